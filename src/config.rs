/*
 * ============================================================================
 * BRIDGE CONFIG MODULE
 * ============================================================================
 *
 * PURPOSE: Configuration for the capture exporter and its encoder
 *
 * FUNCTIONALITY:
 * - Load/save configuration to disk, defaults when none exists
 * - Validation of encoder and export knobs
 * - JSON-based storage in the platform config directory
 *
 * ============================================================================
 */

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::encoder::EncodeSettings;
use crate::capture::storage::{self, DEFAULT_FILE_NAME};
use crate::error::ConfigError;

pub const VALID_PRESETS: &[&str] = &[
    "ultrafast", "superfast", "veryfast", "faster", "fast", "medium", "slow", "slower", "veryslow",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    // Target framerate for capture (fps)
    pub framerate: u8,

    // How long one export runs, in seconds
    pub export_duration_secs: u64,

    // Output video width; height follows 16:9
    #[serde(default = "default_output_width")]
    pub output_width: u32,

    // Constant Rate Factor, 0-51, lower is better quality
    #[serde(default = "default_crf")]
    pub crf: u8,

    // FFmpeg preset (ultrafast, superfast, veryfast, faster, fast, medium, slow)
    #[serde(default = "default_preset")]
    pub preset: String,

    // Base name for exported files, without extension
    #[serde(default = "default_file_name")]
    pub file_name: String,

    // Export directory; None means the platform download directory
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

fn default_output_width() -> u32 {
    1280
}

fn default_crf() -> u8 {
    23
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            framerate: 30,
            export_duration_secs: 20,
            output_width: default_output_width(),
            crf: default_crf(),
            preset: default_preset(),
            file_name: default_file_name(),
            export_dir: None,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.framerate < 1 || self.framerate > 30 {
            return Err(ConfigError::invalid("framerate must be between 1 and 30"));
        }
        if self.export_duration_secs < 1 {
            return Err(ConfigError::invalid(
                "export duration must be at least 1 second",
            ));
        }
        if self.output_width < 640 || self.output_width > 3840 {
            return Err(ConfigError::invalid(
                "output width must be between 640 and 3840 pixels",
            ));
        }
        if self.crf > 51 {
            return Err(ConfigError::invalid("CRF must be between 0 and 51"));
        }
        if !VALID_PRESETS.contains(&self.preset.as_str()) {
            return Err(ConfigError::invalid(format!(
                "invalid preset '{}', must be one of: {}",
                self.preset,
                VALID_PRESETS.join(", ")
            )));
        }
        if self.file_name.trim().is_empty() {
            return Err(ConfigError::invalid("file name must not be blank"));
        }
        Ok(())
    }

    pub fn export_duration(&self) -> Duration {
        Duration::from_secs(self.export_duration_secs)
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            fps: self.framerate,
            output_width: self.output_width,
            crf: self.crf,
            preset: self.preset.clone(),
            duration: self.export_duration(),
        }
    }

    pub fn export_root(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(storage::default_export_dir)
    }
}

// Config file path in the platform config directory
fn config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auraspeech-bridge")
        .join("config.json")
}

pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_config_from(&config_path())
}

// Load configuration from disk; missing file means defaults.
pub fn load_config_from(path: &PathBuf) -> Result<BridgeConfig, ConfigError> {
    if !path.exists() {
        log::info!("No bridge config found, using defaults");
        return Ok(BridgeConfig::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: BridgeConfig = serde_json::from_str(&contents)?;
    config.validate()?;

    log::info!("Loaded bridge config from {:?}", path);
    Ok(config)
}

pub fn save_config(config: &BridgeConfig) -> Result<(), ConfigError> {
    save_config_to(&config_path(), config)
}

pub fn save_config_to(path: &PathBuf, config: &BridgeConfig) -> Result<(), ConfigError> {
    config.validate()?;

    // Ensure directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(config)?;
    std::fs::write(path, contents)?;

    log::info!("Saved bridge config to {:?}", path);
    Ok(())
}
