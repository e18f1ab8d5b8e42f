/*
 * ============================================================================
 * EXPORT STORAGE MODULE
 * ============================================================================
 *
 * PURPOSE: Where finished exports land on disk
 *
 * LAYOUT: one flat directory holding <name>.mp4 plus a <name>.json sidecar
 * per export. Names are sanitized, and an existing export is never
 * overwritten; a numeric suffix is appended instead.
 *
 * ============================================================================
 */

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::capture::types::ExportMetadata;
use crate::error::CaptureError;

pub const DEFAULT_FILE_NAME: &str = "glasses-animation";

#[derive(Debug, Clone)]
pub struct ExportStore {
    root: PathBuf,
}

// Paths reserved for one export; the sidecar always shares the video's stem
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub stem: String,
    pub video: PathBuf,
    pub sidecar: PathBuf,
}

// Keep ASCII word characters, dots, underscores and dashes; collapse
// everything else into a single dash.
pub fn sanitize_file_name(raw: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9._-]+").expect("static pattern is valid");
    let cleaned = re.replace_all(raw.trim(), "-");
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

// Platform download directory, with sensible fallbacks.
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl ExportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ExportStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Pick a non-colliding stem and make sure the directory exists.
    pub fn reserve(&self, base_name: &str) -> Result<ExportPaths, CaptureError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            CaptureError::assembly(format!(
                "failed to create export directory {:?}: {}",
                self.root, e
            ))
        })?;

        let base = sanitize_file_name(base_name);
        let mut stem = base.clone();
        let mut n = 1;
        while self.root.join(format!("{}.mp4", stem)).exists()
            || self.root.join(format!("{}.json", stem)).exists()
        {
            n += 1;
            stem = format!("{}-{}", base, n);
            if n > 99 {
                stem = format!("{}-{}", base, chrono::Utc::now().timestamp());
                break;
            }
        }

        Ok(ExportPaths {
            video: self.root.join(format!("{}.mp4", stem)),
            sidecar: self.root.join(format!("{}.json", stem)),
            stem,
        })
    }

    pub fn write_video(&self, paths: &ExportPaths, payload: &[u8]) -> Result<(), CaptureError> {
        fs::write(&paths.video, payload).map_err(|e| {
            CaptureError::assembly(format!("failed to write {:?}: {}", paths.video, e))
        })?;
        log::info!("wrote {} bytes to {:?}", payload.len(), paths.video);
        Ok(())
    }

    pub fn write_sidecar(
        &self,
        paths: &ExportPaths,
        metadata: &ExportMetadata,
    ) -> Result<(), CaptureError> {
        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| CaptureError::assembly(format!("failed to serialize metadata: {}", e)))?;
        fs::write(&paths.sidecar, json).map_err(|e| {
            CaptureError::assembly(format!("failed to write {:?}: {}", paths.sidecar, e))
        })?;
        Ok(())
    }

    // All exports with a parsable sidecar, newest first. Unparsable sidecars
    // are skipped, not fatal.
    pub fn list_exports(&self) -> Vec<ExportMetadata> {
        let mut exports: Vec<ExportMetadata> = Vec::new();
        if !self.root.exists() {
            return exports;
        }
        for entry in WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str::<ExportMetadata>(&s).map_err(|e| e.to_string()))
            {
                Ok(meta) => exports.push(meta),
                Err(e) => log::warn!("skipping unreadable sidecar {:?}: {}", path, e),
            }
        }
        exports.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        exports
    }

    // Total bytes under the export directory
    pub fn total_size(&self) -> u64 {
        if !self.root.exists() {
            return 0;
        }
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta(id: &str, start: &str) -> ExportMetadata {
        ExportMetadata {
            id: id.to_string(),
            file_name: format!("{}.mp4", id),
            format: "mp4".to_string(),
            codec: "h264".to_string(),
            framerate: 30,
            width: 1280,
            height: 720,
            source: "draw-surface".to_string(),
            start_time: start.to_string(),
            end_time: start.to_string(),
            duration_seconds: 20.0,
            frame_count: 600,
            chunk_count: 4,
            total_bytes: 1024,
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("glasses-animation"), "glasses-animation");
        assert_eq!(sanitize_file_name("my export!.mp4"), "my-export-.mp4");
        assert_eq!(sanitize_file_name("  spaced name  "), "spaced-name");
        assert_eq!(sanitize_file_name("///"), DEFAULT_FILE_NAME);
        assert_eq!(sanitize_file_name(""), DEFAULT_FILE_NAME);
        assert_eq!(sanitize_file_name("..."), DEFAULT_FILE_NAME);
    }

    #[test]
    fn test_reserve_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());

        let first = store.reserve("glasses-animation").unwrap();
        assert_eq!(first.stem, "glasses-animation");
        store.write_video(&first, b"video").unwrap();

        let second = store.reserve("glasses-animation").unwrap();
        assert_eq!(second.stem, "glasses-animation-2");
        assert_ne!(first.video, second.video);
    }

    #[test]
    fn test_video_and_sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path().join("exports"));

        let paths = store.reserve("demo run").unwrap();
        assert_eq!(paths.stem, "demo-run");
        store.write_video(&paths, b"mp4-bytes").unwrap();
        store
            .write_sidecar(&paths, &sample_meta("demo-run", "2025-06-01T10:00:00Z"))
            .unwrap();

        assert_eq!(fs::read(&paths.video).unwrap(), b"mp4-bytes");
        let listed = store.list_exports();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "demo-run");
        assert!(store.total_size() > 0);
    }

    #[test]
    fn test_list_skips_corrupt_sidecars_and_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExportStore::new(dir.path());

        let a = store.reserve("older").unwrap();
        store
            .write_sidecar(&a, &sample_meta("older", "2025-06-01T10:00:00Z"))
            .unwrap();
        let b = store.reserve("newer").unwrap();
        store
            .write_sidecar(&b, &sample_meta("newer", "2025-06-02T10:00:00Z"))
            .unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let listed = store.list_exports();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "newer");
        assert_eq!(listed[1].id, "older");
    }

    #[test]
    fn test_missing_directory_is_empty_not_an_error() {
        let store = ExportStore::new("/nonexistent/export/dir");
        assert!(store.list_exports().is_empty());
        assert_eq!(store.total_size(), 0);
    }
}
