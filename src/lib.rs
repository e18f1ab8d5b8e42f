/*
 * ============================================================================
 * AURASPEECH BRIDGE
 * ============================================================================
 *
 * Smart-glasses companion demo: a simulated AuraSpeech device showcase
 * (turntable, communication modes, speech loop, usage dashboard) and the
 * capture pipeline that records the showcase animation to an MP4 export.
 *
 * Hosts embed the library by sharing one turntable between their render
 * loop and a CaptureController, then driving sessions through
 * SessionHandle and ProgressReporter.
 *
 * ============================================================================
 */

pub mod capture;
pub mod config;
pub mod error;
pub mod showcase;

pub use capture::controller::{
    CaptureController, CaptureGate, SessionHandle, StartOutcome, PROGRESS_TICK,
};
pub use capture::encoder::{EncodeSettings, EncodeStats, EncoderRun, StopFlag, VideoEncoder};
pub use capture::ffmpeg::FfmpegEncoder;
pub use capture::progress::ProgressReporter;
#[cfg(feature = "screen-capture")]
pub use capture::screen::ScreenPicker;
pub use capture::source::{
    CaptureStream, CaptureTarget, FrameFeed, TargetKind, TargetPreference, TrackHandle,
};
pub use capture::storage::ExportStore;
pub use capture::surface::{MountHandle, TurntableSurface};
pub use capture::types::{
    ExportArtifact, ExportMetadata, ExportRequest, SessionOutcome, SessionStats, SessionStatus,
};
pub use config::{load_config, save_config, BridgeConfig};
pub use error::{CaptureError, ConfigError, NoticeKind, UserNotice};
pub use showcase::turntable::{SharedTurntable, Turntable};
