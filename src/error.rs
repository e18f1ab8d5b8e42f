/*
 * ============================================================================
 * ERROR MODULE
 * ============================================================================
 *
 * PURPOSE: Error taxonomy and user-facing notices for the capture pipeline
 *
 * TYPES:
 * - CaptureError: the four recoverable capture failures; never propagates
 *   past the session controller as an unhandled fault
 * - ConfigError: configuration load/save/validation failures
 * - UserNotice: the single generic success/failure notification surfaced
 *   to whoever is hosting the demo
 *
 * ============================================================================
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Failures the capture pipeline can produce. Every variant is recovered at
// the controller boundary: the session ends in Failed, prior UI state is
// restored, and the host sees one generic notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    // The host environment (or the user) refused to hand out a stream.
    #[error("capture permission denied")]
    PermissionDenied,

    // The encoder is missing or cannot produce the requested container.
    #[error("unsupported encoder or container: {reason}")]
    UnsupportedEncoding { reason: String },

    // The encoder stopped without emitting a single chunk.
    #[error("recording stopped with no captured data")]
    EmptyCapture,

    // Assembling or delivering the output payload failed.
    #[error("failed to assemble recording output: {reason}")]
    AssemblyFailure { reason: String },
}

impl CaptureError {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        CaptureError::UnsupportedEncoding {
            reason: reason.into(),
        }
    }

    pub fn assembly(reason: impl Into<String>) -> Self {
        CaptureError::AssemblyFailure {
            reason: reason.into(),
        }
    }
}

// Configuration errors (load, save, validation)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },

    #[error("failed to read or write config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            reason: reason.into(),
        }
    }
}

// Notice category shown to the user at the end of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Failure,
}

// The one user-visible notification per outcome category. Individual error
// causes are logged but deliberately not differentiated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl UserNotice {
    // Shown once an export lands on disk.
    pub fn export_succeeded() -> Self {
        UserNotice {
            kind: NoticeKind::Success,
            message: "Video downloaded successfully!".to_string(),
        }
    }

    // Generic failure notice; covers every CaptureError variant.
    pub fn export_failed() -> Self {
        UserNotice {
            kind: NoticeKind::Failure,
            message: "Failed to start recording. Please try again or use screen recording software."
                .to_string(),
        }
    }

    // Start precondition failure: no mounted capture target.
    pub fn nothing_to_record() -> Self {
        UserNotice {
            kind: NoticeKind::Failure,
            message: "Nothing to record. Please ensure the animation is visible.".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NoticeKind::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_display() {
        let e = CaptureError::unsupported("no ffmpeg on PATH");
        assert!(e.to_string().contains("no ffmpeg on PATH"));
        assert_eq!(
            CaptureError::PermissionDenied.to_string(),
            "capture permission denied"
        );
    }

    #[test]
    fn test_notice_categories() {
        assert!(UserNotice::export_succeeded().is_success());
        assert!(!UserNotice::export_failed().is_success());
        assert!(!UserNotice::nothing_to_record().is_success());
    }

    #[test]
    fn test_config_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: ConfigError = io.into();
        assert!(e.to_string().contains("missing"));
    }
}
