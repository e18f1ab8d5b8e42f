/*
 * ============================================================================
 * CAPTURE TYPES MODULE
 * ============================================================================
 *
 * PURPOSE: Data model for one export session: lifecycle status, encoded
 * chunks, the UI snapshot taken at start, the lock-free cells progress
 * readers poll, and the metadata sidecar written next to each export
 *
 * ============================================================================
 */

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CaptureError, UserNotice};
use crate::showcase::turntable::SharedTurntable;

// Lifecycle of a capture session. Terminal states are Completed and Failed;
// there are no other exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SessionStatus {
    Idle = 0,
    Requesting = 1,
    Recording = 2,
    Finalizing = 3,
    Completed = 4,
    Failed = 5,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    fn from_u8(raw: u8) -> SessionStatus {
        match raw {
            0 => SessionStatus::Idle,
            1 => SessionStatus::Requesting,
            2 => SessionStatus::Recording,
            3 => SessionStatus::Finalizing,
            4 => SessionStatus::Completed,
            _ => SessionStatus::Failed,
        }
    }
}

// One encoded output chunk. seq is the arrival index assigned by the
// encoder; payload assembly preserves this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub seq: u64,
    pub data: Vec<u8>,
}

// Showcase state captured when a session starts and restored on every
// terminal path, success or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorUiState {
    pub playing: bool,
    pub auto_rotate: bool,
}

impl PriorUiState {
    pub fn capture(turntable: &SharedTurntable) -> Self {
        let guard = turntable.lock().unwrap();
        PriorUiState {
            playing: guard.playing(),
            auto_rotate: guard.auto_rotate(),
        }
    }

    pub fn restore(&self, turntable: &SharedTurntable) {
        let mut guard = turntable.lock().unwrap();
        guard.set_playing(self.playing);
        guard.set_auto_rotate(self.auto_rotate);
    }
}

// Shared progress cells. The session task is the only writer; any number of
// progress readers may poll without locking.
#[derive(Debug)]
pub struct SessionCells {
    status: AtomicU8,
    elapsed_ms: AtomicU64,
    chunk_count: AtomicU64,
    duration_ms: u64,
}

impl SessionCells {
    pub fn new(duration: Duration) -> Self {
        SessionCells {
            status: AtomicU8::new(SessionStatus::Idle as u8),
            elapsed_ms: AtomicU64::new(0),
            chunk_count: AtomicU64::new(0),
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: SessionStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }

    pub fn set_elapsed_ms(&self, elapsed: u64) {
        self.elapsed_ms.store(elapsed, Ordering::SeqCst);
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count.load(Ordering::SeqCst)
    }

    pub fn record_chunk(&self) {
        self.chunk_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    // Elapsed over requested duration, clamped to [0, 100].
    pub fn percent(&self) -> f64 {
        if self.duration_ms == 0 {
            return 100.0;
        }
        let pct = self.elapsed_ms() as f64 / self.duration_ms as f64 * 100.0;
        pct.min(100.0)
    }
}

// Caller-tunable knobs for one export. Unset fields fall back to the
// configured defaults.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub file_name: Option<String>,
    pub duration: Option<Duration>,
}

impl ExportRequest {
    pub fn named(file_name: impl Into<String>) -> Self {
        ExportRequest {
            file_name: Some(file_name.into()),
            duration: None,
        }
    }
}

fn default_format() -> String {
    "mp4".to_string()
}

fn default_codec() -> String {
    "h264".to_string()
}

// Sidecar written next to every exported video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub id: String,
    pub file_name: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_codec")]
    pub codec: String,
    pub framerate: u8,
    pub width: u32,
    pub height: u32,
    pub source: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
    pub frame_count: u64,
    pub chunk_count: u64,
    pub total_bytes: u64,
}

// What a completed session leaves on disk
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub video_path: PathBuf,
    pub sidecar_path: PathBuf,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub elapsed_ms: u64,
    pub chunk_count: u64,
    pub payload_bytes: u64,
}

// Final report delivered to whoever holds the session handle
#[derive(Debug)]
pub struct SessionOutcome {
    pub session: Uuid,
    pub status: SessionStatus,
    pub notice: UserNotice,
    pub artifact: Option<ExportArtifact>,
    pub error: Option<CaptureError>,
    pub stats: SessionStats,
}

impl SessionOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}
