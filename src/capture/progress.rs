/*
 * ============================================================================
 * PROGRESS MODULE
 * ============================================================================
 *
 * PURPOSE: Read-only progress view over a running session
 *
 * Reporters are cheap to clone and safe to poll from any thread. Elapsed
 * time advances only with the session's own 100ms tick, never with frame
 * timestamps, so percent() is exact at tick boundaries.
 *
 * ============================================================================
 */

use std::sync::Arc;

use crate::capture::types::{SessionCells, SessionStatus};

#[derive(Debug, Clone)]
pub struct ProgressReporter {
    cells: Arc<SessionCells>,
}

impl ProgressReporter {
    pub(crate) fn new(cells: Arc<SessionCells>) -> Self {
        ProgressReporter { cells }
    }

    pub fn status(&self) -> SessionStatus {
        self.cells.status()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.cells.elapsed_ms()
    }

    pub fn duration_ms(&self) -> u64 {
        self.cells.duration_ms()
    }

    pub fn chunk_count(&self) -> u64 {
        self.cells.chunk_count()
    }

    // Percentage in [0, 100]
    pub fn percent(&self) -> f64 {
        self.cells.percent()
    }

    pub fn finished(&self) -> bool {
        self.status().is_terminal()
    }
}
