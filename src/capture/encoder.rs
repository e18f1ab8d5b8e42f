/*
 * ============================================================================
 * ENCODER SEAM MODULE
 * ============================================================================
 *
 * PURPOSE: Capability seam between the session controller and the encoder
 *
 * TYPES:
 * - VideoEncoder: turns a frame feed into a stream of output chunks
 * - EncoderRun: the controller's view of one live encode (chunk channel,
 *   stop flag, completion channel)
 * - StopFlag: idempotent stop request, observable from sync and async code
 * - EncodeSettings: the knobs every encoder receives
 *
 * CONTRACT: the encoder must push every chunk into the channel before it
 * resolves the done channel, and seq numbers follow emission order. The
 * controller relies on both to assemble the payload without loss or
 * reordering.
 *
 * ============================================================================
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Notify};

use crate::capture::source::FrameFeed;
use crate::capture::types::Chunk;
use crate::error::CaptureError;

// Encoding parameters resolved from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub fps: u8,
    pub output_width: u32,
    pub crf: u8,
    pub preset: String,
    // Requested recording length; encoders bound their own runtime by it
    pub duration: Duration,
}

impl EncodeSettings {
    // Output height for a 16:9 frame, kept even for yuv420p.
    pub fn output_height(&self) -> u32 {
        let output_height = (self.output_width * 9) / 16;
        if output_height % 2 == 1 {
            output_height + 1
        } else {
            output_height
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub frames_fed: u64,
}

// Idempotent stop request. request() is safe to call any number of times
// from any thread; waiters and pollers both observe it.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    requested: AtomicBool,
    notify: Notify,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        if !self.inner.requested.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    // Resolve once a stop has been requested. The notified future is
    // registered before the flag check so a concurrent request() cannot
    // slip between them.
    pub async fn requested(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

// One live encode, handed to the controller by VideoEncoder::begin
#[derive(Debug)]
pub struct EncoderRun {
    pub(crate) chunks: mpsc::UnboundedReceiver<Chunk>,
    pub(crate) stop: StopFlag,
    pub(crate) done: oneshot::Receiver<Result<EncodeStats, CaptureError>>,
}

impl EncoderRun {
    pub fn new(
        chunks: mpsc::UnboundedReceiver<Chunk>,
        stop: StopFlag,
        done: oneshot::Receiver<Result<EncodeStats, CaptureError>>,
    ) -> Self {
        EncoderRun { chunks, stop, done }
    }
}

pub trait VideoEncoder: Send + Sync {
    // Start encoding the feed. Returns Err when the encode cannot start at
    // all (missing binary, unusable feed); failures after a successful
    // begin are reported through the run's done channel instead.
    fn begin(
        &self,
        feed: Box<dyn FrameFeed>,
        settings: &EncodeSettings,
    ) -> Result<EncoderRun, CaptureError>;
}
