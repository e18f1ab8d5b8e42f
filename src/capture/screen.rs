/*
 * ============================================================================
 * SCREEN PICKER MODULE
 * ============================================================================
 *
 * PURPOSE: OS screen capture target via scap, used when the in-process
 * surface is unavailable
 *
 * FUNCTIONALITY:
 * - Check platform support and permissions
 * - Capture the primary display as BGRA frames
 * - Reuse the previous frame when scap delivers an empty one, skip frames
 *   with a wrong size to avoid desyncing the encoder
 *
 * Only compiled with the `screen-capture` feature.
 *
 * ============================================================================
 */

use std::thread;
use std::time::{Duration, Instant};

use scap::{
    capturer::{Capturer, Options},
    frame::{Frame, FrameType},
    Target,
};

use crate::capture::source::{CaptureStream, CaptureTarget, FrameFeed, TargetKind, TrackHandle};
use crate::error::CaptureError;

// Consecutive scap errors tolerated before the feed gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 250;

pub fn is_supported() -> bool {
    scap::is_supported()
}

pub fn has_permission() -> bool {
    scap::has_permission()
}

// Primary-display targets only; windows are not offered.
fn display_targets() -> Vec<Target> {
    scap::get_all_targets()
        .into_iter()
        .filter(|t| matches!(t, Target::Display(_)))
        .collect()
}

pub fn display_count() -> usize {
    display_targets().len()
}

#[derive(Debug, Clone)]
pub struct ScreenPicker {
    fps: u8,
}

impl ScreenPicker {
    pub fn new(fps: u8) -> Self {
        ScreenPicker { fps: fps.max(1) }
    }
}

impl CaptureTarget for ScreenPicker {
    fn kind(&self) -> TargetKind {
        TargetKind::ScreenPicker
    }

    fn is_mounted(&self) -> bool {
        is_supported() && display_count() > 0
    }

    fn open(&self) -> Result<CaptureStream, CaptureError> {
        if !scap::is_supported() {
            log::error!("screen capture not supported on this platform");
            return Err(CaptureError::PermissionDenied);
        }
        if !scap::has_permission() {
            log::error!(
                "screen recording permission not granted. On macOS, enable in \
                 System Preferences > Privacy & Security > Screen Recording"
            );
            return Err(CaptureError::PermissionDenied);
        }

        let target = display_targets().into_iter().next().ok_or_else(|| {
            log::error!("no display target found");
            CaptureError::PermissionDenied
        })?;

        let options = Options {
            fps: self.fps as u32,
            target: Some(target),
            show_cursor: true,
            show_highlight: false,
            excluded_targets: None,
            output_type: FrameType::BGRAFrame,
            output_resolution: scap::capturer::Resolution::Captured,
            ..Default::default()
        };

        let mut capturer = Capturer::build(options).map_err(|e| {
            log::error!("failed to create capturer: {:?}", e);
            CaptureError::PermissionDenied
        })?;
        capturer.start_capture();

        // Let the capturer settle before demanding frames
        thread::sleep(Duration::from_millis(100));

        let (width, height, first) = wait_for_first_frame(&mut capturer)?;
        log::info!("screen capture initialized: {}x{}", width, height);

        let tracks = TrackHandle::new();
        let feed = ScreenFeed {
            capturer: Some(capturer),
            width,
            height,
            expected_size: (width as usize) * (height as usize) * 4,
            pending_first: true,
            last_good: first,
            empty_frames: 0,
            wrong_size: 0,
            tracks: tracks.clone(),
        };
        Ok(CaptureStream {
            frames: Box::new(feed),
            tracks,
        })
    }
}

struct ScreenFeed {
    capturer: Option<Capturer>,
    width: u32,
    height: u32,
    expected_size: usize,
    // First frame arrived during open(); hand it out on the first pull
    pending_first: bool,
    last_good: Vec<u8>,
    empty_frames: u64,
    wrong_size: u64,
    tracks: TrackHandle,
}

impl ScreenFeed {
    fn release(&mut self) {
        if let Some(mut capturer) = self.capturer.take() {
            capturer.stop_capture();
            if self.empty_frames > 0 {
                log::info!(
                    "reused previous frame {} times (empty frames from scap)",
                    self.empty_frames
                );
            }
            if self.wrong_size > 0 {
                log::warn!("skipped {} frames with wrong size", self.wrong_size);
            }
        }
    }
}

impl Drop for ScreenFeed {
    fn drop(&mut self) {
        self.release();
    }
}

impl FrameFeed for ScreenFeed {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError> {
        if self.tracks.is_stopped() {
            self.release();
            return Ok(None);
        }
        if self.pending_first {
            self.pending_first = false;
            return Ok(Some(&self.last_good));
        }

        let mut consecutive_errors: u32 = 0;
        loop {
            if self.tracks.is_stopped() {
                self.release();
                return Ok(None);
            }
            let Some(capturer) = self.capturer.as_mut() else {
                return Ok(None);
            };
            match capturer.get_next_frame() {
                Ok(frame) => {
                    let Some(data) = frame_data(frame) else {
                        log::warn!("unexpected frame type, skipping");
                        continue;
                    };
                    if data.len() == self.expected_size {
                        self.last_good = data;
                        return Ok(Some(&self.last_good));
                    } else if data.is_empty() {
                        // Empty frame from scap - reuse last good frame
                        self.empty_frames += 1;
                        return Ok(Some(&self.last_good));
                    } else {
                        self.wrong_size += 1;
                        if self.wrong_size <= 3 {
                            log::warn!(
                                "wrong frame size, expected {} bytes, got {}",
                                self.expected_size,
                                data.len()
                            );
                        }
                        continue;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors % 50 == 0 {
                        log::warn!(
                            "capture error persists after {} attempts: {:?}",
                            consecutive_errors,
                            e
                        );
                    }
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        log::error!("screen capture stalled: {:?}", e);
                        self.release();
                        return Err(CaptureError::assembly("screen capture stalled"));
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            }
        }
    }
}

fn frame_data(frame: Frame) -> Option<Vec<u8>> {
    match frame {
        Frame::BGRA(f) => Some(f.data),
        Frame::BGR0(f) => Some(f.data),
        Frame::RGB(f) => Some(f.data),
        Frame::RGBx(f) => Some(f.data),
        Frame::XBGR(f) => Some(f.data),
        Frame::BGRx(f) => Some(f.data),
        _ => None,
    }
}

// Wait for the first frame to learn the true capture dimensions.
fn wait_for_first_frame(capturer: &mut Capturer) -> Result<(u32, u32, Vec<u8>), CaptureError> {
    let start = Instant::now();
    let timeout = Duration::from_secs(15);
    let mut attempt = 0;

    while start.elapsed() < timeout {
        attempt += 1;
        match capturer.get_next_frame() {
            Ok(frame) => {
                let (width, height, data) = match frame {
                    Frame::BGRA(f) => (f.width as u32, f.height as u32, f.data),
                    Frame::BGR0(f) => (f.width as u32, f.height as u32, f.data),
                    Frame::RGB(f) => (f.width as u32, f.height as u32, f.data),
                    Frame::RGBx(f) => (f.width as u32, f.height as u32, f.data),
                    Frame::XBGR(f) => (f.width as u32, f.height as u32, f.data),
                    Frame::BGRx(f) => (f.width as u32, f.height as u32, f.data),
                    _ => continue,
                };
                if data.is_empty() {
                    continue;
                }
                log::info!(
                    "got first frame after {} attempts: {}x{}, {} bytes",
                    attempt,
                    width,
                    height,
                    data.len()
                );
                return Ok((width, height, data));
            }
            Err(_) => {
                if attempt % 50 == 0 {
                    log::warn!(
                        "still waiting for first frame (attempt {}, {:.1}s elapsed)",
                        attempt,
                        start.elapsed().as_secs_f32()
                    );
                }
                thread::sleep(Duration::from_millis(20));
            }
        }
    }

    log::error!(
        "timeout waiting for first frame after {:.1}s, check screen recording permissions",
        timeout.as_secs_f32()
    );
    Err(CaptureError::PermissionDenied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picker_kind() {
        let picker = ScreenPicker::new(30);
        assert_eq!(picker.kind(), TargetKind::ScreenPicker);
    }

    #[test]
    fn test_fps_has_a_floor() {
        let picker = ScreenPicker::new(0);
        assert_eq!(picker.fps, 1);
    }
}
