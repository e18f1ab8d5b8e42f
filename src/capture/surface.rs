/*
 * ============================================================================
 * TURNTABLE SURFACE MODULE
 * ============================================================================
 *
 * PURPOSE: In-process capture target that films the rotating glasses view
 *
 * The feed renders the turntable directly into BGRA frames, one per frame
 * interval, and advances the shared turntable by exactly that interval per
 * frame. While a capture runs the feed is the animation clock, which makes
 * a 20 second export cover exactly one revolution at default settings.
 *
 * ============================================================================
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::encoder::EncodeSettings;
use crate::capture::source::{CaptureStream, CaptureTarget, FrameFeed, TargetKind, TrackHandle};
use crate::error::CaptureError;
use crate::showcase::turntable::SharedTurntable;

// Progress strip color, #3498db in BGR
const ACCENT_BGR: [u8; 3] = [219, 152, 52];

const LENS_BGR: [u8; 3] = [38, 34, 30];
const FRAME_RIM_BGR: [u8; 3] = [190, 185, 178];
const PLATFORM_BGR: [u8; 3] = [48, 42, 38];

// Lets a host mark the surface as hidden after handing the target to the
// controller
#[derive(Debug, Clone)]
pub struct MountHandle {
    mounted: Arc<AtomicBool>,
}

impl MountHandle {
    pub fn set(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct TurntableSurface {
    turntable: SharedTurntable,
    width: u32,
    height: u32,
    fps: u8,
    mounted: Arc<AtomicBool>,
}

impl TurntableSurface {
    pub fn new(turntable: SharedTurntable, width: u32, height: u32, fps: u8) -> Self {
        TurntableSurface {
            turntable,
            width,
            height,
            fps: fps.max(1),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    // Render at the encoder's output size so no scaling is needed.
    pub fn from_settings(turntable: SharedTurntable, settings: &EncodeSettings) -> Self {
        Self::new(
            turntable,
            settings.output_width,
            settings.output_height(),
            settings.fps,
        )
    }

    pub fn mount_handle(&self) -> MountHandle {
        MountHandle {
            mounted: Arc::clone(&self.mounted),
        }
    }
}

impl CaptureTarget for TurntableSurface {
    fn kind(&self) -> TargetKind {
        TargetKind::DrawSurface
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn open(&self) -> Result<CaptureStream, CaptureError> {
        if !self.is_mounted() {
            return Err(CaptureError::PermissionDenied);
        }
        log::info!(
            "opening turntable surface stream ({}x{} @ {} fps)",
            self.width,
            self.height,
            self.fps
        );
        let tracks = TrackHandle::new();
        let feed = TurntableFeed {
            turntable: Arc::clone(&self.turntable),
            width: self.width,
            height: self.height,
            frame_interval: Duration::from_secs_f64(1.0 / self.fps as f64),
            next_due: None,
            scratch: Vec::new(),
            tracks: tracks.clone(),
        };
        Ok(CaptureStream {
            frames: Box::new(feed),
            tracks,
        })
    }
}

struct TurntableFeed {
    turntable: SharedTurntable,
    width: u32,
    height: u32,
    frame_interval: Duration,
    next_due: Option<Instant>,
    scratch: Vec<u8>,
    tracks: TrackHandle,
}

impl FrameFeed for TurntableFeed {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError> {
        if self.tracks.is_stopped() {
            return Ok(None);
        }

        // Pace to the frame interval; the first frame renders immediately.
        // Scheduling from the previous due time keeps the cadence drift free.
        let now = Instant::now();
        match self.next_due {
            None => self.next_due = Some(now + self.frame_interval),
            Some(due) => {
                if due > now {
                    thread::sleep(due - now);
                }
                self.next_due = Some(due + self.frame_interval);
            }
        }

        // Snapshot first so frame zero shows the starting pose, then step
        // the turntable by one frame interval
        let rotation = {
            let mut guard = self.turntable.lock().unwrap();
            let rotation = guard.rotation();
            guard.advance(self.frame_interval);
            rotation
        };

        render_into(&mut self.scratch, self.width, self.height, rotation);
        Ok(Some(&self.scratch))
    }
}

// Software render of the turntable at one rotation angle. Pure: the same
// inputs always produce the same bytes.
pub fn render_frame(width: u32, height: u32, rotation_deg: f32) -> Vec<u8> {
    let mut buf = Vec::new();
    render_into(&mut buf, width, height, rotation_deg);
    buf
}

fn render_into(buf: &mut Vec<u8>, width: u32, height: u32, rotation_deg: f32) {
    let w = width as i32;
    let h = height as i32;
    buf.clear();
    buf.resize((width as usize) * (height as usize) * 4, 0);

    // Background: near-black vertical gradient
    for y in 0..h {
        let shade = 14 + ((y * 18) / h.max(1)) as u8;
        for x in 0..w {
            put_px(buf, w, x, y, [shade.saturating_add(6), shade, shade]);
        }
    }

    // Platform under the model
    fill_ellipse(
        buf,
        w,
        h,
        w as f32 / 2.0,
        h as f32 * 0.78,
        w as f32 * 0.28,
        h as f32 * 0.05,
        PLATFORM_BGR,
    );

    let theta = rotation_deg.to_radians();
    // Horizontal squash fakes the yaw; never fully edge-on
    let squash = theta.cos().abs().max(0.18);
    let cx = w as f32 / 2.0;
    let cy = h as f32 * 0.45;
    let lens_r = h as f32 * 0.11;
    let lens_dx = w as f32 * 0.13 * squash;

    // Temples show once the model turns away from straight-on
    if squash < 0.6 {
        let dir = if theta.sin() >= 0.0 { 1.0 } else { -1.0 };
        let arm_len = w as f32 * 0.16 * (1.0 - squash);
        let x0 = cx + dir * (lens_dx + lens_r * 0.6);
        let x1 = x0 + dir * arm_len;
        fill_rect(
            buf,
            w,
            h,
            x0.min(x1),
            cy - lens_r * 0.12,
            x0.max(x1),
            cy + lens_r * 0.12,
            FRAME_RIM_BGR,
        );
    }

    // Bridge between the lenses
    fill_rect(
        buf,
        w,
        h,
        cx - lens_dx,
        cy - lens_r * 0.15,
        cx + lens_dx,
        cy + lens_r * 0.15,
        FRAME_RIM_BGR,
    );

    // Lenses: rim circle with a darker glass disc inside
    for side in [-1.0f32, 1.0] {
        let lx = cx + side * lens_dx;
        fill_ellipse(buf, w, h, lx, cy, lens_r * squash.max(0.35), lens_r, FRAME_RIM_BGR);
        fill_ellipse(
            buf,
            w,
            h,
            lx,
            cy,
            (lens_r - 3.0).max(1.0) * squash.max(0.35),
            (lens_r - 3.0).max(1.0),
            LENS_BGR,
        );
    }

    // Rotation progress strip along the bottom edge
    let filled = ((rotation_deg / 360.0) * w as f32) as i32;
    for y in (h - 4).max(0)..h {
        for x in 0..filled.min(w) {
            put_px(buf, w, x, y, ACCENT_BGR);
        }
    }
}

fn put_px(buf: &mut [u8], w: i32, x: i32, y: i32, bgr: [u8; 3]) {
    let idx = ((y * w + x) as usize) * 4;
    buf[idx] = bgr[0];
    buf[idx + 1] = bgr[1];
    buf[idx + 2] = bgr[2];
    buf[idx + 3] = 255;
}

fn fill_rect(buf: &mut [u8], w: i32, h: i32, x0: f32, y0: f32, x1: f32, y1: f32, bgr: [u8; 3]) {
    let xs = (x0.floor() as i32).max(0);
    let xe = (x1.ceil() as i32).min(w);
    let ys = (y0.floor() as i32).max(0);
    let ye = (y1.ceil() as i32).min(h);
    for y in ys..ye {
        for x in xs..xe {
            put_px(buf, w, x, y, bgr);
        }
    }
}

fn fill_ellipse(buf: &mut [u8], w: i32, h: i32, cx: f32, cy: f32, rx: f32, ry: f32, bgr: [u8; 3]) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let xs = ((cx - rx).floor() as i32).max(0);
    let xe = ((cx + rx).ceil() as i32).min(w);
    let ys = ((cy - ry).floor() as i32).max(0);
    let ye = ((cy + ry).ceil() as i32).min(h);
    for y in ys..ye {
        for x in xs..xe {
            let dx = (x as f32 + 0.5 - cx) / rx;
            let dy = (y as f32 + 0.5 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                put_px(buf, w, x, y, bgr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::showcase::turntable::Turntable;

    #[test]
    fn test_render_is_deterministic() {
        let a = render_frame(64, 36, 90.0);
        let b = render_frame(64, 36, 90.0);
        assert_eq!(a.len(), 64 * 36 * 4);
        assert_eq!(a, b);
        assert_ne!(a, render_frame(64, 36, 0.0));
    }

    #[test]
    fn test_progress_strip_tracks_rotation() {
        let w = 64usize;
        let frame = render_frame(w as u32, 36, 180.0);
        let row = 35usize;
        let left = ((row * w) + w / 4) * 4;
        let right = ((row * w) + (3 * w) / 4) * 4;
        // Half turn: strip covers the left quarter but not the right
        assert_eq!(&frame[left..left + 3], &ACCENT_BGR);
        assert_ne!(&frame[right..right + 3], &ACCENT_BGR);
    }

    #[test]
    fn test_feed_advances_turntable_per_frame() {
        let turntable = Turntable::shared();
        let surface = TurntableSurface::new(Arc::clone(&turntable), 64, 36, 200);
        let mut stream = surface.open().unwrap();

        let first = stream.frames.next_frame().unwrap().unwrap().to_vec();
        assert_eq!(first, render_frame(64, 36, 0.0));
        stream.frames.next_frame().unwrap().unwrap();

        // Two frames consumed: the turntable has stepped twice at 200 fps
        let expected = 2.0 * (1.0 / 200.0) * 18.0;
        let rotation = turntable.lock().unwrap().rotation();
        assert!((rotation - expected).abs() < 0.001, "rotation {}", rotation);
    }

    #[test]
    fn test_released_tracks_end_the_feed() {
        let surface = TurntableSurface::new(Turntable::shared(), 64, 36, 200);
        let mut stream = surface.open().unwrap();
        stream.tracks.stop_all();
        assert!(stream.frames.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_unmounted_surface_refuses_to_open() {
        let surface = TurntableSurface::new(Turntable::shared(), 64, 36, 30);
        let mount = surface.mount_handle();
        assert!(surface.is_mounted());
        mount.set(false);
        assert!(!surface.is_mounted());
        assert!(matches!(
            surface.open(),
            Err(CaptureError::PermissionDenied)
        ));
    }
}
