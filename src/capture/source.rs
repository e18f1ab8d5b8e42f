/*
 * ============================================================================
 * CAPTURE SOURCE MODULE
 * ============================================================================
 *
 * PURPOSE: Capability seam between the session controller and whatever can
 * produce pixels
 *
 * TYPES:
 * - CaptureTarget: something that can be opened into a live stream
 * - FrameFeed: pull-based BGRA frame source owned by the encoder
 * - TrackHandle: release flag observed by every feed spawned from a stream
 * - TargetPreference: explicit, ordered target selection
 *
 * Selection is deliberate: the controller walks the preference order and
 * takes the first mounted target. There is no implicit fallback chain.
 *
 * ============================================================================
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    // The in-process turntable renderer
    DrawSurface,
    // OS screen picker, user mediated
    ScreenPicker,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::DrawSurface => "draw-surface",
            TargetKind::ScreenPicker => "screen-picker",
        }
    }
}

// Ordered list of target kinds to try. The default prefers the in-process
// surface and falls back to the screen picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPreference {
    order: Vec<TargetKind>,
}

impl Default for TargetPreference {
    fn default() -> Self {
        TargetPreference {
            order: vec![TargetKind::DrawSurface, TargetKind::ScreenPicker],
        }
    }
}

impl TargetPreference {
    pub fn new(order: Vec<TargetKind>) -> Self {
        TargetPreference { order }
    }

    pub fn only(kind: TargetKind) -> Self {
        TargetPreference { order: vec![kind] }
    }

    pub fn order(&self) -> &[TargetKind] {
        &self.order
    }
}

// Cooperative stop signal for the tracks behind a stream. Cloned into every
// feed; a stopped handle makes feeds report end-of-stream on the next pull.
#[derive(Debug, Clone, Default)]
pub struct TrackHandle {
    stopped: Arc<AtomicBool>,
}

impl TrackHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_all(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            log::debug!("capture tracks released");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// Pull-based frame source. Implementations pace themselves; a call may block
// until the next frame is due. Returning Ok(None) ends the stream.
pub trait FrameFeed: Send {
    // Frame dimensions in pixels. Fixed for the life of the feed.
    fn dimensions(&self) -> (u32, u32);

    // Next tightly packed BGRA frame (width * height * 4 bytes). The slice
    // is valid until the next call; feeds reuse their buffers.
    fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError>;
}

// A live capture stream: the frames plus the handle that releases them
pub struct CaptureStream {
    pub frames: Box<dyn FrameFeed>,
    pub tracks: TrackHandle,
}

// Targets are shared behind Arcs so a blocked open() never holds the
// candidate list; is_mounted() may be read while an open is in flight.
pub trait CaptureTarget: Send + Sync {
    fn kind(&self) -> TargetKind;

    // Whether the target is currently present and selectable.
    fn is_mounted(&self) -> bool;

    // Acquire a live stream. May block on user mediation (permission
    // prompts, picker dialogs); the controller calls this off the async
    // runtime.
    fn open(&self) -> Result<CaptureStream, CaptureError>;
}

// First mounted candidate in preference order, if any.
pub fn select_index(
    preference: &TargetPreference,
    candidates: &[Arc<dyn CaptureTarget>],
) -> Option<usize> {
    for kind in preference.order() {
        if let Some(idx) = candidates
            .iter()
            .position(|c| c.kind() == *kind && c.is_mounted())
        {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubTarget {
        kind: TargetKind,
        mounted: bool,
    }

    impl CaptureTarget for StubTarget {
        fn kind(&self) -> TargetKind {
            self.kind
        }

        fn is_mounted(&self) -> bool {
            self.mounted
        }

        fn open(&self) -> Result<CaptureStream, CaptureError> {
            Err(CaptureError::PermissionDenied)
        }
    }

    // make sure the trait stays object safe with the borrowed return
    struct EmptyFeed;

    impl FrameFeed for EmptyFeed {
        fn dimensions(&self) -> (u32, u32) {
            (0, 0)
        }

        fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError> {
            Ok(None)
        }
    }

    #[test]
    fn test_feed_is_object_safe() {
        let mut feed: Box<dyn FrameFeed> = Box::new(EmptyFeed);
        assert!(feed.next_frame().unwrap().is_none());
    }

    fn candidate(kind: TargetKind, mounted: bool) -> Arc<dyn CaptureTarget> {
        Arc::new(StubTarget { kind, mounted })
    }

    #[test]
    fn test_selection_follows_preference_order() {
        let candidates = vec![
            candidate(TargetKind::ScreenPicker, true),
            candidate(TargetKind::DrawSurface, true),
        ];
        // Surface wins even though the picker is listed first in candidates
        let idx = select_index(&TargetPreference::default(), &candidates).unwrap();
        assert_eq!(candidates[idx].kind(), TargetKind::DrawSurface);

        let picker_first = TargetPreference::new(vec![
            TargetKind::ScreenPicker,
            TargetKind::DrawSurface,
        ]);
        let idx = select_index(&picker_first, &candidates).unwrap();
        assert_eq!(candidates[idx].kind(), TargetKind::ScreenPicker);
    }

    #[test]
    fn test_unmounted_targets_are_skipped() {
        let candidates = vec![
            candidate(TargetKind::DrawSurface, false),
            candidate(TargetKind::ScreenPicker, true),
        ];
        let idx = select_index(&TargetPreference::default(), &candidates).unwrap();
        assert_eq!(candidates[idx].kind(), TargetKind::ScreenPicker);
    }

    #[test]
    fn test_no_mounted_target_selects_nothing() {
        let candidates = vec![candidate(TargetKind::DrawSurface, false)];
        assert_eq!(select_index(&TargetPreference::default(), &candidates), None);

        let empty: Vec<Arc<dyn CaptureTarget>> = Vec::new();
        assert_eq!(select_index(&TargetPreference::default(), &empty), None);
    }

    #[test]
    fn test_preference_can_exclude_kinds() {
        let candidates = vec![
            candidate(TargetKind::DrawSurface, true),
            candidate(TargetKind::ScreenPicker, true),
        ];
        let only_picker = TargetPreference::only(TargetKind::ScreenPicker);
        let idx = select_index(&only_picker, &candidates).unwrap();
        assert_eq!(candidates[idx].kind(), TargetKind::ScreenPicker);

        let only_surface = TargetPreference::only(TargetKind::DrawSurface);
        let candidates = vec![candidate(TargetKind::ScreenPicker, true)];
        assert_eq!(select_index(&only_surface, &candidates), None);
    }

    #[test]
    fn test_track_handle_stop_is_idempotent() {
        let tracks = TrackHandle::new();
        let clone = tracks.clone();
        assert!(!clone.is_stopped());
        tracks.stop_all();
        tracks.stop_all();
        assert!(clone.is_stopped());
    }
}
