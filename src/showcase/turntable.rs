/*
 * ============================================================================
 * TURNTABLE MODULE
 * ============================================================================
 *
 * PURPOSE: Rotating product view driven by the showcase
 *
 * The glasses model spins at a fixed angular velocity so one full revolution
 * takes exactly as long as the default video export. Playback and auto-rotate
 * can be toggled independently; rotation only advances while both are on.
 *
 * ============================================================================
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// One revolution in 20 seconds
pub const ROTATION_DEGREES_PER_SEC: f32 = 18.0;

pub const FULL_TURN_DEGREES: f32 = 360.0;

// Which of the three product renders faces the viewer at a given angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductFacing {
    Front,
    Side,
    Back,
}

#[derive(Debug, Clone)]
pub struct Turntable {
    rotation: f32,
    playing: bool,
    auto_rotate: bool,
}

// Handle shared between the showcase host and the capture pipeline
pub type SharedTurntable = Arc<Mutex<Turntable>>;

impl Default for Turntable {
    fn default() -> Self {
        Turntable {
            rotation: 0.0,
            playing: true,
            auto_rotate: true,
        }
    }
}

impl Turntable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedTurntable {
        Arc::new(Mutex::new(self))
    }

    pub fn shared() -> SharedTurntable {
        Self::new().into_shared()
    }

    // Advance the rotation by a frame delta. No-op unless playing with
    // auto-rotate on.
    pub fn advance(&mut self, dt: Duration) {
        if self.playing && self.auto_rotate {
            let deg = self.rotation + dt.as_secs_f32() * ROTATION_DEGREES_PER_SEC;
            self.rotation = deg % FULL_TURN_DEGREES;
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    // Normalized into [0, 360)
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees.rem_euclid(FULL_TURN_DEGREES);
    }

    pub fn reset(&mut self) {
        self.rotation = 0.0;
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn toggle_playing(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn set_auto_rotate(&mut self, auto_rotate: bool) {
        self.auto_rotate = auto_rotate;
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.auto_rotate = !self.auto_rotate;
        self.auto_rotate
    }

    // Fraction of the current revolution, as a percentage
    pub fn progress_percent(&self) -> f32 {
        (self.rotation / FULL_TURN_DEGREES) * 100.0
    }

    pub fn facing(&self) -> ProductFacing {
        if self.rotation < 120.0 {
            ProductFacing::Front
        } else if self.rotation < 240.0 {
            ProductFacing::Side
        } else {
            ProductFacing::Back
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_requires_playing_and_auto_rotate() {
        let mut t = Turntable::new();
        t.advance(Duration::from_secs(1));
        assert_eq!(t.rotation(), 18.0);

        t.set_playing(false);
        t.advance(Duration::from_secs(1));
        assert_eq!(t.rotation(), 18.0);

        t.set_playing(true);
        t.set_auto_rotate(false);
        t.advance(Duration::from_secs(1));
        assert_eq!(t.rotation(), 18.0);
    }

    #[test]
    fn test_full_revolution_takes_twenty_seconds() {
        let mut t = Turntable::new();
        for _ in 0..200 {
            t.advance(Duration::from_millis(100));
        }
        // Back at the start, modulo float accumulation
        let r = t.rotation();
        let wrap_error = r.min(FULL_TURN_DEGREES - r);
        assert!(wrap_error < 0.01, "rotation was {}", r);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut t = Turntable::new();
        t.set_rotation(350.0);
        t.advance(Duration::from_secs(1));
        assert!((t.rotation() - 8.0).abs() < 0.001);

        t.set_rotation(-10.0);
        assert!((t.rotation() - 350.0).abs() < 0.001);
    }

    #[test]
    fn test_progress_percent() {
        let mut t = Turntable::new();
        t.set_rotation(90.0);
        assert_eq!(t.progress_percent(), 25.0);
        t.set_rotation(180.0);
        assert_eq!(t.progress_percent(), 50.0);
    }

    #[test]
    fn test_facing_buckets() {
        let mut t = Turntable::new();
        t.set_rotation(0.0);
        assert_eq!(t.facing(), ProductFacing::Front);
        t.set_rotation(119.9);
        assert_eq!(t.facing(), ProductFacing::Front);
        t.set_rotation(120.0);
        assert_eq!(t.facing(), ProductFacing::Side);
        t.set_rotation(239.9);
        assert_eq!(t.facing(), ProductFacing::Side);
        t.set_rotation(240.0);
        assert_eq!(t.facing(), ProductFacing::Back);
        t.set_rotation(359.9);
        assert_eq!(t.facing(), ProductFacing::Back);
    }
}
