/*
 * ============================================================================
 * CAPTURE MODULE
 * ============================================================================
 *
 * PURPOSE: The export pipeline: capture targets, the session controller,
 * encoding, progress reporting, and on-disk delivery
 *
 * ============================================================================
 */

pub mod controller;
pub mod encoder;
pub mod ffmpeg;
pub mod progress;
#[cfg(feature = "screen-capture")]
pub mod screen;
pub mod source;
pub mod storage;
pub mod surface;
pub mod types;
