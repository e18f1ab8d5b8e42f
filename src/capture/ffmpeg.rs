/*
 * ============================================================================
 * FFMPEG ENCODER MODULE
 * ============================================================================
 *
 * PURPOSE: VideoEncoder backed by an ffmpeg child process
 *
 * PIPELINE:
 * - Raw BGRA frames are pulled from the feed and written to ffmpeg stdin
 * - ffmpeg produces a fragmented MP4 on stdout so output is streamable
 *   chunk by chunk while the encode is still running
 * - A reader thread slices stdout into sequenced chunks for the controller
 * - The pump thread joins the reader before reporting completion, so every
 *   chunk is in the channel by the time the done signal fires
 *
 * ============================================================================
 */

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use crate::capture::encoder::{EncodeSettings, EncodeStats, EncoderRun, StopFlag, VideoEncoder};
use crate::capture::source::FrameFeed;
use crate::capture::types::Chunk;
use crate::error::CaptureError;

// Read granularity for ffmpeg stdout
const CHUNK_READ_BYTES: usize = 64 * 1024;

// Slack past the requested duration before the pump gives up on a stop
// signal that never arrived
pub const SAFETY_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    ffmpeg_path: Option<PathBuf>,
    safety_cap: Option<Duration>,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    // Use a specific ffmpeg binary instead of whatever is on PATH.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        FfmpegEncoder {
            ffmpeg_path: Some(path.into()),
            safety_cap: None,
        }
    }

    // Replace the derived ceiling with a fixed one.
    pub fn with_safety_cap(mut self, cap: Duration) -> Self {
        self.safety_cap = Some(cap);
        self
    }

    // Hard ceiling on one encode: the requested duration plus slack, so the
    // cap can only trip after the controller had its chance to stop cleanly.
    fn effective_cap(&self, settings: &EncodeSettings) -> Duration {
        self.safety_cap
            .unwrap_or_else(|| settings.duration + SAFETY_MARGIN)
    }

    fn binary(&self) -> PathBuf {
        self.ffmpeg_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    // Probe the binary before committing to an encode.
    pub fn check(&self) -> Result<(), CaptureError> {
        let ffmpeg_path = self.binary();
        let status = Command::new(&ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                CaptureError::unsupported(format!(
                    "ffmpeg failed to execute: {}. Path: {:?}",
                    e, ffmpeg_path
                ))
            })?;
        if !status.success() {
            return Err(CaptureError::unsupported(format!(
                "ffmpeg -version exited with {}",
                status
            )));
        }
        Ok(())
    }

    fn spawn_child(
        &self,
        width: u32,
        height: u32,
        settings: &EncodeSettings,
    ) -> Result<Child, CaptureError> {
        let ffmpeg_path = self.binary();
        let args = build_args(width, height, settings);

        log::info!(
            "Spawning FFmpeg: {}x{} -> {}x{} @ {} fps, CRF {}, preset {}",
            width,
            height,
            settings.output_width,
            settings.output_height(),
            settings.fps,
            settings.crf,
            settings.preset
        );

        Command::new(&ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null()) // Discard stderr to prevent buffer blocking
            .spawn()
            .map_err(|e| {
                CaptureError::unsupported(format!(
                    "failed to spawn ffmpeg at {:?}: {}",
                    ffmpeg_path, e
                ))
            })
    }
}

// Argument list for one encode. Kept separate from spawning so the shape of
// the invocation is testable.
fn build_args(width: u32, height: u32, settings: &EncodeSettings) -> Vec<String> {
    let output_width = settings.output_width;
    let output_height = settings.output_height();

    // Scale to fit within the output frame, then pad to exact size
    let scale_filter = format!(
        "scale={}:{}:force_original_aspect_ratio=decrease,pad={}:{}:(ow-iw)/2:(oh-ih)/2:black",
        output_width, output_height, output_width, output_height
    );
    let input_size = format!("{}x{}", width, height);
    let fps = settings.fps.to_string();
    let crf = settings.crf.to_string();

    [
        "-f", "rawvideo",                        // Input format
        "-pix_fmt", "bgra",                      // Input pixel format
        "-s", input_size.as_str(),               // Input size
        "-r", fps.as_str(),                      // Input framerate
        "-i", "pipe:0",                          // Read from stdin
        "-vf", scale_filter.as_str(),            // Scale and letterbox/pillarbox filter
        "-c:v", "libx264",                       // H.264 codec
        "-preset", settings.preset.as_str(),     // Encoding preset (configurable)
        "-crf", crf.as_str(),                    // Quality (configurable)
        "-tune", "animation",                    // Optimized for rendered motion
        "-pix_fmt", "yuv420p",                   // Output pixel format (MP4 compatibility)
        "-movflags", "frag_keyframe+empty_moov", // Fragmented MP4, usable over a pipe
        "-f", "mp4",                             // Container
        "pipe:1",                                // Write to stdout
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl VideoEncoder for FfmpegEncoder {
    fn begin(
        &self,
        mut feed: Box<dyn FrameFeed>,
        settings: &EncodeSettings,
    ) -> Result<EncoderRun, CaptureError> {
        self.check()?;

        let (width, height) = feed.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::unsupported(format!(
                "frame source reports {}x{}",
                width, height
            )));
        }

        let mut child = self.spawn_child(width, height, settings)?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CaptureError::unsupported("ffmpeg stdin unavailable"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::unsupported("ffmpeg stdout unavailable"))?;

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let stop = StopFlag::new();
        let pump_stop = stop.clone();
        let safety_cap = self.effective_cap(settings);

        // Reader: slice ffmpeg stdout into sequenced chunks as they appear
        let reader = thread::spawn(move || {
            let mut seq: u64 = 0;
            let mut buf = vec![0u8; CHUNK_READ_BYTES];
            let mut receiver_gone = false;
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = Chunk {
                            seq,
                            data: buf[..n].to_vec(),
                        };
                        seq += 1;
                        // Keep draining even if nobody listens, so ffmpeg
                        // never blocks on a full pipe
                        if !receiver_gone && chunk_tx.send(chunk).is_err() {
                            receiver_gone = true;
                            log::debug!("chunk receiver dropped, draining remaining output");
                        }
                    }
                    Err(e) => {
                        log::error!("failed to read ffmpeg output: {}", e);
                        break;
                    }
                }
            }
            log::debug!("ffmpeg output closed after {} chunks", seq);
        });

        // Pump: pull frames from the feed into ffmpeg stdin until stopped,
        // the feed ends, or the safety cap trips
        thread::spawn(move || {
            let expected_size = (width as usize) * (height as usize) * 4;
            let started = Instant::now();
            let mut frames_fed: u64 = 0;
            let mut feed_error: Option<CaptureError> = None;

            while !pump_stop.is_requested() {
                if started.elapsed() >= safety_cap {
                    log::warn!("encode safety cap {:?} reached, stopping", safety_cap);
                    break;
                }
                match feed.next_frame() {
                    Ok(Some(frame)) => {
                        if frame.len() != expected_size {
                            log::warn!(
                                "skipping frame with unexpected size {} (expected {})",
                                frame.len(),
                                expected_size
                            );
                            continue;
                        }
                        if let Err(e) = stdin.write_all(frame) {
                            // ffmpeg is gone; wait() below reports why
                            log::error!("failed to write frame to ffmpeg: {}", e);
                            break;
                        }
                        frames_fed += 1;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("frame feed failed: {}", e);
                        feed_error = Some(e);
                        break;
                    }
                }
            }

            // EOF on stdin lets ffmpeg flush its final fragments
            drop(stdin);
            drop(feed);
            let wait_result = child.wait();
            // All output chunks are in the channel once the reader returns
            let _ = reader.join();

            let outcome = if let Some(e) = feed_error {
                Err(e)
            } else {
                match wait_result {
                    Ok(status) if status.success() => Ok(EncodeStats { frames_fed }),
                    Ok(status) => Err(CaptureError::assembly(format!(
                        "ffmpeg exited with {}",
                        status
                    ))),
                    Err(e) => Err(CaptureError::assembly(format!(
                        "failed to wait for ffmpeg: {}",
                        e
                    ))),
                }
            };

            log::info!(
                "encode finished: {} frames in {:.1}s",
                frames_fed,
                started.elapsed().as_secs_f64()
            );
            let _ = done_tx.send(outcome);
        });

        Ok(EncoderRun::new(chunk_rx, stop, done_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EncodeSettings {
        EncodeSettings {
            fps: 30,
            output_width: 1280,
            crf: 23,
            preset: "fast".to_string(),
            duration: Duration::from_secs(20),
        }
    }

    struct NoFrames;

    impl FrameFeed for NoFrames {
        fn dimensions(&self) -> (u32, u32) {
            (1280, 720)
        }

        fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError> {
            Ok(None)
        }
    }

    #[test]
    fn test_args_describe_a_piped_fragmented_encode() {
        let args = build_args(1280, 720, &settings());
        assert_eq!(args.first().map(String::as_str), Some("-f"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
        assert!(args.contains(&"pipe:0".to_string()));
        assert!(args.contains(&"1280x720".to_string()));
        assert!(args.contains(&"frag_keyframe+empty_moov".to_string()));
        assert!(args.contains(&"animation".to_string()));

        let vf = args
            .iter()
            .position(|a| a == "-vf")
            .map(|i| args[i + 1].clone())
            .unwrap();
        assert!(vf.contains("scale=1280:720"));
        assert!(vf.contains("pad=1280:720"));
    }

    #[test]
    fn test_odd_output_height_is_padded_even() {
        let mut s = settings();
        s.output_width = 1282;
        let args = build_args(640, 480, &s);
        let vf = args
            .iter()
            .position(|a| a == "-vf")
            .map(|i| args[i + 1].clone())
            .unwrap();
        assert!(vf.contains("scale=1282:722"), "filter was {}", vf);
    }

    #[test]
    fn test_missing_binary_fails_check_and_begin() {
        let encoder = FfmpegEncoder::with_path("/nonexistent/ffmpeg-binary");
        assert!(matches!(
            encoder.check(),
            Err(CaptureError::UnsupportedEncoding { .. })
        ));
        assert!(matches!(
            encoder.begin(Box::new(NoFrames), &settings()),
            Err(CaptureError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_safety_cap_tracks_the_requested_duration() {
        let encoder = FfmpegEncoder::new();
        assert_eq!(
            encoder.effective_cap(&settings()),
            Duration::from_secs(20) + SAFETY_MARGIN
        );

        // A long export moves the ceiling with it; nothing trips mid-recording
        let mut long = settings();
        long.duration = Duration::from_secs(600);
        assert_eq!(
            encoder.effective_cap(&long),
            Duration::from_secs(600) + SAFETY_MARGIN
        );

        let fixed = FfmpegEncoder::new().with_safety_cap(Duration::from_secs(5));
        assert_eq!(fixed.effective_cap(&long), Duration::from_secs(5));
    }
}
