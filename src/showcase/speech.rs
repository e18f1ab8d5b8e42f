/*
 * ============================================================================
 * SPEECH MODULE
 * ============================================================================
 *
 * PURPOSE: Capability seams for speech recognition and synthesis, plus the
 * simulated engine the demo runs on
 *
 * The demo has no microphone or TTS stack. SimulatedSpeech stands in behind
 * the same traits a real engine would implement: recognition resolves to a
 * canned phrase after a fixed listening window, synthesis resolves after a
 * fixed speaking window.
 *
 * ============================================================================
 */

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;

// How long the simulated engine "listens" before producing a phrase
pub const RECOGNITION_LATENCY: Duration = Duration::from_secs(3);

// How long the simulated engine "speaks" a response
pub const SYNTHESIS_LATENCY: Duration = Duration::from_secs(2);

pub const RECOGNITION_PHRASES: [&str; 5] = [
    "Hello, I'm trying to explain my project idea.",
    "Could you please help me find the right book?",
    "I need assistance with this assignment.",
    "I'd like to order a coffee please.",
    "Thank you for your help today.",
];

// A rendered utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub text: String,
    pub duration: Duration,
}

pub trait SpeechRecognizer: Send {
    // Listen once and return the transcribed text.
    fn recognize(&mut self) -> impl Future<Output = String> + Send;
}

pub trait SpeechSynthesizer: Send {
    // Speak the text aloud, returning the utterance that was produced.
    fn synthesize(&mut self, text: &str) -> impl Future<Output = SpeechAudio> + Send;
}

#[derive(Debug)]
pub struct SimulatedSpeech {
    rng: StdRng,
}

impl SimulatedSpeech {
    pub fn new() -> Self {
        SimulatedSpeech {
            rng: StdRng::from_entropy(),
        }
    }

    // Deterministic phrase selection for tests
    pub fn with_seed(seed: u64) -> Self {
        SimulatedSpeech {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognizer for SimulatedSpeech {
    fn recognize(&mut self) -> impl Future<Output = String> + Send {
        let pick = self.rng.gen_range(0..RECOGNITION_PHRASES.len());
        async move {
            sleep(RECOGNITION_LATENCY).await;
            let text = RECOGNITION_PHRASES[pick].to_string();
            log::debug!("simulated recognition produced: {}", text);
            text
        }
    }
}

impl SpeechSynthesizer for SimulatedSpeech {
    fn synthesize(&mut self, text: &str) -> impl Future<Output = SpeechAudio> + Send {
        let text = text.to_string();
        async move {
            sleep(SYNTHESIS_LATENCY).await;
            log::debug!("simulated synthesis spoke {} chars", text.len());
            SpeechAudio {
                text,
                duration: SYNTHESIS_LATENCY,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_recognition_waits_then_yields_known_phrase() {
        let mut engine = SimulatedSpeech::with_seed(7);
        let before = tokio::time::Instant::now();
        let text = engine.recognize().await;
        assert_eq!(before.elapsed(), RECOGNITION_LATENCY);
        assert!(RECOGNITION_PHRASES.contains(&text.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_echoes_text() {
        let mut engine = SimulatedSpeech::with_seed(7);
        let audio = engine.synthesize("Thank you for your help today.").await;
        assert_eq!(audio.text, "Thank you for your help today.");
        assert_eq!(audio.duration, SYNTHESIS_LATENCY);
    }

    #[test]
    fn test_seeded_engines_agree() {
        let mut a = SimulatedSpeech::with_seed(42);
        let mut b = SimulatedSpeech::with_seed(42);
        let pick_a: usize = a.rng.gen_range(0..RECOGNITION_PHRASES.len());
        let pick_b: usize = b.rng.gen_range(0..RECOGNITION_PHRASES.len());
        assert_eq!(pick_a, pick_b);
    }
}
