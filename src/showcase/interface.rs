/*
 * ============================================================================
 * INTERFACE STATE MODULE
 * ============================================================================
 *
 * PURPOSE: State of the glasses communication display: active mode, the text
 * currently shown, and whether the engine is listening or speaking
 *
 * ============================================================================
 */

use crate::showcase::modes::{CommunicationMode, DEFAULT_GREETING};
use crate::showcase::speech::{SpeechAudio, SpeechRecognizer, SpeechSynthesizer};

#[derive(Debug, Clone)]
pub struct InterfaceState {
    mode: CommunicationMode,
    display_text: String,
    listening: bool,
    speaking: bool,
}

impl Default for InterfaceState {
    fn default() -> Self {
        InterfaceState {
            mode: CommunicationMode::Assist,
            display_text: DEFAULT_GREETING.to_string(),
            listening: false,
            speaking: false,
        }
    }
}

impl InterfaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CommunicationMode {
        self.mode
    }

    // Switching modes replaces the display with that mode's greeting.
    pub fn set_mode(&mut self, mode: CommunicationMode) {
        self.mode = mode;
        self.display_text = mode.greeting().to_string();
        log::info!("communication mode set to {}", mode.id());
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn suggestions(&self) -> &'static [&'static str] {
        self.mode.suggestions()
    }

    // Manually typed text. Blank input is ignored.
    pub fn submit(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.display_text = trimmed.to_string();
        true
    }

    pub fn listening(&self) -> bool {
        self.listening
    }

    pub fn speaking(&self) -> bool {
        self.speaking
    }

    // Run one recognition pass and show the transcription.
    pub async fn listen<R: SpeechRecognizer>(&mut self, recognizer: &mut R) -> String {
        let raised = RaisedFlag::raise(&mut self.listening);
        let text = recognizer.recognize().await;
        drop(raised);
        self.display_text = text.clone();
        text
    }

    // Speak whatever is on the display. Nothing to say resolves to None.
    pub async fn speak<S: SpeechSynthesizer>(&mut self, synthesizer: &mut S) -> Option<SpeechAudio> {
        if self.display_text.trim().is_empty() {
            return None;
        }
        let raised = RaisedFlag::raise(&mut self.speaking);
        let audio = synthesizer.synthesize(&self.display_text).await;
        drop(raised);
        Some(audio)
    }
}

// Clears its flag when dropped, abandoned call included, so the interface
// can never be left stuck listening or speaking.
struct RaisedFlag<'a> {
    flag: &'a mut bool,
}

impl<'a> RaisedFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        RaisedFlag { flag }
    }
}

impl Drop for RaisedFlag<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::showcase::speech::{SimulatedSpeech, RECOGNITION_PHRASES};
    use std::time::Duration;

    #[test]
    fn test_starts_with_default_greeting_in_assist_mode() {
        let state = InterfaceState::new();
        assert_eq!(state.mode(), CommunicationMode::Assist);
        assert_eq!(state.display_text(), DEFAULT_GREETING);
        assert!(!state.listening());
        assert!(!state.speaking());
    }

    #[test]
    fn test_mode_switch_replaces_display_with_greeting() {
        let mut state = InterfaceState::new();
        state.set_mode(CommunicationMode::Speech);
        assert_eq!(state.display_text(), CommunicationMode::Speech.greeting());
        assert_eq!(state.suggestions(), CommunicationMode::Speech.suggestions());
    }

    #[test]
    fn test_submit_ignores_blank_input() {
        let mut state = InterfaceState::new();
        assert!(!state.submit("   "));
        assert_eq!(state.display_text(), DEFAULT_GREETING);
        assert!(state.submit("  I need assistance  "));
        assert_eq!(state.display_text(), "I need assistance");
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_updates_display() {
        let mut state = InterfaceState::new();
        let mut engine = SimulatedSpeech::with_seed(3);
        let text = state.listen(&mut engine).await;
        assert!(RECOGNITION_PHRASES.contains(&text.as_str()));
        assert_eq!(state.display_text(), text);
        assert!(!state.listening());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speak_echoes_display_text() {
        let mut state = InterfaceState::new();
        let mut engine = SimulatedSpeech::with_seed(3);
        state.submit("Could you please help me find the right book?");
        let audio = state.speak(&mut engine).await.unwrap();
        assert_eq!(audio.text, "Could you please help me find the right book?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_listen_does_not_stick_the_listening_flag() {
        let mut state = InterfaceState::new();
        let mut engine = SimulatedSpeech::with_seed(3);
        let cut_short =
            tokio::time::timeout(Duration::ZERO, state.listen(&mut engine)).await;
        assert!(cut_short.is_err());
        assert!(!state.listening());
        assert_eq!(state.display_text(), DEFAULT_GREETING);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_speak_does_not_stick_the_speaking_flag() {
        let mut state = InterfaceState::new();
        let mut engine = SimulatedSpeech::with_seed(3);
        state.submit("Could you please help me find the right book?");
        let cut_short =
            tokio::time::timeout(Duration::ZERO, state.speak(&mut engine)).await;
        assert!(cut_short.is_err());
        assert!(!state.speaking());
    }
}
