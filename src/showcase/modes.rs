/*
 * ============================================================================
 * COMMUNICATION MODES MODULE
 * ============================================================================
 *
 * PURPOSE: The four assistance modes the glasses demo ships with, plus the
 * canned greeting and phrase suggestions each mode surfaces on activation
 *
 * ============================================================================
 */

use serde::{Deserialize, Serialize};

pub const DEFAULT_GREETING: &str = "Hello, how can I assist you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationMode {
    Study,
    Assist,
    Speech,
    Advanced,
}

impl CommunicationMode {
    pub const ALL: [CommunicationMode; 4] = [
        CommunicationMode::Study,
        CommunicationMode::Assist,
        CommunicationMode::Speech,
        CommunicationMode::Advanced,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            CommunicationMode::Study => "study",
            CommunicationMode::Assist => "assist",
            CommunicationMode::Speech => "speech",
            CommunicationMode::Advanced => "advanced",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "study" => Some(CommunicationMode::Study),
            "assist" => Some(CommunicationMode::Assist),
            "speech" => Some(CommunicationMode::Speech),
            "advanced" => Some(CommunicationMode::Advanced),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CommunicationMode::Study => "Study Mode",
            CommunicationMode::Assist => "Assist Mode",
            CommunicationMode::Speech => "Speech Disability Mode",
            CommunicationMode::Advanced => "Advanced Communication",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CommunicationMode::Study => "For learning environments and study sessions",
            CommunicationMode::Assist => "General assistance for everyday conversations",
            CommunicationMode::Speech => "Enhanced support for speech disabilities",
            CommunicationMode::Advanced => "EEG-enhanced non-verbal communication",
        }
    }

    // Spoken through the display when the mode is switched on
    pub fn greeting(&self) -> &'static str {
        match self {
            CommunicationMode::Study => {
                "Study Mode activated. I can help with note-taking and classroom interactions."
            }
            CommunicationMode::Assist => {
                "Assist Mode active. I'm ready to help with everyday conversations."
            }
            CommunicationMode::Speech => {
                "Speech Disability Mode enabled. Enhanced speech prediction activated."
            }
            CommunicationMode::Advanced => {
                "Advanced Communication Mode active. EEG monitoring enabled for non-verbal assistance."
            }
        }
    }

    // Quick phrase suggestions offered while composing in this mode
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            CommunicationMode::Study => &[
                "Could you explain this concept?",
                "When is the assignment due?",
                "I need more time, please.",
            ],
            CommunicationMode::Assist => &[
                "Could you help me with this?",
                "I'm looking for...",
                "Thank you for your assistance.",
            ],
            CommunicationMode::Speech => &[
                "Hello, my name is...",
                "I'd like to order...",
                "Could you please...",
            ],
            CommunicationMode::Advanced => &[
                "[Thinking: Need Help]",
                "[Feeling: Anxious]",
                "[Want: Water]",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_ids_round_trip() {
        for mode in CommunicationMode::ALL {
            assert_eq!(CommunicationMode::from_id(mode.id()), Some(mode));
        }
        assert_eq!(CommunicationMode::from_id("bogus"), None);
    }

    #[test]
    fn test_every_mode_has_three_suggestions() {
        for mode in CommunicationMode::ALL {
            assert_eq!(mode.suggestions().len(), 3, "mode {:?}", mode);
        }
    }

    #[test]
    fn test_serde_uses_lowercase_ids() {
        let json = serde_json::to_string(&CommunicationMode::Advanced).unwrap();
        assert_eq!(json, "\"advanced\"");
        let back: CommunicationMode = serde_json::from_str("\"study\"").unwrap();
        assert_eq!(back, CommunicationMode::Study);
    }
}
