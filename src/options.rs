// src/options.rs
// Processing option model and dependency validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slide deduplication strategy applied by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeduplicationMethod {
    #[default]
    Both,
    TextOnly,
    VisualOnly,
}

impl DeduplicationMethod {
    /// Wire string used in the upload form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeduplicationMethod::Both => "both",
            DeduplicationMethod::TextOnly => "text_only",
            DeduplicationMethod::VisualOnly => "visual_only",
        }
    }
}

/// Feature toggles for one submission.
///
/// `enable_*` flags select which processing stages run;
/// `return_*` flags select which sections the result set carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub enable_transcription: bool,
    pub enable_slide_detection: bool,
    pub enable_summarization: bool,
    pub enable_slide_summaries: bool,
    pub return_transcript: bool,
    pub return_slides: bool,
    pub deduplication_method: DeduplicationMethod,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            enable_transcription: true,
            enable_slide_detection: true,
            enable_summarization: true,
            enable_slide_summaries: false,
            return_transcript: true,
            return_slides: true,
            deduplication_method: DeduplicationMethod::Both,
        }
    }
}

/// Option validation errors. Caller-fixable before submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("option {flag} requires {requires}")]
    InvalidOptionCombination {
        flag: &'static str,
        requires: &'static str,
    },
}

impl ProcessingOptions {
    /// Checks the flag dependency invariants.
    ///
    /// Invalid combinations are rejected with the offending flag named;
    /// nothing is ever downgraded silently.
    pub fn normalize(self) -> Result<Self, ConfigError> {
        if self.enable_slide_summaries && !self.enable_slide_detection {
            return Err(ConfigError::InvalidOptionCombination {
                flag: "enable_slide_summaries",
                requires: "enable_slide_detection",
            });
        }
        if self.enable_slide_summaries && !self.enable_transcription {
            return Err(ConfigError::InvalidOptionCombination {
                flag: "enable_slide_summaries",
                requires: "enable_transcription",
            });
        }
        if self.return_transcript && !self.enable_transcription {
            return Err(ConfigError::InvalidOptionCombination {
                flag: "return_transcript",
                requires: "enable_transcription",
            });
        }
        if self.return_slides && !self.enable_slide_detection {
            return Err(ConfigError::InvalidOptionCombination {
                flag: "return_slides",
                requires: "enable_slide_detection",
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = ProcessingOptions::default();
        assert!(options.normalize().is_ok());
    }

    #[test]
    fn slide_summaries_need_detection_and_transcription() {
        let options = ProcessingOptions {
            enable_slide_summaries: true,
            enable_slide_detection: false,
            return_slides: false,
            ..ProcessingOptions::default()
        };
        let err = options.normalize().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidOptionCombination {
                flag: "enable_slide_summaries",
                requires: "enable_slide_detection",
            }
        );

        let options = ProcessingOptions {
            enable_slide_summaries: true,
            enable_transcription: false,
            return_transcript: false,
            ..ProcessingOptions::default()
        };
        let err = options.normalize().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidOptionCombination {
                flag: "enable_slide_summaries",
                requires: "enable_transcription",
            }
        );
    }

    #[test]
    fn return_transcript_needs_transcription() {
        let options = ProcessingOptions {
            enable_transcription: false,
            return_transcript: true,
            ..ProcessingOptions::default()
        };
        assert!(options.normalize().is_err());
    }

    #[test]
    fn return_slides_needs_slide_detection() {
        let options = ProcessingOptions {
            enable_slide_detection: false,
            return_slides: true,
            ..ProcessingOptions::default()
        };
        assert!(options.normalize().is_err());
    }

    #[test]
    fn disabled_stages_with_disabled_returns_pass() {
        let options = ProcessingOptions {
            enable_transcription: false,
            enable_slide_detection: false,
            enable_slide_summaries: false,
            return_transcript: false,
            return_slides: false,
            ..ProcessingOptions::default()
        };
        assert!(options.normalize().is_ok());
    }

    #[test]
    fn deduplication_wire_strings() {
        assert_eq!(DeduplicationMethod::Both.as_str(), "both");
        assert_eq!(DeduplicationMethod::TextOnly.as_str(), "text_only");
        assert_eq!(DeduplicationMethod::VisualOnly.as_str(), "visual_only");

        let parsed: DeduplicationMethod = serde_json::from_str("\"text_only\"").unwrap();
        assert_eq!(parsed, DeduplicationMethod::TextOnly);
    }
}
