pub mod backend;
pub mod config_file;
pub mod extract;
pub mod playback;
pub mod session;
pub mod speech;

// Re-export for convenience
pub use backend::{DocumentParser, PagedDocument, ParseError, TextItem};
pub use config_file::{ConfigError, ConfigFile, Settings};
pub use extract::{Extraction, PREVIEW_CHARS, extract, extract_text, extract_text_with_progress, preview};
pub use playback::{Controls, PlaybackController, PlaybackState, Transition};
pub use session::{Phase, ReaderSession, SessionError, Slider, check_pdf, is_pdf};
pub use speech::{
    OutOfRange, SessionId, SpeechError, SpeechEvent, SpeechEventKind, SpeechEventSender,
    SpeechSynthesizer, Utterance, VoiceParams, multiplier_label,
};

/// How a status message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// The latest user-visible status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub severity: Severity,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
