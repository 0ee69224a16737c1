use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use thiserror::Error;

/// Allowed speech rate multipliers (1.0 is the engine's normal speed).
pub const RATE_RANGE: RangeInclusive<f32> = 0.5..=2.0;
/// Allowed pitch multipliers (1.0 is the engine's normal pitch).
pub const PITCH_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Identifies one utterance handed to a synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{name} must be between {min} and {max}, got {value}")]
pub struct OutOfRange {
    pub name: &'static str,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

/// Rate and pitch captured when playback starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub rate: f32,
    pub pitch: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

impl VoiceParams {
    /// Validate both values against [`RATE_RANGE`] and [`PITCH_RANGE`].
    pub fn new(rate: f32, pitch: f32) -> Result<Self, OutOfRange> {
        check_range("rate", rate, &RATE_RANGE)?;
        check_range("pitch", pitch, &PITCH_RANGE)?;
        Ok(Self { rate, pitch })
    }

    /// Build from arbitrary values, clamping each into its range.
    pub fn clamped(rate: f32, pitch: f32) -> Self {
        Self {
            rate: clamp_to(rate, &RATE_RANGE),
            pitch: clamp_to(pitch, &PITCH_RANGE),
        }
    }
}

/// A rate or pitch multiplier as shown to the user: one decimal on the 0.1
/// grid, two otherwise (so `1.25` is not shown as `1.2`).
pub fn multiplier_label(value: f32) -> String {
    let hundredths = (value * 100.0).round() as i64;
    if hundredths % 10 == 0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

fn check_range(name: &'static str, value: f32, range: &RangeInclusive<f32>) -> Result<(), OutOfRange> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(OutOfRange {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return 1.0_f32.clamp(*range.start(), *range.end());
    }
    value.clamp(*range.start(), *range.end())
}

/// One request to speak a text with fixed voice parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub session: SessionId,
    pub text: Arc<str>,
    pub params: VoiceParams,
}

/// Lifecycle notification for an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEventKind {
    Start,
    End,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub session: SessionId,
    pub kind: SpeechEventKind,
}

impl SpeechEvent {
    pub fn start(session: SessionId) -> Self {
        Self {
            session,
            kind: SpeechEventKind::Start,
        }
    }

    pub fn end(session: SessionId) -> Self {
        Self {
            session,
            kind: SpeechEventKind::End,
        }
    }

    pub fn error(session: SessionId, message: impl Into<String>) -> Self {
        Self {
            session,
            kind: SpeechEventKind::Error(message.into()),
        }
    }
}

/// Channel on which synthesizers report [`SpeechEvent`]s.
pub type SpeechEventSender = tokio::sync::mpsc::UnboundedSender<SpeechEvent>;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("failed to start speech engine: {0}")]
    Spawn(std::io::Error),
    #[error("{0} is not supported by this speech engine")]
    Unsupported(&'static str),
    #[error("speech engine error: {0}")]
    Engine(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for speech-synthesis backends.
///
/// At most one utterance is live at a time. Lifecycle callbacks are not
/// returned from these methods; implementors send them as [`SpeechEvent`]s
/// tagged with the utterance's [`SessionId`].
pub trait SpeechSynthesizer: Send {
    /// Start speaking `utterance`.
    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError>;

    /// Suspend the live utterance without discarding it.
    fn pause(&mut self) -> Result<(), SpeechError>;

    /// Continue a paused utterance.
    fn resume(&mut self) -> Result<(), SpeechError>;

    /// Drop the live utterance, if any. Cancelled utterances emit no further
    /// events.
    fn cancel(&mut self);
}

impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Box<T> {
    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        (**self).speak(utterance)
    }

    fn pause(&mut self) -> Result<(), SpeechError> {
        (**self).pause()
    }

    fn resume(&mut self) -> Result<(), SpeechError> {
        (**self).resume()
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_normal_speed_and_pitch() {
        assert_eq!(VoiceParams::default(), VoiceParams { rate: 1.0, pitch: 1.0 });
    }

    #[test]
    fn new_accepts_bounds() {
        assert!(VoiceParams::new(0.5, 2.0).is_ok());
        assert!(VoiceParams::new(2.0, 0.5).is_ok());
    }

    #[test]
    fn new_rejects_out_of_range() {
        let err = VoiceParams::new(3.0, 1.0).unwrap_err();
        assert_eq!(err.name, "rate");
        assert_eq!(err.to_string(), "rate must be between 0.5 and 2, got 3");

        let err = VoiceParams::new(1.0, 0.1).unwrap_err();
        assert_eq!(err.name, "pitch");
    }

    #[test]
    fn new_rejects_nan() {
        assert!(VoiceParams::new(f32::NAN, 1.0).is_err());
    }

    #[test]
    fn clamped_pins_to_range() {
        let p = VoiceParams::clamped(10.0, -1.0);
        assert_eq!(p, VoiceParams { rate: 2.0, pitch: 0.5 });
        let p = VoiceParams::clamped(f32::NAN, 1.3);
        assert_eq!(p, VoiceParams { rate: 1.0, pitch: 1.3 });
    }
}
