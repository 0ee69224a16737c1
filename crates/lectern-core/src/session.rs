//! Application state shared by the front ends.
//!
//! A [`ReaderSession`] owns the current document text, the playback
//! controller and the two voice sliders, and turns every transition into the
//! status line the user sees. Front ends own exactly one session and route
//! file selections, button presses and speech events into it.

use std::sync::Arc;

use thiserror::Error;

use crate::backend::DocumentParser;
use crate::extract::{self, Extraction};
use crate::playback::{Controls, PlaybackController, PlaybackState, Transition};
use crate::speech::{PITCH_RANGE, RATE_RANGE, SpeechEvent, SpeechSynthesizer, VoiceParams};
use crate::{Severity, Status};

/// PDF readers accept the header anywhere in the first 1024 bytes.
const PDF_HEADER_WINDOW: usize = 1024;

/// Slider granularity for rate and pitch.
pub const SLIDER_STEP: f32 = 0.1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{name} is not a PDF file")]
    NotPdf { name: String },
}

/// Whether `bytes` carry a PDF header.
pub fn is_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Gate applied before any extraction is attempted.
pub fn check_pdf(name: &str, bytes: &[u8]) -> Result<(), SessionError> {
    if is_pdf(bytes) {
        Ok(())
    } else {
        Err(SessionError::NotPdf {
            name: name.to_string(),
        })
    }
}

/// Coarse state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Extracting,
    Ready,
    Speaking,
    Paused,
    Stopped,
    Error,
}

/// A bounded numeric control snapped to a fixed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slider {
    value: f32,
    min: f32,
    max: f32,
    step: f32,
}

impl Slider {
    /// The initial value is only clamped. It comes from validated settings,
    /// so it may sit between steps; moving the slider snaps it.
    pub fn new(value: f32, min: f32, max: f32, step: f32) -> Self {
        let value = if value.is_nan() { min } else { value.clamp(min, max) };
        Self {
            value,
            min,
            max,
            step,
        }
    }

    pub fn rate(value: f32) -> Self {
        Self::new(value, *RATE_RANGE.start(), *RATE_RANGE.end(), SLIDER_STEP)
    }

    pub fn pitch(value: f32) -> Self {
        Self::new(value, *PITCH_RANGE.start(), *PITCH_RANGE.end(), SLIDER_STEP)
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Set the value, clamped into range and snapped to the nearest step.
    pub fn set(&mut self, value: f32) {
        let value = if value.is_nan() { self.min } else { value };
        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        let snapped = self.min + steps * self.step;
        // Round away float noise such as 1.1000001.
        self.value = ((snapped * 1000.0).round() / 1000.0).clamp(self.min, self.max);
    }

    /// Move by a whole number of steps (negative moves down).
    pub fn step_by(&mut self, steps: i32) {
        self.set(self.value + steps as f32 * self.step);
    }

    /// Position within the range, 0.0 at `min` and 1.0 at `max`.
    pub fn fraction(&self) -> f64 {
        if self.max <= self.min {
            return 0.0;
        }
        f64::from((self.value - self.min) / (self.max - self.min))
    }

    /// Value as displayed next to the slider.
    pub fn label(&self) -> String {
        crate::speech::multiplier_label(self.value)
    }
}

/// State for one reader: document, playback, sliders and status.
pub struct ReaderSession<S> {
    controller: PlaybackController<S>,
    text: Option<Arc<str>>,
    preview: Option<String>,
    file_name: Option<String>,
    status: Option<Status>,
    phase: Phase,
    pub rate: Slider,
    pub pitch: Slider,
}

impl<S: SpeechSynthesizer> ReaderSession<S> {
    pub fn new(synth: S, params: VoiceParams) -> Self {
        Self {
            controller: PlaybackController::new(synth),
            text: None,
            preview: None,
            file_name: None,
            status: None,
            phase: Phase::Idle,
            rate: Slider::rate(params.rate),
            pitch: Slider::pitch(params.pitch),
        }
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn controller(&self) -> &PlaybackController<S> {
        &self.controller
    }

    /// Button enablement: all disabled until text is loaded, then a function
    /// of whether speech is playing.
    pub fn controls(&self) -> Controls {
        if self.has_text() {
            self.controller.controls()
        } else {
            Controls::disabled()
        }
    }

    /// Voice parameters as they would be used by a Play right now.
    pub fn voice_params(&self) -> VoiceParams {
        VoiceParams::clamped(self.rate.value(), self.pitch.value())
    }

    /// Show the rejection for a file that failed [`check_pdf`].
    pub fn reject(&mut self, error: &SessionError) {
        tracing::info!(%error, "rejected file");
        self.set_status(Severity::Error, "Please upload a PDF file");
    }

    /// A new file was accepted; discard the previous document.
    pub fn begin_extraction(&mut self, file_name: &str) {
        if self.controller.state() != PlaybackState::Idle {
            self.controller.stop();
        }
        self.text = None;
        self.preview = None;
        self.file_name = Some(file_name.to_string());
        self.phase = Phase::Extracting;
        self.set_status(Severity::Info, "Extracting text from PDF...");
    }

    pub fn finish_extraction(&mut self, extraction: Extraction) {
        self.status = Some(extraction.status());
        match extraction {
            Extraction::Text(text) => {
                self.preview = Some(extract::preview(&text));
                self.text = Some(Arc::from(text));
                self.phase = Phase::Ready;
            }
            Extraction::NoText => self.phase = Phase::Idle,
            Extraction::Failed(_) => self.phase = Phase::Error,
        }
    }

    /// Gate, extract and apply in one synchronous step.
    pub fn load(
        &mut self,
        parser: &dyn DocumentParser,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), SessionError> {
        if let Err(e) = check_pdf(file_name, bytes) {
            self.reject(&e);
            return Err(e);
        }
        self.begin_extraction(file_name);
        self.finish_extraction(extract::extract(parser, bytes));
        Ok(())
    }

    /// Resume when paused, otherwise restart with the current slider values.
    pub fn play(&mut self) {
        let Some(text) = self.text.clone() else {
            return;
        };
        let params = self.voice_params();
        let transition = self.controller.play(text, params);
        self.apply(transition);
    }

    pub fn pause(&mut self) {
        let transition = self.controller.pause();
        self.apply(transition);
    }

    pub fn stop(&mut self) {
        let transition = self.controller.stop();
        self.apply(transition);
    }

    pub fn handle_speech_event(&mut self, event: SpeechEvent) {
        let transition = self.controller.handle_event(event);
        self.apply(transition);
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Started(_) => {
                self.phase = Phase::Speaking;
            }
            Transition::Speaking | Transition::Resumed => {
                self.phase = Phase::Speaking;
                self.set_status(Severity::Info, "\u{1F50A} Speaking...");
            }
            Transition::Paused => {
                self.phase = Phase::Paused;
                self.set_status(Severity::Info, "Paused");
            }
            Transition::Stopped => {
                self.phase = Phase::Stopped;
                self.set_status(Severity::Info, "Stopped");
            }
            Transition::Finished => {
                self.phase = Phase::Ready;
                self.set_status(Severity::Success, "\u{2713} Finished reading");
            }
            Transition::Failed(message) => {
                self.phase = Phase::Error;
                self.set_status(Severity::Error, format!("Error: {message}"));
            }
            Transition::Ignored => {}
        }
    }

    fn set_status(&mut self, severity: Severity, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            severity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PagedDocument, ParseError, TextItem};
    use crate::speech::{SessionId, SpeechError, Utterance};

    #[derive(Default)]
    struct Silent {
        spoken: Vec<Utterance>,
        cancels: usize,
    }

    impl SpeechSynthesizer for Silent {
        fn speak(&mut self, u: Utterance) -> Result<(), SpeechError> {
            self.spoken.push(u);
            Ok(())
        }
        fn pause(&mut self) -> Result<(), SpeechError> {
            Ok(())
        }
        fn resume(&mut self) -> Result<(), SpeechError> {
            Ok(())
        }
        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    struct OnePage(&'static str);
    struct OnePageDoc(&'static str);

    impl DocumentParser for OnePage {
        fn load(&self, _bytes: &[u8]) -> Result<Box<dyn PagedDocument>, ParseError> {
            Ok(Box::new(OnePageDoc(self.0)))
        }
    }

    impl PagedDocument for OnePageDoc {
        fn page_count(&self) -> usize {
            1
        }
        fn text_items(&self, _page: usize) -> Result<Vec<TextItem>, ParseError> {
            Ok(vec![TextItem::new(self.0)])
        }
    }

    fn session() -> ReaderSession<Silent> {
        ReaderSession::new(Silent::default(), VoiceParams::default())
    }

    fn loaded() -> ReaderSession<Silent> {
        let mut s = session();
        s.finish_extraction(Extraction::Text("Hello World".into()));
        s
    }

    #[test]
    fn pdf_header_detection() {
        assert!(is_pdf(b"%PDF-1.7\n"));
        assert!(is_pdf(b"\xEF\xBB\xBF  %PDF-1.4"));
        assert!(!is_pdf(b"PK\x03\x04"));
        assert!(!is_pdf(b""));
        let mut late = vec![b' '; PDF_HEADER_WINDOW];
        late.extend_from_slice(b"%PDF-1.4");
        assert!(!is_pdf(&late));
    }

    #[test]
    fn check_pdf_names_the_file() {
        let err = check_pdf("notes.txt", b"hello").unwrap_err();
        assert_eq!(err.to_string(), "notes.txt is not a PDF file");
    }

    #[test]
    fn rejected_file_never_reaches_parser() {
        struct Exploding;
        impl DocumentParser for Exploding {
            fn load(&self, _bytes: &[u8]) -> Result<Box<dyn PagedDocument>, ParseError> {
                panic!("parser must not be called for non-PDF input");
            }
        }
        let mut s = session();
        assert!(s.load(&Exploding, "cat.png", b"\x89PNG").is_err());
        let status = s.status().unwrap();
        assert_eq!(status.message, "Please upload a PDF file");
        assert_eq!(status.severity, Severity::Error);
        assert_eq!(s.controls(), Controls::disabled());
    }

    #[test]
    fn successful_load_enables_play() {
        let mut s = session();
        s.load(&OnePage("Hello World"), "a.pdf", b"%PDF-1.4").unwrap();
        assert_eq!(s.status().unwrap().message, "\u{2713} Successfully extracted 11 characters");
        assert_eq!(s.status().unwrap().severity, Severity::Success);
        assert_eq!(s.preview(), Some("Hello World"));
        assert_eq!(s.phase(), Phase::Ready);
        assert_eq!(s.controls(), Controls::for_playing(false));
    }

    #[test]
    fn begin_extraction_clears_previous_text() {
        let mut s = loaded();
        s.begin_extraction("next.pdf");
        assert!(!s.has_text());
        assert_eq!(s.preview(), None);
        assert_eq!(s.phase(), Phase::Extracting);
        assert_eq!(s.status().unwrap().message, "Extracting text from PDF...");
        assert_eq!(s.controls(), Controls::disabled());
    }

    #[test]
    fn begin_extraction_stops_running_playback() {
        let mut s = loaded();
        s.play();
        s.begin_extraction("next.pdf");
        assert_eq!(s.playback_state(), PlaybackState::Idle);
    }

    #[test]
    fn no_text_keeps_controls_disabled() {
        let mut s = session();
        s.finish_extraction(Extraction::NoText);
        assert_eq!(s.status().unwrap().message, "No text found in PDF");
        assert_ne!(s.status().unwrap().severity, Severity::Error);
        assert_eq!(s.controls(), Controls::disabled());
    }

    #[test]
    fn failure_shows_message_verbatim() {
        let mut s = session();
        s.finish_extraction(Extraction::Failed("failed to open PDF: broken xref".into()));
        assert_eq!(
            s.status().unwrap().message,
            "Error reading PDF: failed to open PDF: broken xref"
        );
        assert_eq!(s.phase(), Phase::Error);
        assert_eq!(s.controls(), Controls::disabled());
    }

    #[test]
    fn play_without_text_does_nothing() {
        let mut s = session();
        s.play();
        assert!(s.controller().synthesizer().spoken.is_empty());
        assert_eq!(s.status(), None);
    }

    #[test]
    fn play_uses_slider_values_at_invocation() {
        let mut s = loaded();
        s.rate.set(1.5);
        s.pitch.set(0.7);
        s.play();
        let spoken = &s.controller().synthesizer().spoken;
        assert_eq!(spoken[0].params, VoiceParams { rate: 1.5, pitch: 0.7 });
        assert_eq!(&*spoken[0].text, "Hello World");
        assert_eq!(s.controls(), Controls::for_playing(true));
    }

    #[test]
    fn slider_change_mid_speech_waits_for_restart() {
        let mut s = loaded();
        s.play();
        s.rate.set(2.0);
        assert_eq!(s.controller().synthesizer().spoken.len(), 1);
        assert_eq!(s.controller().synthesizer().spoken[0].params.rate, 1.0);
        s.stop();
        s.play();
        assert_eq!(s.controller().synthesizer().spoken[1].params.rate, 2.0);
    }

    #[test]
    fn status_follows_lifecycle() {
        let mut s = loaded();
        s.play();
        s.handle_speech_event(SpeechEvent::start(SessionId(1)));
        assert_eq!(s.status().unwrap().message, "\u{1F50A} Speaking...");
        s.pause();
        assert_eq!(s.status().unwrap().message, "Paused");
        assert_eq!(s.controls(), Controls::for_playing(false));
        s.play();
        assert_eq!(s.status().unwrap().message, "\u{1F50A} Speaking...");
        assert_eq!(s.controller().synthesizer().spoken.len(), 1);
        s.handle_speech_event(SpeechEvent::end(SessionId(1)));
        assert_eq!(s.status().unwrap().message, "\u{2713} Finished reading");
        assert_eq!(s.status().unwrap().severity, Severity::Success);
        assert_eq!(s.phase(), Phase::Ready);
    }

    #[test]
    fn stop_reports_stopped() {
        let mut s = loaded();
        s.play();
        s.stop();
        assert_eq!(s.status().unwrap().message, "Stopped");
        assert_eq!(s.phase(), Phase::Stopped);
        assert_eq!(s.controls(), Controls::for_playing(false));
    }

    #[test]
    fn speech_error_is_shown_and_resets_controls() {
        let mut s = loaded();
        s.play();
        s.handle_speech_event(SpeechEvent::error(SessionId(1), "synthesis-failed"));
        assert_eq!(s.status().unwrap().message, "Error: synthesis-failed");
        assert_eq!(s.status().unwrap().severity, Severity::Error);
        assert_eq!(s.controls(), Controls::for_playing(false));
    }

    #[test]
    fn slider_snaps_and_clamps() {
        let mut rate = Slider::rate(1.0);
        rate.step_by(1);
        assert_eq!(rate.value(), 1.1);
        assert_eq!(rate.label(), "1.1");
        rate.set(1.04);
        assert_eq!(rate.value(), 1.0);
        rate.set(9.0);
        assert_eq!(rate.value(), 2.0);
        rate.step_by(-100);
        assert_eq!(rate.value(), 0.5);
        assert_eq!(rate.fraction(), 0.0);
    }

    #[test]
    fn slider_keeps_off_step_start_until_moved() {
        let mut rate = Slider::rate(1.23);
        assert_eq!(rate.value(), 1.23);
        assert_eq!(rate.label(), "1.23");
        rate.step_by(1);
        assert_eq!(rate.value(), 1.3);
        assert_eq!(rate.label(), "1.3");
        assert_eq!(Slider::pitch(7.0).value(), 2.0);
    }

    #[test]
    fn resolved_settings_reach_the_utterance_unchanged() {
        use crate::config_file::ConfigFile;

        let settings = ConfigFile::from_flags(Some(1.25), Some(0.55), None, None, None)
            .resolve()
            .unwrap();
        let mut s = ReaderSession::new(Silent::default(), settings.params);
        s.finish_extraction(Extraction::Text("Hello World".into()));
        s.play();
        assert_eq!(
            s.controller().synthesizer().spoken[0].params,
            VoiceParams { rate: 1.25, pitch: 0.55 }
        );
        assert_eq!(s.rate.label(), "1.25");
        assert_eq!(s.pitch.label(), "0.55");
    }

    #[test]
    fn slider_fraction_spans_range() {
        let pitch = Slider::pitch(2.0);
        assert_eq!(pitch.fraction(), 1.0);
        let mid = Slider::pitch(1.25);
        assert!((mid.fraction() - 0.5).abs() < 0.1);
    }
}
