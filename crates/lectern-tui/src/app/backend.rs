use lectern_core::SpeechEvent;

use super::App;
use crate::tui_event::BackendEvent;

impl App {
    /// Process a backend event and update model state.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        if self.pending_request != Some(event.request()) {
            tracing::debug!(request = event.request(), "ignoring event for superseded file");
            return;
        }

        match event {
            BackendEvent::Rejected { error, .. } => {
                self.pending_request = None;
                self.extraction_progress = None;
                self.session.reject(&error);
            }
            BackendEvent::ExtractionStarted { file_name, .. } => {
                self.extraction_progress = Some((0, 0));
                self.preview_scroll = 0;
                self.session.begin_extraction(&file_name);
            }
            BackendEvent::ExtractionProgress { done, total, .. } => {
                self.extraction_progress = Some((done, total));
            }
            BackendEvent::ExtractionFinished { extraction, .. } => {
                self.pending_request = None;
                self.extraction_progress = None;
                self.session.finish_extraction(extraction);
            }
        }
    }

    /// Route a synthesizer lifecycle event into the session.
    pub fn handle_speech_event(&mut self, event: SpeechEvent) {
        self.session.handle_speech_event(event);
    }
}
