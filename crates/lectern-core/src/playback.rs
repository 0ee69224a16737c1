use std::sync::Arc;

use crate::speech::{SessionId, SpeechEvent, SpeechEventKind, SpeechSynthesizer, Utterance, VoiceParams};

/// Where the controller is in the speak/pause lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

/// Enablement of the three transport buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
}

impl Controls {
    /// Play is disabled while playing; Pause and Stop only while playing.
    pub fn for_playing(playing: bool) -> Self {
        Self {
            play: !playing,
            pause: playing,
            stop: playing,
        }
    }

    pub fn disabled() -> Self {
        Self {
            play: false,
            pause: false,
            stop: false,
        }
    }
}

/// What a controller call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A new utterance was handed to the synthesizer.
    Started(SessionId),
    /// The synthesizer reported that the current utterance began.
    Speaking,
    Resumed,
    Paused,
    Stopped,
    Finished,
    Failed(String),
    /// Nothing changed (invalid in this state, or an event for a stale session).
    Ignored,
}

/// Drives a [`SpeechSynthesizer`] through Idle → Speaking ⇄ Paused → Idle.
pub struct PlaybackController<S> {
    synth: S,
    state: PlaybackState,
    current: Option<SessionId>,
    next_session: u64,
}

impl<S: SpeechSynthesizer> PlaybackController<S> {
    pub fn new(synth: S) -> Self {
        Self {
            synth,
            state: PlaybackState::Idle,
            current: None,
            next_session: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Speaking
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.current
    }

    pub fn controls(&self) -> Controls {
        Controls::for_playing(self.is_playing())
    }

    pub fn synthesizer(&self) -> &S {
        &self.synth
    }

    /// Resume a paused utterance, or cancel whatever is live and start a new
    /// one with `text` and `params`.
    pub fn play(&mut self, text: Arc<str>, params: VoiceParams) -> Transition {
        if self.state == PlaybackState::Paused && self.current.is_some() {
            return match self.synth.resume() {
                Ok(()) => {
                    self.state = PlaybackState::Speaking;
                    Transition::Resumed
                }
                Err(e) => self.fail(e.to_string()),
            };
        }

        self.synth.cancel();
        self.current = None;

        self.next_session += 1;
        let session = SessionId(self.next_session);
        let utterance = Utterance {
            session,
            text,
            params,
        };
        tracing::debug!(%session, rate = params.rate, pitch = params.pitch, "starting utterance");

        match self.synth.speak(utterance) {
            Ok(()) => {
                self.current = Some(session);
                self.state = PlaybackState::Speaking;
                Transition::Started(session)
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// Suspend the live utterance. Only valid while speaking.
    pub fn pause(&mut self) -> Transition {
        if self.state != PlaybackState::Speaking {
            return Transition::Ignored;
        }
        match self.synth.pause() {
            Ok(()) => {
                self.state = PlaybackState::Paused;
                Transition::Paused
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// Cancel the live utterance, whatever the state.
    pub fn stop(&mut self) -> Transition {
        self.synth.cancel();
        self.current = None;
        self.state = PlaybackState::Idle;
        Transition::Stopped
    }

    /// Apply a lifecycle event. Events for any session other than the
    /// current one are ignored.
    pub fn handle_event(&mut self, event: SpeechEvent) -> Transition {
        if self.current != Some(event.session) {
            tracing::debug!(session = %event.session, "ignoring event for stale session");
            return Transition::Ignored;
        }
        match event.kind {
            SpeechEventKind::Start if self.state == PlaybackState::Speaking => Transition::Speaking,
            SpeechEventKind::Start => Transition::Ignored,
            SpeechEventKind::End => {
                self.current = None;
                self.state = PlaybackState::Idle;
                Transition::Finished
            }
            SpeechEventKind::Error(message) => {
                tracing::warn!(session = %event.session, error = %message, "speech failed");
                self.current = None;
                self.state = PlaybackState::Idle;
                Transition::Failed(message)
            }
        }
    }

    fn fail(&mut self, message: String) -> Transition {
        tracing::warn!(error = %message, "speech engine call failed");
        self.synth.cancel();
        self.current = None;
        self.state = PlaybackState::Idle;
        Transition::Failed(message)
    }
}
