use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[cfg(unix)]
use nix::sys::signal::{Signal, kill};
#[cfg(unix)]
use nix::unistd::Pid;

use lectern_core::{
    SessionId, SpeechError, SpeechEvent, SpeechEventSender, SpeechSynthesizer, Utterance,
    VoiceParams,
};

/// espeak-ng's default speed in words per minute.
pub const BASE_WORDS_PER_MINUTE: f32 = 175.0;
/// espeak-ng's default pitch on its 0–99 scale.
pub const BASE_PITCH: f32 = 50.0;

/// Words per minute for a rate multiplier.
pub fn words_per_minute(rate: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * rate).round().max(1.0) as u32
}

/// espeak-ng pitch (0–99) for a pitch multiplier.
pub fn espeak_pitch(pitch: f32) -> u32 {
    (BASE_PITCH * pitch).round().clamp(0.0, 99.0) as u32
}

/// Arguments passed to the engine; the text itself goes to stdin.
pub fn command_args(params: &VoiceParams, voice: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        words_per_minute(params.rate).to_string(),
        "-p".to_string(),
        espeak_pitch(params.pitch).to_string(),
    ];
    if let Some(voice) = voice {
        args.push("-v".to_string());
        args.push(voice.to_string());
    }
    args.push("--stdin".to_string());
    args
}

struct LiveUtterance {
    session: SessionId,
    child: Arc<Mutex<Child>>,
    cancelled: Arc<AtomicBool>,
    /// Set by the watcher, under the child lock, once the process is reaped.
    exited: Arc<AtomicBool>,
}

/// Speaks through an `espeak-ng` child process, one process per utterance.
///
/// `Start` is sent once the process is spawned; a watcher thread sends `End`
/// when it exits successfully and `Error` (with its stderr) otherwise. Pause
/// and resume stop and continue the process, which needs Unix job-control
/// signals.
pub struct EspeakSynthesizer {
    program: String,
    voice: Option<String>,
    events: SpeechEventSender,
    live: Option<LiveUtterance>,
}

impl EspeakSynthesizer {
    pub fn new(program: impl Into<String>, events: SpeechEventSender) -> Self {
        Self {
            program: program.into(),
            voice: None,
            events,
            live: None,
        }
    }

    /// Use a specific espeak-ng voice (`-v`).
    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Send a job-control signal to the live process. A process that has
    /// already exited is left alone; its pid may belong to someone else now.
    #[cfg(unix)]
    fn signal(&self, signal: Signal) -> Result<(), SpeechError> {
        let Some(live) = &self.live else {
            return Ok(());
        };
        let child = live
            .child
            .lock()
            .map_err(|_| SpeechError::Engine("speech process state poisoned".into()))?;
        // Holding the lock keeps the watcher from reaping in between, so an
        // unreaped pid still names our (possibly zombie) child.
        if live.exited.load(Ordering::SeqCst) {
            tracing::debug!(session = %live.session, ?signal, "speech process already exited");
            return Ok(());
        }
        let pid = i32::try_from(child.id())
            .map_err(|_| SpeechError::Engine(format!("pid {} out of range", child.id())))?;
        kill(Pid::from_raw(pid), signal).map_err(|errno| {
            SpeechError::Engine(format!(
                "failed to send {} to speech process {pid}: {errno}",
                signal.as_str()
            ))
        })
    }
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        self.cancel();

        let args = command_args(&utterance.params, self.voice.as_deref());
        tracing::debug!(program = %self.program, ?args, session = %utterance.session, "spawning speech engine");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SpeechError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            let text = Arc::clone(&utterance.text);
            thread::spawn(move || {
                // Dropping stdin afterwards closes the pipe and ends the input.
                if let Err(e) = stdin.write_all(text.as_bytes()) {
                    tracing::debug!(error = %e, "speech engine stopped reading input");
                }
            });
        }
        let stderr = child.stderr.take();

        let session = utterance.session;
        let child = Arc::new(Mutex::new(child));
        let cancelled = Arc::new(AtomicBool::new(false));
        let exited = Arc::new(AtomicBool::new(false));

        let _ = self.events.send(SpeechEvent::start(session));

        {
            let child = Arc::clone(&child);
            let cancelled = Arc::clone(&cancelled);
            let exited = Arc::clone(&exited);
            let events = self.events.clone();
            thread::spawn(move || watch(session, child, stderr, cancelled, exited, events));
        }

        self.live = Some(LiveUtterance {
            session,
            child,
            cancelled,
            exited,
        });
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SpeechError> {
        #[cfg(unix)]
        {
            self.signal(Signal::SIGSTOP)
        }
        #[cfg(not(unix))]
        {
            Err(SpeechError::Unsupported("pause"))
        }
    }

    fn resume(&mut self) -> Result<(), SpeechError> {
        #[cfg(unix)]
        {
            self.signal(Signal::SIGCONT)
        }
        #[cfg(not(unix))]
        {
            Err(SpeechError::Unsupported("resume"))
        }
    }

    fn cancel(&mut self) {
        let Some(live) = self.live.take() else {
            return;
        };
        live.cancelled.store(true, Ordering::SeqCst);
        let Ok(mut child) = live.child.lock() else {
            tracing::warn!(session = %live.session, "speech process state poisoned; not killed");
            return;
        };
        match child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(e) = child.kill() {
                    tracing::debug!(session = %live.session, error = %e, "kill failed");
                }
                // Reap so no zombie is left behind.
                let _ = child.wait();
            }
        }
        tracing::debug!(session = %live.session, "cancelled utterance");
    }
}

impl Drop for EspeakSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Wait for the process to exit and report how it ended.
fn watch(
    session: SessionId,
    child: Arc<Mutex<Child>>,
    stderr: Option<std::process::ChildStderr>,
    cancelled: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    events: SpeechEventSender,
) {
    // stderr reaches EOF once the process exits (or is killed).
    let mut err_output = String::new();
    if let Some(mut stderr) = stderr {
        let _ = stderr.read_to_string(&mut err_output);
    }

    let status = match child.lock() {
        Ok(mut child) => {
            let status = child.wait();
            exited.store(true, Ordering::SeqCst);
            status
        }
        Err(_) => return,
    };

    if cancelled.load(Ordering::SeqCst) {
        return;
    }

    let event = match status {
        Ok(status) if status.success() => SpeechEvent::end(session),
        Ok(status) => {
            let detail = err_output.trim();
            if detail.is_empty() {
                SpeechEvent::error(session, format!("speech engine exited with {status}"))
            } else {
                SpeechEvent::error(session, detail.to_string())
            }
        }
        Err(e) => SpeechEvent::error(session, e.to_string()),
    };
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::SpeechEventKind;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn utterance(id: u64) -> Utterance {
        Utterance {
            session: SessionId(id),
            text: Arc::from("Hello World"),
            params: VoiceParams::default(),
        }
    }

    #[test]
    fn rate_maps_to_words_per_minute() {
        assert_eq!(words_per_minute(1.0), 175);
        assert_eq!(words_per_minute(0.5), 88);
        assert_eq!(words_per_minute(2.0), 350);
    }

    #[test]
    fn pitch_maps_to_espeak_scale() {
        assert_eq!(espeak_pitch(1.0), 50);
        assert_eq!(espeak_pitch(0.5), 25);
        assert_eq!(espeak_pitch(2.0), 99);
    }

    #[test]
    fn args_include_voice_when_set() {
        let params = VoiceParams { rate: 1.2, pitch: 0.8 };
        assert_eq!(
            command_args(&params, Some("en-us")),
            vec!["-s", "210", "-p", "40", "-v", "en-us", "--stdin"]
        );
        assert_eq!(
            command_args(&VoiceParams::default(), None),
            vec!["-s", "175", "-p", "50", "--stdin"]
        );
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut synth = EspeakSynthesizer::new("lectern-no-such-speech-engine", tx);
        let err = synth.speak(utterance(1)).unwrap_err();
        assert!(matches!(err, SpeechError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_exit_reports_start_then_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut synth = EspeakSynthesizer::new("true", tx);
        synth.speak(utterance(7)).unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first, SpeechEvent::start(SessionId(7)));
        let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, SpeechEvent::end(SessionId(7)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_exit_reports_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut synth = EspeakSynthesizer::new("false", tx);
        synth.speak(utterance(3)).unwrap();

        let _start = rx.recv().await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.session, SessionId(3));
        match event.kind {
            SpeechEventKind::Error(message) => assert!(message.contains("exit")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancelled_utterance_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // `sh -s` runs whatever arrives on stdin, so this utterance keeps the
        // process alive long enough to pause, resume and cancel it.
        let mut synth = EspeakSynthesizer::new("sh", tx);
        let mut u = utterance(9);
        u.text = Arc::from("sleep 30\n");
        synth.speak(u).unwrap();
        assert_eq!(rx.recv().await.unwrap(), SpeechEvent::start(SessionId(9)));

        synth.pause().unwrap();
        synth.resume().unwrap();
        synth.cancel();

        let late = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(late.is_err(), "cancelled utterance must not emit events");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pause_after_exit_does_not_turn_completion_into_an_error() {
        use lectern_core::{PlaybackController, PlaybackState, Transition};

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PlaybackController::new(EspeakSynthesizer::new("true", tx));
        let Transition::Started(session) =
            controller.play(Arc::from("Hello World"), VoiceParams::default())
        else {
            panic!("play did not start an utterance");
        };
        assert_eq!(rx.recv().await.unwrap(), SpeechEvent::start(session));

        // The process is gone and End is queued, but the loop has not applied it.
        let end = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(end, SpeechEvent::end(session));

        assert_eq!(controller.pause(), Transition::Paused);
        assert_eq!(controller.handle_event(end), Transition::Finished);
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signals_after_exit_are_no_ops() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut synth = EspeakSynthesizer::new("true", tx);
        synth.speak(utterance(4)).unwrap();
        let _start = rx.recv().await.unwrap();
        let _end = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert!(synth.pause().is_ok());
        assert!(synth.resume().is_ok());
    }

    #[test]
    fn pause_without_utterance_is_a_no_op() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut synth = EspeakSynthesizer::new("espeak-ng", tx);
        #[cfg(unix)]
        {
            assert!(synth.pause().is_ok());
            assert!(synth.resume().is_ok());
        }
        synth.cancel();
        assert_eq!(synth.program(), "espeak-ng");
    }
}
