use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ratatui::Terminal;
use ratatui::crossterm::event;
use ratatui::crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use lectern_core::{ConfigFile, DocumentParser, ReaderSession, SpeechSynthesizer};
use lectern_espeak::EspeakSynthesizer;
use lectern_pdf_mupdf::MupdfParser;

mod action;
mod app;
mod backend;
mod input;
mod theme;
mod tui_event;
mod view;

use app::App;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Lectern TUI: open a PDF and listen to its text.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// PDF file to open on startup
    pdf_path: Option<PathBuf>,

    /// Speech rate multiplier (0.5 to 2.0)
    #[arg(long)]
    rate: Option<f32>,

    /// Voice pitch multiplier (0.5 to 2.0)
    #[arg(long)]
    pitch: Option<f32>,

    /// espeak-ng voice name, e.g. en-us
    #[arg(long)]
    voice: Option<String>,

    /// Speech engine program
    #[arg(long)]
    espeak: Option<String>,

    /// Color theme: hacker (default) or modern
    #[arg(long)]
    theme: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let _log_guard = init_logging();

    if let Some(path) = &args.pdf_path
        && !path.exists()
    {
        anyhow::bail!("PDF file not found: {}", path.display());
    }

    // Resolve config from CLI flags > env vars > config files > defaults
    let flags = ConfigFile::from_flags(args.rate, args.pitch, args.voice, args.espeak, args.theme);
    let settings = lectern_core::config_file::resolve_settings(flags)?;
    tracing::info!(?settings, "starting");

    let (speech_tx, mut speech_rx) = mpsc::unbounded_channel();
    let synth: Box<dyn SpeechSynthesizer> = Box::new(
        EspeakSynthesizer::new(settings.program.clone(), speech_tx)
            .with_voice(settings.voice.clone()),
    );
    let session = ReaderSession::new(synth, settings.params);
    let mut app = App::new(session, theme::Theme::from_name(&settings.theme));

    // Set up backend command channel for extraction
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    app.backend_cmd_tx = Some(cmd_tx);
    let parser: Arc<dyn DocumentParser> = Arc::new(MupdfParser::new());
    tokio::spawn(backend::run_backend(parser, cmd_rx, event_tx));

    if let Some(path) = args.pdf_path {
        app.open_file(path);
    }

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
        original_hook(panic_info);
    }));

    let backend_terminal = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_terminal)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let size = terminal.size()?;
    app.update(action::Action::Resize(size.width, size.height));

    // Also handle Ctrl+C at the OS level for clean shutdown
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| app.view(f))?;

        tokio::select! {
            Some(backend_event) = event_rx.recv() => {
                app.handle_backend_event(backend_event);
                // Drain any additional queued backend events
                while let Ok(evt) = event_rx.try_recv() {
                    app.handle_backend_event(evt);
                }
            }
            Some(speech_event) = speech_rx.recv() => {
                app.handle_speech_event(speech_event);
            }
            _ = cancel.cancelled() => {
                app.should_quit = true;
            }
            // Terminal input events
            _ = async {
                if event::poll(tick_rate).unwrap_or(false)
                    && let Ok(evt) = event::read()
                {
                    app.update(input::map_event(&evt));
                }
            } => {}
        }

        app.update(action::Action::Tick);

        if app.should_quit {
            break;
        }
    }

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;

    Ok(())
}

/// Log to a daily file under the cache directory; the terminal belongs to
/// the UI. Returns the guard that flushes the writer on drop.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let dir = dirs::cache_dir()?.join("lectern").join("logs");
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(&dir, "lectern-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
