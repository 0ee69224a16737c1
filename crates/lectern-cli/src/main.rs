use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lectern_core::{ConfigFile, Extraction, Phase, ReaderSession, SpeechSynthesizer, Status};
use lectern_espeak::EspeakSynthesizer;
use lectern_pdf_mupdf::MupdfParser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod output;

use output::ColorMode;

/// Lectern - read the text of a PDF aloud
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the text of a PDF and print a preview of it
    Extract {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Print the whole text instead of the preview
        #[arg(long)]
        full: bool,

        /// Write the whole text to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Extract the text of a PDF and read it aloud
    Speak {
        /// Path to the PDF file
        file_path: PathBuf,

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

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            file_path,
            full,
            output,
            no_color,
        } => extract(file_path, full, output, no_color).await,
        Command::Speak {
            file_path,
            rate,
            pitch,
            voice,
            espeak,
            no_color,
        } => {
            let flags = ConfigFile::from_flags(rate, pitch, voice, espeak, None);
            speak(file_path, flags, no_color).await
        }
    }
}

/// Logs go to stderr so they never mix with extracted text; `RUST_LOG`
/// overrides the default `warn` level.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a file and apply the PDF gate.
fn read_pdf(path: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let name = file_label(path);
    let bytes = std::fs::read(path)?;
    if let Err(e) = lectern_core::check_pdf(&name, &bytes) {
        tracing::info!(error = %e, "rejected file");
        anyhow::bail!("Please upload a PDF file ({e})");
    }
    Ok((name, bytes))
}

/// Extract on a blocking thread, showing per-page progress on stderr.
async fn extract_with_progress(bytes: Vec<u8>) -> anyhow::Result<Extraction> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len} pages")?
            .progress_chars("=> "),
    );
    bar.set_message("Extracting text from PDF...");
    bar.enable_steady_tick(Duration::from_millis(120));

    let page_bar = bar.clone();
    let result = tokio::task::spawn_blocking(move || {
        lectern_core::extract_text_with_progress(&MupdfParser::new(), &bytes, |done, total| {
            page_bar.set_length(total as u64);
            page_bar.set_position(done as u64);
        })
    })
    .await?;

    bar.finish_and_clear();
    Ok(Extraction::from_result(result))
}

async fn extract(
    file_path: PathBuf,
    full: bool,
    output: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);
    let mut stdout = std::io::stdout();

    let (name, bytes) = read_pdf(&file_path)?;
    let extraction = extract_with_progress(bytes).await?;
    let status = extraction.status();

    let text = match extraction {
        Extraction::Text(text) => text,
        Extraction::NoText => {
            output::print_status(&mut stdout, &status, color)?;
            return Ok(());
        }
        Extraction::Failed(_) => anyhow::bail!("{}", status.message),
    };
    output::print_status(&mut stdout, &status, color)?;

    if let Some(ref output_path) = output {
        let mut file = std::fs::File::create(output_path)?;
        file.write_all(text.as_bytes())?;
        writeln!(stdout, "Wrote text to {}", output_path.display())?;
    } else if full {
        output::print_text(&mut stdout, &name, &text, color)?;
    } else {
        output::print_text(&mut stdout, &name, &lectern_core::preview(&text), color)?;
    }
    Ok(())
}

async fn speak(file_path: PathBuf, flags: ConfigFile, no_color: bool) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);
    let mut stdout = std::io::stdout();

    let settings = lectern_core::config_file::resolve_settings(flags)?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let synth = EspeakSynthesizer::new(settings.program.clone(), events_tx)
        .with_voice(settings.voice.clone());
    let mut session = ReaderSession::new(synth, settings.params);

    let (name, bytes) = read_pdf(&file_path)?;
    session.begin_extraction(&name);
    session.finish_extraction(extract_with_progress(bytes).await?);
    print_latest(&mut stdout, &session, color)?;

    match session.phase() {
        Phase::Ready => {}
        Phase::Error => anyhow::bail!("could not read {name}"),
        _ => return Ok(()),
    }

    output::print_voice(&mut stdout, &settings, color)?;

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let mut last = session.status().cloned();
    session.play();

    loop {
        let current = session.status().cloned();
        print_status_change(&mut stdout, last.as_ref(), current.as_ref(), color)?;
        last = current;
        if session.phase() != Phase::Speaking {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => session.stop(),
            event = events_rx.recv() => match event {
                Some(event) => session.handle_speech_event(event),
                None => break,
            },
        }
    }

    if session.phase() == Phase::Error {
        anyhow::bail!("speech failed");
    }
    Ok(())
}

fn print_latest<S: SpeechSynthesizer>(
    w: &mut dyn Write,
    session: &ReaderSession<S>,
    color: ColorMode,
) -> std::io::Result<()> {
    match session.status() {
        Some(status) => output::print_status(w, status, color),
        None => Ok(()),
    }
}

fn print_status_change(
    w: &mut dyn Write,
    before: Option<&Status>,
    after: Option<&Status>,
    color: ColorMode,
) -> std::io::Result<()> {
    match after {
        Some(status) if before != Some(status) => output::print_status(w, status, color),
        _ => Ok(()),
    }
}
