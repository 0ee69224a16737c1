use std::io::Write;

use lectern_core::{Settings, Severity, Status, multiplier_label};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print a status line, colored by severity.
pub fn print_status(w: &mut dyn Write, status: &Status, color: ColorMode) -> std::io::Result<()> {
    if !color.enabled() {
        return writeln!(w, "{}", status.message);
    }
    match status.severity {
        Severity::Info => writeln!(w, "{}", status.message.cyan()),
        Severity::Success => writeln!(w, "{}", status.message.green()),
        Severity::Error => writeln!(w, "{}", status.message.red().bold()),
    }
}

/// Print the extracted text under a header naming the file.
pub fn print_text(
    w: &mut dyn Write,
    file_name: &str,
    text: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", format!("--- {file_name} ---").dimmed())?;
    } else {
        writeln!(w, "--- {file_name} ---")?;
    }
    writeln!(w, "{text}")?;
    Ok(())
}

/// One-line summary of the voice settings a read will use.
pub fn print_voice(w: &mut dyn Write, settings: &Settings, color: ColorMode) -> std::io::Result<()> {
    let voice = settings.voice.as_deref().unwrap_or("default voice");
    let line = format!(
        "Reading with {} ({voice}), rate {}, pitch {}. Press Ctrl+C to stop.",
        settings.program,
        multiplier_label(settings.params.rate),
        multiplier_label(settings.params.pitch)
    );
    if color.enabled() {
        writeln!(w, "{}", line.dimmed())
    } else {
        writeln!(w, "{line}")
    }
}
