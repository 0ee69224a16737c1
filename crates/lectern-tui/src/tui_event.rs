use std::path::PathBuf;

use lectern_core::{Extraction, SessionError};

/// Commands sent from the TUI to the backend.
#[derive(Debug, Clone)]
pub enum BackendCommand {
    /// Read and extract a file. `request` tags every event it produces.
    Extract { request: u64, path: PathBuf },
}

/// Events flowing from the backend extraction task to the TUI.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// The file is not a PDF; nothing was extracted.
    Rejected { request: u64, error: SessionError },
    /// The file passed the PDF gate and extraction began.
    ExtractionStarted { request: u64, file_name: String },
    /// `done` of `total` pages have been read.
    ExtractionProgress {
        request: u64,
        done: usize,
        total: usize,
    },
    ExtractionFinished {
        request: u64,
        extraction: Extraction,
    },
}

impl BackendEvent {
    pub fn request(&self) -> u64 {
        match self {
            BackendEvent::Rejected { request, .. }
            | BackendEvent::ExtractionStarted { request, .. }
            | BackendEvent::ExtractionProgress { request, .. }
            | BackendEvent::ExtractionFinished { request, .. } => *request,
        }
    }
}
