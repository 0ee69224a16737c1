use std::path::Path;
use std::sync::Arc;

use lectern_core::{DocumentParser, Extraction};
use tokio::sync::mpsc;

use crate::tui_event::{BackendCommand, BackendEvent};

/// Serve extraction commands until the command channel closes.
///
/// Each extraction runs on the blocking pool so the UI keeps drawing while
/// MuPDF works through the pages.
pub async fn run_backend(
    parser: Arc<dyn DocumentParser>,
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    event_tx: mpsc::UnboundedSender<BackendEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            BackendCommand::Extract { request, path } => {
                let parser = Arc::clone(&parser);
                let tx = event_tx.clone();
                tokio::task::spawn_blocking(move || {
                    run_extraction(parser.as_ref(), request, &path, &tx);
                });
            }
        }
    }
}

/// Read `path`, gate it on the PDF header and extract its text, reporting
/// each step as a [`BackendEvent`].
pub fn run_extraction(
    parser: &dyn DocumentParser,
    request: u64,
    path: &Path,
    tx: &mpsc::UnboundedSender<BackendEvent>,
) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file");
            let _ = tx.send(BackendEvent::ExtractionStarted { request, file_name });
            let _ = tx.send(BackendEvent::ExtractionFinished {
                request,
                extraction: Extraction::Failed(e.to_string()),
            });
            return;
        }
    };

    if let Err(error) = lectern_core::check_pdf(&file_name, &bytes) {
        let _ = tx.send(BackendEvent::Rejected { request, error });
        return;
    }

    tracing::info!(path = %path.display(), bytes = bytes.len(), "extracting");
    let _ = tx.send(BackendEvent::ExtractionStarted { request, file_name });

    let result = lectern_core::extract_text_with_progress(parser, &bytes, |done, total| {
        let _ = tx.send(BackendEvent::ExtractionProgress {
            request,
            done,
            total,
        });
    });
    let _ = tx.send(BackendEvent::ExtractionFinished {
        request,
        extraction: Extraction::from_result(result),
    });
}
