mod backend;
mod update;
mod update_file_picker;

use std::path::{Path, PathBuf};

use lectern_core::{Extraction, ReaderSession, SpeechSynthesizer};
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::theme::Theme;
use crate::tui_event::BackendCommand;

/// The session type the TUI drives; the synthesizer is chosen at startup.
pub type Session = ReaderSession<Box<dyn SpeechSynthesizer>>;

/// Which screen is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Reader,
    FilePicker,
}

/// Which voice slider the arrow keys adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderFocus {
    Rate,
    Pitch,
}

/// State for the file picker screen.
#[derive(Debug, Clone)]
pub struct FilePickerState {
    /// Current directory being browsed.
    pub current_dir: PathBuf,
    /// Entries in the current directory (dirs first, then files).
    pub entries: Vec<FileEntry>,
    /// Cursor position in the entries list.
    pub cursor: usize,
}

/// A single entry in the file picker.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub is_pdf: bool,
}

impl FilePickerState {
    pub fn new() -> Self {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::at(current_dir)
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let mut state = Self {
            current_dir: dir.into(),
            entries: Vec::new(),
            cursor: 0,
        };
        state.refresh_entries();
        state
    }

    /// Refresh the entries list from the current directory.
    pub fn refresh_entries(&mut self) {
        let mut entries = Vec::new();

        // Parent directory entry
        if let Some(parent) = self.current_dir.parent() {
            entries.push(FileEntry {
                name: "..".to_string(),
                path: parent.to_path_buf(),
                is_dir: true,
                is_pdf: false,
            });
        }

        if let Ok(read_dir) = std::fs::read_dir(&self.current_dir) {
            let mut dirs = Vec::new();
            let mut files = Vec::new();

            for entry in read_dir.flatten() {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();

                // Skip hidden files/dirs
                if name.starts_with('.') {
                    continue;
                }

                if path.is_dir() {
                    dirs.push(FileEntry {
                        name,
                        path,
                        is_dir: true,
                        is_pdf: false,
                    });
                } else {
                    let is_pdf = has_pdf_extension(&path);
                    files.push(FileEntry {
                        name,
                        path,
                        is_dir: false,
                        is_pdf,
                    });
                }
            }

            dirs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

            entries.extend(dirs);
            entries.extend(files);
        }

        self.entries = entries;
        self.cursor = 0;
    }

    /// Enter the directory at cursor, or return false if not a directory.
    pub fn enter_directory(&mut self) -> bool {
        if let Some(entry) = self.entries.get(self.cursor)
            && entry.is_dir
        {
            self.current_dir = entry.path.clone();
            self.refresh_entries();
            return true;
        }
        false
    }

    pub fn current(&self) -> Option<&FileEntry> {
        self.entries.get(self.cursor)
    }
}

impl Default for FilePickerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Only a hint for the picker's icons; the real gate is the PDF header.
fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Turn pasted text into a path. Terminals paste dropped files as a path,
/// sometimes quoted, with escaped spaces, or as a `file://` URI; only the
/// first dropped file is used.
pub fn pasted_path(text: &str) -> Option<PathBuf> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let unquoted = line
        .strip_prefix('\'')
        .and_then(|l| l.strip_suffix('\''))
        .or_else(|| line.strip_prefix('"').and_then(|l| l.strip_suffix('"')))
        .unwrap_or(line);
    let unescaped = unquoted.replace("\\ ", " ");
    let path = unescaped.strip_prefix("file://").unwrap_or(unescaped.as_str());
    Some(PathBuf::from(path))
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    pub session: Session,
    pub theme: Theme,
    pub should_quit: bool,
    pub confirm_quit: bool,
    pub show_help: bool,
    pub focus: SliderFocus,
    /// Vertical scroll of the preview pane, in lines.
    pub preview_scroll: u16,
    pub tick: usize,
    /// Rows of preview text on screen (set on resize, used for page up/down).
    pub visible_rows: usize,
    /// Columns available to preview text.
    pub preview_width: u16,
    pub file_picker: FilePickerState,
    /// Channel to send commands to the backend listener.
    pub backend_cmd_tx: Option<mpsc::UnboundedSender<BackendCommand>>,
    /// Pages read so far by the extraction in flight, as `(done, total)`.
    pub extraction_progress: Option<(usize, usize)>,
    /// Request id of the extraction whose events are still wanted.
    pending_request: Option<u64>,
    next_request: u64,
}

impl App {
    pub fn new(session: Session, theme: Theme) -> Self {
        Self {
            screen: Screen::Reader,
            session,
            theme,
            should_quit: false,
            confirm_quit: false,
            show_help: false,
            focus: SliderFocus::Rate,
            preview_scroll: 0,
            tick: 0,
            visible_rows: 14,
            preview_width: 78,
            file_picker: FilePickerState::new(),
            backend_cmd_tx: None,
            extraction_progress: None,
            pending_request: None,
            next_request: 0,
        }
    }

    /// Ask the backend to load `path`. Events from any earlier request are
    /// ignored from now on.
    pub fn open_file(&mut self, path: PathBuf) {
        self.next_request += 1;
        let request = self.next_request;
        self.pending_request = Some(request);
        self.extraction_progress = None;

        tracing::info!(request, path = %path.display(), "opening file");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let sent = match &self.backend_cmd_tx {
            Some(tx) => tx.send(BackendCommand::Extract { request, path }).is_ok(),
            None => false,
        };
        if !sent {
            tracing::warn!(request, "extraction backend is not running");
            self.pending_request = None;
            self.session.begin_extraction(&file_name);
            self.session.finish_extraction(Extraction::Failed(
                "extraction backend is not running".into(),
            ));
        }
    }

    /// Stop any speech before the process exits.
    pub fn shutdown(&mut self) {
        if self.session.controller().current_session().is_some() {
            self.session.stop();
        }
    }

    pub fn view(&self, f: &mut Frame) {
        let area = f.area();
        match self.screen {
            Screen::Reader => crate::view::reader::render_in(f, self, area),
            Screen::FilePicker => crate::view::file_picker::render_in(f, self, area),
        }
        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
        if self.confirm_quit {
            crate::view::quit_confirm::render(f, &self.theme);
        }
    }
}
