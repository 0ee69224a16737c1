use crate::Status;
use crate::backend::{DocumentParser, ParseError};

/// Number of characters shown in the text preview.
pub const PREVIEW_CHARS: usize = 500;

/// Outcome of a single extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Non-empty, trimmed document text.
    Text(String),
    /// The document parsed but contained no text (e.g. a scanned PDF).
    NoText,
    /// Loading or extraction failed; carries the underlying error message.
    Failed(String),
}

impl Extraction {
    pub fn from_result(result: Result<String, ParseError>) -> Self {
        match result {
            Ok(text) if text.is_empty() => Extraction::NoText,
            Ok(text) => Extraction::Text(text),
            Err(e) => Extraction::Failed(e.to_string()),
        }
    }

    /// The status line that reports this outcome.
    pub fn status(&self) -> Status {
        match self {
            Extraction::Text(text) => Status::success(format!(
                "\u{2713} Successfully extracted {} characters",
                text.chars().count()
            )),
            Extraction::NoText => Status::info("No text found in PDF"),
            Extraction::Failed(message) => Status::error(format!("Error reading PDF: {message}")),
        }
    }
}

/// Extract the text of every page, in page order.
///
/// Item strings on a page are joined with single spaces, each page is
/// followed by one space, and the result is trimmed.
pub fn extract_text(parser: &dyn DocumentParser, bytes: &[u8]) -> Result<String, ParseError> {
    extract_text_with_progress(parser, bytes, |_, _| {})
}

/// Like [`extract_text`], calling `on_page(done, total)` after each page.
pub fn extract_text_with_progress(
    parser: &dyn DocumentParser,
    bytes: &[u8],
    mut on_page: impl FnMut(usize, usize),
) -> Result<String, ParseError> {
    let document = parser.load(bytes)?;
    let total = document.page_count();
    tracing::debug!(pages = total, bytes = bytes.len(), "opened document");

    let mut text = String::new();
    for page_number in 1..=total {
        let items = document.text_items(page_number)?;
        tracing::debug!(page = page_number, items = items.len(), "extracted page");

        let page_text = items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        text.push_str(&page_text);
        text.push(' ');
        on_page(page_number, total);
    }

    let text = text.trim().to_string();
    tracing::info!(chars = text.chars().count(), pages = total, "extraction finished");
    Ok(text)
}

/// Run an extraction and classify its outcome.
pub fn extract(parser: &dyn DocumentParser, bytes: &[u8]) -> Extraction {
    Extraction::from_result(extract_text(parser, bytes))
}

/// The first [`PREVIEW_CHARS`] characters of `text`, with `...` appended
/// when anything was cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PagedDocument, TextItem};

    struct MemoryParser {
        pages: Vec<Vec<&'static str>>,
    }

    struct MemoryDocument {
        pages: Vec<Vec<&'static str>>,
    }

    impl DocumentParser for MemoryParser {
        fn load(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, ParseError> {
            if bytes.starts_with(b"%PDF-") {
                Ok(Box::new(MemoryDocument {
                    pages: self.pages.clone(),
                }))
            } else {
                Err(ParseError::OpenError("no objects found".into()))
            }
        }
    }

    impl PagedDocument for MemoryDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn text_items(&self, page_number: usize) -> Result<Vec<TextItem>, ParseError> {
            self.pages
                .get(page_number.wrapping_sub(1))
                .map(|items| items.iter().map(|s| TextItem::new(*s)).collect())
                .ok_or(ParseError::PageOutOfRange {
                    page: page_number,
                    count: self.pages.len(),
                })
        }
    }

    fn parser(pages: Vec<Vec<&'static str>>) -> MemoryParser {
        MemoryParser { pages }
    }

    const PDF: &[u8] = b"%PDF-1.4\n";

    #[test]
    fn two_pages_join_in_order() {
        let p = parser(vec![vec!["Hello"], vec!["World"]]);
        let text = extract_text(&p, PDF).unwrap();
        assert_eq!(text, "Hello World");
        assert_eq!(text.chars().count(), 11);
    }

    #[test]
    fn items_on_a_page_join_with_single_spaces() {
        let p = parser(vec![vec!["The", "quick", "fox"], vec!["jumps"]]);
        assert_eq!(extract_text(&p, PDF).unwrap(), "The quick fox jumps");
    }

    #[test]
    fn output_is_trimmed_but_inner_spacing_kept() {
        let p = parser(vec![vec!["  lead", ""], vec!["", "tail  "]]);
        // page 1 -> "  lead " + " ", page 2 -> " tail  " + " "
        assert_eq!(extract_text(&p, PDF).unwrap(), "lead   tail");
    }

    #[test]
    fn no_items_is_no_text() {
        let p = parser(vec![vec![], vec![]]);
        assert_eq!(extract(&p, PDF), Extraction::NoText);
    }

    #[test]
    fn whitespace_only_items_are_no_text() {
        let p = parser(vec![vec![" ", "\n"]]);
        assert_eq!(extract(&p, PDF), Extraction::NoText);
    }

    #[test]
    fn load_failure_carries_message() {
        let p = parser(vec![vec!["Hello"]]);
        assert_eq!(
            extract(&p, b"garbage"),
            Extraction::Failed("failed to open PDF: no objects found".into())
        );
    }

    #[test]
    fn progress_reports_every_page() {
        let p = parser(vec![vec!["a"], vec!["b"], vec!["c"]]);
        let mut seen = Vec::new();
        extract_text_with_progress(&p, PDF, |done, total| seen.push((done, total))).unwrap();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn short_preview_is_verbatim() {
        let text = "x".repeat(PREVIEW_CHARS);
        assert_eq!(preview(&text), text);
        assert_eq!(preview("Hello World"), "Hello World");
    }

    #[test]
    fn long_preview_is_cut_with_ellipsis() {
        let text = "y".repeat(PREVIEW_CHARS + 1);
        let shown = preview(&text);
        assert_eq!(shown, format!("{}...", "y".repeat(PREVIEW_CHARS)));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let text = "é".repeat(PREVIEW_CHARS + 10);
        let shown = preview(&text);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.starts_with("éé"));
        assert!(shown.ends_with("é..."));
    }

    #[test]
    fn status_wording_per_outcome() {
        use crate::Severity;

        let ok = Extraction::Text("Hello World".into()).status();
        assert_eq!(ok.severity, Severity::Success);
        assert_eq!(ok.message, "\u{2713} Successfully extracted 11 characters");

        let empty = Extraction::NoText.status();
        assert_eq!(empty.severity, Severity::Info);
        assert_eq!(empty.message, "No text found in PDF");

        let failed = Extraction::Failed("bad xref".into()).status();
        assert_eq!(failed.severity, Severity::Error);
        assert_eq!(failed.message, "Error reading PDF: bad xref");
    }
}
