use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
}

/// One run of text reported by a parser for a page, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String,
}

impl TextItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A loaded document whose pages can be queried one at a time.
pub trait PagedDocument {
    fn page_count(&self) -> usize;

    /// Text items of the page at `page_number` (1-based).
    fn text_items(&self, page_number: usize) -> Result<Vec<TextItem>, ParseError>;
}

/// Trait for PDF parsing backends.
///
/// Implementors only open a payload and expose its pages; joining the items
/// into one string is done by [`crate::extract::extract_text`].
pub trait DocumentParser: Send + Sync {
    /// Load a document from an in-memory PDF payload.
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, ParseError>;
}
