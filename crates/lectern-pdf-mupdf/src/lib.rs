use mupdf::{Document, TextPageFlags};

use lectern_core::{DocumentParser, PagedDocument, ParseError, TextItem};

/// MuPDF-based implementation of [`DocumentParser`].
///
/// mupdf is AGPL-3.0, so it is kept behind this crate. lectern-core and the
/// speech backend build without it.
///
/// Each text line MuPDF finds on a page becomes one [`TextItem`]; lines that
/// are empty or whitespace-only are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfParser;

impl MupdfParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for MupdfParser {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, ParseError> {
        let document = Document::from_bytes(bytes, "application/pdf")
            .map_err(|e| ParseError::OpenError(e.to_string()))?;
        let page_count = document
            .page_count()
            .map_err(|e| ParseError::OpenError(e.to_string()))?;

        tracing::debug!(page_count, "mupdf opened document");
        Ok(Box::new(MupdfDocument {
            document,
            page_count: usize::try_from(page_count).unwrap_or(0),
        }))
    }
}

struct MupdfDocument {
    document: Document,
    page_count: usize,
}

impl PagedDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn text_items(&self, page_number: usize) -> Result<Vec<TextItem>, ParseError> {
        if page_number == 0 || page_number > self.page_count {
            return Err(ParseError::PageOutOfRange {
                page: page_number,
                count: self.page_count,
            });
        }
        let index = i32::try_from(page_number - 1).map_err(|_| ParseError::PageOutOfRange {
            page: page_number,
            count: self.page_count,
        })?;

        let page = self
            .document
            .load_page(index)
            .map_err(|e| ParseError::ExtractionError(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| ParseError::ExtractionError(e.to_string()))?;

        let mut items = Vec::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                if !line_text.trim().is_empty() {
                    items.push(TextItem::new(line_text));
                }
            }
        }
        Ok(items)
    }
}
