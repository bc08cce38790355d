//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use crate::pdf::form::decode_text;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("Pages is not a reference".to_string()))?;

    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    match count {
        Object::Integer(n) => Ok(*n as usize),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

/// PDF metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Creating application or person (if present)
    pub creator: Option<String>,
}

impl PdfMetadata {
    fn from_document(doc: &Document, origin: &str) -> Result<Self> {
        let page_count = count_pages_from_catalog(doc)?;
        if page_count == 0 {
            return Err(Error::EmptyPdf(origin.to_string()));
        }

        let info = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
        let field = |key: &[u8]| info.and_then(|dict| dict.get(key).ok()).and_then(decode_text);

        Ok(Self {
            page_count,
            title: field(b"Title"),
            author: field(b"Author"),
            creator: field(b"Creator"),
        })
    }
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path).map_err(|source| Error::Load {
        origin: path.display().to_string(),
        source,
    })?;
    PdfMetadata::from_document(&doc, &path.display().to_string())
}

/// Extract metadata from an in-memory PDF
pub fn extract_metadata_from_bytes(data: &[u8]) -> Result<PdfMetadata> {
    let doc = Document::load_mem(data).map_err(|source| Error::Load {
        origin: "<memory>".to_string(),
        source,
    })?;
    PdfMetadata::from_document(&doc, "<memory>")
}
