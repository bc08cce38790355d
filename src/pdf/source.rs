//! External documents whose pages are imported into the report

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pdf::form;
use crate::pdf::import::collect_objects;
use crate::pdf::page::detached_page;

/// Where a document comes from: a file on disk or an in-memory buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes { name: String, data: Vec<u8> },
}

impl DocumentSource {
    pub fn bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        DocumentSource::Bytes {
            name: name.into(),
            data,
        }
    }

    /// Parse the document, failing when it is missing, malformed or has
    /// no pages
    pub(crate) fn load_document(&self) -> Result<Document> {
        let doc = match self {
            DocumentSource::Path(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound(path.clone()));
                }
                Document::load(path)
            }
            DocumentSource::Bytes { data, .. } => Document::load_mem(data),
        }
        .map_err(|source| Error::Load {
            origin: self.to_string(),
            source,
        })?;

        if doc.get_pages().is_empty() {
            return Err(Error::EmptyPdf(self.to_string()));
        }
        Ok(doc)
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
            DocumentSource::Bytes { name, .. } => write!(f, "{}", name),
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        DocumentSource::Path(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        DocumentSource::Path(path.to_path_buf())
    }
}

/// A loaded external document whose pages can be appended to the report
///
/// # Example
///
/// ```no_run
/// use pdf_templater::pdf::PageSource;
/// use std::collections::{BTreeMap, BTreeSet};
/// use std::path::Path;
///
/// let mut fields = BTreeMap::new();
/// fields.insert("employeeName".to_string(), "Ada".to_string());
///
/// let cover = PageSource::open(Path::new("Portada.pdf"))?
///     .fill_fields(&fields)?
///     .flatten();
/// assert_eq!(cover.page_count(), 1);
/// # Ok::<(), pdf_templater::Error>(())
/// ```
#[derive(Debug)]
pub struct PageSource {
    name: String,
    doc: Document,
}

impl PageSource {
    pub fn load(source: &DocumentSource) -> Result<Self> {
        let doc = source.load_document()?;
        debug!("Loaded {} ({} pages)", source, doc.get_pages().len());
        Ok(Self {
            name: source.to_string(),
            doc,
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::load(&DocumentSource::from(path))
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        Self::load(&DocumentSource::bytes(name, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Terminal form fields, empty when the document has no form
    pub fn fields(&self) -> Vec<form::FormField> {
        form::form_fields(&self.doc).unwrap_or_default()
    }

    /// Set form field values by fully qualified name.
    ///
    /// A name missing from the form fails with [`Error::FieldNotFound`].
    pub fn fill_fields(mut self, values: &BTreeMap<String, String>) -> Result<Self> {
        form::fill_fields(&mut self.doc, &self.name, values)?;
        Ok(self)
    }

    /// Bake widget values into page content and drop the form
    pub fn flatten(mut self) -> Self {
        form::flatten(&mut self.doc, &self.name);
        self
    }

    /// Consume the source into its pages, in order
    pub fn into_pages(self) -> SourcePages {
        let page_ids: Vec<(u32, ObjectId)> = self.doc.get_pages().into_iter().collect();
        SourcePages {
            name: self.name,
            all_pages: page_ids.iter().map(|(_, id)| *id).collect(),
            doc: self.doc,
            page_ids: page_ids.into_iter(),
        }
    }
}

/// Iterator over the pages of a consumed [`PageSource`]
pub struct SourcePages {
    name: String,
    doc: Document,
    /// Every page of the source, including ones already yielded
    all_pages: BTreeSet<ObjectId>,
    page_ids: std::vec::IntoIter<(u32, ObjectId)>,
}

impl SourcePages {
    pub fn source_name(&self) -> &str {
        &self.name
    }

    /// Source ids of every page in the document.
    ///
    /// Handles keep references to these pages (link destinations, `/P`
    /// entries) unresolved; the importer maps them to output pages.
    pub(crate) fn page_ids(&self) -> &BTreeSet<ObjectId> {
        &self.all_pages
    }
}

impl Iterator for SourcePages {
    type Item = Result<PageHandle>;

    fn next(&mut self) -> Option<Self::Item> {
        let (number, page_id) = self.page_ids.next()?;
        Some(PageHandle::extract(&self.doc, number, page_id, &self.all_pages))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.page_ids.size_hint()
    }
}

/// A page lifted out of its source document, ready to import once
#[derive(Debug, Clone)]
pub struct PageHandle {
    number: u32,
    source_id: ObjectId,
    page: Dictionary,
    objects: BTreeMap<ObjectId, Object>,
}

impl PageHandle {
    fn extract(
        doc: &Document,
        number: u32,
        page_id: ObjectId,
        pages: &BTreeSet<ObjectId>,
    ) -> Result<Self> {
        let page = detached_page(doc, page_id)?;
        let objects = collect_objects(doc, &Object::Dictionary(page.clone()), pages);
        Ok(Self {
            number,
            source_id: page_id,
            page,
            objects,
        })
    }

    /// 1-based index within the source document
    pub fn number(&self) -> u32 {
        self.number
    }

    pub(crate) fn into_parts(self) -> (ObjectId, Dictionary, BTreeMap<ObjectId, Object>) {
        (self.source_id, self.page, self.objects)
    }
}
