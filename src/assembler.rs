//! Building the output document segment by segment
//!
//! The assembler owns the output document and its running page counter.
//! Pages come either from a [`PageSource`] (cover and end segments) or
//! from freshly rendered content (the body). Every appended page fires the
//! page-completion hook once, with the boundaries recorded so far.

use std::collections::HashMap;
use std::io::Write;
use chrono::Local;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::{CompletedPage, PageEvents};
use crate::layout::PageDimensions;
use crate::pdf::form::encode_text;
use crate::pdf::import::{import_objects, renumber_dictionary};
use crate::pdf::source::{PageHandle, PageSource};
use crate::policy::{Boundaries, Boundary};

/// Metadata written to the output's Info dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    /// Defaults to the author
    pub creator: Option<String>,
}

impl DocumentInfo {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            creator: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Init("document title is required".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(Error::Init("document author is required".to_string()));
        }
        Ok(())
    }

    fn to_dictionary(&self) -> Dictionary {
        let text = |value: &str| Object::String(encode_text(value), StringFormat::Literal);
        let creator = self.creator.as_deref().unwrap_or(&self.author);

        let mut info = Dictionary::new();
        info.set("Title", text(&self.title));
        info.set("Author", text(&self.author));
        info.set("Creator", text(creator));
        info.set(
            "Producer",
            text(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))),
        );
        info.set(
            "CreationDate",
            Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
        );
        info
    }
}

/// The accumulating output: a lopdf document plus its ordered page list
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    page_size: PageDimensions,
}

impl OutputDocument {
    fn new(page_size: PageDimensions) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page_size,
        }
    }

    /// Pages appended so far, which is also the number of the last page
    pub fn page_count(&self) -> u32 {
        self.kids.len() as u32
    }

    /// Copy one page into the output.
    ///
    /// `segment_pages` maps every page of the source document to the id
    /// reserved for it here, so links between pages of the same segment
    /// land on the imported pages. References to pages outside the map
    /// become `null`.
    fn import_page(
        &mut self,
        handle: PageHandle,
        segment_pages: &HashMap<ObjectId, ObjectId>,
    ) -> ObjectId {
        let (source_id, page, objects) = handle.into_parts();
        let page_id = match segment_pages.get(&source_id) {
            Some(id) => *id,
            None => self.doc.new_object_id(),
        };

        let mut id_map = segment_pages.clone();
        id_map.insert(source_id, page_id);
        let id_map = import_objects(&mut self.doc, objects, id_map);

        let mut page = renumber_dictionary(&page, &id_map);
        page.set("Parent", Object::Reference(self.pages_id));
        self.doc.objects.insert(page_id, Object::Dictionary(page));
        page_id
    }

    fn add_page(&mut self, content: Vec<u8>, resources: Dictionary) -> ObjectId {
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("MediaBox", media_box_object(&self.page_size));
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));
        self.doc.add_object(Object::Dictionary(page))
    }

    /// Write the page tree, catalog and Info dictionary, then serialize
    fn finish(self, info: &DocumentInfo) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(info, &mut bytes)?;
        Ok(bytes)
    }

    fn write_to<W: Write>(mut self, info: &DocumentInfo, target: &mut W) -> Result<()> {
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set(
            "Kids",
            Object::Array(self.kids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        pages.set("MediaBox", media_box_object(&self.page_size));
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(Object::Dictionary(catalog));
        let info_id = self.doc.add_object(Object::Dictionary(info.to_dictionary()));

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        self.doc.compress();
        self.doc.save_to(target).map_err(Error::Finalize)?;
        Ok(())
    }
}

fn media_box_object(page_size: &PageDimensions) -> Object {
    Object::Array(page_size.media_box().iter().map(|v| Object::Real(*v)).collect())
}

/// Result of a closed assembly
#[derive(Debug)]
pub struct Assembled<E> {
    /// Serialized PDF
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub boundaries: Boundaries,
    /// The page-completion hook, returned for inspection
    pub events: E,
}

/// Appends segments to an output document and records their boundaries
///
/// The order of operations is fixed: cover pages, `CoverEnd`, body pages,
/// `BodyEnd`, end pages, then [`close`](Self::close).
///
/// # Example
///
/// ```no_run
/// use pdf_templater::assembler::{DocumentAssembler, DocumentInfo};
/// use pdf_templater::pdf::PageSource;
/// use pdf_templater::policy::Boundary;
/// use std::path::Path;
///
/// let mut assembler = DocumentAssembler::open(DocumentInfo::new("Report", "Ada"), ())?;
/// assembler.append_segment(PageSource::open(Path::new("cover.pdf"))?)?;
/// assembler.mark_segment_boundary(Boundary::CoverEnd)?;
/// assembler.mark_segment_boundary(Boundary::BodyEnd)?;
/// assembler.append_segment(PageSource::open(Path::new("end.pdf"))?)?;
/// let assembled = assembler.close()?;
/// assert_eq!(assembled.page_count, 2);
/// # Ok::<(), pdf_templater::Error>(())
/// ```
pub struct DocumentAssembler<E: PageEvents> {
    output: OutputDocument,
    info: DocumentInfo,
    boundaries: Boundaries,
    events: E,
}

impl<E: PageEvents> DocumentAssembler<E> {
    /// Start an empty US Letter document
    pub fn open(info: DocumentInfo, events: E) -> Result<Self> {
        Self::with_page_size(info, events, PageDimensions::letter())
    }

    pub fn with_page_size(info: DocumentInfo, events: E, page_size: PageDimensions) -> Result<Self> {
        info.validate()?;
        if page_size.width.pt() <= 0.0 || page_size.height.pt() <= 0.0 {
            return Err(Error::Init(format!("invalid page size {:?}", page_size)));
        }
        debug!("Opened output document '{}'", info.title);
        Ok(Self {
            output: OutputDocument::new(page_size),
            info,
            boundaries: Boundaries::new(),
            events,
        })
    }

    /// Pages appended so far
    pub fn page_count(&self) -> u32 {
        self.output.page_count()
    }

    pub fn page_size(&self) -> PageDimensions {
        self.output.page_size
    }

    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    /// Add a shared object (e.g. a font) to the output document
    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.output.doc.add_object(object)
    }

    /// Import every page of `source`, in order
    pub fn append_segment(&mut self, source: PageSource) -> Result<usize> {
        let pages = source.into_pages();
        let name = pages.source_name().to_string();

        // Reserved up front so a link on one page can target a later one
        let segment_pages: HashMap<ObjectId, ObjectId> = pages
            .page_ids()
            .iter()
            .map(|source_id| (*source_id, self.output.doc.new_object_id()))
            .collect();

        let mut appended = 0;
        for handle in pages {
            let page_id = self.output.import_page(handle?, &segment_pages);
            self.complete_page(page_id);
            appended += 1;
        }
        debug!(
            "Appended {} pages from {} (output now {} pages)",
            appended,
            name,
            self.page_count()
        );
        Ok(appended)
    }

    /// Append a freshly rendered page and return its page number
    pub fn push_page(&mut self, content: Vec<u8>, resources: Dictionary) -> Result<u32> {
        let page_id = self.output.add_page(content, resources);
        Ok(self.complete_page(page_id))
    }

    /// Record a segment boundary and return the page number stored.
    ///
    /// `CoverEnd` stores the last page appended so far. `BodyEnd` stores
    /// the page number the end segment is about to start at, so it must be
    /// called before the first end page is appended.
    pub fn mark_segment_boundary(&mut self, kind: Boundary) -> Result<u32> {
        let page = match kind {
            Boundary::CoverEnd => self.page_count(),
            Boundary::BodyEnd => self.page_count() + 1,
        };
        self.boundaries.mark(kind, page)?;
        debug!("Marked {:?} at page {}", kind, page);
        Ok(page)
    }

    fn complete_page(&mut self, page_id: ObjectId) -> u32 {
        self.output.kids.push(page_id);
        let number = self.output.page_count();
        let mut page = CompletedPage {
            number,
            id: page_id,
            boundaries: self.boundaries,
            doc: &mut self.output.doc,
        };
        self.events.on_page_complete(&mut page);
        number
    }

    /// Finalize and serialize the document
    pub fn close(self) -> Result<Assembled<E>> {
        let page_count = self.output.page_count();
        let bytes = self.output.finish(&self.info)?;
        debug!("Closed output document: {} pages, {} bytes", page_count, bytes.len());
        Ok(Assembled {
            bytes,
            page_count,
            boundaries: self.boundaries,
            events: self.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> DocumentInfo {
        DocumentInfo::new("Report", "Hernán")
    }

    #[test]
    fn test_open_requires_title_and_author() {
        assert!(matches!(
            DocumentAssembler::open(DocumentInfo::new("", "a"), ()),
            Err(Error::Init(_))
        ));
        assert!(matches!(
            DocumentAssembler::open(DocumentInfo::new("t", "  "), ()),
            Err(Error::Init(_))
        ));
    }

    #[test]
    fn test_push_page_fires_callback_once_per_page() {
        let mut seen = Vec::new();
        let mut assembler = DocumentAssembler::open(info(), |page: &mut CompletedPage<'_>| {
            seen.push((page.number, page.boundaries.cover_end()));
        })
        .unwrap();

        assembler.push_page(b"% cover".to_vec(), Dictionary::new()).unwrap();
        assembler.mark_segment_boundary(Boundary::CoverEnd).unwrap();
        assembler.push_page(b"% body".to_vec(), Dictionary::new()).unwrap();
        let assembled = assembler.close().unwrap();
        drop(assembled);

        assert_eq!(seen, vec![(1, None), (2, Some(1))]);
    }

    #[test]
    fn test_body_end_is_next_page_number() {
        let mut assembler = DocumentAssembler::open(info(), ()).unwrap();
        assembler.push_page(Vec::new(), Dictionary::new()).unwrap();
        assert_eq!(assembler.mark_segment_boundary(Boundary::CoverEnd).unwrap(), 1);
        assembler.push_page(Vec::new(), Dictionary::new()).unwrap();
        assembler.push_page(Vec::new(), Dictionary::new()).unwrap();
        assert_eq!(assembler.mark_segment_boundary(Boundary::BodyEnd).unwrap(), 4);
    }

    struct RejectingWriter;

    impl Write for RejectingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_finalize_error() {
        let mut output = OutputDocument::new(PageDimensions::letter());
        let page_id = output.add_page(b"0 g".to_vec(), Dictionary::new());
        output.kids.push(page_id);

        let err = output.write_to(&info(), &mut RejectingWriter).unwrap_err();
        assert!(matches!(err, Error::Finalize(ref e) if e.to_string() == "disk full"));
    }

    #[test]
    fn test_close_writes_info_and_page_tree() {
        let mut assembler = DocumentAssembler::open(info(), ()).unwrap();
        assembler.push_page(b"0 g".to_vec(), Dictionary::new()).unwrap();
        assembler.push_page(b"0 g".to_vec(), Dictionary::new()).unwrap();
        let assembled = assembler.close().unwrap();

        assert_eq!(assembled.page_count, 2);
        let doc = Document::load_mem(&assembled.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        let info_id = doc.trailer.get(b"Info").and_then(Object::as_reference).unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Report");
        // Creator falls back to the author
        assert_eq!(info.get(b"Creator").unwrap(), info.get(b"Author").unwrap());
    }
}
