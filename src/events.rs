//! Page-completion hooks
//!
//! The assembler calls [`PageEvents::on_page_complete`] exactly once for
//! every page it appends, synchronously, before the next page starts.

use lopdf::{Document, ObjectId};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pdf::overlay::{OverlayPlacement, OverlayTemplate};
use crate::pdf::source::DocumentSource;
use crate::policy::Boundaries;

/// A page that has just been appended to the output
pub struct CompletedPage<'a> {
    /// 1-based page number in the output document
    pub number: u32,
    /// Page object in the output document
    pub id: ObjectId,
    /// Boundaries recorded so far
    pub boundaries: Boundaries,
    pub(crate) doc: &'a mut Document,
}

impl CompletedPage<'_> {
    /// The output document, for compositing onto this page
    pub fn document(&mut self) -> &mut Document {
        self.doc
    }
}

/// Receives page-completion events from the assembler
pub trait PageEvents {
    fn on_page_complete(&mut self, page: &mut CompletedPage<'_>);
}

impl PageEvents for () {
    fn on_page_complete(&mut self, _page: &mut CompletedPage<'_>) {}
}

impl<F> PageEvents for F
where
    F: FnMut(&mut CompletedPage<'_>),
{
    fn on_page_complete(&mut self, page: &mut CompletedPage<'_>) {
        self(page)
    }
}

/// Draws the overlay template on every page strictly inside the body.
///
/// The template is reloaded for each qualifying page. A page whose
/// template cannot be loaded or drawn is left as is and the failure is
/// recorded.
#[derive(Debug)]
pub struct OverlayCallback {
    template: DocumentSource,
    placement: OverlayPlacement,
    overlaid: Vec<u32>,
    failures: Vec<Error>,
}

impl OverlayCallback {
    pub fn new(template: DocumentSource, placement: OverlayPlacement) -> Self {
        Self {
            template,
            placement,
            overlaid: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Pages that received the overlay, in order
    pub fn overlaid_pages(&self) -> &[u32] {
        &self.overlaid
    }

    /// Recorded [`Error::OverlayLoad`] failures
    pub fn failures(&self) -> &[Error] {
        &self.failures
    }

    pub fn into_outcome(self) -> (Vec<u32>, Vec<Error>) {
        (self.overlaid, self.failures)
    }

    fn apply(&self, page: &mut CompletedPage<'_>) -> Result<()> {
        let template = OverlayTemplate::load(&self.template)?;
        template.composite(page.doc, page.id, self.placement)?;
        Ok(())
    }
}

impl PageEvents for OverlayCallback {
    fn on_page_complete(&mut self, page: &mut CompletedPage<'_>) {
        if !page.boundaries.should_overlay(page.number) {
            return;
        }
        match self.apply(page) {
            Ok(()) => {
                debug!("Overlay {} applied to page {}", self.template, page.number);
                self.overlaid.push(page.number);
            }
            Err(e) => {
                warn!("Overlay skipped on page {}: {}", page.number, e);
                self.failures.push(Error::OverlayLoad {
                    page: page.number,
                    source: Box::new(e),
                });
            }
        }
    }
}
