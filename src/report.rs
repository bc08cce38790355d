//! The full cover → body → end pipeline

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::assembler::{DocumentAssembler, DocumentInfo};
use crate::error::{Error, Result};
use crate::events::OverlayCallback;
use crate::pdf::body::{BodyStyle, ParagraphRenderer, SAMPLE_PARAGRAPH, SAMPLE_REPEAT};
use crate::pdf::overlay::OverlayPlacement;
use crate::pdf::source::{DocumentSource, PageSource};
use crate::policy::{Boundaries, Boundary};

/// Everything needed to assemble one report
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub info: DocumentInfo,
    /// Cover template, filled and flattened before import
    pub cover: DocumentSource,
    /// Values for the cover's form fields, by qualified name
    pub cover_fields: BTreeMap<String, String>,
    /// Appended verbatim after the body
    pub end: DocumentSource,
    /// Template drawn onto every body page
    pub overlay: DocumentSource,
    pub placement: OverlayPlacement,
    /// Body text, one entry per paragraph
    pub paragraphs: Vec<String>,
    pub body_style: BodyStyle,
}

impl ReportOptions {
    /// Options with the sample body: the sample paragraph repeated 150 times
    pub fn new(info: DocumentInfo, cover: DocumentSource, end: DocumentSource, overlay: DocumentSource) -> Self {
        Self {
            info,
            cover,
            cover_fields: BTreeMap::new(),
            end,
            overlay,
            placement: OverlayPlacement::default(),
            paragraphs: vec![SAMPLE_PARAGRAPH.to_string(); SAMPLE_REPEAT],
            body_style: BodyStyle::default(),
        }
    }
}

/// A successfully assembled report
#[derive(Debug)]
pub struct Report {
    /// Serialized PDF
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub cover_pages: u32,
    pub body_pages: u32,
    pub end_pages: u32,
    pub boundaries: Boundaries,
    /// Pages that received the overlay
    pub overlaid_pages: Vec<u32>,
    /// Non-fatal [`Error::OverlayLoad`] failures; the pages they name
    /// carry no overlay
    pub overlay_failures: Vec<Error>,
}

/// Assemble cover, body and end segments into one PDF.
///
/// Any load, fill or serialization failure aborts the whole assembly and
/// no bytes are returned. Overlay failures only cost the affected page its
/// overlay and are reported in [`Report::overlay_failures`].
///
/// # Example
///
/// ```no_run
/// use pdf_templater::assembler::DocumentInfo;
/// use pdf_templater::report::{build_report, ReportOptions};
/// use std::path::PathBuf;
///
/// let mut options = ReportOptions::new(
///     DocumentInfo::new("El título del PDF", "Hernán"),
///     PathBuf::from("Portada.pdf").into(),
///     PathBuf::from("EndPage.pdf").into(),
///     PathBuf::from("TemplateInfo.pdf").into(),
/// );
/// options.cover_fields.insert("employeeName".into(), "Hernán Darío".into());
///
/// let report = build_report(&options)?;
/// std::fs::write("GeneratedReport.pdf", &report.bytes)?;
/// # Ok::<(), pdf_templater::Error>(())
/// ```
pub fn build_report(options: &ReportOptions) -> Result<Report> {
    let events = OverlayCallback::new(options.overlay.clone(), options.placement);
    let mut assembler = DocumentAssembler::open(options.info.clone(), events)?;

    let cover = PageSource::load(&options.cover)?
        .fill_fields(&options.cover_fields)?
        .flatten();
    let cover_pages = assembler.append_segment(cover)? as u32;
    assembler.mark_segment_boundary(Boundary::CoverEnd)?;

    let renderer = ParagraphRenderer::new(options.body_style.clone());
    let body_pages = renderer.render(&mut assembler, &options.paragraphs)?;

    // Captured before the first end page exists
    let end = PageSource::load(&options.end)?;
    assembler.mark_segment_boundary(Boundary::BodyEnd)?;
    let end_pages = assembler.append_segment(end)? as u32;

    let assembled = assembler.close()?;
    let (overlaid_pages, overlay_failures) = assembled.events.into_outcome();

    for failure in &overlay_failures {
        warn!("{}", failure);
    }
    info!(
        "Assembled '{}': {} pages ({} cover, {} body, {} end), {} overlaid",
        options.info.title,
        assembled.page_count,
        cover_pages,
        body_pages,
        end_pages,
        overlaid_pages.len()
    );

    Ok(Report {
        bytes: assembled.bytes,
        page_count: assembled.page_count,
        cover_pages,
        body_pages,
        end_pages,
        boundaries: assembled.boundaries,
        overlaid_pages,
        overlay_failures,
    })
}
