//! Integration tests for the report pipeline

mod common;

use common::{options, overlay_count, page_text};
use lopdf::{Document, Object};
use pdf_templater::assembler::{DocumentAssembler, DocumentInfo};
use pdf_templater::config::load_options;
use pdf_templater::events::OverlayCallback;
use pdf_templater::pdf::{
    extract_metadata_from_bytes, DocumentSource, OverlayPlacement, PageSource,
};
use pdf_templater::policy::Boundary;
use pdf_templater::{build_report, Error};
use tempfile::TempDir;

fn load(bytes: &[u8]) -> Document {
    Document::load_mem(bytes).expect("Output is not a readable PDF")
}

#[test]
fn test_sample_report_layout() {
    // 150 one-line sample paragraphs at 43 lines per page fill 4 body pages
    let report = build_report(&options(150)).expect("Failed to assemble report");

    assert_eq!(report.cover_pages, 1);
    assert_eq!(report.body_pages, 4);
    assert_eq!(report.end_pages, 1);
    assert_eq!(report.page_count, 6);
    assert_eq!(report.boundaries.cover_end(), Some(1));
    assert_eq!(report.boundaries.body_end(), Some(6));
    assert_eq!(report.overlaid_pages, vec![2, 3, 4, 5]);
    assert!(report.overlay_failures.is_empty());

    let doc = load(&report.bytes);
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 6);
    for (number, page_id) in pages {
        let expected = if (2..=5).contains(&number) { 1 } else { 0 };
        assert_eq!(
            overlay_count(&doc, page_id),
            expected,
            "unexpected overlay count on page {}",
            number
        );
    }
}

#[test]
fn test_cover_is_filled_and_flattened() {
    let report = build_report(&options(150)).unwrap();
    let doc = load(&report.bytes);
    let cover_id = doc.get_pages()[&1];

    let cover_text = page_text(&doc, cover_id);
    assert!(cover_text.contains("Portada"));
    assert!(cover_text.contains("(Torres) Tj"));

    let cover = doc.get_dictionary(cover_id).unwrap();
    assert!(!cover.has(b"Annots"), "widgets should be flattened away");
    assert!(!doc.catalog().unwrap().has(b"AcroForm"));
}

#[test]
fn test_end_page_appended_verbatim() {
    let report = build_report(&options(150)).unwrap();
    let doc = load(&report.bytes);
    let end_id = doc.get_pages()[&6];

    assert!(page_text(&doc, end_id).contains("(Fin del reporte) Tj"));
    assert_eq!(overlay_count(&doc, end_id), 0);
}

#[test]
fn test_page_conservation() {
    for paragraphs in [0, 1, 43, 44, 150] {
        let report = build_report(&options(paragraphs)).unwrap();
        assert_eq!(
            report.page_count,
            report.cover_pages + report.body_pages + report.end_pages
        );
        assert_eq!(load(&report.bytes).get_pages().len() as u32, report.page_count);
        assert_eq!(report.overlaid_pages.len() as u32, report.body_pages);
    }
}

#[test]
fn test_empty_body() {
    let report = build_report(&options(0)).unwrap();

    assert_eq!(report.page_count, 2);
    assert_eq!(report.body_pages, 0);
    assert_eq!(report.boundaries.cover_end(), Some(1));
    assert_eq!(report.boundaries.body_end(), Some(2));
    assert!(report.overlaid_pages.is_empty());
}

#[test]
fn test_missing_cover_field_aborts() {
    let mut options = options(150);
    options.cover_fields.insert("employeeAge".into(), "42".into());

    let err = build_report(&options).unwrap_err();
    assert!(err.is_fill_error());
    assert!(matches!(err, Error::FieldNotFound { ref field, .. } if field == "employeeAge"));
}

#[test]
fn test_missing_cover_aborts() {
    let mut options = options(150);
    options.cover = DocumentSource::Path("does/not/exist/Portada.pdf".into());

    let err = build_report(&options).unwrap_err();
    assert!(err.is_load_error());
}

#[test]
fn test_corrupt_end_page_aborts() {
    let mut options = options(150);
    options.end = DocumentSource::bytes("EndPage.pdf", b"%PDF-1.5 garbage".to_vec());

    assert!(build_report(&options).unwrap_err().is_load_error());
}

#[test]
fn test_links_between_end_pages_target_output_pages() {
    let mut options = options(150);
    options.end = DocumentSource::bytes("EndPage.pdf", common::linked_end_pdf());

    let report = build_report(&options).unwrap();
    assert_eq!(report.page_count, 7);
    assert_eq!(report.end_pages, 2);

    let doc = load(&report.bytes);
    let pages = doc.get_pages();
    assert_eq!(common::page_object_count(&doc), pages.len());

    let annex_id = pages[&7];
    assert!(page_text(&doc, annex_id).contains("(Anexo) Tj"));

    let links: Vec<&lopdf::Dictionary> = doc
        .get_dictionary(pages[&6])
        .unwrap()
        .get(b"Annots")
        .and_then(Object::as_array)
        .unwrap()
        .iter()
        .map(|annot| doc.get_dictionary(annot.as_reference().unwrap()).unwrap())
        .collect();
    assert_eq!(links.len(), 2);

    let dest = links[0].get(b"Dest").and_then(Object::as_array).unwrap();
    assert_eq!(dest[0], Object::Reference(annex_id));

    let action_dest = links[1]
        .get(b"A")
        .and_then(Object::as_dict)
        .and_then(|action| action.get(b"D"))
        .and_then(Object::as_array)
        .unwrap();
    assert_eq!(action_dest[0], Object::Reference(annex_id));

    for number in [6, 7] {
        assert_eq!(overlay_count(&doc, pages[&number]), 0);
    }
}

#[test]
fn test_missing_overlay_still_completes() {
    let mut options = options(150);
    options.overlay = DocumentSource::Path("does/not/exist/TemplateInfo.pdf".into());

    let report = build_report(&options).expect("Overlay failures must not abort");
    assert_eq!(report.page_count, 6);
    assert!(report.overlaid_pages.is_empty());
    assert_eq!(report.overlay_failures.len(), 4);

    let failed: Vec<u32> = report
        .overlay_failures
        .iter()
        .map(|e| match e {
            Error::OverlayLoad { page, .. } => *page,
            other => panic!("unexpected failure {:?}", other),
        })
        .collect();
    assert_eq!(failed, vec![2, 3, 4, 5]);

    let doc = load(&report.bytes);
    for (_, page_id) in doc.get_pages() {
        assert_eq!(overlay_count(&doc, page_id), 0);
    }
}

#[test]
fn test_background_placement() {
    let mut options = options(150);
    options.placement = OverlayPlacement::Background;

    let report = build_report(&options).unwrap();
    let doc = load(&report.bytes);
    let body_id = doc.get_pages()[&2];

    let text = page_text(&doc, body_id);
    let overlay_at = text.find("/Overlay Do").expect("overlay not drawn");
    let body_at = text.find("BT").expect("body text missing");
    assert!(overlay_at < body_at);
}

#[test]
fn test_metadata_written() {
    let report = build_report(&options(150)).unwrap();
    let metadata = extract_metadata_from_bytes(&report.bytes).unwrap();

    assert_eq!(metadata.page_count, 6);
    assert_eq!(metadata.title.as_deref(), Some("El título del PDF"));
    assert_eq!(metadata.author.as_deref(), Some("Hernán"));
    assert_eq!(metadata.creator.as_deref(), Some("Hernán"));
}

#[test]
fn test_multi_page_end_segment_never_overlaid() {
    // The first end page sits exactly on BodyEnd
    let mut assembler = DocumentAssembler::open(
        DocumentInfo::new("t", "a"),
        OverlayCallback::new(
            DocumentSource::bytes("TemplateInfo.pdf", common::overlay_pdf()),
            OverlayPlacement::Foreground,
        ),
    )
    .unwrap();

    assembler
        .append_segment(PageSource::from_bytes("cover", common::end_pdf()).unwrap())
        .unwrap();
    assembler.mark_segment_boundary(Boundary::CoverEnd).unwrap();
    assembler
        .append_segment(PageSource::from_bytes("body", common::end_pdf()).unwrap())
        .unwrap();
    assert_eq!(assembler.mark_segment_boundary(Boundary::BodyEnd).unwrap(), 3);
    for _ in 0..2 {
        assembler
            .append_segment(PageSource::from_bytes("end", common::end_pdf()).unwrap())
            .unwrap();
    }

    let assembled = assembler.close().unwrap();
    assert_eq!(assembled.page_count, 4);
    assert_eq!(assembled.events.overlaid_pages(), &[2]);
}

#[test]
fn test_boundary_misuse_rejected() {
    let mut assembler = DocumentAssembler::open(DocumentInfo::new("t", "a"), ()).unwrap();
    assert!(matches!(
        assembler.mark_segment_boundary(Boundary::BodyEnd),
        Err(Error::Boundary { kind: Boundary::BodyEnd, .. })
    ));
    assembler.mark_segment_boundary(Boundary::CoverEnd).unwrap();
    assert!(assembler.mark_segment_boundary(Boundary::CoverEnd).is_err());
}

#[test]
fn test_config_file_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    std::fs::write(temp_dir.path().join("Portada.pdf"), common::cover_pdf()).unwrap();
    std::fs::write(temp_dir.path().join("EndPage.pdf"), common::end_pdf()).unwrap();
    std::fs::write(temp_dir.path().join("TemplateInfo.pdf"), common::overlay_pdf()).unwrap();

    let config_path = temp_dir.path().join("report.toml");
    std::fs::write(
        &config_path,
        r#"
[document]
title = "Informe"
author = "Hernán"
creator = "pdf-templater tests"

[segments]
cover = "Portada.pdf"
end = "EndPage.pdf"
overlay = "TemplateInfo.pdf"

[cover_fields]
employeeName = "Hernán Darío"

[body]
paragraphs = ["Primer párrafo", "Segundo párrafo"]
"#,
    )
    .unwrap();

    let options = load_options(&config_path).unwrap();
    let report = build_report(&options).unwrap();

    assert_eq!(report.page_count, 3);
    assert_eq!(report.overlaid_pages, vec![2]);

    let doc = load(&report.bytes);
    let info_id = doc.trailer.get(b"Info").and_then(Object::as_reference).unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    assert_eq!(info.get(b"Creator").unwrap().as_str().unwrap(), b"pdf-templater tests");
}
