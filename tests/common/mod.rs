//! Fixture documents built with lopdf, so the tests need no binary files

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_templater::assembler::DocumentInfo;
use pdf_templater::pdf::DocumentSource;
use pdf_templater::ReportOptions;

pub const LETTER: [i64; 4] = [0, 0, 612, 792];

/// Single-page document with the given content and a Helvetica `F1` font
fn single_page(content: &str, annots: impl FnOnce(&mut Document, ObjectId) -> Vec<ObjectId>) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.as_bytes().to_vec()));

    let widgets = annots(&mut doc, page_id);

    let mut page = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        (
            "Resources",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Font",
                Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
            )])),
        ),
    ]);
    if !widgets.is_empty() {
        page.set(
            "Annots",
            Object::Array(widgets.iter().map(|id| Object::Reference(*id)).collect()),
        );
    }
    doc.objects.insert(page_id, Object::Dictionary(page));

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            (
                "MediaBox",
                Object::Array(LETTER.iter().map(|v| Object::Integer(*v)).collect()),
            ),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to save fixture");
    bytes
}

/// Cover page with text fields `employeeName` and `EmployeeLastName`
pub fn cover_pdf() -> Vec<u8> {
    let mut field_ids = Vec::new();
    let mut doc = single_page("BT /F1 24 Tf 72 700 Td (Portada) Tj ET", |doc, page_id| {
        for (name, y) in [("employeeName", 600i64), ("EmployeeLastName", 560)] {
            let id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Annot".to_vec())),
                ("Subtype", Object::Name(b"Widget".to_vec())),
                ("FT", Object::Name(b"Tx".to_vec())),
                ("T", Object::string_literal(name)),
                ("DA", Object::string_literal("/Helv 12 Tf 0 g")),
                (
                    "Rect",
                    Object::Array(vec![
                        Object::Integer(72),
                        Object::Integer(y),
                        Object::Integer(400),
                        Object::Integer(y + 20),
                    ]),
                ),
                ("P", Object::Reference(page_id)),
            ]));
            field_ids.push(id);
        }
        field_ids.clone()
    });

    let acroform_id = doc.add_object(Dictionary::from_iter(vec![(
        "Fields",
        Object::Array(field_ids.iter().map(|id| Object::Reference(*id)).collect()),
    )]));
    let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
    doc.get_dictionary_mut(catalog_id)
        .unwrap()
        .set("AcroForm", Object::Reference(acroform_id));
    save(doc)
}

pub fn end_pdf() -> Vec<u8> {
    save(single_page("BT /F1 24 Tf 72 400 Td (Fin del reporte) Tj ET", |_, _| Vec::new()))
}

/// Two-page end document whose first page links to the second, once by
/// `/Dest` and once through a `/GoTo` action
pub fn linked_end_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let first_id = doc.new_object_id();
    let second_id = doc.new_object_id();

    let dest = Object::Array(vec![Object::Reference(second_id), Object::Name(b"Fit".to_vec())]);
    let rect = |y: i64| {
        Object::Array(vec![
            Object::Integer(72),
            Object::Integer(y),
            Object::Integer(300),
            Object::Integer(y + 20),
        ])
    };
    let dest_link = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        ("Rect", rect(400)),
        ("Dest", dest.clone()),
    ]));
    let action_link = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        ("Rect", rect(360)),
        (
            "A",
            Object::Dictionary(Dictionary::from_iter(vec![
                ("S", Object::Name(b"GoTo".to_vec())),
                ("D", dest),
            ])),
        ),
    ]));

    for (page_id, text, annots) in [
        (first_id, "(Ver anexo) Tj", vec![dest_link, action_link]),
        (second_id, "(Anexo) Tj", vec![]),
    ] {
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            format!("BT /F1 12 Tf 72 700 Td {} ET", text).into_bytes(),
        ));
        let mut page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]);
        if !annots.is_empty() {
            page.set(
                "Annots",
                Object::Array(annots.iter().map(|id| Object::Reference(*id)).collect()),
            );
        }
        doc.objects.insert(page_id, Object::Dictionary(page));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(2)),
            (
                "Kids",
                Object::Array(vec![Object::Reference(first_id), Object::Reference(second_id)]),
            ),
            (
                "MediaBox",
                Object::Array(LETTER.iter().map(|v| Object::Integer(*v)).collect()),
            ),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    save(doc)
}

/// Page dictionaries anywhere in the document, in the page tree or not
pub fn page_object_count(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|object| {
            matches!(
                object.as_dict().and_then(|d| d.get(b"Type")),
                Ok(Object::Name(name)) if name == b"Page"
            )
        })
        .count()
}

/// Letterhead frame used as the overlay
pub fn overlay_pdf() -> Vec<u8> {
    save(single_page(
        "0 0 1 RG 2 w 20 20 572 752 re S BT /F1 8 Tf 30 30 Td (Template) Tj ET",
        |_, _| Vec::new(),
    ))
}

pub fn options(paragraphs: usize) -> ReportOptions {
    let mut options = ReportOptions::new(
        DocumentInfo::new("El título del PDF", "Hernán"),
        DocumentSource::bytes("Portada.pdf", cover_pdf()),
        DocumentSource::bytes("EndPage.pdf", end_pdf()),
        DocumentSource::bytes("TemplateInfo.pdf", overlay_pdf()),
    );
    options.cover_fields.insert("employeeName".into(), "Hernán Darío".into());
    options.cover_fields.insert("EmployeeLastName".into(), "Torres".into());
    options.paragraphs.truncate(paragraphs);
    options
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Names in the page's XObject resources
pub fn xobject_names(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let page = doc.get_dictionary(page_id).unwrap();
    let Ok(resources) = page.get(b"Resources").map(|r| resolve(doc, r)) else {
        return Vec::new();
    };
    let Ok(xobjects) = resources
        .as_dict()
        .and_then(|r| r.get(b"XObject"))
        .map(|x| resolve(doc, x))
        .and_then(Object::as_dict)
    else {
        return Vec::new();
    };
    xobjects
        .iter()
        .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
        .collect()
}

pub fn overlay_count(doc: &Document, page_id: ObjectId) -> usize {
    xobject_names(doc, page_id)
        .iter()
        .filter(|name| name.starts_with("Overlay"))
        .count()
}

/// Decoded content of every stream on the page, concatenated
pub fn page_text(doc: &Document, page_id: ObjectId) -> String {
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}
