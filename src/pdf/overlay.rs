//! Compositing a template page onto report pages
//!
//! The template's first page is turned into a Form XObject inside the
//! target document and drawn at the page origin, so a template with the
//! same page size covers the whole page.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pdf::import::{collect_objects, import_objects, renumber_object_references};
use crate::pdf::page::{
    detached_page, existing_contents, media_box, page_content, page_resources, register_resource,
};
use crate::pdf::source::DocumentSource;

/// Resource name prefix for the template XObject on each page
pub const OVERLAY_RESOURCE: &str = "Overlay";

/// Where the template is drawn relative to the page's own content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPlacement {
    /// On top of the page content (watermark)
    #[default]
    Foreground,
    /// Beneath the page content (letterhead background)
    Background,
}

/// The first page of a template document, detached from its source
#[derive(Debug)]
pub struct OverlayTemplate {
    name: String,
    content: Vec<u8>,
    resources: Object,
    bbox: [f32; 4],
    objects: BTreeMap<ObjectId, Object>,
}

impl OverlayTemplate {
    pub fn load(source: &DocumentSource) -> Result<Self> {
        let doc = source.load_document()?;
        let (_, page_id) = doc
            .get_pages()
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmptyPdf(source.to_string()))?;

        let page = detached_page(&doc, page_id)?;
        let pages: BTreeSet<ObjectId> = doc.get_pages().into_values().collect();
        let resources = page
            .get(b"Resources")
            .cloned()
            .unwrap_or_else(|_| Object::Dictionary(Dictionary::new()));

        Ok(Self {
            name: source.to_string(),
            content: page_content(&doc, &page),
            objects: collect_objects(&doc, &resources, &pages),
            bbox: media_box(&doc, &page),
            resources,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Import the template into `doc` and draw it on `page_id`.
    ///
    /// Returns the resource name the template was registered under. On
    /// error the page is left exactly as it was.
    pub fn composite(
        self,
        doc: &mut Document,
        page_id: ObjectId,
        placement: OverlayPlacement,
    ) -> Result<String> {
        let mut resources = page_resources(doc, page_id)?;
        let contents = existing_contents(doc.get_dictionary(page_id)?);

        let id_map = import_objects(doc, self.objects, HashMap::new());
        let template_resources = renumber_object_references(&self.resources, &id_map);

        let mut xobject_dict = Dictionary::new();
        xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
        xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        xobject_dict.set("FormType", Object::Integer(1));
        xobject_dict.set(
            "BBox",
            Object::Array(self.bbox.iter().map(|v| Object::Real(*v)).collect()),
        );
        xobject_dict.set(
            "Matrix",
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
            ]),
        );
        xobject_dict.set("Resources", template_resources);

        let xobject_id = doc.add_object(Object::Stream(Stream::new(xobject_dict, self.content)));
        let name = register_resource(doc, &mut resources, "XObject", OVERLAY_RESOURCE, xobject_id);
        let invoke = content_stream(doc, format!("q\n/{} Do\nQ\n", name).into_bytes());

        let layers: Vec<Object> = match placement {
            OverlayPlacement::Foreground if contents.is_empty() => vec![invoke],
            OverlayPlacement::Foreground => {
                // Keep the page's own graphics state from leaking into the overlay
                let open = content_stream(doc, b"q\n".to_vec());
                let close = content_stream(doc, b"\nQ\n".to_vec());
                std::iter::once(open)
                    .chain(contents)
                    .chain([close, invoke])
                    .collect()
            }
            OverlayPlacement::Background => std::iter::once(invoke).chain(contents).collect(),
        };

        let page = doc.get_dictionary_mut(page_id)?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(layers));

        Ok(name)
    }
}

fn content_stream(doc: &mut Document, content: Vec<u8>) -> Object {
    Object::Reference(doc.add_object(Stream::new(Dictionary::new(), content)))
}
