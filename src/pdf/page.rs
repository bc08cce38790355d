//! Page dictionary helpers shared by import, flattening and overlay

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::Result;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, used when a page tree carries no MediaBox at all
pub(crate) const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Clone a page dictionary with inherited attributes copied in and the
/// `Parent` link removed, so it can stand alone in another page tree.
pub(crate) fn detached_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc.get_dictionary(page_id)?.clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Page trees are shallow; the bound only guards against cycles
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if depth > 64 {
            break;
        }
        depth += 1;
        let Ok(parent_dict) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = parent_dict.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = parent_dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    page.remove(b"Parent");
    Ok(page)
}

/// Page rectangle `[llx lly urx ury]`, falling back to US Letter
pub(crate) fn media_box(doc: &Document, page: &Dictionary) -> [f32; 4] {
    let Some(Object::Array(values)) = page.get(b"MediaBox").ok().map(|obj| resolve(doc, obj)) else {
        return DEFAULT_MEDIA_BOX;
    };
    let nums: Vec<f32> = values.iter().filter_map(|v| number(resolve(doc, v))).collect();
    if nums.len() == 4 {
        [nums[0], nums[1], nums[2], nums[3]]
    } else {
        DEFAULT_MEDIA_BOX
    }
}

/// Follow a reference one level, returning the object itself otherwise
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decoded bytes of every content stream on a page, in order
pub(crate) fn page_content(doc: &Document, page: &Dictionary) -> Vec<u8> {
    let mut combined = Vec::new();
    for content_id in content_ids(page) {
        if let Ok(Object::Stream(stream)) = doc.get_object(content_id) {
            let bytes = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            combined.extend_from_slice(&bytes);
            combined.push(b'\n');
        }
    }
    combined
}

fn content_ids(page: &Dictionary) -> Vec<ObjectId> {
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|obj| obj.as_reference().ok())
            .collect(),
        _ => vec![],
    }
}

/// Resources dictionary of a page, dereferenced and cloned
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let page_dict = doc.get_dictionary(page_id)?;
    let resources = match page_dict.get(b"Resources") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(res_id)) => match doc.get_object(*res_id) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    };
    Ok(resources)
}

/// Register `object_id` under a fresh name in the page's `category`
/// resource subdictionary (`XObject`, `Font`, ...) and return the name.
///
/// The page gets its own inline copy of the resources so shared
/// dictionaries on other pages stay untouched.
pub(crate) fn add_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    object_id: ObjectId,
) -> Result<String> {
    let mut resources = page_resources(doc, page_id)?;
    let name = register_resource(doc, &mut resources, category, prefix, object_id);

    let page_dict = doc.get_dictionary_mut(page_id)?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Add `object_id` to a detached resources dictionary under a fresh name
pub(crate) fn register_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &str,
    prefix: &str,
    object_id: ObjectId,
) -> String {
    let mut entries = match resources.get(category.as_bytes()) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    };

    let name = unique_name(&entries, prefix);
    entries.set(name.as_bytes().to_vec(), Object::Reference(object_id));
    resources.set(category, Object::Dictionary(entries));
    name
}

fn unique_name(entries: &Dictionary, prefix: &str) -> String {
    if !entries.has(prefix.as_bytes()) {
        return prefix.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", prefix, n))
        .find(|candidate| !entries.has(candidate.as_bytes()))
        .unwrap_or_else(|| prefix.to_string())
}

/// Append a content stream to a page's Contents (drawn on top)
pub(crate) fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page_dict = doc.get_dictionary_mut(page_id)?;
    let mut contents = existing_contents(page_dict);
    contents.push(Object::Reference(content_id));
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

/// Prepend a content stream to a page's Contents (drawn beneath)
pub(crate) fn prepend_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page_dict = doc.get_dictionary_mut(page_id)?;
    let mut contents = existing_contents(page_dict);
    contents.insert(0, Object::Reference(content_id));
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

/// Wrap the page's existing content in q/Q so any transformation it
/// leaves behind does not leak into streams added afterwards
pub(crate) fn isolate_graphics_state(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    if existing_contents(doc.get_dictionary(page_id)?).is_empty() {
        return Ok(());
    }
    prepend_content(doc, page_id, b"q\n".to_vec())?;
    append_content(doc, page_id, b"\nQ\n".to_vec())
}

pub(crate) fn existing_contents(page_dict: &Dictionary) -> Vec<Object> {
    match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(arr)) => arr.clone(),
        _ => vec![],
    }
}

/// Standard Type1 Helvetica with WinAnsiEncoding (one of the 14 standard
/// PDF fonts, so nothing is embedded)
pub(crate) fn helvetica_font() -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

pub(crate) fn helvetica(doc: &mut Document) -> ObjectId {
    doc.add_object(Object::Dictionary(helvetica_font()))
}

/// Encode text for a WinAnsi font and escape it as a PDF literal string body
pub(crate) fn pdf_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.extend_from_slice(b"\\\\"),
            '(' => out.extend_from_slice(b"\\("),
            ')' => out.extend_from_slice(b"\\)"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\n' => out.extend_from_slice(b"\\n"),
            c if (c as u32) < 0x100 => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Estimate text width for Helvetica
pub(crate) fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    // Average glyph width is roughly half an em
    text.chars().count() as f32 * font_size * 0.5
}
