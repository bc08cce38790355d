//! AcroForm field filling and flattening

use std::collections::{BTreeMap, HashMap};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pdf::page::{
    add_page_resource, append_content, estimate_text_width, isolate_graphics_state, number,
    pdf_literal, resolve,
};

/// Annotation flag bit for hidden annotations
const HIDDEN_FLAG: i64 = 1 << 1;

/// Appearance state of an unselected button
const OFF_STATE: &str = "Off";

/// Font size used when the default appearance asks for auto sizing
const MAX_AUTO_FONT_SIZE: f32 = 12.0;

/// Terminal form field with the attributes it inherits from its ancestors
#[derive(Debug, Clone)]
pub struct FormField {
    /// Fully qualified name (`parent.child`)
    pub name: String,
    /// Field type (`Tx`, `Btn`, `Ch`, `Sig`)
    pub field_type: Option<String>,
    /// Current value, decoded
    pub value: Option<String>,
    id: ObjectId,
    default_appearance: Option<String>,
    alignment: i64,
    widgets: Vec<ObjectId>,
}

#[derive(Clone, Default)]
struct Inherited {
    field_type: Option<String>,
    value: Option<Object>,
    default_appearance: Option<String>,
    alignment: i64,
}

/// List the terminal fields of the document's interactive form.
///
/// Returns `None` when the document has no form.
pub fn form_fields(doc: &Document) -> Option<Vec<FormField>> {
    let acroform = acroform(doc)?;
    let fields = resolve(doc, acroform.get(b"Fields").ok()?).as_array().ok()?;

    let inherited = Inherited {
        default_appearance: acroform
            .get(b"DA")
            .ok()
            .and_then(|da| decode_text(resolve(doc, da))),
        alignment: acroform.get(b"Q").and_then(Object::as_i64).unwrap_or(0),
        ..Inherited::default()
    };

    let mut out = Vec::new();
    for field in fields {
        if let Ok(id) = field.as_reference() {
            walk_field(doc, id, None, &inherited, &mut out, 0);
        }
    }
    Some(out)
}

fn walk_field(
    doc: &Document,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited: &Inherited,
    out: &mut Vec<FormField>,
    depth: usize,
) {
    // Field trees are shallow; the bound only guards against cycles
    if depth > 32 {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        warn!("Skipping unreadable form field {:?}", id);
        return;
    };

    let partial = dict.get(b"T").ok().and_then(|t| decode_text(resolve(doc, t)));
    let name = match (parent_name, partial) {
        (Some(parent), Some(partial)) => format!("{}.{}", parent, partial),
        (None, Some(partial)) => partial,
        (Some(parent), None) => parent.to_string(),
        (None, None) => return,
    };

    let mut own = inherited.clone();
    if let Ok(Object::Name(ft)) = dict.get(b"FT") {
        own.field_type = Some(String::from_utf8_lossy(ft).into_owned());
    }
    if let Ok(value) = dict.get(b"V") {
        own.value = Some(resolve(doc, value).clone());
    }
    if let Some(da) = dict.get(b"DA").ok().and_then(|da| decode_text(resolve(doc, da))) {
        own.default_appearance = Some(da);
    }
    if let Ok(q) = dict.get(b"Q").and_then(Object::as_i64) {
        own.alignment = q;
    }

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|kids| resolve(doc, kids).as_array().ok())
        .map(|kids| kids.iter().filter_map(|k| k.as_reference().ok()).collect())
        .unwrap_or_default();

    let mut widgets = Vec::new();
    let mut has_child_fields = false;
    for kid in &kids {
        let is_field = doc
            .get_dictionary(*kid)
            .map(|kid_dict| kid_dict.has(b"T"))
            .unwrap_or(false);
        if is_field {
            has_child_fields = true;
            walk_field(doc, *kid, Some(name.as_str()), &own, out, depth + 1);
        } else {
            widgets.push(*kid);
        }
    }

    if kids.is_empty() {
        // Field and widget merged into one dictionary
        widgets.push(id);
    }

    if !has_child_fields || !widgets.is_empty() {
        out.push(FormField {
            name,
            field_type: own.field_type,
            value: own.value.as_ref().and_then(value_text),
            id,
            default_appearance: own.default_appearance,
            alignment: own.alignment,
            widgets,
        });
    }
}

/// Set field values by fully qualified name.
///
/// Every name must exist; a missing one fails the whole fill.
pub(crate) fn fill_fields(
    doc: &mut Document,
    origin: &str,
    values: &BTreeMap<String, String>,
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    let fields = form_fields(doc).ok_or_else(|| Error::NoForm(origin.to_string()))?;

    // Validate every value before the document is touched
    let mut targets = Vec::with_capacity(values.len());
    for (name, value) in values {
        let field = fields
            .iter()
            .find(|field| field.name == *name)
            .ok_or_else(|| Error::FieldNotFound {
                origin: origin.to_string(),
                field: name.clone(),
            })?;
        if field.field_type.as_deref() == Some("Btn")
            && value != OFF_STATE
            && !field.widgets.iter().any(|w| has_state(doc, *w, value))
        {
            return Err(Error::InvalidFieldValue {
                origin: origin.to_string(),
                field: name.clone(),
                value: value.clone(),
            });
        }
        targets.push((field.clone(), value));
    }

    for (field, value) in targets {
        if field.field_type.as_deref() == Some("Btn") {
            set_button_state(doc, &field, value)?;
        } else {
            doc.get_dictionary_mut(field.id)?
                .set("V", Object::String(encode_text(value), StringFormat::Literal));
            // Stale appearances would hide the new value in viewers
            for widget_id in &field.widgets {
                if let Ok(widget) = doc.get_dictionary_mut(*widget_id) {
                    widget.remove(b"AP");
                }
            }
        }
        debug!("Filled field {} in {}", field.name, origin);
    }

    if let Some(acroform_id) = acroform_reference(doc) {
        doc.get_dictionary_mut(acroform_id)?
            .set("NeedAppearances", Object::Boolean(true));
    } else if let Some(catalog_id) = root_id(doc) {
        if let Ok(Object::Dictionary(acroform)) = doc.get_dictionary_mut(catalog_id)?.get_mut(b"AcroForm") {
            acroform.set("NeedAppearances", Object::Boolean(true));
        }
    }

    Ok(())
}

/// Select `state` on a check box or radio group.
///
/// Widgets that have an appearance for `state` switch to it, the rest
/// turn off. Appearances are kept since they are what flattening draws.
fn set_button_state(doc: &mut Document, field: &FormField, state: &str) -> Result<()> {
    doc.get_dictionary_mut(field.id)?
        .set("V", Object::Name(state.as_bytes().to_vec()));

    for widget_id in &field.widgets {
        let appearance = if has_state(doc, *widget_id, state) {
            state
        } else {
            OFF_STATE
        };
        if let Ok(widget) = doc.get_dictionary_mut(*widget_id) {
            widget.set("AS", Object::Name(appearance.as_bytes().to_vec()));
        }
    }
    Ok(())
}

/// Whether the widget has a normal appearance (`/AP /N`) for `state`
fn has_state(doc: &Document, widget_id: ObjectId, state: &str) -> bool {
    doc.get_dictionary(widget_id)
        .ok()
        .and_then(|widget| widget.get(b"AP").ok())
        .and_then(|ap| resolve(doc, ap).as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|normal| resolve(doc, normal).as_dict().ok())
        .is_some_and(|states| states.has(state.as_bytes()))
}

/// Draw every widget onto its page and drop the interactive form.
///
/// Widgets that cannot be drawn are skipped with a warning.
pub(crate) fn flatten(doc: &mut Document, origin: &str) {
    let Some(fields) = form_fields(doc) else {
        debug!("{} has no form to flatten", origin);
        return;
    };

    let mut widget_fields: HashMap<ObjectId, &FormField> = HashMap::new();
    for field in &fields {
        for widget in &field.widgets {
            widget_fields.insert(*widget, field);
        }
    }

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in pages {
        if let Err(e) = flatten_page(doc, page_id, &widget_fields) {
            warn!("Failed to flatten page {:?} of {}: {}", page_id, origin, e);
        }
    }

    if let Some(catalog_id) = root_id(doc) {
        if let Ok(catalog) = doc.get_dictionary_mut(catalog_id) {
            catalog.remove(b"AcroForm");
        }
    }
    debug!("Flattened {} form fields in {}", fields.len(), origin);
}

fn flatten_page(
    doc: &mut Document,
    page_id: ObjectId,
    widget_fields: &HashMap<ObjectId, &FormField>,
) -> Result<()> {
    let annots: Vec<Object> = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Annots") {
            Ok(annots) => resolve(doc, annots).as_array().cloned().unwrap_or_default(),
            Err(_) => return Ok(()),
        }
    };

    let mut kept = Vec::new();
    let mut content = Vec::new();
    let mut font_name: Option<String> = None;

    for annot in annots {
        let widget_id = annot.as_reference().ok();
        let widget = match &annot {
            Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
            Object::Dictionary(dict) => Some(dict.clone()),
            _ => None,
        };
        let Some(widget) = widget else {
            kept.push(annot);
            continue;
        };
        let is_widget = matches!(widget.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Widget");
        if !is_widget {
            kept.push(annot);
            continue;
        }

        let field = widget_id.and_then(|id| widget_fields.get(&id).copied());
        match draw_widget(doc, page_id, &widget, field, &mut font_name) {
            Ok(ops) => content.extend(ops),
            Err(e) => warn!("Skipping widget on page {:?}: {}", page_id, e),
        }
    }

    let page = doc.get_dictionary_mut(page_id)?;
    if kept.is_empty() {
        page.remove(b"Annots");
    } else {
        page.set("Annots", Object::Array(kept));
    }

    if !content.is_empty() {
        isolate_graphics_state(doc, page_id)?;
        append_content(doc, page_id, content)?;
    }
    Ok(())
}

/// Content stream operators reproducing one widget
fn draw_widget(
    doc: &mut Document,
    page_id: ObjectId,
    widget: &Dictionary,
    field: Option<&FormField>,
    font_name: &mut Option<String>,
) -> Result<Vec<u8>> {
    let flags = widget.get(b"F").and_then(Object::as_i64).unwrap_or(0);
    if flags & HIDDEN_FLAG != 0 {
        return Ok(Vec::new());
    }
    let rect = widget_rect(doc, widget)
        .ok_or_else(|| Error::General("widget has no usable Rect".to_string()))?;

    let text = field
        .filter(|f| matches!(f.field_type.as_deref(), Some("Tx") | Some("Ch")))
        .and_then(|f| f.value.as_deref().map(|value| (f, value)));

    if let Some((field, value)) = text {
        let name = match font_name {
            Some(name) => name.clone(),
            None => {
                let font_id = crate::pdf::page::helvetica(doc);
                let name = add_page_resource(doc, page_id, "Font", "FlatF", font_id)?;
                *font_name = Some(name.clone());
                name
            }
        };
        return Ok(text_operations(&name, value, rect, field));
    }

    match appearance_stream(doc, widget) {
        Some(ap_id) => {
            let name = add_page_resource(doc, page_id, "XObject", "FlatAp", ap_id)?;
            Ok(format!("q\n1 0 0 1 {} {} cm\n/{} Do\nQ\n", rect[0], rect[1], name).into_bytes())
        }
        None => Ok(Vec::new()),
    }
}

fn text_operations(font_name: &str, value: &str, rect: [f32; 4], field: &FormField) -> Vec<u8> {
    let width = rect[2] - rect[0];
    let height = rect[3] - rect[1];
    let size = match field.default_appearance.as_deref().and_then(font_size) {
        Some(size) if size > 0.0 => size,
        _ => (height * 0.7).clamp(4.0, MAX_AUTO_FONT_SIZE),
    };

    let text_width = estimate_text_width(value, size);
    let x = match field.alignment {
        1 => rect[0] + (width - text_width) / 2.0,
        2 => rect[2] - 2.0 - text_width,
        _ => rect[0] + 2.0,
    };
    // Vertically centre the baseline, allowing for descenders
    let y = rect[1] + (height - size) / 2.0 + size * 0.22;

    let mut ops = Vec::new();
    ops.extend_from_slice(b"q\nBT\n0 g\n");
    ops.extend_from_slice(format!("/{} {} Tf\n{} {} Td\n(", font_name, size, x, y).as_bytes());
    ops.extend(pdf_literal(value));
    ops.extend_from_slice(b") Tj\nET\nQ\n");
    ops
}

/// Font size operand of the `Tf` operator in a default appearance string
fn font_size(default_appearance: &str) -> Option<f32> {
    let tokens: Vec<&str> = default_appearance.split_whitespace().collect();
    let tf = tokens.iter().position(|t| *t == "Tf")?;
    tokens.get(tf.checked_sub(1)?)?.parse().ok()
}

fn widget_rect(doc: &Document, widget: &Dictionary) -> Option<[f32; 4]> {
    let values = resolve(doc, widget.get(b"Rect").ok()?).as_array().ok()?;
    let nums: Vec<f32> = values.iter().filter_map(|v| number(resolve(doc, v))).collect();
    if nums.len() != 4 {
        return None;
    }
    Some([
        nums[0].min(nums[2]),
        nums[1].min(nums[3]),
        nums[0].max(nums[2]),
        nums[1].max(nums[3]),
    ])
}

/// Normal appearance stream, choosing the `/AS` state for buttons
fn appearance_stream(doc: &Document, widget: &Dictionary) -> Option<ObjectId> {
    let ap = resolve(doc, widget.get(b"AP").ok()?).as_dict().ok()?;
    let normal = ap.get(b"N").ok()?;
    if let Ok(id) = normal.as_reference() {
        if matches!(doc.get_object(id), Ok(Object::Stream(_))) {
            return Some(id);
        }
    }
    let states = resolve(doc, normal).as_dict().ok()?;
    let state = widget.get(b"AS").and_then(Object::as_name).ok()?;
    states.get(state).and_then(Object::as_reference).ok()
}

fn root_id(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Root").and_then(Object::as_reference).ok()
}

fn acroform_reference(doc: &Document) -> Option<ObjectId> {
    let catalog = doc.get_dictionary(root_id(doc)?).ok()?;
    catalog.get(b"AcroForm").and_then(Object::as_reference).ok()
}

fn acroform(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_dictionary(root_id(doc)?).ok()?;
    resolve(doc, catalog.get(b"AcroForm").ok()?).as_dict().ok()
}

fn value_text(value: &Object) -> Option<String> {
    match value {
        Object::Array(items) => items.first().and_then(decode_text),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        other => decode_text(other),
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise Latin-1)
pub(crate) fn decode_text(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Some(String::from_utf16_lossy(&units))
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

/// Encode a PDF text string, Latin-1 when possible
pub(crate) fn encode_text(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) < 0x100) {
        return text.chars().map(|c| c as u32 as u8).collect();
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}
