//! Copying object graphs between lopdf documents

use std::collections::{BTreeMap, BTreeSet, HashMap};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Keys never followed while collecting a page's objects.
///
/// `Parent` leads back into the source page tree (or a form field
/// hierarchy) and would drag the whole source document along.
const SKIPPED_KEYS: &[&[u8]] = &[b"Parent"];

/// Collect every indirect object reachable from `root`, without entering
/// the objects in `excluded`
///
/// References to excluded objects (typically the source's pages) are left
/// for the caller to map. Dangling references are ignored here;
/// `renumber_object_references` turns them into `null` once the id map is
/// built.
pub(crate) fn collect_objects(
    doc: &Document,
    root: &Object,
    excluded: &BTreeSet<ObjectId>,
) -> BTreeMap<ObjectId, Object> {
    let mut objects = BTreeMap::new();
    let mut pending: Vec<ObjectId> = Vec::new();
    push_references(root, &mut pending);

    while let Some(id) = pending.pop() {
        if objects.contains_key(&id) || excluded.contains(&id) {
            continue;
        }
        if let Ok(object) = doc.get_object(id) {
            push_references(object, &mut pending);
            objects.insert(id, object.clone());
        }
    }

    objects
}

fn push_references(object: &Object, pending: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => pending.push(*id),
        Object::Array(arr) => arr.iter().for_each(|obj| push_references(obj, pending)),
        Object::Dictionary(dict) => push_dictionary_references(dict, pending),
        Object::Stream(stream) => push_dictionary_references(&stream.dict, pending),
        _ => {}
    }
}

fn push_dictionary_references(dict: &Dictionary, pending: &mut Vec<ObjectId>) {
    for (key, value) in dict.iter() {
        if SKIPPED_KEYS.contains(&key.as_slice()) {
            continue;
        }
        push_references(value, pending);
    }
}

/// Insert `objects` into `target` under fresh ids
///
/// `id_map` may already hold mappings (e.g. the source page id to the new
/// page id); the returned map extends it with every inserted object.
pub(crate) fn import_objects(
    target: &mut Document,
    objects: BTreeMap<ObjectId, Object>,
    mut id_map: HashMap<ObjectId, ObjectId>,
) -> HashMap<ObjectId, ObjectId> {
    // Allocate all ids first so forward references resolve
    for old_id in objects.keys() {
        if !id_map.contains_key(old_id) {
            id_map.insert(*old_id, target.new_object_id());
        }
    }

    for (old_id, object) in objects.iter() {
        let new_id = id_map[old_id];
        target
            .objects
            .insert(new_id, renumber_object_references(object, &id_map));
    }

    id_map
}

/// Renumber all object references in an object
///
/// References with no entry in `id_map` point outside the copied graph and
/// become `null`.
pub(crate) fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => match id_map.get(old_id) {
            Some(new_id) => Object::Reference(*new_id),
            None => Object::Null,
        },
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => Object::Stream(lopdf::Stream {
            dict: renumber_dictionary(&stream.dict, id_map),
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: stream.start_position,
        }),
        _ => object.clone(),
    }
}

pub(crate) fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}
