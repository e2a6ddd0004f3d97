//! Bookmarks (outline) of the merged document
//!
//! The merged outline is built from two kinds of entries: new bookmarks
//! marking where each source file starts, and the top-level items of each
//! source file's own outline, carried over with their subtrees intact.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::pdf::metadata::resolve_dict;

/// Encode a bookmark title as a PDF text string
///
/// ASCII titles are stored as-is; anything else becomes UTF-16BE with a BOM.
pub fn text_string(title: &str) -> Object {
    if title.is_ascii() {
        return Object::String(title.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in title.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// One top-level entry of the merged outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineNode {
    /// A new bookmark at `page`, with existing outline items nested under it
    File {
        title: String,
        page: ObjectId,
        children: Vec<ObjectId>,
    },
    /// An existing outline item, kept with its own subtree
    Imported(ObjectId),
}

/// Top-level items of a document's own outline, in order
///
/// Follows the `First`/`Next` chain of the catalog's `Outlines`; stops at the
/// first item that is missing, not a dictionary, or already seen.
pub fn top_level_items(doc: &Document) -> Vec<ObjectId> {
    let first = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|outlines| resolve_dict(doc, outlines))
        .and_then(|outlines| outlines.get(b"First").ok())
        .and_then(|first| first.as_reference().ok());

    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut current = first;
    while let Some(id) = current {
        if !seen.insert(id) {
            break;
        }
        let Some(item) = doc.get_object(id).ok().and_then(|obj| obj.as_dict().ok()) else {
            break;
        };
        items.push(id);
        current = item.get(b"Next").ok().and_then(|next| next.as_reference().ok());
    }
    items
}

/// Make `children` the ordered kids of `parent`
///
/// Rewrites each child's `Parent`, `Prev` and `Next`, and the parent's
/// `First`, `Last` and `Count`. Children that are not dictionaries are skipped.
fn link_children(doc: &mut Document, parent: ObjectId, children: &[ObjectId]) {
    let children: Vec<ObjectId> = children
        .iter()
        .copied()
        .filter(|&id| matches!(doc.get_object(id), Ok(Object::Dictionary(_))))
        .collect();

    for (i, &child) in children.iter().enumerate() {
        if let Ok(Object::Dictionary(item)) = doc.get_object_mut(child) {
            item.set("Parent", Object::Reference(parent));
            match i.checked_sub(1).map(|p| children[p]) {
                Some(prev) => item.set("Prev", Object::Reference(prev)),
                None => {
                    item.remove(b"Prev");
                }
            }
            match children.get(i + 1) {
                Some(&next) => item.set("Next", Object::Reference(next)),
                None => {
                    item.remove(b"Next");
                }
            }
        }
    }

    if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
        if let Ok(Object::Dictionary(node)) = doc.get_object_mut(parent) {
            node.set("First", Object::Reference(first));
            node.set("Last", Object::Reference(last));
            node.set("Count", Object::Integer(children.len() as i64));
        }
    }
}

/// Add an outline with the given top-level entries
///
/// Returns the id of the outline root to be referenced from the catalog, or
/// `None` when there is nothing to bookmark.
pub fn add_outline(doc: &mut Document, nodes: &[OutlineNode]) -> Option<ObjectId> {
    if nodes.is_empty() {
        return None;
    }

    let outline_id = doc.new_object_id();
    let mut outline = Dictionary::new();
    outline.set("Type", Object::Name(b"Outlines".to_vec()));
    doc.objects.insert(outline_id, Object::Dictionary(outline));

    let mut top = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            OutlineNode::File {
                title,
                page,
                children,
            } => {
                let mut item = Dictionary::new();
                item.set("Title", text_string(title));
                item.set(
                    "Dest",
                    Object::Array(vec![
                        Object::Reference(*page),
                        Object::Name(b"Fit".to_vec()),
                    ]),
                );
                let item_id = doc.add_object(Object::Dictionary(item));
                link_children(doc, item_id, children);
                top.push(item_id);
            }
            OutlineNode::Imported(id) => top.push(*id),
        }
    }
    link_children(doc, outline_id, &top);

    Some(outline_id)
}
