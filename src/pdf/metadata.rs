//! Page inspection of PDF files

use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::FailureCause;

/// Page attributes a page may inherit from its ancestors in the page tree
pub(crate) const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Deepest tree (page tree, name tree) we follow before giving up
pub(crate) const MAX_TREE_DEPTH: usize = 64;

/// The dictionary `object` is, or refers to
pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

/// Look up `key` on a page, falling back to the nearest ancestor that has it
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn load(path: &Path) -> Result<Document, FailureCause> {
    Document::load(path).map_err(|source| FailureCause::Append {
        path: path.to_path_buf(),
        source,
    })
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Count the pages of a PDF file by walking its page tree
pub fn count_pages(path: &Path) -> Result<usize, FailureCause> {
    Ok(load(path)?.get_pages().len())
}

/// Width and height of every page in order, taken from its (possibly inherited) MediaBox
///
/// Pages without a readable MediaBox are reported as `None`.
pub fn page_sizes(path: &Path) -> Result<Vec<Option<(f32, f32)>>, FailureCause> {
    let doc = load(path)?;

    let sizes = doc
        .get_pages()
        .into_values()
        .map(|page_id| {
            let media_box = inherited_attribute(&doc, page_id, b"MediaBox")?;
            let corners: Vec<f32> = media_box
                .as_array()
                .ok()?
                .iter()
                .map(number)
                .collect::<Option<_>>()?;
            match corners.as_slice() {
                [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
                _ => None,
            }
        })
        .collect();

    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), FailureCause::Append { .. }));
    }

    #[test]
    fn test_inherited_attribute_walks_parents() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Rotate" => 90,
            }),
        );

        assert!(matches!(
            inherited_attribute(&doc, page_id, b"Rotate"),
            Some(Object::Integer(90))
        ));
        assert!(matches!(
            inherited_attribute(&doc, page_id, b"Contents"),
            Some(Object::Reference(id)) if id == content_id
        ));
        assert!(inherited_attribute(&doc, page_id, b"CropBox").is_none());
    }
}
