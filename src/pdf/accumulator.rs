//! Incremental PDF merging using lopdf
//!
//! Each appended document is renumbered past the objects already collected,
//! so documents never share object ids. The page tree is rebuilt once, on
//! write, with every collected page as a direct kid of a single Pages root.
//!
//! Source catalogs are dropped, but what they point at is carried over: the
//! top-level items of each file's outline and its named destinations (both the
//! catalog `Dests` dictionary and the `Names`/`Dests` name tree). When two
//! files define the same destination name, the first one appended wins.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, warn};

use crate::error::FailureCause;
use crate::pdf::metadata::{inherited_attribute, resolve_dict, INHERITABLE, MAX_TREE_DEPTH};
use crate::pdf::outline::{add_outline, top_level_items, OutlineNode};

/// The capability the merge driver relies on
///
/// `append` adds a whole document, `write` serializes everything appended so
/// far and consumes the merger. Dropping a merger without writing releases
/// its resources.
pub trait DocumentMerger {
    /// Append every page of the PDF at `path`; returns the number of pages added
    fn append(&mut self, path: &Path) -> Result<usize, FailureCause>;

    /// Write the combined document to `path`, replacing any existing file
    fn write(self, path: &Path) -> Result<(), FailureCause>
    where
        Self: Sized;
}

/// One appended source file
#[derive(Debug, Clone)]
struct Section {
    title: String,
    first_page: Option<ObjectId>,
    /// Top-level items of the file's own outline
    outline: Vec<ObjectId>,
}

/// In-memory accumulator of pages from several PDFs
#[derive(Debug)]
pub struct PdfAccumulator {
    objects: BTreeMap<ObjectId, Object>,
    page_ids: Vec<ObjectId>,
    sections: Vec<Section>,
    /// First object id free for the next appended document
    next_id: u32,
    version: String,
    bookmarks: bool,
    dests: Dictionary,
    named_dests: BTreeMap<Vec<u8>, Object>,
}

impl Default for PdfAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAccumulator {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            page_ids: Vec::new(),
            sections: Vec::new(),
            next_id: 1,
            version: "1.4".to_string(),
            bookmarks: false,
            dests: Dictionary::new(),
            named_dests: BTreeMap::new(),
        }
    }

    /// Add a bookmark for the first page of every appended file when written
    pub fn with_bookmarks(mut self, bookmarks: bool) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Total pages appended so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Number of documents appended so far
    pub fn document_count(&self) -> usize {
        self.sections.len()
    }

    /// Add an already loaded document under the given bookmark title
    pub fn append_document(
        &mut self,
        mut doc: Document,
        title: &str,
        path: &Path,
    ) -> Result<usize, FailureCause> {
        doc.renumber_objects_with(self.next_id);
        self.next_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        // Copy inherited attributes down before the old page tree is dropped
        for &page_id in &pages {
            let missing: Vec<(&[u8], Object)> = INHERITABLE
                .iter()
                .filter_map(|&key| {
                    let own = doc
                        .get_object(page_id)
                        .ok()
                        .and_then(|obj| obj.as_dict().ok())
                        .map(|dict| dict.has(key))
                        .unwrap_or(false);
                    if own {
                        None
                    } else {
                        inherited_attribute(&doc, page_id, key).map(|value| (key, value))
                    }
                })
                .collect();

            let page = doc
                .get_object_mut(page_id)
                .and_then(|obj| obj.as_dict_mut())
                .map_err(|_| FailureCause::Structure {
                    path: path.to_path_buf(),
                    reason: format!("page {} {} is not a dictionary", page_id.0, page_id.1),
                })?;
            for (key, value) in missing {
                page.set(key.to_vec(), value);
            }
        }

        if version_number(&doc.version) > version_number(&self.version) {
            self.version = doc.version.clone();
        }

        let outline = top_level_items(&doc);
        self.collect_destinations(&doc);

        self.objects
            .extend(doc.objects.into_iter().filter(|(_, object)| !is_tree_node(object)));

        if pages.is_empty() {
            warn!(path = %path.display(), "document has no pages");
        }
        debug!(
            path = %path.display(),
            pages = pages.len(),
            outline_items = outline.len(),
            next_id = self.next_id,
            "appended document"
        );

        self.sections.push(Section {
            title: title.to_string(),
            first_page: pages.first().copied(),
            outline,
        });
        let added = pages.len();
        self.page_ids.extend(pages);
        Ok(added)
    }

    /// Remember the named destinations of a source catalog
    fn collect_destinations(&mut self, doc: &Document) {
        let Ok(catalog) = doc.catalog() else {
            return;
        };

        if let Some(dests) = catalog.get(b"Dests").ok().and_then(|d| resolve_dict(doc, d)) {
            for (name, dest) in dests.iter() {
                if !self.dests.has(name) {
                    self.dests.set(name.clone(), dest.clone());
                }
            }
        }

        let tree = catalog
            .get(b"Names")
            .ok()
            .and_then(|names| resolve_dict(doc, names))
            .and_then(|names| names.get(b"Dests").ok())
            .and_then(|dests| resolve_dict(doc, dests));
        if let Some(tree) = tree {
            collect_name_tree(doc, tree, 0, &mut self.named_dests);
        }
    }

    /// Assemble the merged document: one catalog, one Pages root, optional outline
    pub fn into_document(self) -> Document {
        let mut merged = Document::with_version(self.version.as_str());
        merged.objects.extend(self.objects);
        // new_object_id() must hand out ids above everything collected
        merged.max_id = self.next_id - 1;

        let pages_id = merged.new_object_id();
        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages_object.set("Kids", Object::Array(kids));
        merged.objects.insert(pages_id, Object::Dictionary(pages_object));

        for &page_id in &self.page_ids {
            if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(page_id) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }

        // Files without pages get no entry of their own
        let nodes: Vec<OutlineNode> = if self.bookmarks {
            self.sections
                .iter()
                .filter_map(|s| {
                    s.first_page.map(|page| OutlineNode::File {
                        title: s.title.clone(),
                        page,
                        children: s.outline.clone(),
                    })
                })
                .collect()
        } else {
            self.sections
                .iter()
                .flat_map(|s| s.outline.iter().copied().map(OutlineNode::Imported))
                .collect()
        };
        let outline_id = add_outline(&mut merged, &nodes);

        let names_id = if self.named_dests.is_empty() {
            None
        } else {
            let names: Vec<Object> = self
                .named_dests
                .into_iter()
                .flat_map(|(name, dest)| [Object::String(name, StringFormat::Literal), dest])
                .collect();
            Some(merged.add_object(dictionary! { "Names" => names }))
        };

        let catalog_id = merged.new_object_id();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        if let Some(outline_id) = outline_id {
            catalog.set("Outlines", Object::Reference(outline_id));
            if self.bookmarks {
                catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
            }
        }
        if !self.dests.is_empty() {
            catalog.set("Dests", Object::Dictionary(self.dests));
        }
        if let Some(names_id) = names_id {
            catalog.set("Names", dictionary! { "Dests" => names_id });
        }
        merged.objects.insert(catalog_id, Object::Dictionary(catalog));
        merged.trailer.set("Root", Object::Reference(catalog_id));

        merged
    }
}

impl DocumentMerger for PdfAccumulator {
    fn append(&mut self, path: &Path) -> Result<usize, FailureCause> {
        let doc = Document::load(path).map_err(|source| FailureCause::Append {
            path: path.to_path_buf(),
            source,
        })?;
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.append_document(doc, &title, path)
    }

    fn write(self, path: &Path) -> Result<(), FailureCause> {
        let mut merged = self.into_document();
        merged.compress();

        // Stage in the target folder, then rename over `path` once complete
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // An existing output keeps its mode; a new one gets the usual umask mode
        let existing = fs::metadata(path).ok().map(|meta| meta.permissions());
        let mut builder = tempfile::Builder::new();
        builder.prefix(".pdf-folder-merge-").suffix(".tmp");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut staged = builder
            .tempfile_in(dir)
            .map_err(|e| FailureCause::write(path, e))?;

        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            merged
                .save_to(&mut writer)
                .map_err(|e| FailureCause::write(path, e))?;
            writer.flush().map_err(|e| FailureCause::write(path, e))?;
        }
        if let Some(permissions) = existing {
            fs::set_permissions(staged.path(), permissions)
                .map_err(|e| FailureCause::write(path, e))?;
        }

        staged
            .persist(path)
            .map_err(|e| FailureCause::write(path, e.error))?;

        debug!(path = %path.display(), "wrote merged document");
        Ok(())
    }
}

/// Catalog, outline root and intermediate page-tree nodes of a source document
fn is_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(|t| t.as_name()),
            Ok(b"Catalog") | Ok(b"Pages") | Ok(b"Outlines")
        ),
        _ => false,
    }
}

/// Flatten a name tree's leaves into `into`, keeping names already present
fn collect_name_tree(
    doc: &Document,
    node: &Dictionary,
    depth: usize,
    into: &mut BTreeMap<Vec<u8>, Object>,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }
    if let Ok(names) = node.get(b"Names").and_then(|n| n.as_array()) {
        for pair in names.chunks_exact(2) {
            if let Object::String(name, _) = &pair[0] {
                into.entry(name.clone()).or_insert_with(|| pair[1].clone());
            }
        }
    }
    if let Ok(kids) = node.get(b"Kids").and_then(|k| k.as_array()) {
        for kid in kids {
            if let Some(kid) = resolve_dict(doc, kid) {
                collect_name_tree(doc, kid, depth + 1, into);
            }
        }
    }
}

/// `"1.7"` -> `(1, 7)`; unparseable parts count as zero
fn version_number(version: &str) -> (u32, u32) {
    let mut parts = version.trim().splitn(2, '.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// A document whose pages inherit MediaBox from their Pages node
    fn sample_document(version: &str, widths: &[i64]) -> Document {
        let mut doc = Document::with_version(version);
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in widths {
            let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id);
        }
        // Per-page widths go on the pages themselves when there is more than one
        if widths.len() > 1 {
            for (page_id, width) in kids.iter().zip(widths) {
                if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
                    dict.set("MediaBox", media_box(*width));
                }
            }
        }
        let width = widths.first().copied().unwrap_or(612);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "Count" => kids.len() as i64,
                "MediaBox" => media_box(width),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn media_box(width: i64) -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(792),
        ])
    }

    fn media_width(doc: &Document, page_id: ObjectId) -> i64 {
        let media_box = inherited_attribute(doc, page_id, b"MediaBox").expect("MediaBox");
        media_box.as_array().unwrap()[2].as_i64().unwrap()
    }

    #[test]
    fn test_append_keeps_page_order_and_attributes() {
        let mut acc = PdfAccumulator::new();
        let path = Path::new("memory.pdf");
        assert_eq!(acc.append_document(sample_document("1.4", &[100]), "a", path).unwrap(), 1);
        assert_eq!(acc.append_document(sample_document("1.4", &[200, 300]), "b", path).unwrap(), 2);
        assert_eq!(acc.page_count(), 3);
        assert_eq!(acc.document_count(), 2);

        let merged = acc.into_document();
        let pages: Vec<ObjectId> = merged.get_pages().into_values().collect();
        assert_eq!(pages.len(), 3);

        let widths: Vec<i64> = pages.iter().map(|&id| media_width(&merged, id)).collect();
        assert_eq!(widths, vec![100, 200, 300]);
    }

    #[test]
    fn test_source_tree_nodes_are_dropped() {
        let mut acc = PdfAccumulator::new();
        let path = Path::new("memory.pdf");
        acc.append_document(sample_document("1.4", &[100]), "a", path).unwrap();
        acc.append_document(sample_document("1.4", &[200]), "b", path).unwrap();

        let merged = acc.into_document();
        let tree_nodes = merged.objects.values().filter(|o| is_tree_node(o)).count();
        // exactly the new Catalog and the new Pages root
        assert_eq!(tree_nodes, 2);
    }

    #[test]
    fn test_highest_version_wins() {
        let mut acc = PdfAccumulator::new();
        let path = Path::new("memory.pdf");
        acc.append_document(sample_document("1.7", &[100]), "a", path).unwrap();
        acc.append_document(sample_document("1.3", &[100]), "b", path).unwrap();
        assert_eq!(acc.into_document().version, "1.7");
    }

    #[test]
    fn test_bookmarks_point_at_first_pages() {
        let mut acc = PdfAccumulator::new().with_bookmarks(true);
        let path = Path::new("memory.pdf");
        acc.append_document(sample_document("1.4", &[100, 150]), "1 - first", path).unwrap();
        acc.append_document(sample_document("1.4", &[200]), "2 - second", path).unwrap();

        let merged = acc.into_document();
        let pages: Vec<ObjectId> = merged.get_pages().into_values().collect();
        let catalog = merged.catalog().unwrap();
        let outline_id = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
        let outline = merged.get_object(outline_id).unwrap().as_dict().unwrap();
        assert_eq!(outline.get(b"Count").unwrap().as_i64().unwrap(), 2);

        let last_id = outline.get(b"Last").unwrap().as_reference().unwrap();
        let last = merged.get_object(last_id).unwrap().as_dict().unwrap();
        let dest = last.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), pages[2]);
    }

    /// Point the name `name` at the document's first page through a two-level name tree
    fn add_named_dest(doc: &mut Document, name: &str) -> ObjectId {
        let page = *doc.get_pages().values().next().unwrap();
        let dest = Object::Array(vec![Object::Reference(page), Object::Name(b"Fit".to_vec())]);
        let leaf = doc.add_object(dictionary! {
            "Names" => vec![Object::string_literal(name), dest.clone()],
        });
        let tree = doc.add_object(dictionary! { "Kids" => vec![Object::Reference(leaf)] });
        let catalog = doc.catalog_mut().unwrap();
        catalog.set("Names", dictionary! { "Dests" => tree });
        catalog.set("Dests", dictionary! { name => dest });
        page
    }

    #[test]
    fn test_first_named_destination_wins() {
        let mut first = sample_document("1.4", &[100]);
        add_named_dest(&mut first, "intro");
        let mut second = sample_document("1.4", &[200]);
        add_named_dest(&mut second, "intro");

        let mut acc = PdfAccumulator::new();
        let path = Path::new("memory.pdf");
        acc.append_document(first, "a", path).unwrap();
        acc.append_document(second, "b", path).unwrap();
        assert_eq!(acc.named_dests.len(), 1);
        assert_eq!(acc.dests.len(), 1);

        let merged = acc.into_document();
        let first_page = *merged.get_pages().values().next().unwrap();
        let catalog = merged.catalog().unwrap();

        let dests = catalog.get(b"Dests").unwrap().as_dict().unwrap();
        let dest = dests.get(b"intro").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), first_page);

        let names = catalog.get(b"Names").unwrap().as_dict().unwrap();
        let tree_id = names.get(b"Dests").unwrap().as_reference().unwrap();
        let tree = merged.get_object(tree_id).unwrap().as_dict().unwrap();
        let leaves = tree.get(b"Names").unwrap().as_array().unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].as_str().unwrap(), b"intro");
        assert_eq!(leaves[1].as_array().unwrap()[0].as_reference().unwrap(), first_page);
    }

    #[test]
    fn test_version_number() {
        assert_eq!(version_number("1.7"), (1, 7));
        assert_eq!(version_number("2.0"), (2, 0));
        assert_eq!(version_number("garbage"), (0, 0));
        assert!(version_number("1.10") > version_number("1.9"));
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let output = temp_dir.path().join("merged.pdf");
        std::fs::write(&output, b"old contents").unwrap();

        let mut acc = PdfAccumulator::new();
        acc.append_document(sample_document("1.5", &[100]), "a", Path::new("memory.pdf")).unwrap();
        acc.write(&output).expect("write should succeed");

        let reloaded = Document::load(&output).expect("output should be a valid PDF");
        assert_eq!(reloaded.get_pages().len(), 1);

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let output = temp_dir.path().join("missing").join("merged.pdf");

        let acc = PdfAccumulator::new();
        let err = acc.write(&output).unwrap_err();
        assert!(matches!(err, FailureCause::Write { .. }));
        assert_eq!(err.path(), output.as_path());
    }
}
