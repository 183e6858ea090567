use std::collections::BTreeSet;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use sitebinder_core::error::CrawlError;
use sitebinder_core::traits::DocumentMerger;

/// Page attributes that may be set on a page tree node instead of the page.
const INHERITED_ATTRIBUTES: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// PDF merger built on `lopdf`.
///
/// Each appended document is loaded and renumbered so its object ids do not
/// collide with earlier ones. On finalize the pages of every document are
/// hung under a single page tree, in append order.
pub struct LopdfMerger {
    documents: Vec<Document>,
    next_id: u32,
}

impl Default for LopdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfMerger {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn build(self) -> Result<Document, String> {
        // Renumbering in `append` left every id below `next_id` taken.
        let tree_id: ObjectId = (self.next_id, 0);
        let mut merged = Document::with_version("1.5");
        let mut catalog: Option<(ObjectId, Dictionary)> = None;
        let mut kids = Vec::new();

        for document in self.documents {
            for (_, page_id) in document.get_pages() {
                let mut page = document
                    .get_dictionary(page_id)
                    .map_err(|e| format!("missing page object {page_id:?}: {e}"))?
                    .clone();
                inherit_attributes(&document, &mut page);
                page.set("Parent", tree_id);
                merged.objects.insert(page_id, Object::Dictionary(page));
                kids.push(Object::Reference(page_id));
            }

            for (id, object) in document.objects {
                match object.type_name().ok() {
                    Some("Catalog") => {
                        if catalog.is_none() {
                            if let Object::Dictionary(dictionary) = object {
                                catalog = Some((id, dictionary));
                            }
                        }
                    }
                    // Page trees are replaced by one fresh root; outlines
                    // point into the source documents and are dropped.
                    Some("Pages") | Some("Page") | Some("Outlines") | Some("Outline") => {}
                    _ => {
                        merged.objects.insert(id, object);
                    }
                }
            }
        }

        let (catalog_id, mut catalog) = catalog.ok_or("no catalog found")?;
        catalog.set("Pages", tree_id);
        catalog.remove(b"Outlines");
        merged
            .objects
            .insert(catalog_id, Object::Dictionary(catalog));

        let count = kids.len() as i64;
        merged.objects.insert(
            tree_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        merged.trailer.set("Root", catalog_id);
        merged.max_id = self.next_id;
        merged.renumber_objects();
        merged.compress();
        Ok(merged)
    }
}

/// Copy the attributes a page inherits from its source page tree onto the
/// page itself, so it renders the same under the new root.
fn inherit_attributes(document: &Document, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut seen = BTreeSet::new();

    while let Some(id) = parent {
        if !seen.insert(id) {
            break;
        }
        let Ok(node) = document.get_dictionary(id) else {
            break;
        };
        for key in INHERITED_ATTRIBUTES {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(*key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
}

impl DocumentMerger for LopdfMerger {
    fn append(&mut self, path: &Path) -> Result<(), CrawlError> {
        let mut document = Document::load(path).map_err(|e| CrawlError::MergeAppend {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if document.get_pages().is_empty() {
            return Err(CrawlError::MergeAppend {
                path: path.to_path_buf(),
                message: "document has no pages".to_string(),
            });
        }

        document.renumber_objects_with(self.next_id);
        self.next_id = document.max_id + 1;
        self.documents.push(document);
        Ok(())
    }

    fn finalize(self, output: &Path) -> Result<(), CrawlError> {
        let finalize_error = |message: String| CrawlError::MergeFinalize {
            path: output.to_path_buf(),
            message,
        };

        if self.is_empty() {
            return Err(finalize_error("no documents were appended".to_string()));
        }

        let mut merged = self.build().map_err(finalize_error)?;
        merged
            .save(output)
            .map_err(|e| finalize_error(e.to_string()))?;
        tracing::debug!(output = %output.display(), "Composite PDF written");
        Ok(())
    }
}
