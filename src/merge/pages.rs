//! Page tree concatenation.
//!
//! Each appended document's page tree is grafted, whole, under the merged
//! document's root `Pages` node. Keeping the source's own `Pages` node
//! preserves attributes that pages inherit from it (`MediaBox`, `Resources`,
//! `Rotate`).

use lopdf::{Document, Object, ObjectId, dictionary};

use crate::error::{DocsError, Result};

/// A document being assembled from several sources.
#[derive(Debug)]
pub struct MergedDocument {
    document: Document,
    pages_id: ObjectId,
    page_count: usize,
}

impl MergedDocument {
    /// Start an empty document.
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            page_count: 0,
        }
    }

    /// Pages merged so far.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Append every page of `source` and return how many were added.
    ///
    /// The merged document is left unchanged when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` has no catalog or page tree root.
    pub fn append(&mut self, mut source: Document) -> Result<usize> {
        let added = source.get_pages().len();
        if added == 0 {
            return Ok(0);
        }

        source.renumber_objects_with(self.document.max_id + 1);

        let catalog_id = source.trailer.get(b"Root").and_then(Object::as_reference)?;
        let root_id = source
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| DocsError::other(format!("source has no page tree: {e}")))?;

        let root = source.get_dictionary_mut(root_id)?;
        root.set("Parent", Object::Reference(self.pages_id));
        root.set("Count", Object::Integer(added as i64));

        // The source catalog would otherwise still point at the grafted tree.
        source.objects.remove(&catalog_id);

        self.document.objects.extend(source.objects);
        self.document.max_id = self.document.max_id.max(source.max_id);

        let pages = self.document.get_dictionary_mut(self.pages_id)?;
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        pages.set("Count", Object::Integer(count + added as i64));
        if let Ok(Object::Array(kids)) = pages.get_mut(b"Kids") {
            kids.push(Object::Reference(root_id));
        }

        self.page_count += added;
        Ok(added)
    }

    /// Finish assembly and hand out the document.
    pub fn into_document(self) -> Document {
        self.document
    }
}

impl Default for MergedDocument {
    fn default() -> Self {
        Self::new()
    }
}
