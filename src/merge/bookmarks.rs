//! Bookmark (outline) management for merged documents.
//!
//! The outline is flat: one level-1 item per merged source, pointing at the
//! first page that source contributed. It is written in one of two ways:
//!
//! - **Bulk**: every target is resolved and every item is built before the
//!   document is touched, then all objects are inserted at once.
//! - **Sequential**: items are appended one at a time; items whose target
//!   page cannot be found are skipped.
//!
//! Sequential writing is only attempted when the bulk write fails. If both
//! fail the document keeps its pages and simply has no outline.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::error::{DocsError, Result};
use crate::utils::{decode_pdf_text, pdf_text_string};

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Outline depth; merged documents only use level 1.
    pub level: u32,
    /// Text shown in the viewer's outline panel.
    pub title: String,
    /// 1-based page number the entry jumps to.
    pub target_page: u32,
}

impl Bookmark {
    /// Create a top-level bookmark.
    pub fn new(title: impl Into<String>, target_page: u32) -> Self {
        Self {
            level: 1,
            title: title.into(),
            target_page,
        }
    }
}

/// How the outline ended up being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineOutcome {
    /// All items written in one step.
    Bulk(usize),
    /// Bulk write failed; this many items were appended one by one.
    Sequential(usize),
    /// No outline could be written.
    Omitted,
}

impl OutlineOutcome {
    /// Number of outline items in the document.
    pub fn written(&self) -> usize {
        match self {
            Self::Bulk(n) | Self::Sequential(n) => *n,
            Self::Omitted => 0,
        }
    }
}

/// Manager for PDF bookmarks (outlines).
pub struct BookmarkManager;

impl BookmarkManager {
    /// Create a new bookmark manager.
    pub fn new() -> Self {
        Self
    }

    /// Write `bookmarks` as the document outline, falling back from the bulk
    /// write to sequential appends.
    ///
    /// Never fails: the outcome says which strategy succeeded, if any.
    pub fn write_outline(&self, doc: &mut Document, bookmarks: &[Bookmark]) -> OutlineOutcome {
        if bookmarks.is_empty() {
            return OutlineOutcome::Bulk(0);
        }

        let bulk_err = match self.write_bulk(doc, bookmarks) {
            Ok(written) => return OutlineOutcome::Bulk(written),
            Err(err) => err,
        };
        warn!("{bulk_err}; appending bookmarks one at a time");

        match self.write_sequential(doc, bookmarks) {
            Ok(written) => OutlineOutcome::Sequential(written),
            Err(err) => {
                warn!("{err}; saving without bookmarks");
                OutlineOutcome::Omitted
            }
        }
    }

    /// Write the whole outline in one step.
    ///
    /// Nothing is inserted unless every bookmark resolves to a page.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::OutlineFailed`] if the document has no catalog or
    /// a bookmark targets a page that does not exist.
    pub fn write_bulk(&self, doc: &mut Document, bookmarks: &[Bookmark]) -> Result<usize> {
        doc.catalog()
            .map_err(|e| DocsError::outline_failed(format!("no document catalog: {e}")))?;

        let pages = doc.get_pages();
        let targets = bookmarks
            .iter()
            .map(|bookmark| resolve(&pages, bookmark))
            .collect::<Result<Vec<_>>>()?;

        let outline_id = doc.new_object_id();
        let item_ids: Vec<ObjectId> = targets.iter().map(|_| doc.new_object_id()).collect();

        let mut objects = Vec::with_capacity(item_ids.len() + 1);
        for (idx, (bookmark, page_id)) in bookmarks.iter().zip(&targets).enumerate() {
            let mut item = outline_item(outline_id, &bookmark.title, *page_id);
            if idx > 0 {
                item.set("Prev", Object::Reference(item_ids[idx - 1]));
            }
            if let Some(next) = item_ids.get(idx + 1) {
                item.set("Next", Object::Reference(*next));
            }
            objects.push((item_ids[idx], item));
        }

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Outlines".to_vec()));
        root.set("Count", Object::Integer(item_ids.len() as i64));
        if let (Some(first), Some(last)) = (item_ids.first(), item_ids.last()) {
            root.set("First", Object::Reference(*first));
            root.set("Last", Object::Reference(*last));
        }
        objects.push((outline_id, root));

        for (id, dict) in objects {
            doc.objects.insert(id, Object::Dictionary(dict));
        }
        doc.catalog_mut()?
            .set("Outlines", Object::Reference(outline_id));

        debug!(items = item_ids.len(), "outline written");
        Ok(item_ids.len())
    }

    /// Append bookmarks one at a time, skipping those that cannot be
    /// resolved.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::OutlineFailed`] if the document has no catalog or
    /// no bookmark at all could be appended.
    pub fn write_sequential(&self, doc: &mut Document, bookmarks: &[Bookmark]) -> Result<usize> {
        doc.catalog()
            .map_err(|e| DocsError::outline_failed(format!("no document catalog: {e}")))?;

        let root_id = doc.add_object(dictionary! {
            "Type" => "Outlines",
            "Count" => 0,
        });

        let pages = doc.get_pages();
        let mut last: Option<ObjectId> = None;
        let mut written = 0;

        for bookmark in bookmarks {
            let page_id = match resolve(&pages, bookmark) {
                Ok(page_id) => page_id,
                Err(err) => {
                    warn!("{err}; skipping bookmark");
                    continue;
                }
            };

            match append_item(doc, root_id, last, &bookmark.title, page_id) {
                Ok(item_id) => {
                    last = Some(item_id);
                    written += 1;
                }
                Err(err) => warn!("{err}; skipping bookmark `{}`", bookmark.title),
            }
        }

        if written == 0 {
            doc.objects.remove(&root_id);
            return Err(DocsError::outline_failed("no bookmark could be appended"));
        }

        doc.catalog_mut()?
            .set("Outlines", Object::Reference(root_id));
        debug!(items = written, "outline appended sequentially");
        Ok(written)
    }

    /// Read the outline back as bookmarks, in outline order.
    ///
    /// Items whose destination is not a page of the document get target
    /// page 0.
    pub fn read_outline(&self, doc: &Document) -> Vec<Bookmark> {
        let page_numbers: HashMap<ObjectId, u32> = doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| (id, number))
            .collect();

        let mut bookmarks = Vec::new();
        let Some(mut current) = doc
            .catalog()
            .and_then(|catalog| catalog.get(b"Outlines"))
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .and_then(|root| root.get(b"First"))
            .and_then(Object::as_reference)
            .ok()
        else {
            return bookmarks;
        };

        // Bounded by the object count so a Next cycle cannot loop forever.
        for _ in 0..doc.objects.len() {
            let Ok(item) = doc.get_dictionary(current) else {
                break;
            };

            let title = item
                .get(b"Title")
                .and_then(Object::as_str)
                .ok()
                .and_then(decode_pdf_text)
                .unwrap_or_default();
            let target_page = item
                .get(b"Dest")
                .and_then(Object::as_array)
                .ok()
                .and_then(|dest| dest.first())
                .and_then(|page| page.as_reference().ok())
                .and_then(|id| page_numbers.get(&id).copied())
                .unwrap_or(0);
            bookmarks.push(Bookmark::new(title, target_page));

            match item.get(b"Next").and_then(Object::as_reference) {
                Ok(next) => current = next,
                Err(_) => break,
            }
        }

        bookmarks
    }

    /// Check if a document has bookmarks.
    pub fn has_bookmarks(&self, doc: &Document) -> bool {
        doc.catalog()
            .map(|catalog| catalog.has(b"Outlines"))
            .unwrap_or(false)
    }
}

impl Default for BookmarkManager {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(pages: &BTreeMap<u32, ObjectId>, bookmark: &Bookmark) -> Result<ObjectId> {
    pages.get(&bookmark.target_page).copied().ok_or_else(|| {
        DocsError::outline_failed(format!(
            "bookmark `{}` targets page {} but the document has {} pages",
            bookmark.title,
            bookmark.target_page,
            pages.len()
        ))
    })
}

fn outline_item(parent: ObjectId, title: &str, page_id: ObjectId) -> Dictionary {
    let dest = vec![
        Object::Reference(page_id),
        Object::Name(b"XYZ".to_vec()),
        Object::Null,
        Object::Null,
        Object::Null,
    ];

    let mut item = Dictionary::new();
    item.set("Title", pdf_text_string(title));
    item.set("Parent", Object::Reference(parent));
    item.set("Dest", Object::Array(dest));
    item
}

/// Append one item after `last` and update the root's First/Last/Count.
fn append_item(
    doc: &mut Document,
    root_id: ObjectId,
    last: Option<ObjectId>,
    title: &str,
    page_id: ObjectId,
) -> Result<ObjectId> {
    let mut item = outline_item(root_id, title, page_id);
    if let Some(prev) = last {
        item.set("Prev", Object::Reference(prev));
    }
    let item_id = doc.add_object(item);

    if let Some(prev) = last {
        doc.get_dictionary_mut(prev)?
            .set("Next", Object::Reference(item_id));
    }

    let root = doc.get_dictionary_mut(root_id)?;
    if last.is_none() {
        root.set("First", Object::Reference(item_id));
    }
    root.set("Last", Object::Reference(item_id));
    let count = root.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    root.set("Count", Object::Integer(count + 1));

    Ok(item_id)
}
