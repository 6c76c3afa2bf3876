//! PDF metadata management.
//!
//! Merged documents get an Info dictionary naming the student, a fixed
//! author/subject/creator, this crate as producer, and creation and
//! modification dates.

use chrono::{DateTime, Local, Offset, TimeZone};
use lopdf::{Dictionary, Document, Object};

use crate::error::{DocsError, Result};
use crate::utils::{decode_pdf_text, pdf_text_string};

/// Author recorded in merged documents.
pub const AUTHOR: &str = "系统生成";
/// Subject recorded in merged documents.
pub const SUBJECT: &str = "学生论文材料合并";
/// Creator recorded in merged documents.
pub const CREATOR: &str = "StudentDocumentMerger";

/// Document information written to the Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Application that created the content.
    pub creator: Option<String>,
    /// Application that produced the PDF.
    pub producer: Option<String>,
}

impl DocumentMetadata {
    /// Metadata of a student's merged document.
    pub fn for_student(name: &str) -> Self {
        Self {
            title: Some(format!("{name}的论文材料")),
            author: Some(AUTHOR.to_string()),
            subject: Some(SUBJECT.to_string()),
            creator: Some(CREATOR.to_string()),
            producer: Some(format!("{} {}", crate::NAME, crate::VERSION)),
        }
    }

    /// Check if no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.creator.is_none()
            && self.producer.is_none()
    }

    fn fields(&self) -> [(&'static str, Option<&String>); 5] {
        [
            ("Title", self.title.as_ref()),
            ("Author", self.author.as_ref()),
            ("Subject", self.subject.as_ref()),
            ("Creator", self.creator.as_ref()),
            ("Producer", self.producer.as_ref()),
        ]
    }
}

/// Manager for PDF metadata.
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Set metadata on a document.
    ///
    /// Only fields that are set are written. Creation and modification dates
    /// are always stamped with the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::MetadataFailed`] if the trailer points at an Info
    /// object that is not a dictionary.
    pub fn set_metadata(&self, doc: &mut Document, metadata: &DocumentMetadata) -> Result<()> {
        let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                let id = doc.add_object(Dictionary::new());
                doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };

        let info = doc
            .get_dictionary_mut(info_id)
            .map_err(|e| DocsError::MetadataFailed {
                reason: format!("Info is not a dictionary: {e}"),
            })?;

        for (key, value) in metadata.fields() {
            if let Some(value) = value {
                info.set(key, pdf_text_string(value));
            }
        }

        let date = format_pdf_date(&Local::now());
        info.set("CreationDate", Object::string_literal(date.clone()));
        info.set("ModDate", Object::string_literal(date));

        Ok(())
    }

    /// Get metadata from a document.
    pub fn get_metadata(&self, doc: &Document) -> DocumentMetadata {
        let Ok(info) = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
        else {
            return DocumentMetadata::default();
        };

        let field = |key: &[u8]| {
            info.get(key)
                .and_then(Object::as_str)
                .ok()
                .and_then(decode_pdf_text)
        };

        DocumentMetadata {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
        }
    }

    /// Check if a document has metadata.
    pub fn has_metadata(&self, doc: &Document) -> bool {
        doc.trailer.has(b"Info")
    }
}

impl Default for MetadataManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a timestamp as a PDF date string: `D:YYYYMMDDHHmmSS+HH'mm'`.
pub fn format_pdf_date<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    let offset = time.offset().fix().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();

    format!(
        "D:{}{sign}{:02}'{:02}'",
        time.naive_local().format("%Y%m%d%H%M%S"),
        offset / 3600,
        (offset % 3600) / 60
    )
}
