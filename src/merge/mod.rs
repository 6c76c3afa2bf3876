//! PDF merging: page concatenation, bookmarks and metadata.
//!
//! [`PdfAssembler`] drives the other parts for one student:
//!
//! - [`pages`]: grafts each source's page tree into the merged document
//! - [`bookmarks`]: writes the flat outline, one entry per source
//! - [`metadata`]: fills the Info dictionary

pub mod assembler;
pub mod bookmarks;
pub mod metadata;
pub mod pages;

pub use assembler::{AssemblyReport, FinishedDocument, PdfAssembler};
pub use bookmarks::{Bookmark, BookmarkManager, OutlineOutcome};
pub use metadata::{DocumentMetadata, MetadataManager};
pub use pages::MergedDocument;
