//! PDF loading.
//!
//! Parsing runs on the blocking pool so that a large thesis does not stall
//! the runtime driving the converter's timeout.

use lopdf::Document;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{DocsError, Result};
use crate::utils::format_file_size;

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to load the document.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,
}

impl LoadedPdf {
    fn new(document: Document, path: PathBuf, load_time: Duration) -> Self {
        let page_count = document.get_pages().len();
        let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        Self {
            document,
            path,
            page_count,
            load_time,
            file_size,
        }
    }

    /// Human-readable size of the source file.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Loads source PDFs for assembly.
#[derive(Debug, Clone)]
pub struct PdfReader {
    /// Reject documents without pages.
    verify: bool,
}

impl PdfReader {
    /// Create a reader that rejects empty documents.
    pub fn new() -> Self {
        Self { verify: true }
    }

    /// Create a reader that accepts documents without pages.
    #[cfg(test)]
    pub fn without_verification() -> Self {
        Self { verify: false }
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - File is not a valid PDF
    /// - PDF is encrypted
    /// - PDF has no pages (unless verification is off)
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let path_buf = path.to_path_buf();
        let verify = self.verify;

        task::spawn_blocking(move || {
            let start = Instant::now();

            let document = Document::load(&path_buf).map_err(|e| {
                let err_msg = e.to_string();
                if err_msg.contains("encrypt") || err_msg.contains("password") {
                    DocsError::EncryptedPdf {
                        path: path_buf.clone(),
                    }
                } else {
                    DocsError::failed_to_load_pdf(path_buf.clone(), err_msg)
                }
            })?;

            if document.is_encrypted() {
                return Err(DocsError::EncryptedPdf { path: path_buf });
            }

            if verify && document.get_pages().is_empty() {
                return Err(DocsError::failed_to_load_pdf(path_buf, "PDF has no pages"));
            }

            Ok(LoadedPdf::new(document, path_buf, start.elapsed()))
        })
        .await
        .map_err(|e| DocsError::other(format!("Load task failed: {e}")))?
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}
