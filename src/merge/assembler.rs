//! Assembly of one student's merged PDF.
//!
//! Sources are taken in order. PDFs are loaded directly, word documents are
//! converted into the scratch directory first, and anything else is
//! skipped. A source that cannot be converted or loaded is logged and
//! skipped; the rest are still merged. Each merged source gets one bookmark
//! at its first page.

use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::collect::{SourceFile, SourceKind};
use crate::convert::{DocumentConverter, convert_or_skip};
use crate::error::{DocsError, Result};
use crate::io::{PdfReader, PdfWriter, WriteStatistics};
use crate::merge::bookmarks::{Bookmark, BookmarkManager, OutlineOutcome};
use crate::merge::metadata::{DocumentMetadata, MetadataManager};
use crate::merge::pages::MergedDocument;

/// Outcome of assembling one student's document.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    /// Where the document was written.
    pub output: PathBuf,
    /// Pages in the written document.
    pub page_count: usize,
    /// Bookmarks requested, one per merged source, in page order.
    pub bookmarks: Vec<Bookmark>,
    /// Sources that contributed pages.
    pub merged: Vec<PathBuf>,
    /// Sources that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    /// How the outline was written.
    pub outline: OutlineOutcome,
    /// Size of the written file in bytes.
    pub file_size: u64,
}

/// Result of [`PdfAssembler::finish`].
#[derive(Debug, Clone)]
pub struct FinishedDocument {
    /// Pages in the saved document.
    pub page_count: usize,
    /// How the outline was written.
    pub outline: OutlineOutcome,
    /// Write statistics.
    pub write: WriteStatistics,
}

/// Converter outputs awaiting deletion. Removed on drop at the latest.
#[derive(Debug, Default)]
struct ScratchFiles(Vec<PathBuf>);

impl ScratchFiles {
    fn track(&mut self, path: PathBuf) {
        self.0.push(path);
    }

    fn remove_all(&mut self) {
        for path in self.0.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed temporary file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), "cannot remove temporary file: {e}"),
            }
        }
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        self.remove_all();
    }
}

/// Merges a student's sources into one bookmarked PDF.
pub struct PdfAssembler<'a, C> {
    converter: &'a C,
    scratch_dir: &'a Path,
    reader: PdfReader,
    writer: PdfWriter,
    bookmark_manager: BookmarkManager,
    metadata_manager: MetadataManager,
}

impl<'a, C: DocumentConverter> PdfAssembler<'a, C> {
    /// Create an assembler that converts word documents with `converter`
    /// into `scratch_dir`.
    pub fn new(converter: &'a C, scratch_dir: &'a Path) -> Self {
        Self {
            converter,
            scratch_dir,
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
            bookmark_manager: BookmarkManager::new(),
            metadata_manager: MetadataManager::new(),
        }
    }

    /// Merge `sources` into `output`, titled after `student_name`.
    ///
    /// Converter outputs are deleted once the save has been attempted,
    /// whether or not it succeeded.
    ///
    /// # Errors
    ///
    /// - [`DocsError::NothingToMerge`] if no source contributed a page
    /// - [`DocsError::FailedToCreateOutput`] / [`DocsError::FailedToWrite`]
    ///   if the output cannot be saved
    pub async fn assemble(
        &self,
        sources: &[SourceFile],
        output: &Path,
        student_name: &str,
    ) -> Result<AssemblyReport> {
        let mut scratch = ScratchFiles::default();
        let mut merged = MergedDocument::new();
        let mut bookmarks = Vec::new();
        let mut merged_paths = Vec::new();
        let mut skipped = Vec::new();

        for source in sources {
            let pdf_path = match source.kind() {
                SourceKind::Pdf => source.path.clone(),
                SourceKind::WordDocument => {
                    match convert_or_skip(self.converter, &source.path, self.scratch_dir).await {
                        Some(pdf) => {
                            scratch.track(pdf.clone());
                            pdf
                        }
                        None => {
                            skipped.push((source.path.clone(), "conversion failed".to_string()));
                            continue;
                        }
                    }
                }
                SourceKind::Unsupported => {
                    debug!(path = %source.path.display(), "unsupported file type; skipping");
                    skipped.push((source.path.clone(), "unsupported file type".to_string()));
                    continue;
                }
            };

            let loaded = match self.reader.load(&pdf_path).await {
                Ok(loaded) => loaded,
                Err(err) => {
                    warn!("skipping {}: {err}", source.path.display());
                    skipped.push((source.path.clone(), err.to_string()));
                    continue;
                }
            };

            let target_page = merged.page_count() + 1;
            let size = loaded.format_file_size();
            match merged.append(loaded.document) {
                Ok(added) => {
                    debug!(
                        source = %source.path.display(),
                        pages = added,
                        first_page = target_page,
                        size = %size,
                        "merged"
                    );
                    bookmarks.push(Bookmark::new(source.stem(), target_page as u32));
                    merged_paths.push(source.path.clone());
                }
                Err(err) => {
                    warn!("skipping {}: {err}", source.path.display());
                    skipped.push((source.path.clone(), err.to_string()));
                }
            }
        }

        if merged.page_count() == 0 {
            return Err(DocsError::NothingToMerge {
                output: output.to_path_buf(),
            });
        }

        let result = self
            .finish(merged.into_document(), &bookmarks, student_name, output)
            .await;
        scratch.remove_all();
        let finished = result?;

        info!(
            output = %output.display(),
            pages = finished.page_count,
            sources = merged_paths.len(),
            skipped = skipped.len(),
            size = %finished.write.format_file_size(),
            "merged PDF written"
        );

        Ok(AssemblyReport {
            output: output.to_path_buf(),
            page_count: finished.page_count,
            bookmarks,
            merged: merged_paths,
            skipped,
            outline: finished.outline,
            file_size: finished.write.file_size,
        })
    }

    /// Stamp metadata and the outline onto `doc` and save it.
    ///
    /// Metadata and outline failures are logged and do not prevent the save.
    ///
    /// # Errors
    ///
    /// Returns an error only if the document cannot be written.
    pub async fn finish(
        &self,
        mut doc: Document,
        bookmarks: &[Bookmark],
        student_name: &str,
        output: &Path,
    ) -> Result<FinishedDocument> {
        let metadata = DocumentMetadata::for_student(student_name);
        if let Err(err) = self.metadata_manager.set_metadata(&mut doc, &metadata) {
            warn!("{err}; saving without metadata");
        }

        let outline = self.bookmark_manager.write_outline(&mut doc, bookmarks);
        let page_count = doc.get_pages().len();
        let write = self.writer.save(doc, output).await?;

        Ok(FinishedDocument {
            page_count,
            outline,
            write,
        })
    }
}
