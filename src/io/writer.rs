//! PDF writing.
//!
//! Output is written to a temporary file in the destination directory and
//! renamed into place, so a failed save never leaves a truncated
//! `<name>.pdf` that looks like a finished result.

use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{DocsError, Result};
use crate::utils::format_file_size;

/// Options for writing PDF files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Compress content streams before writing.
    pub compress: bool,

    /// Drop unreachable objects and renumber the rest.
    pub optimize: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compress: true,
            optimize: true,
            buffer_size: 64 * 1024,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Writes assembled documents to disk.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    #[cfg(test)]
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Save `doc` to `path`, consuming it.
    ///
    /// The parent directory is created if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::FailedToCreateOutput`] if the temporary file
    /// cannot be created and [`DocsError::FailedToWrite`] if serialising or
    /// renaming fails.
    pub async fn save(&self, doc: Document, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();
        let options = self.options.clone();

        task::spawn_blocking(move || write_atomically(doc, path_buf, &options))
            .await
            .map_err(|e| DocsError::other(format!("Write task failed: {e}")))?
    }
}

fn write_atomically(
    mut doc: Document,
    path: PathBuf,
    options: &WriteOptions,
) -> Result<WriteStatistics> {
    let start = Instant::now();

    if options.optimize {
        doc.prune_objects();
        doc.renumber_objects();
    }
    if options.compress {
        doc.compress();
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| DocsError::FailedToCreateOutput {
        path: dir.clone(),
        source: e,
    })?;

    let temp = tempfile::Builder::new()
        .prefix(".merge-")
        .suffix(".pdf")
        .tempfile_in(&dir)
        .map_err(|e| DocsError::FailedToCreateOutput {
            path: path.clone(),
            source: e,
        })?;

    let mut writer = std::io::BufWriter::with_capacity(options.buffer_size, temp);
    doc.save_to(&mut writer)
        .map_err(|e| DocsError::FailedToWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
    writer.flush().map_err(|e| DocsError::FailedToWrite {
        path: path.clone(),
        source: e,
    })?;

    let temp = writer.into_inner().map_err(|e| DocsError::FailedToWrite {
        path: path.clone(),
        source: e.into_error(),
    })?;
    temp.persist(&path).map_err(|e| DocsError::FailedToWrite {
        path: path.clone(),
        source: e.error,
    })?;

    let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    Ok(WriteStatistics {
        write_time: start.elapsed(),
        file_size,
        output_path: path,
    })
}
