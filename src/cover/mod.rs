//! Cover generation.
//!
//! A cover is the student's copy of the shared template with the name, id
//! and major fields filled in. It is written next to the other temporary
//! artifacts of the student job and converted to PDF like any other word
//! document, so that it lands on page 1 of the merged output.

pub mod docx;
pub mod fields;

pub use fields::CoverFields;

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{DocsError, Result};
use crate::roster::{RosterEntry, RosterIndex};
use crate::utils::sanitize_filename;

/// Prefix of every generated cover file name.
pub const COVER_FILE_PREFIX: &str = "封面_";

/// Fills the cover template for individual students.
#[derive(Debug, Clone)]
pub struct CoverGenerator {
    template: PathBuf,
}

impl CoverGenerator {
    /// Create a generator for the given template.
    pub fn new(template: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The template this generator fills.
    pub fn template(&self) -> &Path {
        &self.template
    }

    /// File name of the cover generated for `name`.
    pub fn cover_file_name(name: &str) -> String {
        format!("{COVER_FILE_PREFIX}{}.docx", sanitize_filename(name))
    }

    /// Generate a cover for `entry` inside `output_dir`.
    ///
    /// The document is written to a temporary file in `output_dir` and only
    /// renamed to its final name once complete, so a failure never leaves a
    /// half-written cover behind.
    ///
    /// # Errors
    ///
    /// - [`DocsError::TemplateNotFound`] if the template does not exist
    /// - [`DocsError::MalformedTemplate`] if it is not a `.docx` container
    /// - I/O errors while writing the cover
    pub fn generate(&self, entry: &RosterEntry, output_dir: &Path) -> Result<PathBuf> {
        if !self.template.is_file() {
            return Err(DocsError::TemplateNotFound {
                path: self.template.clone(),
            });
        }

        std::fs::create_dir_all(output_dir)?;
        let output = output_dir.join(Self::cover_file_name(&entry.name));

        let scratch = tempfile::Builder::new()
            .prefix(".cover-")
            .suffix(".docx")
            .tempfile_in(output_dir)?;

        let fields = CoverFields::from(entry);
        let (scratch, rewritten) = docx::rewrite_docx(&self.template, &fields, scratch)?;
        if rewritten == 0 {
            warn!(
                template = %self.template.display(),
                "template has no 姓名/学号/专业 fields to fill"
            );
        }

        scratch
            .persist(&output)
            .map_err(|e| DocsError::FailedToWrite {
                path: output.clone(),
                source: e.error,
            })?;

        debug!(paragraphs = rewritten, path = %output.display(), "cover written");
        Ok(output)
    }

    /// Look `name` up in the roster and generate its cover.
    ///
    /// Returns `None` when the student is not in the roster or generation
    /// fails; the cause is logged and the student is merged without a cover.
    pub fn generate_for(
        &self,
        roster: &RosterIndex,
        name: &str,
        output_dir: &Path,
    ) -> Option<PathBuf> {
        let Some(entry) = roster.get(name) else {
            warn!(student = name, "not found in roster; skipping cover");
            return None;
        };

        match self.generate(entry, output_dir) {
            Ok(path) => {
                info!(student = name, "cover generated");
                Some(path)
            }
            Err(err) => {
                warn!(student = name, "cover generation failed: {err}");
                None
            }
        }
    }
}
