//! Word document to PDF conversion.
//!
//! Conversion is delegated to an external office suite running headless.
//! A conversion only counts as successful when the converter exits cleanly
//! *and* the expected `<stem>.pdf` exists in the output directory afterwards.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ConverterSettings;
use crate::error::{DocsError, Result};

/// Turns a word-processor document into a PDF.
pub trait DocumentConverter {
    /// Convert `input` and return the path of the PDF written into
    /// `output_dir`.
    fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf>> + Send;
}

impl<C: DocumentConverter> DocumentConverter for &C {
    fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf>> + Send {
        (**self).convert(input, output_dir)
    }
}

/// Path at which a converter is expected to leave the PDF for `input`.
pub fn expected_output(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| DocsError::other(format!("{} has no file name", input.display())))?;
    let mut name = stem.to_os_string();
    name.push(".pdf");
    Ok(output_dir.join(name))
}

/// Convert `input`, logging the cause and returning `None` on failure.
pub async fn convert_or_skip<C: DocumentConverter>(
    converter: &C,
    input: &Path,
    output_dir: &Path,
) -> Option<PathBuf> {
    match converter.convert(input, output_dir).await {
        Ok(pdf) => {
            debug!(input = %input.display(), output = %pdf.display(), "converted");
            Some(pdf)
        }
        Err(err) => {
            warn!("skipping {}: {err}", input.display());
            None
        }
    }
}

/// LibreOffice (`soffice`) running in headless batch mode.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: String,
    timeout: Duration,
}

impl SofficeConverter {
    /// Create a converter from the configured settings.
    pub fn new(settings: &ConverterSettings) -> Self {
        Self {
            program: settings.program.clone(),
            timeout: settings.timeout,
        }
    }

    /// Program that is invoked.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Upper bound for one conversion.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, input: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new(&ConverterSettings::default())
    }
}

impl DocumentConverter for SofficeConverter {
    async fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let expected = expected_output(input, output_dir)?;
        // A leftover from an earlier input with the same stem must not pass
        // for this conversion's output.
        match std::fs::remove_file(&expected) {
            Ok(()) => debug!(path = %expected.display(), "removed stale output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(DocsError::Io(e)),
        }

        debug!(
            program = %self.program,
            input = %input.display(),
            outdir = %output_dir.display(),
            "starting conversion"
        );

        let child = self
            .command(input, output_dir)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DocsError::ConverterNotFound {
                    program: self.program.clone(),
                },
                _ => DocsError::Io(e),
            })?;

        // Dropping the pending wait on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DocsError::ConversionTimedOut {
                path: input.to_path_buf(),
                timeout: self.timeout,
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim(), "converter output");
        }

        if !output.status.success() {
            return Err(DocsError::ConversionFailed {
                path: input.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !expected.is_file() {
            return Err(DocsError::ConvertedOutputMissing { expected });
        }

        Ok(expected)
    }
}
