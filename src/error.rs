//! Error types for degree-docs.
//!
//! Errors carry the path that caused them and a human-readable reason.
//! Most of them never leave the component that raised them: the roster
//! loader, the converter and the per-source assembly steps log and degrade.
//! Only configuration and output errors abort a student or the batch.
//!
//! # Error Categories
//!
//! - **Configuration**: malformed request, roster or cover template problems
//! - **External tool**: converter missing, failing, timing out or silent
//! - **PDF**: unreadable or encrypted sources, outline and metadata failures
//! - **I/O**: missing folders, failed writes

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for degree-docs operations.
pub type Result<T> = std::result::Result<T, DocsError>;

/// Main error type for degree-docs operations.
#[derive(Debug, thiserror::Error)]
pub enum DocsError {
    /// The JSON request could not be understood.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request.
        message: String,
    },

    /// A file or directory was not found.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path that does not exist.
        path: PathBuf,
    },

    /// A path exists but is not a directory.
    #[error("Not a directory: {}", path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// The roster spreadsheet could not be read.
    #[error("Failed to read roster: {}\n  Reason: {reason}", path.display())]
    RosterUnreadable {
        /// Path to the roster.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The roster lacks one or more required columns.
    #[error("Roster {} is missing required columns: {}", path.display(), missing.join(", "))]
    MissingColumns {
        /// Path to the roster.
        path: PathBuf,
        /// Names of the missing columns.
        missing: Vec<String>,
    },

    /// The cover template does not exist.
    #[error("Cover template not found: {}", path.display())]
    TemplateNotFound {
        /// Expected template path.
        path: PathBuf,
    },

    /// The cover template is not a usable word-processor document.
    #[error("Malformed cover template: {}\n  Reason: {reason}", path.display())]
    MalformedTemplate {
        /// Template path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The conversion program is not installed or not on the search path.
    #[error(
        "Document converter `{program}` was not found\n  \
         Hint: install LibreOffice and make sure `{program}` is on PATH"
    )]
    ConverterNotFound {
        /// Program that was invoked.
        program: String,
    },

    /// The converter exited unsuccessfully.
    #[error("Conversion of {} failed ({status})\n  stderr: {stderr}", path.display())]
    ConversionFailed {
        /// Input document.
        path: PathBuf,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The converter did not finish in time.
    #[error("Conversion of {} timed out after {}s", path.display(), timeout.as_secs())]
    ConversionTimedOut {
        /// Input document.
        path: PathBuf,
        /// Configured timeout.
        timeout: Duration,
    },

    /// The converter reported success but produced nothing.
    #[error("Converter exited successfully but {} was not produced", expected.display())]
    ConvertedOutputMissing {
        /// Where the PDF should have been.
        expected: PathBuf,
    },

    /// Failed to load PDF file.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", path.display())]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// PDF file is encrypted and cannot be processed.
    #[error(
        "PDF is encrypted and cannot be processed: {}\n  \
         Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools",
        path.display()
    )]
    EncryptedPdf {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// Not a single page could be merged for a student.
    #[error("No pages to merge for {}", output.display())]
    NothingToMerge {
        /// The output that would have been written.
        output: PathBuf,
    },

    /// Failed to create the output file.
    #[error("Failed to create output file: {}\n  Reason: {source}", path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to write to output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The document outline could not be written.
    #[error("Failed to write bookmarks: {reason}")]
    OutlineFailed {
        /// Details about the failure.
        reason: String,
    },

    /// Metadata operation failed.
    #[error("Failed to set metadata: {reason}")]
    MetadataFailed {
        /// Details about the failure.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for DocsError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<serde_json::Error> for DocsError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_request(err.to_string())
    }
}

impl From<zip::result::ZipError> for DocsError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::other(format!("zip: {err}"))
    }
}

impl From<quick_xml::Error> for DocsError {
    fn from(err: quick_xml::Error) -> Self {
        Self::other(format!("xml: {err}"))
    }
}

impl DocsError {
    /// Create an InvalidRequest error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a MalformedTemplate error.
    pub fn malformed_template(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an OutlineFailed error.
    pub fn outline_failed(reason: impl Into<String>) -> Self {
        Self::OutlineFailed {
            reason: reason.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error only affects a single source file.
    ///
    /// Recoverable errors make the assembler skip the file and carry on with
    /// its siblings.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConverterNotFound { .. }
                | Self::ConversionFailed { .. }
                | Self::ConversionTimedOut { .. }
                | Self::ConvertedOutputMissing { .. }
                | Self::FailedToLoadPdf { .. }
                | Self::EncryptedPdf { .. }
                | Self::OutlineFailed { .. }
                | Self::MetadataFailed { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidRequest { .. } => 1,
            Self::FileNotFound { .. } | Self::NotADirectory { .. } => 2,
            Self::RosterUnreadable { .. }
            | Self::MissingColumns { .. }
            | Self::TemplateNotFound { .. }
            | Self::MalformedTemplate { .. } => 1,
            Self::ConverterNotFound { .. }
            | Self::ConversionFailed { .. }
            | Self::ConversionTimedOut { .. }
            | Self::ConvertedOutputMissing { .. } => 7,
            Self::FailedToLoadPdf { .. } | Self::EncryptedPdf { .. } => 3,
            Self::NothingToMerge { .. } => 6,
            Self::FailedToCreateOutput { .. } | Self::FailedToWrite { .. } | Self::Io(_) => 5,
            Self::OutlineFailed { .. } | Self::MetadataFailed { .. } => 6,
            Self::Other { .. } => 1,
        }
    }
}
