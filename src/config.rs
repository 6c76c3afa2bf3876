//! Configuration module for degree-docs.
//!
//! This module turns the JSON request handed to the binary, together with the
//! command-line options, into a validated [`Config`] that drives a batch run.
//! It handles:
//! - Parsing of the JSON request
//! - Defaults for the roster, cover template and output directory
//! - Expansion of folder patterns
//! - Converter and verbosity settings

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DocsError, Result};
use crate::utils::expand_folder_patterns;

/// Roster file looked up next to the binary when the request names none.
pub const DEFAULT_ROSTER_FILE: &str = "学号&姓名&专业.xlsx";

/// Cover template looked up next to the binary.
pub const DEFAULT_COVER_TEMPLATE: &str = "通用封面.docx";

/// Output directory used when the request names none.
pub const DEFAULT_OUTPUT_DIR: &str = "./合并后的PDF文件";

/// Conversion program invoked for word-processor documents.
pub const DEFAULT_CONVERTER: &str = "soffice";

/// Upper bound for a single document conversion.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(120);

/// The JSON object passed as the single command-line argument.
///
/// Unknown keys are ignored so that callers may send extra bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MergeRequest {
    /// Student folders to process, in order. Entries may be glob patterns.
    #[serde(default)]
    pub student_folders: Vec<String>,

    /// Destination directory for the merged PDFs.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Roster spreadsheet overriding the default sibling file.
    #[serde(default)]
    pub excel_file: Option<PathBuf>,

    /// Cover template overriding the default sibling file.
    #[serde(default)]
    pub cover_template: Option<PathBuf>,
}

impl MergeRequest {
    /// Parse a request from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::InvalidRequest`] if the text is not a JSON object
    /// with the expected field types.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(DocsError::invalid_request(
                "expected a JSON object with `student_folders` and `output_dir`",
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// How much progress text goes to the log side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    /// Per-student progress.
    #[default]
    Normal,
    /// Per-file detail, including page counts and converter output.
    Verbose,
}

impl Verbosity {
    /// Derive the level from the `--quiet` / `--verbose` flags.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, true) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }

    /// Default `tracing` filter directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
        }
    }
}

/// Settings for the external document converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterSettings {
    /// Program name or path.
    pub program: String,
    /// Maximum time a single conversion may take.
    pub timeout: Duration,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_CONVERTER.to_string(),
            timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

/// Validated configuration for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Student folders in processing order.
    pub student_folders: Vec<PathBuf>,
    /// Directory receiving `<name>.pdf` files; created if absent.
    pub output_dir: PathBuf,
    /// Roster spreadsheet.
    pub roster_file: PathBuf,
    /// Cover template document.
    pub cover_template: PathBuf,
    /// External converter settings.
    pub converter: ConverterSettings,
    /// Log verbosity.
    pub verbosity: Verbosity,
}

impl Config {
    /// Build a configuration from a parsed request.
    ///
    /// `base_dir` is where the default roster and cover template live.
    ///
    /// # Errors
    ///
    /// Returns an error if a folder pattern cannot be expanded.
    pub fn from_request(request: MergeRequest, base_dir: &Path) -> Result<Self> {
        let student_folders = expand_folder_patterns(&request.student_folders)?;

        let output_dir = non_empty(request.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let roster_file =
            non_empty(request.excel_file).unwrap_or_else(|| base_dir.join(DEFAULT_ROSTER_FILE));
        let cover_template = non_empty(request.cover_template)
            .unwrap_or_else(|| base_dir.join(DEFAULT_COVER_TEMPLATE));

        Ok(Self {
            student_folders,
            output_dir,
            roster_file,
            cover_template,
            converter: ConverterSettings::default(),
            verbosity: Verbosity::default(),
        })
    }

    /// Override the converter settings.
    pub fn with_converter(mut self, converter: ConverterSettings) -> Self {
        self.converter = converter;
        self
    }

    /// Override the verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::InvalidRequest`] for an empty converter program or
    /// a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.converter.program.trim().is_empty() {
            return Err(DocsError::invalid_request("converter program is empty"));
        }
        if self.converter.timeout.is_zero() {
            return Err(DocsError::invalid_request(
                "conversion timeout must be positive",
            ));
        }
        Ok(())
    }
}

/// Treat `""` the same as an absent path; callers often send empty strings.
fn non_empty(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}
