//! CLI argument parsing for merge-student-docs.
//!
//! The binary is driven by a web front end that passes the whole request as
//! one JSON argument. The remaining options exist for operators running the
//! tool by hand or from a service unit.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use degree_docs::config::{Config, ConverterSettings, MergeRequest, Verbosity};
use degree_docs::error::{DocsError, Result};

/// Merge each student's degree documents into one bookmarked PDF.
///
/// Every student folder yields `<name>.pdf` in the output directory, starting
/// with a cover generated from the roster and template, followed by the
/// folder's documents in numeric-prefix order.
#[derive(Parser, Debug)]
#[command(name = "merge-student-docs")]
#[command(version)]
#[command(about = "Merge each student's degree documents into one bookmarked PDF", long_about = None)]
pub struct Cli {
    /// JSON request
    ///
    /// Keys: `student_folders` (list of folders or glob patterns),
    /// `output_dir`, and optionally `excel_file` and `cover_template`.
    ///
    /// Example:
    ///   merge-student-docs '{"student_folders": ["/data/张三"], "output_dir": "/data/out"}'
    #[arg(value_name = "JSON")]
    pub request: String,

    /// Directory holding the default roster and cover template
    ///
    /// Defaults to the directory of the executable.
    #[arg(long, value_name = "DIR", env = "DEGREE_DOCS_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Program used to convert word-processor documents to PDF
    #[arg(long, value_name = "PROGRAM", env = "DEGREE_DOCS_CONVERTER", default_value = "soffice")]
    pub converter: String,

    /// Maximum seconds a single conversion may take
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    pub timeout: u64,

    /// Verbose output - log every file, page count and converter run
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Log verbosity selected by the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }

    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request is not a JSON object of the expected shape
    /// - A folder pattern cannot be expanded
    /// - The converter program is empty or the timeout is zero
    pub fn to_config(&self) -> Result<Config> {
        let request = MergeRequest::from_json(&self.request)?;
        let base_dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => executable_dir()?,
        };

        let config = Config::from_request(request, &base_dir)?
            .with_converter(ConverterSettings {
                program: self.converter.clone(),
                timeout: Duration::from_secs(self.timeout),
            })
            .with_verbosity(self.verbosity());

        config.validate()?;
        Ok(config)
    }
}

/// Directory containing the running executable.
fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(PathBuf::from)
        .ok_or_else(|| DocsError::other(format!("executable has no parent: {}", exe.display())))
}
