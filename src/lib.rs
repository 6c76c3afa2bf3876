//! degree-docs - Merge per-student degree documents into one bookmarked PDF.
//!
//! For every student folder in a batch, this library:
//!
//! - Looks the student up in a roster spreadsheet
//! - Fills a cover template with the student's name, id and major
//! - Converts word-processor documents to PDF with an external converter
//! - Concatenates cover and documents in numeric-prefix order
//! - Writes one bookmark per source, plus document metadata
//!
//! # Examples
//!
//! ```no_run
//! use degree_docs::config::{Config, MergeRequest};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = MergeRequest::from_json(
//!     r#"{"student_folders": ["/data/张三"], "output_dir": "/data/out"}"#,
//! )?;
//! let config = Config::from_request(request, Path::new("/opt/degree-docs"))?;
//!
//! let summary = degree_docs::run(&config).await?;
//! println!("{} of {} students merged", summary.success_count, summary.total());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collect;
pub mod config;
pub mod convert;
pub mod cover;
pub mod error;
pub mod io;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod roster;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{DocsError, Result};
pub use pipeline::{BatchSummary, StudentPipeline};

use crate::convert::SofficeConverter;
use tracing::debug;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Run a whole batch with the external converter named in `config`.
///
/// Individual student failures are counted in the returned summary and never
/// abort the batch.
///
/// # Errors
///
/// Returns an error only if `config` fails validation.
pub async fn run(config: &Config) -> Result<BatchSummary> {
    config.validate()?;

    let converter = SofficeConverter::new(&config.converter);
    debug!(
        program = converter.program(),
        timeout = ?converter.timeout(),
        "external converter"
    );
    let pipeline = StudentPipeline::from_config(config, converter);
    Ok(pipeline.run_batch(&config.student_folders).await)
}
