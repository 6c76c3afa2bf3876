//! merge-student-docs - Merge each student's degree documents into one PDF.
//!
//! Prints exactly one JSON line on stdout: `{"success":true|false}`, or
//! `{"success":false,"error":"..."}` when the run could not complete. Logs
//! go to stderr.

mod cli;

use anyhow::Context;
use clap::Parser;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::process;
use tracing::{error, info};

use crate::cli::Cli;
use degree_docs::{BatchSummary, DocsError, logging};

/// The single line written to stdout.
#[derive(Debug, Serialize)]
struct Outcome {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Outcome {
    fn finished(success: bool) -> Self {
        Self {
            success,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(line) => println!("{line}"),
            Err(_) => println!(r#"{{"success":false}}"#),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            Outcome::failed(err.to_string().trim_end()).emit();
            process::exit(2);
        }
    };

    if let Err(err) = logging::init(cli.verbosity()) {
        eprintln!("{err}");
    }

    match AssertUnwindSafe(run(&cli)).catch_unwind().await {
        Ok(Ok(summary)) => Outcome::finished(summary.is_success()).emit(),
        Ok(Err(err)) => {
            error!("{err:#}");
            Outcome::failed(format!("{err:#}")).emit();
            process::exit(exit_code(&err));
        }
        Err(_) => {
            Outcome::failed("internal error").emit();
            process::exit(101);
        }
    }
}

/// Main application logic.
async fn run(cli: &Cli) -> anyhow::Result<BatchSummary> {
    let config = cli.to_config().context("cannot read request")?;
    info!(
        "{} v{}: {} student folder(s)",
        degree_docs::NAME,
        degree_docs::VERSION,
        config.student_folders.len()
    );

    let summary = degree_docs::run(&config).await?;
    if !summary.is_success() {
        info!("no student document was merged");
    }
    Ok(summary)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<DocsError>()
        .map_or(1, DocsError::exit_code)
}
