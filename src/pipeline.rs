//! Per-student orchestration and the batch tally.
//!
//! Each student folder moves through
//! `discovered → cover_built → files_collected → converted → assembled →
//! cleaned → done`, or ends in `failed`. Students are processed strictly one
//! after another; a failure (or panic) in one never stops the batch.
//!
//! Temporary artifacts of a student (the personalised cover and every
//! converter output) live in a private scratch directory under the output
//! directory and are removed before the next student starts.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::collect::{SourceFile, collect};
use crate::config::Config;
use crate::convert::DocumentConverter;
use crate::cover::CoverGenerator;
use crate::error::{DocsError, Result};
use crate::merge::{AssemblyReport, PdfAssembler};
use crate::roster::RosterIndex;
use crate::utils::sanitize_filename;

/// Where a student job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Folder accepted for processing.
    Discovered,
    /// Personalised cover written.
    CoverBuilt,
    /// Source files listed and ordered.
    FilesCollected,
    /// Word documents being converted and merged.
    Converted,
    /// Merged PDF saved.
    Assembled,
    /// Temporary artifacts removed.
    Cleaned,
    /// Finished successfully.
    Done,
    /// Finished without output.
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovered => "discovered",
            Self::CoverBuilt => "cover_built",
            Self::FilesCollected => "files_collected",
            Self::Converted => "converted",
            Self::Assembled => "assembled",
            Self::Cleaned => "cleaned",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One student folder to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentJob {
    /// Folder holding the student's documents.
    pub folder: PathBuf,
    /// Student name: the folder's last path segment.
    pub name: String,
}

impl StudentJob {
    /// Create a job for `folder`.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { folder, name }
    }

    /// File name of the merged PDF.
    pub fn output_file_name(&self) -> String {
        format!("{}.pdf", sanitize_filename(&self.name))
    }
}

/// Result of one student job.
#[derive(Debug)]
pub struct StudentOutcome {
    /// The job.
    pub job: StudentJob,
    /// Final stage: [`JobStage::Done`] or [`JobStage::Failed`].
    pub stage: JobStage,
    /// Assembly report, or why the student failed.
    pub result: std::result::Result<AssemblyReport, String>,
}

impl StudentOutcome {
    /// Whether a merged PDF was written.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Students with a merged PDF.
    pub success_count: usize,
    /// Students without one.
    pub failed_count: usize,
    /// Per-student outcomes in processing order.
    pub outcomes: Vec<StudentOutcome>,
}

impl BatchSummary {
    /// Number of students processed.
    pub fn total(&self) -> usize {
        self.success_count + self.failed_count
    }

    /// A batch succeeds when at least one student succeeded.
    pub fn is_success(&self) -> bool {
        self.success_count > 0
    }

    fn record(&mut self, outcome: StudentOutcome) {
        if outcome.is_success() {
            self.success_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Runs student jobs against one roster, template and converter.
pub struct StudentPipeline<C> {
    converter: C,
    roster: RosterIndex,
    covers: CoverGenerator,
    output_dir: PathBuf,
}

impl<C: DocumentConverter> StudentPipeline<C> {
    /// Create a pipeline.
    pub fn new(
        converter: C,
        roster: RosterIndex,
        covers: CoverGenerator,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            converter,
            roster,
            covers,
            output_dir: output_dir.into(),
        }
    }

    /// Create a pipeline from a configuration, loading the roster.
    pub fn from_config(config: &Config, converter: C) -> Self {
        Self::new(
            converter,
            RosterIndex::load(&config.roster_file),
            CoverGenerator::new(&config.cover_template),
            &config.output_dir,
        )
    }

    /// Process every folder in order and tally the results.
    pub async fn run_batch(&self, folders: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        info!(
            students = folders.len(),
            output = %self.output_dir.display(),
            template = %self.covers.template().display(),
            "starting batch"
        );

        for folder in folders {
            let job = StudentJob::new(folder);
            let span = info_span!("student", name = %job.name);

            let result = AssertUnwindSafe(self.process(&job).instrument(span.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(DocsError::other(format!(
                        "internal error: {}",
                        panic_message(panic.as_ref())
                    )))
                });

            let stage = match &result {
                Ok(_) => JobStage::Done,
                Err(err) => {
                    span.in_scope(|| error!(stage = %JobStage::Failed, "{err}"));
                    JobStage::Failed
                }
            };

            summary.record(StudentOutcome {
                job,
                stage,
                result: result.map_err(|e| e.to_string()),
            });
        }

        info!(
            success = summary.success_count,
            failed = summary.failed_count,
            total = summary.total(),
            "batch finished"
        );
        summary
    }

    /// Process a single student.
    ///
    /// # Errors
    ///
    /// - [`DocsError::FileNotFound`] / [`DocsError::NotADirectory`] if the
    ///   folder is unusable
    /// - any error from [`PdfAssembler::assemble`]
    pub async fn process(&self, job: &StudentJob) -> Result<AssemblyReport> {
        let mut stage = StageLog::default();

        if !job.folder.exists() {
            return Err(DocsError::file_not_found(&job.folder));
        }
        if !job.folder.is_dir() {
            return Err(DocsError::NotADirectory {
                path: job.folder.clone(),
            });
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|e| DocsError::FailedToCreateOutput {
            path: self.output_dir.clone(),
            source: e,
        })?;
        let scratch = tempfile::Builder::new()
            .prefix(".scratch-")
            .tempdir_in(&self.output_dir)?;

        let cover = self
            .covers
            .generate_for(&self.roster, &job.name, scratch.path());
        if cover.is_some() {
            stage.advance(JobStage::CoverBuilt);
        }

        let mut sources: Vec<SourceFile> = cover.iter().filter_map(SourceFile::new).collect();
        sources.extend(collect(&job.folder));
        stage.advance(JobStage::FilesCollected);
        debug!(sources = sources.len(), "sources ready");

        let output = self.output_dir.join(job.output_file_name());
        stage.advance(JobStage::Converted);
        let result = PdfAssembler::new(&self.converter, scratch.path())
            .assemble(&sources, &output, &job.name)
            .await;
        if result.is_ok() {
            stage.advance(JobStage::Assembled);
        }

        if let Some(cover) = &cover
            && let Err(e) = std::fs::remove_file(cover)
        {
            warn!(path = %cover.display(), "cannot remove cover: {e}");
        }
        if let Err(e) = scratch.close() {
            warn!("cannot remove scratch directory: {e}");
        }
        stage.advance(JobStage::Cleaned);

        let report = result?;
        stage.advance(JobStage::Done);
        Ok(report)
    }
}

/// Logs stage transitions of the current student.
#[derive(Debug)]
struct StageLog(JobStage);

impl Default for StageLog {
    fn default() -> Self {
        debug!(stage = %JobStage::Discovered, "stage");
        Self(JobStage::Discovered)
    }
}

impl StageLog {
    fn advance(&mut self, next: JobStage) {
        debug!(from = %self.0, stage = %next, "stage");
        self.0 = next;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
