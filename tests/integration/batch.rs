//! Batches of students and the batch tally.

use std::path::PathBuf;
use tempfile::TempDir;

use degree_docs::config::{Config, MergeRequest};
use degree_docs::cover::CoverGenerator;
use degree_docs::pipeline::{JobStage, StudentPipeline};
use degree_docs::roster::RosterIndex;

use crate::common::{FakeConverter, dir_entries, write_cover_template, write_pdf, write_roster};

struct Batch {
    root: TempDir,
    output: PathBuf,
}

impl Batch {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        write_roster(&root.path().join("roster.xlsx"));
        write_cover_template(&root.path().join("cover.docx"));
        let output = root.path().join("out");
        Self { root, output }
    }

    fn student(&self, name: &str, pdfs: &[(&str, usize)]) -> PathBuf {
        let folder = self.root.path().join(name);
        std::fs::create_dir(&folder).unwrap();
        for (file, pages) in pdfs {
            write_pdf(&folder.join(file), *pages);
        }
        folder
    }

    fn pipeline<'a>(&self, converter: &'a FakeConverter) -> StudentPipeline<&'a FakeConverter> {
        StudentPipeline::new(
            converter,
            RosterIndex::load(&self.root.path().join("roster.xlsx")),
            CoverGenerator::new(self.root.path().join("cover.docx")),
            &self.output,
        )
    }
}

#[tokio::test]
async fn test_missing_folder_counts_as_failed() {
    let batch = Batch::new();
    let folders = vec![
        batch.student("张三", &[("1_thesis.pdf", 2)]),
        batch.root.path().join("不存在"),
        batch.student("李四", &[("1_thesis.pdf", 1)]),
    ];
    let converter = FakeConverter::new(1);

    let summary = batch.pipeline(&converter).run_batch(&folders).await;

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.total(), 3);
    assert!(summary.is_success());
    assert_eq!(dir_entries(&batch.output), vec!["张三.pdf", "李四.pdf"]);

    let stages: Vec<JobStage> = summary.outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(stages, vec![JobStage::Done, JobStage::Failed, JobStage::Done]);
    let failure = summary.outcomes[1].result.as_ref().unwrap_err();
    assert!(failure.contains("不存在"), "{failure}");
}

#[tokio::test]
async fn test_batch_without_any_success_fails() {
    let batch = Batch::new();
    let folders = vec![
        batch.root.path().join("missing"),
        batch.student("王五", &[]),
    ];
    let converter = FakeConverter::new(1);

    let summary = batch.pipeline(&converter).run_batch(&folders).await;

    assert_eq!(summary.success_count, 0);
    assert_eq!(summary.failed_count, 2);
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_empty_batch_is_not_a_success() {
    let batch = Batch::new();
    let converter = FakeConverter::new(1);

    let summary = batch.pipeline(&converter).run_batch(&[]).await;

    assert_eq!(summary.total(), 0);
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_file_in_place_of_folder_counts_as_failed() {
    let batch = Batch::new();
    let not_a_folder = batch.root.path().join("张三.txt");
    std::fs::write(&not_a_folder, "not a folder").unwrap();
    let folders = vec![not_a_folder, batch.student("李四", &[("a.pdf", 1)])];
    let converter = FakeConverter::new(1);

    let summary = batch.pipeline(&converter).run_batch(&folders).await;

    assert_eq!((summary.success_count, summary.failed_count), (1, 1));
}

#[tokio::test]
async fn test_panicking_student_does_not_stop_batch() {
    let batch = Batch::new();
    let crashing = batch.student("王五", &[]);
    std::fs::write(crashing.join("1_panic.docx"), b"not really a docx").unwrap();
    let folders = vec![crashing, batch.student("张三", &[("1_thesis.pdf", 1)])];
    let converter = FakeConverter::new(1);

    let summary = batch.pipeline(&converter).run_batch(&folders).await;

    assert_eq!((summary.success_count, summary.failed_count), (1, 1));
    let failure = summary.outcomes[0].result.as_ref().unwrap_err();
    assert!(failure.contains("converter crashed"), "{failure}");
    assert_eq!(dir_entries(&batch.output), vec!["张三.pdf"]);
}

#[tokio::test]
async fn test_students_run_in_request_order() {
    let batch = Batch::new();
    let folders = vec![
        batch.student("李四", &[("1.pdf", 1)]),
        batch.student("张三", &[("1.pdf", 1)]),
    ];
    let converter = FakeConverter::new(1);

    let summary = batch.pipeline(&converter).run_batch(&folders).await;

    let names: Vec<&str> = summary.outcomes.iter().map(|o| o.job.name.as_str()).collect();
    assert_eq!(names, vec!["李四", "张三"]);
    assert_eq!(
        converter.converted_names(),
        vec!["封面_李四.docx", "封面_张三.docx"]
    );
}

#[tokio::test]
async fn test_every_requested_folder_is_tallied() {
    let batch = Batch::new();
    let bracketed = batch.student("[硕士]张三", &[("1_thesis.pdf", 1)]);
    let unmatched = format!("{}/*_nobody", batch.root.path().display());
    let request = MergeRequest {
        student_folders: vec![bracketed.to_string_lossy().into_owned(), unmatched],
        ..Default::default()
    };
    let config = Config::from_request(request, batch.root.path()).unwrap();
    let converter = FakeConverter::new(1);

    let summary = batch.pipeline(&converter).run_batch(&config.student_folders).await;

    assert_eq!(summary.total(), 2);
    assert_eq!((summary.success_count, summary.failed_count), (1, 1));
    assert_eq!(summary.outcomes[0].job.name, "[硕士]张三");
    assert_eq!(dir_entries(&batch.output), vec!["[硕士]张三.pdf"]);
}
