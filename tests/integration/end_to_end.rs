//! One student from folder to bookmarked PDF.

use lopdf::Document;
use std::path::Path;
use tempfile::TempDir;

use degree_docs::cover::CoverGenerator;
use degree_docs::merge::{Bookmark, BookmarkManager, MetadataManager, OutlineOutcome};
use degree_docs::pipeline::{StudentJob, StudentPipeline};
use degree_docs::roster::RosterIndex;

use crate::common::{
    FakeConverter, dir_entries, write_cover_template, write_docx, write_pdf, write_roster,
};

struct Workspace {
    _root: TempDir,
    roster: std::path::PathBuf,
    template: std::path::PathBuf,
    students: std::path::PathBuf,
    output: std::path::PathBuf,
}

fn workspace() -> Workspace {
    let root = TempDir::new().unwrap();
    let roster = root.path().join("学号&姓名&专业.xlsx");
    let template = root.path().join("通用封面.docx");
    write_roster(&roster);
    write_cover_template(&template);

    let students = root.path().join("students");
    std::fs::create_dir(&students).unwrap();
    let output = root.path().join("合并后的PDF文件");

    Workspace {
        roster,
        template,
        students,
        output,
        _root: root,
    }
}

fn student_folder(ws: &Workspace, name: &str) -> std::path::PathBuf {
    let folder = ws.students.join(name);
    std::fs::create_dir(&folder).unwrap();
    folder
}

fn pipeline<'a>(ws: &Workspace, converter: &'a FakeConverter) -> StudentPipeline<&'a FakeConverter> {
    StudentPipeline::new(
        converter,
        RosterIndex::load(&ws.roster),
        CoverGenerator::new(&ws.template),
        &ws.output,
    )
}

fn outline(path: &Path) -> Vec<Bookmark> {
    let doc = Document::load(path).unwrap();
    BookmarkManager::new().read_outline(&doc)
}

#[tokio::test]
async fn test_cover_thesis_and_review_are_merged_in_order() {
    let ws = workspace();
    let folder = student_folder(&ws, "张三");
    write_docx(&folder.join("1_thesis.docx"), &["论文正文"]);
    write_pdf(&folder.join("2_review.pdf"), 1);
    let converter = FakeConverter::new(2);

    let report = pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    assert_eq!(report.output, ws.output.join("张三.pdf"));
    assert_eq!(report.page_count, 5);
    assert_eq!(report.outline, OutlineOutcome::Bulk(3));
    assert!(report.skipped.is_empty());

    let saved = outline(&report.output);
    let titles: Vec<&str> = saved.iter().map(|b| b.title.as_str()).collect();
    let pages: Vec<u32> = saved.iter().map(|b| b.target_page).collect();
    assert_eq!(titles, vec!["封面_张三", "1_thesis", "2_review"]);
    assert_eq!(pages, vec![1, 3, 5]);

    let doc = Document::load(&report.output).unwrap();
    assert_eq!(doc.get_pages().len(), 5);
    let metadata = MetadataManager::new().get_metadata(&doc);
    assert_eq!(metadata.title.as_deref(), Some("张三的论文材料"));
}

#[tokio::test]
async fn test_cover_carries_roster_fields() {
    let ws = workspace();
    let folder = student_folder(&ws, "张三");
    write_pdf(&folder.join("1_review.pdf"), 1);
    let converter = FakeConverter::new(1);

    pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    assert_eq!(converter.converted_names(), vec!["封面_张三.docx"]);
    let cover = &converter.converted_paragraphs()[0];
    assert!(cover.contains(&"姓名：张三".to_string()), "{cover:?}");
    assert!(cover.contains(&"学号：2021001".to_string()), "{cover:?}");
    assert!(cover.contains(&"专业：计算机科学与技术".to_string()), "{cover:?}");
    assert!(!cover.iter().any(|p| p.contains("某某")));
}

#[tokio::test]
async fn test_temporary_files_are_removed() {
    let ws = workspace();
    let folder = student_folder(&ws, "张三");
    write_docx(&folder.join("1_thesis.docx"), &["论文正文"]);
    write_pdf(&folder.join("2_review.pdf"), 1);
    let before = dir_entries(&folder);
    let converter = FakeConverter::new(2);

    pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    assert_eq!(dir_entries(&ws.output), vec!["张三.pdf"]);
    assert_eq!(dir_entries(&folder), before);
}

#[tokio::test]
async fn test_student_missing_from_roster_gets_no_cover() {
    let ws = workspace();
    let folder = student_folder(&ws, "王五");
    write_pdf(&folder.join("1_thesis.pdf"), 2);
    let converter = FakeConverter::new(1);

    let report = pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    assert!(converter.converted_names().is_empty());
    assert_eq!(report.page_count, 2);
    let saved = outline(&report.output);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title, "1_thesis");
    assert_eq!(saved[0].target_page, 1);
}

#[tokio::test]
async fn test_missing_roster_still_merges_documents() {
    let ws = workspace();
    std::fs::remove_file(&ws.roster).unwrap();
    let folder = student_folder(&ws, "张三");
    write_pdf(&folder.join("1_thesis.pdf"), 1);
    let converter = FakeConverter::new(1);

    let report = pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    assert!(converter.converted_names().is_empty());
    assert_eq!(report.bookmarks.len(), 1);
}

#[tokio::test]
async fn test_failed_conversion_skips_only_that_file() {
    let ws = workspace();
    let folder = student_folder(&ws, "李四");
    write_docx(&folder.join("1_broken.docx"), &["损坏"]);
    write_pdf(&folder.join("2_review.pdf"), 1);
    let converter = FakeConverter::new(1);

    let report = pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    let titles: Vec<String> = report.bookmarks.iter().map(|b| b.title.clone()).collect();
    assert_eq!(titles, vec!["封面_李四", "2_review"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(dir_entries(&ws.output), vec!["李四.pdf"]);
}

#[tokio::test]
async fn test_numeric_prefixes_order_numerically() {
    let ws = workspace();
    let folder = student_folder(&ws, "王五");
    write_pdf(&folder.join("10_appendix.pdf"), 1);
    write_pdf(&folder.join("9_thesis.pdf"), 1);
    write_pdf(&folder.join("notes.pdf"), 1);
    let converter = FakeConverter::new(1);

    let report = pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    let titles: Vec<String> = report.bookmarks.iter().map(|b| b.title.clone()).collect();
    assert_eq!(titles, vec!["9_thesis", "10_appendix", "notes"]);
}

#[tokio::test]
async fn test_existing_output_is_replaced() {
    let ws = workspace();
    let folder = student_folder(&ws, "王五");
    write_pdf(&folder.join("1_thesis.pdf"), 3);
    std::fs::create_dir_all(&ws.output).unwrap();
    std::fs::write(ws.output.join("王五.pdf"), b"stale").unwrap();
    let converter = FakeConverter::new(1);

    pipeline(&ws, &converter)
        .process(&StudentJob::new(&folder))
        .await
        .unwrap();

    let doc = Document::load(ws.output.join("王五.pdf")).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}
