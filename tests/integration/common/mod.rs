//! Fixtures shared by the integration tests.
//!
//! Every fixture is synthesised at test time: PDFs with lopdf, `.docx` and
//! `.xlsx` files as minimal zip containers.

#![allow(dead_code)]

use lopdf::{Document, Object, dictionary};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zip::write::SimpleFileOptions;

use degree_docs::convert::{DocumentConverter, expected_output};
use degree_docs::cover::docx::{DOCUMENT_PART, read_paragraphs};
use degree_docs::error::{DocsError, Result};

/// Write a PDF with `pages` blank A4 pages.
pub fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("Failed to write PDF fixture");
}

/// Write a `.docx` whose body holds one paragraph per entry of `paragraphs`.
pub fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|text| format!(r#"<w:p><w:r><w:rPr><w:rFonts w:eastAsia="宋体"/></w:rPr><w:t>{text}</w:t></w:r></w:p>"#))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    write_zip(
        path,
        &[
            ("[Content_Types].xml", "<Types/>".to_string()),
            (DOCUMENT_PART, document),
        ],
    );
}

/// Write an `.xlsx` with a single sheet. Cells starting with `#` are numbers.
pub fn write_xlsx(path: &Path, rows: &[&[&str]]) {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, cells) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in cells.iter().enumerate() {
            let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            match value.strip_prefix('#') {
                Some(number) => {
                    sheet.push_str(&format!(r#"<c r="{reference}"><v>{number}</v></c>"#))
                }
                None => sheet.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#
                )),
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    write_zip(
        path,
        &[
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
            ),
            ("xl/worksheets/sheet1.xml", sheet),
        ],
    );
}

fn write_zip(path: &Path, parts: &[(&str, String)]) {
    let file = std::fs::File::create(path).expect("Failed to create zip fixture");
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in parts {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Roster with 张三 and 李四.
pub fn write_roster(path: &Path) {
    write_xlsx(
        path,
        &[
            &["姓名", "学号", "专业"],
            &["张三", "#2021001", "计算机科学与技术"],
            &["李四", "2021002", "数学"],
        ],
    );
}

/// Cover template with the three labels filled with placeholder values.
pub fn write_cover_template(path: &Path) {
    write_docx(
        path,
        &["硕士学位论文", "姓名：某某", "学号：0000000", "专业：某专业"],
    );
}

/// A converter that never leaves the process.
///
/// Every document becomes a PDF of `pages` pages. Inputs whose name contains
/// `broken` fail; inputs whose name contains `panic` panic.
pub struct FakeConverter {
    pages: usize,
    calls: Mutex<Vec<PathBuf>>,
    paragraphs: Mutex<Vec<Vec<String>>>,
}

impl FakeConverter {
    /// Converter producing `pages` pages per document.
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            calls: Mutex::new(Vec::new()),
            paragraphs: Mutex::new(Vec::new()),
        }
    }

    /// File names converted so far, in call order.
    pub fn converted_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    /// Paragraphs of every converted document, read at conversion time.
    pub fn converted_paragraphs(&self) -> Vec<Vec<String>> {
        self.paragraphs.lock().unwrap().clone()
    }
}

impl DocumentConverter for FakeConverter {
    async fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        self.calls.lock().unwrap().push(input.to_path_buf());
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.contains("panic") {
            panic!("converter crashed on {name}");
        }
        if name.contains("broken") {
            return Err(DocsError::ConversionFailed {
                path: input.to_path_buf(),
                status: "exit status: 1".to_string(),
                stderr: "source file could not be loaded".to_string(),
            });
        }

        let paragraphs = read_paragraphs(input).unwrap_or_default();
        self.paragraphs.lock().unwrap().push(paragraphs);

        let pdf = expected_output(input, output_dir)?;
        write_pdf(&pdf, self.pages);
        Ok(pdf)
    }
}

/// Names of the entries in `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
