//! WordprocessingML paragraph rewriting.
//!
//! A `.docx` is a zip container; the body text lives in `word/document.xml`.
//! Every `<w:p>` (body paragraphs and table-cell paragraphs alike) is buffered,
//! its text is assembled from its `<w:t>` runs, and if field substitution
//! changes that text the paragraph is re-emitted with its properties, the
//! formatting of its first text run, and a single run holding the new text.
//! Paragraphs that substitution does not change are written back untouched.
//! All other container parts are copied without recompression.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::fields::CoverFields;
use crate::error::{DocsError, Result};

/// Container part holding the document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

const PARAGRAPH: &[u8] = b"w:p";
const PARAGRAPH_PROPS: &[u8] = b"w:pPr";
const RUN: &[u8] = b"w:r";
const RUN_PROPS: &[u8] = b"w:rPr";
const TEXT: &[u8] = b"w:t";

/// Copy `template` into `out`, rewriting labelled fields in the body.
///
/// Returns the writer back together with the number of paragraphs that were
/// rewritten.
///
/// # Errors
///
/// Returns [`DocsError::MalformedTemplate`] if the template is not a zip
/// container with a `word/document.xml` part or the XML is unbalanced, and
/// I/O errors from reading or writing.
pub fn rewrite_docx<W: Write + Seek>(
    template: &Path,
    fields: &CoverFields,
    out: W,
) -> Result<(W, usize)> {
    let malformed = |reason: String| DocsError::malformed_template(template, reason);

    let file = File::open(template)?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| malformed(e.to_string()))?;
    let mut writer = ZipWriter::new(out);
    let mut rewritten = None;

    for idx in 0..archive.len() {
        let is_document = archive.by_index_raw(idx)?.name() == DOCUMENT_PART;
        if !is_document {
            writer.raw_copy_file(archive.by_index_raw(idx)?)?;
            continue;
        }

        let mut xml = String::new();
        archive
            .by_index(idx)?
            .read_to_string(&mut xml)
            .map_err(|e| malformed(format!("{DOCUMENT_PART}: {e}")))?;

        let (new_xml, count) =
            rewrite_document_xml(&xml, fields).map_err(|e| malformed(e.to_string()))?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(DOCUMENT_PART, options)?;
        writer.write_all(new_xml.as_bytes())?;
        rewritten = Some(count);
    }

    let count = rewritten.ok_or_else(|| malformed(format!("missing {DOCUMENT_PART}")))?;
    let out = writer.finish()?;
    Ok((out, count))
}

/// Rewrite the labelled fields of a `word/document.xml` body.
///
/// Returns the new XML and the number of rewritten paragraphs.
pub fn rewrite_document_xml(xml: &str, fields: &CoverFields) -> Result<(String, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    // One buffer per open paragraph; nested paragraphs (text boxes) collapse
    // into their parent once closed.
    let mut open: Vec<Vec<Event<'static>>> = Vec::new();
    let mut rewritten = 0;

    loop {
        let event = reader.read_event()?;
        let (opens, closes) = match &event {
            Event::Eof => break,
            Event::Start(e) => (e.name().as_ref() == PARAGRAPH, false),
            Event::End(e) => (false, e.name().as_ref() == PARAGRAPH),
            _ => (false, false),
        };

        if opens {
            open.push(vec![event.into_owned()]);
        } else if closes {
            let mut paragraph = open
                .pop()
                .ok_or_else(|| DocsError::other("unbalanced </w:p>"))?;
            paragraph.push(event.into_owned());

            let paragraph = match rewrite_paragraph(&paragraph, fields) {
                Some(replacement) => {
                    rewritten += 1;
                    replacement
                }
                None => paragraph,
            };
            emit(&mut open, &mut writer, paragraph)?;
        } else {
            emit(&mut open, &mut writer, vec![event.into_owned()])?;
        }
    }

    if !open.is_empty() {
        return Err(DocsError::other("unclosed <w:p>"));
    }

    let xml = String::from_utf8(writer.into_inner())
        .map_err(|e| DocsError::other(format!("rewritten XML is not UTF-8: {e}")))?;
    Ok((xml, rewritten))
}

/// Read the text of every paragraph of a `.docx`, in document order.
///
/// Paragraphs that contain other paragraphs contribute only their inner
/// paragraphs.
pub fn read_paragraphs(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| DocsError::malformed_template(path, e.to_string()))?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut open: Vec<Vec<Event<'static>>> = Vec::new();
    let mut texts = Vec::new();

    loop {
        let event = reader.read_event()?;
        let (opens, closes) = match &event {
            Event::Eof => break,
            Event::Start(e) => (e.name().as_ref() == PARAGRAPH, false),
            Event::End(e) => (false, e.name().as_ref() == PARAGRAPH),
            _ => (false, false),
        };

        if opens {
            open.push(vec![event.into_owned()]);
        } else if closes {
            let mut paragraph = open
                .pop()
                .ok_or_else(|| DocsError::other("unbalanced </w:p>"))?;
            paragraph.push(event.into_owned());
            if let Some(text) = paragraph_text(&paragraph) {
                texts.push(text);
            }
            if let Some(parent) = open.last_mut() {
                parent.extend(paragraph);
            }
        } else if let Some(parent) = open.last_mut() {
            parent.push(event.into_owned());
        }
    }

    Ok(texts)
}

fn emit(
    open: &mut [Vec<Event<'static>>],
    writer: &mut Writer<Vec<u8>>,
    events: Vec<Event<'static>>,
) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.extend(events),
        None => {
            for event in events {
                writer.write_event(event)?;
            }
        }
    }
    Ok(())
}

/// Build the replacement for a paragraph, or `None` to keep it as it is.
fn rewrite_paragraph(
    paragraph: &[Event<'static>],
    fields: &CoverFields,
) -> Option<Vec<Event<'static>>> {
    let text = paragraph_text(paragraph)?;
    if !CoverFields::matches(&text) {
        return None;
    }

    let new_text = fields.substitute(&text);
    if new_text == text {
        return None;
    }

    let (first, rest) = paragraph.split_first()?;
    let last = rest.last()?;

    let mut out = vec![first.clone()];
    out.extend(child_element(paragraph, PARAGRAPH_PROPS));
    out.push(Event::Start(BytesStart::new("w:r")));
    out.extend(first_text_run_props(paragraph));
    out.push(Event::Start(
        BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
    ));
    out.push(Event::Text(BytesText::new(&new_text).into_owned()));
    out.push(Event::End(BytesEnd::new("w:t")));
    out.push(Event::End(BytesEnd::new("w:r")));
    out.push(last.clone());
    Some(out)
}

/// Concatenated `<w:t>` text of a buffered paragraph.
///
/// `None` when the paragraph contains another paragraph or its text cannot
/// be decoded; such paragraphs are never rewritten.
fn paragraph_text(paragraph: &[Event<'_>]) -> Option<String> {
    let mut text = String::new();
    let mut in_text = false;

    for (idx, event) in paragraph.iter().enumerate() {
        match event {
            Event::Start(e) if idx > 0 && e.name().as_ref() == PARAGRAPH => return None,
            Event::Start(e) if e.name().as_ref() == TEXT => in_text = true,
            Event::End(e) if e.name().as_ref() == TEXT => in_text = false,
            Event::Text(t) if in_text => text.push_str(&t.unescape().ok()?),
            Event::CData(c) if in_text => text.push_str(std::str::from_utf8(c).ok()?),
            _ => {}
        }
    }

    Some(text)
}

/// Run properties of the first run that carries text.
fn first_text_run_props(paragraph: &[Event<'static>]) -> Vec<Event<'static>> {
    let mut idx = 1;
    while idx < paragraph.len() {
        if is_start(&paragraph[idx], RUN) {
            let end = matching_end(paragraph, idx);
            let run = &paragraph[idx..=end];
            if run.iter().any(|event| is_start(event, TEXT)) {
                return child_element(run, RUN_PROPS);
            }
            idx = end + 1;
        } else {
            idx += 1;
        }
    }
    Vec::new()
}

/// The first element named `name` below the opening event of `events`.
fn child_element(events: &[Event<'static>], name: &[u8]) -> Vec<Event<'static>> {
    for (idx, event) in events.iter().enumerate().skip(1) {
        match event {
            Event::Empty(e) if e.name().as_ref() == name => return vec![event.clone()],
            Event::Start(e) if e.name().as_ref() == name => {
                let end = matching_end(events, idx);
                return events[idx..=end].to_vec();
            }
            _ => {}
        }
    }
    Vec::new()
}

fn is_start(event: &Event<'_>, name: &[u8]) -> bool {
    matches!(event, Event::Start(e) if e.name().as_ref() == name)
}

/// Index of the end tag matching the start tag at `start`.
fn matching_end(events: &[Event<'_>], start: usize) -> usize {
    let Event::Start(opening) = &events[start] else {
        return start;
    };
    let name = opening.name();
    let mut depth = 0usize;

    for (idx, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(e) if e.name() == name => depth += 1,
            Event::End(e) if e.name() == name => {
                depth -= 1;
                if depth == 0 {
                    return idx;
                }
            }
            _ => {}
        }
    }
    events.len() - 1
}
