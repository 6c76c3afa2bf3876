//! Utilities shared across the pipeline: folder pattern expansion, file name
//! sanitising and PDF text-string encoding.

use crate::{Result, error::DocsError};
use lopdf::{Object, StringFormat};
use std::path::{Path, PathBuf};

/// Name used when sanitising leaves nothing behind.
pub const FALLBACK_FILE_NAME: &str = "unnamed_file";

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];

/// Expand the folder entries of a request into paths.
///
/// An entry naming an existing path is always taken literally, even when it
/// contains glob metacharacters (`[硕士]张三`). Other entries containing
/// metacharacters are expanded, sorted, in the order of the patterns. Plain
/// entries, malformed patterns and patterns matching nothing are kept as
/// given, so that every entry is reported by the pipeline instead of
/// silently vanishing.
///
/// Errors:
/// - Propagates filesystem errors from the glob iterator.
pub fn expand_folder_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        let pattern = pattern.as_ref();
        if !is_pattern(pattern) || Path::new(pattern).exists() {
            resolved_paths.push(PathBuf::from(pattern));
            continue;
        }

        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!(pattern, "not a valid folder pattern, using it as a path: {err}");
                resolved_paths.push(PathBuf::from(pattern));
                continue;
            }
        };

        let mut matched = Vec::new();
        for entry in paths {
            let path = entry.map_err(|err| DocsError::Other {
                message: err.to_string(),
            })?;
            matched.push(path);
        }

        if matched.is_empty() {
            tracing::warn!(pattern, "folder pattern matched nothing");
            resolved_paths.push(PathBuf::from(pattern));
            continue;
        }
        matched.sort();
        resolved_paths.extend(matched);
    }

    Ok(resolved_paths)
}

fn is_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Make a student name safe to use as a file name.
///
/// Control characters and `< > : " | ? * \ /` become `_`, leading and
/// trailing spaces and dots are stripped, and an empty result becomes
/// [`FALLBACK_FILE_NAME`]. Non-ASCII text (CJK names) is preserved.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Encode text as a PDF text string.
///
/// ASCII stays a literal string; anything else is written as UTF-16BE with a
/// byte order mark so that viewers render CJK titles correctly.
pub fn pdf_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFE, 0xFF]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decode a PDF text string written by [`pdf_text_string`] (or any
/// UTF-16BE/ASCII string).
pub fn decode_pdf_text(bytes: &[u8]) -> Option<String> {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        _ => String::from_utf8(bytes.to_vec()).ok(),
    }
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
