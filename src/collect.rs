//! Source file discovery for one student folder.
//!
//! Only the top level of the folder is scanned. Hidden entries and anything
//! that is not a regular file (after following symlinks) are ignored. Files
//! whose name starts with digits come first, ordered by that number's value
//! so that `9_x` precedes `10_y`; the rest follow in name order.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// How a source file is brought into the merged PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Already a PDF; merged as is.
    Pdf,
    /// `.doc` / `.docx`; converted first.
    WordDocument,
    /// Anything else; skipped.
    Unsupported,
}

impl SourceKind {
    /// Classify a lowercase extension.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "pdf" => Self::Pdf,
            "doc" | "docx" => Self::WordDocument,
            _ => Self::Unsupported,
        }
    }
}

/// Decimal digits compared by value, without overflow for long prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericPrefix(String);

impl NumericPrefix {
    fn parse(file_name: &str) -> Option<Self> {
        let end = file_name
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(file_name.len());
        if end == 0 {
            return None;
        }
        let digits = file_name[..end].trim_start_matches('0');
        Some(Self(digits.to_string()))
    }

    /// The prefix value when it fits in a `u64`.
    #[cfg(test)]
    pub fn value(&self) -> Option<u64> {
        if self.0.is_empty() {
            return Some(0);
        }
        self.0.parse().ok()
    }
}

impl Ord for NumericPrefix {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for NumericPrefix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key of a source file. Numbered files order before named ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderKey {
    /// File name starts with digits.
    Numbered(NumericPrefix, String),
    /// Any other file name.
    Named(String),
}

impl OrderKey {
    /// Compute the key of a file name.
    pub fn for_file_name(file_name: &str) -> Self {
        match NumericPrefix::parse(file_name) {
            Some(prefix) => Self::Numbered(prefix, file_name.to_string()),
            None => Self::Named(file_name.to_string()),
        }
    }
}

/// A file considered for merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path.
    pub path: PathBuf,
    /// Lowercase extension without the dot; empty if there is none.
    pub extension: String,
    /// Position in the merge order.
    pub order_key: OrderKey,
}

impl SourceFile {
    /// Describe the file at `path`.
    ///
    /// Returns `None` if the file name is not valid UTF-8.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let file_name = path.file_name()?.to_str()?.to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        Some(Self {
            order_key: OrderKey::for_file_name(&file_name),
            path,
            extension,
        })
    }

    /// How this file is merged.
    pub fn kind(&self) -> SourceKind {
        SourceKind::from_extension(&self.extension)
    }

    /// File name without extension; used as the bookmark title.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// List the source files of `folder` in merge order.
///
/// An absent or unreadable folder yields an empty list.
pub fn collect(folder: &Path) -> Vec<SourceFile> {
    if !folder.is_dir() {
        warn!(folder = %folder.display(), "source folder is missing");
        return Vec::new();
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(folder = %folder.display(), "cannot read entry: {err}");
                continue;
            }
        };

        if is_hidden(entry.file_name().to_str()) || !entry.file_type().is_file() {
            continue;
        }

        match SourceFile::new(entry.path()) {
            Some(file) => files.push(file),
            None => warn!(path = %entry.path().display(), "skipping file with non UTF-8 name"),
        }
    }

    files.sort_by(|a, b| a.order_key.cmp(&b.order_key));
    debug!(folder = %folder.display(), count = files.len(), "collected source files");
    files
}

fn is_hidden(file_name: Option<&str>) -> bool {
    file_name.is_some_and(|name| name.starts_with('.'))
}
