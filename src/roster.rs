//! Roster index: the name → (id, major) lookup used to personalise covers.
//!
//! The roster is the first worksheet of a spreadsheet whose header row names
//! the columns `姓名` (name), `学号` (id) and `专业` (major). Loading never
//! fails from the caller's point of view: a missing file, missing columns or
//! a parse error leave an empty index, and every lookup then misses.

use calamine::{Data, Reader, open_workbook_auto};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{DocsError, Result};

/// Header of the name column.
pub const NAME_COLUMN: &str = "姓名";
/// Header of the student id column.
pub const ID_COLUMN: &str = "学号";
/// Header of the major column.
pub const MAJOR_COLUMN: &str = "专业";

/// One roster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Student name, the lookup key.
    pub name: String,
    /// Student id, kept as text (it may carry leading zeros).
    pub id: String,
    /// Major.
    pub major: String,
}

/// Read-only lookup table keyed by student name.
#[derive(Debug, Clone, Default)]
pub struct RosterIndex {
    entries: HashMap<String, RosterEntry>,
    duplicates: Vec<String>,
}

impl RosterIndex {
    /// Load the roster, degrading to an empty index on any failure.
    ///
    /// The cause of a failure is logged; callers treat "not in the index" the
    /// same way whatever the reason.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(index) => {
                info!(
                    path = %path.display(),
                    students = index.len(),
                    "roster loaded"
                );
                index
            }
            Err(err) => {
                warn!("{err}; covers will not be generated");
                Self::default()
            }
        }
    }

    /// Load the roster, reporting why it could not be read.
    ///
    /// # Errors
    ///
    /// - [`DocsError::FileNotFound`] if the file does not exist
    /// - [`DocsError::RosterUnreadable`] if the workbook cannot be parsed or
    ///   has no worksheet
    /// - [`DocsError::MissingColumns`] if a required header is absent
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DocsError::file_not_found(path));
        }

        let unreadable = |reason: String| DocsError::RosterUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| unreadable("workbook has no worksheet".to_string()))?
            .map_err(|e| unreadable(e.to_string()))?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| unreadable("worksheet is empty".to_string()))?
            .iter()
            .map(cell_text)
            .collect();

        let body = rows.map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
        Self::from_rows(path, &header, body)
    }

    /// Build an index from a header row and data rows.
    ///
    /// Rows with an empty name are ignored. When a name appears twice the
    /// later row wins; every such name is logged and recorded in
    /// [`duplicates`](Self::duplicates).
    ///
    /// # Errors
    ///
    /// Returns [`DocsError::MissingColumns`] if a required header is absent.
    pub fn from_rows<I>(source: &Path, header: &[String], rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let position = |column: &str| header.iter().position(|h| h.trim() == column);

        let (name_col, id_col, major_col) =
            match (position(NAME_COLUMN), position(ID_COLUMN), position(MAJOR_COLUMN)) {
                (Some(n), Some(i), Some(m)) => (n, i, m),
                (n, i, m) => {
                    let missing = [(n, NAME_COLUMN), (i, ID_COLUMN), (m, MAJOR_COLUMN)]
                        .into_iter()
                        .filter(|(found, _)| found.is_none())
                        .map(|(_, column)| column.to_string())
                        .collect();
                    return Err(DocsError::MissingColumns {
                        path: source.to_path_buf(),
                        missing,
                    });
                }
            };

        let mut index = Self::default();
        for row in rows {
            let field = |col: usize| row.get(col).map(|s| s.trim().to_string()).unwrap_or_default();

            let name = field(name_col);
            if name.is_empty() {
                continue;
            }

            let entry = RosterEntry {
                name: name.clone(),
                id: field(id_col),
                major: field(major_col),
            };
            debug!(name = %entry.name, id = %entry.id, major = %entry.major, "roster row");

            if index.entries.insert(name.clone(), entry).is_some() {
                warn!(name = %name, "duplicate roster name; the later row replaces the earlier one");
                index.duplicates.push(name);
            }
        }

        Ok(index)
    }

    /// Look up a student by name.
    pub fn get(&self, name: &str) -> Option<&RosterEntry> {
        self.entries.get(name.trim())
    }

    /// Number of distinct students.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no students.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names that appeared on more than one row, in order of reappearance.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}

/// Render a cell as text. Whole numbers lose the `.0` spreadsheets add to ids.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
