//! Labelled field substitution for cover paragraphs.
//!
//! A field is a label (`姓名`, `学号`, `专业`) followed by a full-width or
//! half-width colon and the current value. Substitution rewrites each field
//! to `label：value` with the student's value and leaves all other text
//! alone. Several fields in one paragraph are all rewritten in one pass.

use regex::Regex;
use std::sync::LazyLock;

use crate::roster::{ID_COLUMN, MAJOR_COLUMN, NAME_COLUMN, RosterEntry};

static FIELD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"({NAME_COLUMN}|{ID_COLUMN}|{MAJOR_COLUMN})[：:]\s*"))
        .expect("field label pattern is valid")
});

/// Values written into the cover's labelled fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverFields {
    /// Student name.
    pub name: String,
    /// Student id.
    pub id: String,
    /// Major.
    pub major: String,
}

impl From<&RosterEntry> for CoverFields {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            name: entry.name.clone(),
            id: entry.id.clone(),
            major: entry.major.clone(),
        }
    }
}

impl CoverFields {
    fn value_for(&self, label: &str) -> &str {
        match label {
            NAME_COLUMN => &self.name,
            ID_COLUMN => &self.id,
            _ => &self.major,
        }
    }

    /// Whether `text` contains at least one labelled field.
    pub fn matches(text: &str) -> bool {
        FIELD_LABEL.is_match(text)
    }

    /// Rewrite every labelled field in `text`.
    ///
    /// The old value is the run of word characters and whitespace after the
    /// colon. It never extends into the next label; whitespace separating it
    /// from a following label is kept.
    pub fn substitute(&self, text: &str) -> String {
        let labels: Vec<_> = FIELD_LABEL.captures_iter(text).collect();
        if labels.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for (idx, caps) in labels.iter().enumerate() {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let label = &caps[1];

            let next_label = labels
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start());
            let limit = next_label.unwrap_or(text.len());
            let tail = &text[whole.end()..limit];

            let value_len = tail
                .char_indices()
                .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || c.is_whitespace()))
                .map(|(i, _)| i)
                .unwrap_or(tail.len());
            let mut old_value = &tail[..value_len];
            if value_len == tail.len() && next_label.is_some() {
                old_value = old_value.trim_end();
            }

            out.push_str(&text[cursor..whole.start()]);
            out.push_str(label);
            out.push('：');
            out.push_str(self.value_for(label));
            cursor = whole.end() + old_value.len();
        }

        out.push_str(&text[cursor..]);
        out
    }
}
