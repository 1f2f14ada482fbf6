//! Value normalization.
//!
//! Every raw cell goes through the same steps: enclosing quotes and
//! whitespace are stripped, the result is checked against the closed set of
//! absent tokens, and numeric columns are coerced with a strict parse.
//! Numeric cells additionally lose their flag annotations (strip patterns)
//! before the token check.

use std::borrow::Cow;
use std::collections::BTreeSet;

use dwh_common::parse_f64;
use dwh_model::{CanonicalValue, RawTable, Table};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Closed set of placeholder tokens meaning "no value".
///
/// Tokens are matched after trimming and case-sensitively. The empty
/// string is always absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbsentTokens(BTreeSet<String>);

impl AbsentTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            tokens
                .into_iter()
                .map(|token| token.as_ref().trim().to_string())
                .filter(|token| !token.is_empty())
                .collect(),
        )
    }

    pub fn is_absent(&self, cleaned: &str) -> bool {
        cleaned.is_empty() || self.0.contains(cleaned)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strips surrounding whitespace and enclosing double quotes.
///
/// # Examples
///
/// ```
/// use dwh_transform::clean_text;
///
/// assert_eq!(clean_text("  \"Lombardia\" "), "Lombardia");
/// assert_eq!(clean_text("\"\"Acme\"\""), "Acme");
/// assert_eq!(clean_text("Acme \"Spa\""), "Acme \"Spa");
/// ```
pub fn clean_text(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

/// How a column's cells are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Cleaned text; only absent tokens are recognised.
    #[default]
    Text,
    /// Strict numeric coercion; anything unparseable becomes absent.
    Numeric,
    /// Number when the strict parse succeeds, text otherwise.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentReason {
    /// Empty cell or one of the absent tokens.
    Token,
    /// Present but not a finite number.
    Unparseable,
}

/// Outcome of numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    Numeric(f64),
    Absent(AbsentReason),
}

impl Coerced {
    pub fn into_value(self) -> CanonicalValue {
        match self {
            Self::Numeric(v) => CanonicalValue::number(v),
            Self::Absent(_) => CanonicalValue::Absent,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Absent(AbsentReason::Unparseable))
    }
}

/// A normalized table plus the per-column count of failed coercions.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub table: Table,
    pub coercion_failures: Vec<(String, usize)>,
}

impl NormalizedTable {
    pub fn total_failures(&self) -> usize {
        self.coercion_failures.iter().map(|(_, count)| count).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    tokens: AbsentTokens,
    strip_patterns: Vec<Regex>,
}

impl Normalizer {
    pub fn new(tokens: AbsentTokens) -> Self {
        Self {
            tokens,
            strip_patterns: Vec::new(),
        }
    }

    /// Patterns removed from cells under numeric coercion, before token
    /// matching. Text cells keep them.
    pub fn with_strip_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.strip_patterns = patterns;
        self
    }

    pub fn tokens(&self) -> &AbsentTokens {
        &self.tokens
    }

    fn strip<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        let mut text = Cow::Borrowed(clean_text(raw));
        for pattern in &self.strip_patterns {
            let stripped = match pattern.replace_all(&text, "") {
                Cow::Owned(stripped) => Some(stripped),
                Cow::Borrowed(_) => None,
            };
            if let Some(stripped) = stripped {
                text = Cow::Owned(clean_text(&stripped).to_string());
            }
        }
        text
    }

    /// Cleans a cell and maps absent tokens to `Absent`.
    pub fn classify(&self, raw: &str) -> CanonicalValue {
        let text = clean_text(raw);
        if self.tokens.is_absent(text) {
            CanonicalValue::Absent
        } else {
            CanonicalValue::Text(text.to_string())
        }
    }

    /// Masks absent tokens, then parses strictly.
    pub fn coerce(&self, raw: &str) -> Coerced {
        let text = self.strip(raw);
        if self.tokens.is_absent(&text) {
            return Coerced::Absent(AbsentReason::Token);
        }
        match parse_f64(&text) {
            Some(v) => Coerced::Numeric(v),
            None => Coerced::Absent(AbsentReason::Unparseable),
        }
    }

    /// Normalizes one cell. The flag is set when a present value failed
    /// numeric coercion.
    pub fn normalize_cell(&self, raw: &str, kind: ColumnKind) -> (CanonicalValue, bool) {
        match kind {
            ColumnKind::Text => (self.classify(raw), false),
            ColumnKind::Numeric => {
                let coerced = self.coerce(raw);
                (coerced.into_value(), coerced.is_failure())
            }
            ColumnKind::Auto => match self.coerce(raw) {
                Coerced::Numeric(v) => (CanonicalValue::number(v), false),
                Coerced::Absent(AbsentReason::Token) => (CanonicalValue::Absent, false),
                Coerced::Absent(AbsentReason::Unparseable) => (self.classify(raw), false),
            },
        }
    }

    /// Normalizes headers and every cell of a raw table.
    ///
    /// `kind_of` receives the cleaned header name.
    pub fn normalize_table<F>(&self, raw: &RawTable, kind_of: F) -> Result<NormalizedTable>
    where
        F: Fn(&str) -> ColumnKind,
    {
        let columns: Vec<String> = raw
            .headers
            .iter()
            .map(|header| clean_text(header).to_string())
            .collect();
        let kinds: Vec<ColumnKind> = columns.iter().map(|column| kind_of(column)).collect();
        let mut failures = vec![0usize; columns.len()];
        let mut table = Table::new(columns)?;

        for raw_row in &raw.rows {
            let mut row = Vec::with_capacity(kinds.len());
            for (idx, kind) in kinds.iter().enumerate() {
                let cell = raw_row.get(idx).map_or("", String::as_str);
                let (value, failed) = self.normalize_cell(cell, *kind);
                if failed {
                    failures[idx] += 1;
                }
                row.push(value);
            }
            table.push_row(row)?;
        }

        let coercion_failures: Vec<(String, usize)> = table
            .columns()
            .iter()
            .zip(failures)
            .filter(|(_, count)| *count > 0)
            .map(|(column, count)| (column.clone(), count))
            .collect();
        for (column, count) in &coercion_failures {
            tracing::warn!(column = %column, count, "values could not be parsed as numbers");
        }
        Ok(NormalizedTable {
            table,
            coercion_failures,
        })
    }
}

/// Absent-value count per column, for columns with at least one.
///
/// Sorted by count descending, then by column name.
pub fn null_counts(table: &Table) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let count = table.rows().iter().filter(|row| row[idx].is_absent()).count();
            (column.clone(), count)
        })
        .filter(|(_, count)| *count > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
