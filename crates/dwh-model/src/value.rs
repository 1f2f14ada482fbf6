use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use dwh_common::format_numeric;
use serde::{Deserialize, Serialize};

/// A normalized cell.
///
/// Every placeholder token, empty string and failed numeric coercion
/// collapses into the single [`CanonicalValue::Absent`] sentinel. Numbers
/// are always finite and never negative zero, so equality, ordering and
/// hashing agree.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CanonicalValue {
    Number(f64),
    Text(String),
    #[default]
    Absent,
}

impl CanonicalValue {
    /// Builds a numeric value; non-finite input becomes `Absent`.
    pub fn number(value: f64) -> Self {
        if !value.is_finite() {
            Self::Absent
        } else if value == 0.0 {
            Self::Number(0.0)
        } else {
            Self::Number(value)
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text used for natural-key matching and for output cells.
    ///
    /// `Number(2019.0)` and `Text("2019")` share the key text `"2019"`,
    /// which lets a year read back from a persisted snapshot match the same
    /// year extracted from a source period label.
    pub fn key_text(&self) -> Cow<'_, str> {
        match self {
            Self::Number(v) => Cow::Owned(format_numeric(*v)),
            Self::Text(s) => Cow::Borrowed(s),
            Self::Absent => Cow::Borrowed(""),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Absent => 0,
            Self::Number(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

impl PartialEq for CanonicalValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CanonicalValue {}

impl PartialOrd for CanonicalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Absent sorts first, then numbers in numeric order, then text.
impl Ord for CanonicalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for CanonicalValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Number(v) => v.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Absent => {}
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_text())
    }
}

impl From<f64> for CanonicalValue {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<&str> for CanonicalValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
