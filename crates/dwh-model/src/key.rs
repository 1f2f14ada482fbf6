use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CanonicalValue, ModelError};

/// Positive integer identifying a dimension or fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurrogateKey(u64);

impl SurrogateKey {
    pub const FIRST: Self = Self(1);

    pub fn new(value: u64) -> Result<Self, ModelError> {
        if value == 0 {
            return Err(ModelError::ZeroSurrogateKey(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The following key; fails once the key space is exhausted.
    pub fn next(self) -> Result<Self, ModelError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(ModelError::KeySpaceExhausted(self.0))
    }

    /// Integer text, exact for every key.
    pub fn to_value(self) -> CanonicalValue {
        CanonicalValue::Text(self.0.to_string())
    }
}

impl fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero() {
        assert!(SurrogateKey::new(0).is_err());
        assert_eq!(SurrogateKey::new(7).expect("key").get(), 7);
    }

    #[test]
    fn next_increments() {
        assert_eq!(SurrogateKey::FIRST.next().expect("next").get(), 2);
    }

    #[test]
    fn next_after_the_largest_key_is_an_error() {
        let last = SurrogateKey::new(u64::MAX).expect("key");
        assert!(matches!(last.next(), Err(ModelError::KeySpaceExhausted(u64::MAX))));
    }

    #[test]
    fn large_keys_render_exactly() {
        let key = SurrogateKey::new((1 << 53) + 1).expect("key");
        assert_eq!(key.to_value().key_text(), "9007199254740993");
    }
}
