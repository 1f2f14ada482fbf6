//! The dataset families.

pub mod enrollment;
pub mod gender_gap;
pub mod labour;

use dwh_transform::{AbsentTokens, Normalizer};

fn normalizer(absent_tokens: &[String]) -> Normalizer {
    Normalizer::new(AbsentTokens::new(absent_tokens))
}
