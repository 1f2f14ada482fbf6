//! Data model for the dimensional-modeling pipeline.
//!
//! Raw rows come in as [`RawTable`], are normalized into [`Table`]s of
//! [`CanonicalValue`]s, and end up as [`DimensionTable`]s keyed by
//! [`SurrogateKey`] plus a [`FactTable`] referencing them.

pub mod dimension;
pub mod error;
pub mod fact;
pub mod key;
pub mod table;
pub mod value;

pub use dimension::{DimensionRow, DimensionTable, natural_key_text};
pub use error::{ModelError, Result};
pub use fact::{FactRow, FactTable, ForeignKey};
pub use key::SurrogateKey;
pub use table::{RawTable, Table};
pub use value::CanonicalValue;
