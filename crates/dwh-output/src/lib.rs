//! Artifact output.
//!
//! Every table this workspace persists is written as comma-separated UTF-8
//! with a header row, `\n` line endings, invariant number formatting and
//! empty cells for absent values. Writes are atomic: the bytes go to a
//! sibling temp file which is synced and renamed over the target.

pub mod error;
pub mod render;
pub mod write;

pub use error::{OutputError, Result};
pub use render::render_csv;
pub use write::{write_atomic, write_table};
