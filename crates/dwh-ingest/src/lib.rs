//! Reading raw delimited extracts.
//!
//! Sources arrive as semicolon- or tab-delimited text in UTF-8 or Latin-1.
//! The delimiter and encoding are configuration, never sniffed.

pub mod error;
pub mod format;
pub mod reader;

pub use error::{IngestError, Result};
pub use format::{SourceFormat, TextEncoding};
pub use reader::{decode, parse_delimited, read_delimited};
