use serde::{Deserialize, Serialize};

/// Character encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    #[serde(alias = "latin-1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "Latin-1",
        }
    }

    pub(crate) fn encoding(self) -> &'static encoding_rs::Encoding {
        match self {
            Self::Utf8 => encoding_rs::UTF_8,
            // WHATWG maps the latin-1 labels onto windows-1252
            Self::Latin1 => encoding_rs::WINDOWS_1252,
        }
    }
}

/// Physical layout of a delimited source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    pub delimiter: u8,
    pub encoding: TextEncoding,
}

impl SourceFormat {
    pub fn new(delimiter: u8, encoding: TextEncoding) -> Self {
        Self {
            delimiter,
            encoding,
        }
    }

    /// Format of every artifact this workspace writes.
    pub fn artifact() -> Self {
        Self::new(b',', TextEncoding::Utf8)
    }
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self::artifact()
    }
}
