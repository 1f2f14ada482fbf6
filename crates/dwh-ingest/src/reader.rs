//! Delimited file reading with explicit delimiter and encoding.

use std::path::Path;

use csv::ReaderBuilder;
use dwh_model::RawTable;

use crate::error::{IngestError, Result};
use crate::format::{SourceFormat, TextEncoding};

/// Reads a delimited file into a [`RawTable`].
///
/// The first record is the header. Blank lines are ignored, short rows are
/// padded with empty cells and rows with more non-empty fields than the
/// header are skipped and counted.
pub fn read_delimited(path: &Path, format: SourceFormat) -> Result<RawTable> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let text = decode(&bytes, format.encoding, path)?;
    let table = parse_delimited(&text, format.delimiter, path)?;
    tracing::debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        skipped = table.skipped_rows,
        encoding = format.encoding.as_str(),
        "read source"
    );
    Ok(table)
}

/// Decodes raw bytes, dropping a leading byte-order mark.
pub fn decode(bytes: &[u8], encoding: TextEncoding, path: &Path) -> Result<String> {
    let (text, had_errors) = encoding.encoding().decode_with_bom_removal(bytes);
    if had_errors {
        return Err(IngestError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.as_str(),
        });
    }
    Ok(text.into_owned())
}

/// Parses already-decoded delimited text. `path` is only used in errors.
pub fn parse_delimited(text: &str, delimiter: u8, path: &Path) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            return Err(IngestError::EmptyFile {
                path: path.to_path_buf(),
            });
        }
    };
    let headers: Vec<String> = header.iter().map(normalize_header).collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::NoHeaderDetected {
            path: path.to_path_buf(),
        });
    }

    let width = headers.len();
    let mut rows = Vec::new();
    let mut skipped_rows = 0usize;
    for record in records {
        let record = record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        while row.len() > width && row.last().is_some_and(|value| value.trim().is_empty()) {
            row.pop();
        }
        if row.len() > width {
            skipped_rows += 1;
            tracing::warn!(
                path = %path.display(),
                line = record.position().map(|pos| pos.line()),
                expected = width,
                found = row.len(),
                "skipping row with more fields than the header"
            );
            continue;
        }
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(RawTable {
        headers,
        rows,
        skipped_rows,
    })
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, delimiter: u8) -> RawTable {
        parse_delimited(text, delimiter, Path::new("test.csv")).expect("parse")
    }

    #[test]
    fn pads_short_rows() {
        let table = parse("a;b;c\n1;2\n", b';');
        assert_eq!(table.rows, vec![vec!["1", "2", ""]]);
    }

    #[test]
    fn skips_long_rows() {
        let table = parse("a;b\n1;2;3\n4;5\n", b';');
        assert_eq!(table.rows, vec![vec!["4", "5"]]);
        assert_eq!(table.skipped_rows, 1);
    }

    #[test]
    fn tolerates_trailing_delimiters() {
        let table = parse("a;b\n1;2;\n", b';');
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn ignores_blank_lines() {
        let table = parse("a\tb\n\n1\t2\n \t \n", b'\t');
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let table = parse("nome;Settore\n\"Acme; S.p.A.\";Moda\n", b';');
        assert_eq!(table.rows[0][0], "Acme; S.p.A.");
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = parse_delimited("", b';', Path::new("empty.csv")).expect_err("empty");
        assert!(matches!(err, IngestError::EmptyFile { .. }));
    }

    #[test]
    fn blank_header_is_an_error() {
        let err = parse_delimited(" ; \n1;2\n", b';', Path::new("x.csv")).expect_err("header");
        assert!(matches!(err, IngestError::NoHeaderDetected { .. }));
    }

    #[test]
    fn decodes_latin1() {
        let text = decode(b"Facolt\xe0", TextEncoding::Latin1, Path::new("x")).expect("decode");
        assert_eq!(text, "Facoltà");
    }

    #[test]
    fn strips_utf8_bom() {
        let text = decode(b"\xef\xbb\xbfanno", TextEncoding::Utf8, Path::new("x")).expect("decode");
        assert_eq!(text, "anno");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = decode(b"Facolt\xe0", TextEncoding::Utf8, Path::new("x")).expect_err("invalid");
        assert!(matches!(err, IngestError::Decode { .. }));
    }
}
