//! CSV rendering.

use std::path::Path;

use csv::{Terminator, WriterBuilder};
use dwh_model::Table;

use crate::error::{OutputError, Result};

/// Renders `table` as CSV bytes. `path` is only used in errors.
pub fn render_csv(table: &Table, path: &Path) -> Result<Vec<u8>> {
    let csv_error = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(table.columns()).map_err(csv_error)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|value| value.key_text().into_owned()))
            .map_err(csv_error)?;
    }
    writer.into_inner().map_err(|e| OutputError::Io {
        operation: "flush",
        path: path.to_path_buf(),
        source: e.into_error(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwh_model::CanonicalValue;

    fn render(table: &Table) -> String {
        let bytes = render_csv(table, Path::new("test.csv")).expect("render");
        String::from_utf8(bytes).expect("utf8")
    }

    #[test]
    fn renders_numbers_absent_and_quotes() {
        let table = Table::from_rows(
            vec!["id_azienda".to_string(), "nome".to_string(), "valore".to_string()],
            vec![
                vec![
                    CanonicalValue::number(1.0),
                    CanonicalValue::text("Acme, S.p.A."),
                    CanonicalValue::number(12.50),
                ],
                vec![
                    CanonicalValue::number(2.0),
                    CanonicalValue::text("Beta"),
                    CanonicalValue::Absent,
                ],
            ],
        )
        .expect("table");
        insta::assert_snapshot!(render(&table), @r#"
        id_azienda,nome,valore
        1,"Acme, S.p.A.",12.5
        2,Beta,
        "#);
    }

    #[test]
    fn uses_unix_line_endings() {
        let table = Table::from_rows(
            vec!["a".to_string()],
            vec![vec![CanonicalValue::number(100.0)]],
        )
        .expect("table");
        assert_eq!(render(&table), "a\n100\n");
    }

    #[test]
    fn header_written_for_empty_table() {
        let table = Table::new(vec!["id_report".to_string(), "nome".to_string()]).expect("table");
        assert_eq!(render(&table), "id_report,nome\n");
    }
}
