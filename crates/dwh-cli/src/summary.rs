use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use dwh_core::{FamilyKind, RunReport, stage_catalog};

pub fn print_catalog(kinds: &[FamilyKind]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Family"),
        header_cell("Aliases"),
        header_cell("Stage"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    for &kind in kinds {
        for (idx, stage) in stage_catalog(kind).into_iter().enumerate() {
            let (family, aliases) = if idx == 0 {
                (
                    Cell::new(kind.as_str())
                        .fg(Color::Cyan)
                        .add_attribute(Attribute::Bold),
                    dim_cell(kind.aliases().join(", ")),
                )
            } else {
                (Cell::new(""), Cell::new(""))
            };
            table.add_row(vec![
                family,
                aliases,
                Cell::new(stage.name),
                Cell::new(stage.description),
            ]);
        }
    }
    println!("{table}");
}

pub fn print_run_report(report: &RunReport) {
    println!("Family: {}", report.family);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Rows in"),
        header_cell("Rows out"),
        header_cell("Excluded"),
        header_cell("Unresolved"),
        header_cell("ms"),
        header_cell("Artifacts"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for stage in &report.stages {
        let artifacts: Vec<String> = stage
            .artifacts
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        table.add_row(vec![
            Cell::new(&stage.stage).add_attribute(Attribute::Bold),
            Cell::new(stage.rows_in),
            Cell::new(stage.rows_out),
            count_cell(stage.excluded(), Color::Yellow),
            count_cell(stage.unresolved(), Color::Yellow),
            dim_cell(stage.duration_ms),
            if artifacts.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(artifacts.join("\n"))
            },
        ]);
    }
    if let Some(failure) = &report.failure {
        table.add_row(vec![
            Cell::new(&failure.stage)
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            Cell::new("failed").fg(Color::Red),
        ]);
        for skipped in &failure.skipped {
            table.add_row(vec![
                dim_cell(skipped),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("skipped"),
            ]);
        }
    }
    println!("{table}");
    print_exclusions(report);
    if let Some(failure) = &report.failure {
        eprintln!("Error in stage {}: {}", failure.stage, failure.message);
    }
}

fn print_exclusions(report: &RunReport) {
    let rows = exclusion_rows(report);
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Reason"),
        header_cell("Rows"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (stage, reason, count) in rows {
        table.add_row(vec![
            Cell::new(stage),
            Cell::new(reason),
            count_cell(count, Color::Yellow),
        ]);
    }
    println!("{table}");
}

/// Exclusions and unresolved joins of every stage, in stage order.
fn exclusion_rows(report: &RunReport) -> Vec<(String, String, usize)> {
    let mut rows = Vec::new();
    for stage in &report.stages {
        for (reason, count) in &stage.exclusions {
            rows.push((stage.stage.clone(), reason.clone(), *count));
        }
        for join in stage.joins.iter().filter(|join| join.unresolved > 0) {
            rows.push((
                stage.stage.clone(),
                format!("unresolved {}", join.foreign_key),
                join.unresolved,
            ));
        }
        for (column, count) in &stage.coercion_failures {
            rows.push((
                stage.stage.clone(),
                format!("not numeric: {column}"),
                *count,
            ));
        }
    }
    rows
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwh_core::{StageFailure, StageReport};

    #[test]
    fn exclusion_rows_follow_stage_order() {
        let mut clean = StageReport::new("labour", "clean");
        clean.exclude("composite arity mismatch", 2);
        clean.coercion_failures = vec![("2019".to_string(), 1)];
        let mut unpivot = StageReport::new("labour", "unpivot");
        unpivot.exclude("absent value", 7);
        let report = RunReport {
            family: "labour".to_string(),
            stages: vec![clean, unpivot],
            failure: Some(StageFailure {
                stage: "observations".to_string(),
                message: "input years is unavailable".to_string(),
                skipped: Vec::new(),
            }),
        };

        insta::assert_debug_snapshot!(exclusion_rows(&report), @r#"
        [
            (
                "clean",
                "composite arity mismatch",
                2,
            ),
            (
                "clean",
                "not numeric: 2019",
                1,
            ),
            (
                "unpivot",
                "absent value",
                7,
            ),
        ]
        "#);
    }
}
