use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::{StepResult, TableKind};

pub fn print_summary(result: &StepResult) {
    println!("Step: {}", result.step);
    println!("Output: {}", result.output_dir.display());
    println!("{}", summary_table(result));
}

pub fn summary_table(result: &StepResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Kind"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("File"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);

    for summary in &result.tables {
        let written = &summary.table;
        let file = written
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("-");
        table.add_row(vec![
            table_cell(&written.name, summary.kind),
            dim_cell(summary.kind.label()),
            rows_cell(written.rows),
            Cell::new(written.columns),
            Cell::new(file),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(result.total_rows()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    table
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
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn table_cell(name: &str, kind: TableKind) -> Cell {
    match kind {
        TableKind::OneBigTable => Cell::new(name)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        _ => Cell::new(name)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
    }
}

// Empty tables stand out in yellow.
fn rows_cell(rows: usize) -> Cell {
    if rows == 0 {
        Cell::new(rows).fg(Color::Yellow)
    } else {
        Cell::new(rows)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
