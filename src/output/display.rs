use crate::domain::model::{AnalysisReport, TableGrid, TableOutcome};
use std::collections::BTreeSet;

pub const NO_TABLE_NOTICE: &str = "No table present in the file";

/// 所有列出現過的欄位 index，排序後去重
pub fn column_keys(grid: &TableGrid) -> Vec<i64> {
    grid.values()
        .flat_map(|row| row.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// 以 pipe table 顯示；稀疏的格子留白
pub fn render_grid(grid: &TableGrid) -> String {
    if grid.is_empty() {
        return "(empty table)".to_string();
    }

    let columns = column_keys(grid);
    let mut lines = Vec::with_capacity(grid.len() + 2);

    let header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    lines.push(format!("|   | {} |", header.join(" | ")));
    lines.push(format!("|---|{}", "---|".repeat(columns.len())));

    for (row_index, row) in grid {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map(|t| escape_cell(t)).unwrap_or_default())
            .collect();
        lines.push(format!("| {} | {} |", row_index, cells.join(" | ")));
    }

    lines.join("\n")
}

pub fn render_tables(outcome: &TableOutcome) -> String {
    match outcome {
        TableOutcome::NoTables => format!("⚠️ {}", NO_TABLE_NOTICE),
        TableOutcome::Tables(grids) if grids.is_empty() => format!("⚠️ {}", NO_TABLE_NOTICE),
        TableOutcome::Tables(grids) => grids
            .iter()
            .enumerate()
            .map(|(i, grid)| format!("### Table {}\n{}", i + 1, render_grid(grid)))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

pub fn render_report(report: &AnalysisReport) -> String {
    format!(
        "### Extracted Invoice Information:\nInvoice Date: {}\nDue Date: {}\nTotal Due: {}\n\n{}",
        report.summary.invoice_date,
        report.summary.due_date,
        report.summary.total_due,
        render_tables(&report.tables)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn grid(cells: &[(i64, i64, &str)]) -> TableGrid {
        let mut grid = TableGrid::new();
        for (row, column, text) in cells {
            grid.entry(*row)
                .or_insert_with(BTreeMap::new)
                .insert(*column, text.to_string());
        }
        grid
    }

    #[test]
    fn test_render_grid_fills_gaps_with_blanks() {
        let grid = grid(&[(0, 0, "Item"), (0, 2, "Amount"), (1, 0, "Widget")]);
        let rendered = render_grid(&grid);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "|   | 0 | 2 |");
        assert_eq!(lines[1], "|---|---|---|");
        assert_eq!(lines[2], "| 0 | Item | Amount |");
        assert_eq!(lines[3], "| 1 | Widget |  |");
    }

    #[test]
    fn test_render_grid_escapes_pipes() {
        let grid = grid(&[(0, 0, "a|b\nc")]);
        assert!(render_grid(&grid).contains("| 0 | a\\|b c |"));
    }

    #[test]
    fn test_render_tables_notice() {
        assert_eq!(
            render_tables(&TableOutcome::NoTables),
            "⚠️ No table present in the file"
        );

        let rendered = render_tables(&TableOutcome::Tables(vec![
            grid(&[(0, 0, "A")]),
            TableGrid::new(),
        ]));
        assert!(rendered.starts_with("### Table 1\n"));
        assert!(rendered.contains("### Table 2\n(empty table)"));
    }
}
