use crate::domain::model::{AnalysisResult, TableCell, TableGrid, TableOutcome};
use serde::Deserialize;
use serde_json::Value;

/// 將扁平的 cell 清單整理成 row -> column -> text。
/// 相同座標的 cell 以後出現者為準，缺漏的座標不補。
pub fn reshape_cells(cells: &[TableCell]) -> TableGrid {
    let mut grid = TableGrid::new();
    for cell in cells {
        grid.entry(cell.row_index)
            .or_default()
            .insert(cell.column_index, cell.content.clone());
    }
    grid
}

pub fn reshape_tables(result: &AnalysisResult) -> TableOutcome {
    let Some(tables) = result
        .analyze_result()
        .and_then(|analyze| analyze.get("tables"))
    else {
        tracing::warn!("⚠️ No table present in the file");
        return TableOutcome::NoTables;
    };

    let Some(tables) = tables.as_array() else {
        tracing::warn!("⚠️ Table list is not an array, treating as no table");
        return TableOutcome::NoTables;
    };

    tracing::debug!("Reshaping {} table(s)", tables.len());
    TableOutcome::Tables(
        tables
            .iter()
            .enumerate()
            .map(|(i, table)| reshape_cells(&read_cells(i + 1, table)))
            .collect(),
    )
}

/// 逐一解析 cell；無法解析的 cell 略過，不影響同一表格或其他表格
fn read_cells(table_number: usize, table: &Value) -> Vec<TableCell> {
    let Some(cells) = table.get("cells").and_then(Value::as_array) else {
        if table.get("cells").is_some() || !table.is_object() {
            tracing::warn!("⚠️ Table {} has no readable cell list", table_number);
        }
        return Vec::new();
    };

    cells
        .iter()
        .filter_map(|cell| match TableCell::deserialize(cell) {
            Ok(cell) => Some(cell),
            Err(e) => {
                tracing::warn!("⚠️ Skipping unreadable cell in table {}: {}", table_number, e);
                None
            }
        })
        .collect()
}
