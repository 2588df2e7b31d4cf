use serde::Serialize;

use crate::codec::CellValue;
use crate::loader::ParsedTable;

/// Default number of data rows kept for preview and submission.
pub const DEFAULT_ROW_CAP: usize = 50;

/// Label of the synthetic index column.
pub const INDEX_HEADER: &str = "Index";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCell {
    pub cell_id: String,
    pub value: CellValue,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    pub row_id: String,
    pub cells: Vec<PreviewCell>,
}

/// Headers and rows shown to the user before submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<PreviewRow>,
}

impl Preview {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Build the preview grid for the first `row_cap` data rows of `table`.
///
/// Every row gets a 1-based index cell in front of its own cells. Short rows
/// are passed through as they are, so a row has exactly one cell more than
/// the table row it came from.
///
/// # Examples
/// ```
/// use sheetbridge::loader::ParsedTable;
/// use sheetbridge::preview::build_preview;
///
/// let table = ParsedTable::new("t.csv", vec![
///     vec!["Name".into()],
///     vec!["Ada".into()],
/// ]);
/// let preview = build_preview(&table, 50);
///
/// assert_eq!(preview.headers, vec!["Index", "Name"]);
/// assert_eq!(preview.rows[0].cells[0].cell_id, "row-0-index");
/// assert_eq!(preview.rows[0].cells[1].cell_id, "row-0-cell-0");
/// ```
pub fn build_preview(table: &ParsedTable, row_cap: usize) -> Preview {
    let Some(header_row) = table.headers() else {
        return Preview::default();
    };

    let mut headers = Vec::with_capacity(header_row.len() + 1);
    headers.push(INDEX_HEADER.to_string());
    headers.extend(header_row.iter().map(ToString::to_string));

    let rows = table
        .data_rows()
        .iter()
        .take(row_cap)
        .enumerate()
        .map(|(i, row)| preview_row(i, row))
        .collect();

    Preview { headers, rows }
}

fn preview_row(i: usize, row: &[CellValue]) -> PreviewRow {
    let mut cells = Vec::with_capacity(row.len() + 1);
    cells.push(PreviewCell {
        cell_id: format!("row-{}-index", i),
        value: CellValue::Int(i as i64 + 1),
    });
    cells.extend(row.iter().enumerate().map(|(j, value)| PreviewCell {
        cell_id: format!("row-{}-cell-{}", i, j),
        value: value.clone(),
    }));

    PreviewRow {
        row_id: format!("row-{}", i),
        cells,
    }
}
