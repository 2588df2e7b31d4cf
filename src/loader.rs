use tracing::debug;

use crate::codec::{CellValue, FileContent, Sheet, SpreadsheetCodec};
use crate::error::ImportError;

/// Rows of cells read from the first sheet of a file.
///
/// Row 0 is the header row. Rows may be ragged: a data row can be shorter or
/// longer than the header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedTable {
    /// Name of the file the table came from.
    pub source: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl ParsedTable {
    pub fn new(source: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            source: source.into(),
            rows,
        }
    }

    pub fn headers(&self) -> Option<&[CellValue]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Header plus at most `row_cap` data rows.
    pub fn window(&self, row_cap: usize) -> &[Vec<CellValue>] {
        let end = self.rows.len().min(row_cap.saturating_add(1));
        &self.rows[..end]
    }

    /// The bounded window as a sheet, ready for re-serialization.
    pub fn window_sheet(&self, row_cap: usize) -> Sheet {
        Sheet::new(self.source.clone(), self.window(row_cap).to_vec())
    }
}

/// Parse file content into a [`ParsedTable`].
///
/// Only the first sheet is read; any other sheets of a workbook are ignored.
/// A codec failure becomes [`ImportError::Parse`] carrying the file name and
/// no partial table is returned.
///
/// # Arguments
/// * `codec` - Codec that reads the workbook
/// * `file_name` - Name of the selected file, used in errors and logs
/// * `content` - Decoded text or raw workbook bytes
///
/// # Returns
/// * `Result<ParsedTable, ImportError>` - All rows of the first sheet, header first
///
/// # Examples
/// ```
/// use sheetbridge::{FileContent, StandardCodec, parse};
///
/// let content = FileContent::Text("Name\nAda".to_string());
/// let table = parse(&StandardCodec, "people.csv", &content).unwrap();
/// assert_eq!(table.data_rows().len(), 1);
/// ```
pub fn parse<C: SpreadsheetCodec + ?Sized>(
    codec: &C,
    file_name: &str,
    content: &FileContent,
) -> Result<ParsedTable, ImportError> {
    let workbook = codec
        .parse_workbook(content)
        .map_err(|e| ImportError::Parse {
            file_name: file_name.to_string(),
            reason: e.to_string(),
        })?;

    let Some(sheet) = workbook.first_sheet() else {
        debug!(file_name, "workbook has no sheets");
        return Ok(ParsedTable::new(file_name, Vec::new()));
    };

    if workbook.sheets.len() > 1 {
        debug!(
            file_name,
            used = %sheet.name,
            ignored = ?&workbook.sheet_names()[1..],
            "only the first sheet is imported"
        );
    }

    let rows = codec.sheet_to_rows(sheet);
    debug!(file_name, rows = rows.len(), "parsed table");

    Ok(ParsedTable::new(file_name, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{StandardCodec, Workbook};
    use crate::error::CodecError;

    struct FailingCodec;

    impl SpreadsheetCodec for FailingCodec {
        fn parse_workbook(&self, _content: &FileContent) -> Result<Workbook, CodecError> {
            Err(CodecError::Sheet("Sheet1".to_string(), "corrupt".to_string()))
        }

        fn sheet_to_rows(&self, sheet: &Sheet) -> Vec<Vec<CellValue>> {
            sheet.rows.clone()
        }

        fn sheet_to_delimited_text(&self, _sheet: &Sheet, _separator: u8) -> Result<String, CodecError> {
            Ok(String::new())
        }

        fn write_workbook(&self, _sheets: &[Sheet]) -> Result<Vec<u8>, CodecError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn codec_failure_names_the_file() {
        let err = parse(&FailingCodec, "people.xlsx", &FileContent::Binary(vec![1, 2, 3])).unwrap_err();
        match err {
            ImportError::Parse { file_name, .. } => assert_eq!(file_name, "people.xlsx"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let content = FileContent::Text("a,b,c\n1\n1,2,3,4\n".to_string());
        let table = parse(&StandardCodec, "r.csv", &content).unwrap();

        assert_eq!(table.headers().unwrap().len(), 3);
        assert_eq!(table.data_rows()[0].len(), 1);
        assert_eq!(table.data_rows()[1].len(), 4);
    }

    #[test]
    fn interior_empty_cells_keep_their_position() {
        let content = FileContent::Text("a,b,c\n1,,3\n".to_string());
        let table = parse(&StandardCodec, "e.csv", &content).unwrap();
        assert_eq!(
            table.data_rows()[0],
            vec!["1".into(), CellValue::Empty, "3".into()]
        );
    }

    #[test]
    fn interior_blank_line_is_an_empty_row() {
        let content = FileContent::Text("a,b\n\n1,2\n\n".to_string());
        let table = parse(&StandardCodec, "b.csv", &content).unwrap();

        assert_eq!(table.rows.len(), 3);
        assert!(table.data_rows()[0].is_empty());
        assert_eq!(table.data_rows()[1], vec!["1".into(), "2".into()]);
    }

    #[test]
    fn header_only_and_empty_tables() {
        let header_only = parse(&StandardCodec, "h.csv", &FileContent::Text("a,b".to_string())).unwrap();
        assert_eq!(header_only.rows.len(), 1);
        assert!(header_only.data_rows().is_empty());

        let empty = parse(&StandardCodec, "e.csv", &FileContent::Text(String::new())).unwrap();
        assert!(empty.headers().is_none());
        assert!(empty.data_rows().is_empty());
    }

    #[test]
    fn window_is_clamped() {
        let rows = (0..10).map(|i| vec![CellValue::Int(i)]).collect();
        let table = ParsedTable::new("t", rows);

        assert_eq!(table.window(3).len(), 4);
        assert_eq!(table.window(50).len(), 10);
        assert_eq!(table.window(0).len(), 1);
        assert_eq!(table.window(usize::MAX).len(), 10);
    }
}
