use tracing::debug;

use crate::codec::SpreadsheetCodec;
use crate::error::ImportError;
use crate::loader::ParsedTable;

/// Field separator of submission payloads.
pub const FIELD_SEPARATOR: u8 = b',';

/// Re-serialize the header and the first `row_cap` data rows of `table` as
/// comma-delimited text.
///
/// The window is the same one [`build_preview`](crate::preview::build_preview)
/// uses, so the submitted rows always match the previewed rows. Truncation is
/// done on records before serialization, which keeps quoted multi-line fields
/// intact.
///
/// # Arguments
/// * `codec` - Codec that writes the delimited text
/// * `table` - Parsed rows of the selected file
/// * `row_cap` - Maximum number of data rows to include
///
/// # Returns
/// * `Result<String, ImportError>` - Header and data lines joined by `\n`, no trailing line break
pub fn to_submission_payload<C: SpreadsheetCodec + ?Sized>(
    codec: &C,
    table: &ParsedTable,
    row_cap: usize,
) -> Result<String, ImportError> {
    let window = table.window_sheet(row_cap);
    let text = codec.sheet_to_delimited_text(&window, FIELD_SEPARATOR)?;

    debug!(
        source = %table.source,
        rows = window.rows.len().saturating_sub(1),
        bytes = text.len(),
        "built submission payload"
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CellValue, FileContent, StandardCodec};
    use crate::loader::parse;

    fn csv_table(text: &str) -> ParsedTable {
        parse(&StandardCodec, "in.csv", &FileContent::Text(text.to_string())).unwrap()
    }

    #[test]
    fn small_input_round_trips_verbatim() {
        let input = "Name,Email\nAda,a@x.com\nBob,b@x.com";
        let payload = to_submission_payload(&StandardCodec, &csv_table(input), 50).unwrap();
        assert_eq!(payload, input);
    }

    #[test]
    fn payload_is_capped() {
        let mut input = String::from("id,value");
        for i in 0..1000 {
            input.push_str(&format!("\n{i},v{i}"));
        }
        let payload = to_submission_payload(&StandardCodec, &csv_table(&input), 50).unwrap();
        let lines: Vec<&str> = payload.lines().collect();

        assert_eq!(lines.len(), 51);
        assert_eq!(lines[0], "id,value");
        assert_eq!(lines[50], "49,v49");
    }

    #[test]
    fn multi_line_fields_count_as_one_row() {
        let table = ParsedTable::new(
            "t",
            vec![
                vec!["Name".into(), "Note".into()],
                vec!["Ada".into(), "first\nsecond".into()],
                vec!["Bob".into(), "x".into()],
            ],
        );
        let payload = to_submission_payload(&StandardCodec, &table, 1).unwrap();
        assert_eq!(payload, "Name,Note\nAda,\"first\nsecond\"");
    }

    #[test]
    fn blank_lines_keep_their_slot() {
        let payload = to_submission_payload(&StandardCodec, &csv_table("a,b\n\n1,2"), 50).unwrap();
        assert_eq!(payload, "a,b\n,\n1,2");
    }

    #[test]
    fn header_line_is_kept_verbatim() {
        let table = csv_table("First Name,Last Name,Score\nAda,Lovelace,10\n");
        let payload = to_submission_payload(&StandardCodec, &table, 0).unwrap();
        assert_eq!(payload, "First Name,Last Name,Score");
    }

    #[test]
    fn empty_table_gives_empty_payload() {
        let payload = to_submission_payload(&StandardCodec, &ParsedTable::default(), 50).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn numeric_cells_are_rendered() {
        let table = ParsedTable::new(
            "t",
            vec![
                vec!["n".into(), "f".into()],
                vec![CellValue::Int(3), CellValue::Float(4.0)],
            ],
        );
        let payload = to_submission_payload(&StandardCodec, &table, 50).unwrap();
        assert_eq!(payload, "n,f\n3,4");
    }
}
