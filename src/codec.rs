//! Spreadsheet codec capability.
//!
//! Reading and writing of workbook formats is delegated to `calamine`, `csv`
//! and `rust_xlsxwriter`. The rest of the crate only talks to the
//! [`SpreadsheetCodec`] trait, so a codec is always handed in explicitly and
//! tests can swap it for a fake.

use std::fmt;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::Timelike;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::CodecError;

/// A single cell as returned by the codec.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::String(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{}", i),
            // Whole floats print without a fractional part, like a spreadsheet does
            CellValue::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Float(n) => write!(f, "{}", n),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_str(""),
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(n) => serializer.serialize_f64(*n),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&serde_json::Value> for CellValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => CellValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => CellValue::String(s.clone()),
            other => CellValue::String(other.to_string()),
        }
    }
}

/// A named two-dimensional grid of cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// An in-memory workbook: sheets in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }
}

/// File content in the shape the codec expects for each format.
#[derive(Clone, Debug, PartialEq)]
pub enum FileContent {
    /// Delimited text, already decoded.
    Text(String),
    /// Raw workbook bytes (xls, xlsx, xlsb, ods).
    Binary(Vec<u8>),
}

/// The black-box spreadsheet capability.
pub trait SpreadsheetCodec: Send + Sync {
    /// Parse file content into a workbook.
    fn parse_workbook(&self, content: &FileContent) -> Result<Workbook, CodecError>;

    /// Rows of cells with positional alignment.
    ///
    /// Interior empty cells are kept, trailing empty cells and trailing
    /// blank rows are dropped.
    fn sheet_to_rows(&self, sheet: &Sheet) -> Vec<Vec<CellValue>>;

    /// Serialize a sheet to delimited text, one line per row, rows padded to
    /// the sheet width. No trailing line break.
    fn sheet_to_delimited_text(&self, sheet: &Sheet, separator: u8) -> Result<String, CodecError>;

    /// Serialize sheets to xlsx bytes.
    fn write_workbook(&self, sheets: &[Sheet]) -> Result<Vec<u8>, CodecError>;
}

/// Codec backed by `csv`, `calamine` and `rust_xlsxwriter`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardCodec;

/// Name given to the single sheet of a delimited text file.
pub const TEXT_SHEET_NAME: &str = "Sheet1";

impl StandardCodec {
    pub fn new() -> Self {
        Self
    }

    fn parse_text(&self, text: &str) -> Result<Workbook, CodecError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        // The csv reader skips blank lines; they are recovered from the bytes
        // each record consumed so row positions match the file.
        let bytes = text.as_bytes();
        let mut record = csv::StringRecord::new();
        let mut start: usize = 0;
        let mut rows = Vec::new();

        while reader.read_record(&mut record)? {
            let end = usize::try_from(reader.position().byte())
                .unwrap_or(bytes.len())
                .min(bytes.len());
            let after_cr = start
                .checked_sub(1)
                .and_then(|i| bytes.get(i))
                .is_some_and(|b| *b == b'\r');
            let blank = leading_blank_lines(bytes.get(start..end).unwrap_or_default(), after_cr);
            rows.extend(std::iter::repeat_with(Vec::new).take(blank));

            rows.push(
                record
                    .iter()
                    .map(|field| match field {
                        "" => CellValue::Empty,
                        field => CellValue::from(field),
                    })
                    .collect(),
            );
            start = end;
        }

        Ok(Workbook {
            sheets: vec![Sheet::new(TEXT_SHEET_NAME, rows)],
        })
    }

    fn parse_binary(&self, bytes: &[u8]) -> Result<Workbook, CodecError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| CodecError::Sheet(name.clone(), e.to_string()))?;

            let rows = range
                .rows()
                .map(|row| row.iter().map(convert_cell).collect())
                .collect();
            sheets.push(Sheet::new(name, rows));
        }

        debug!(sheets = sheets.len(), "parsed binary workbook");
        Ok(Workbook { sheets })
    }
}

impl SpreadsheetCodec for StandardCodec {
    fn parse_workbook(&self, content: &FileContent) -> Result<Workbook, CodecError> {
        match content {
            FileContent::Text(text) => self.parse_text(text),
            FileContent::Binary(bytes) => self.parse_binary(bytes),
        }
    }

    fn sheet_to_rows(&self, sheet: &Sheet) -> Vec<Vec<CellValue>> {
        let mut rows: Vec<Vec<CellValue>> = sheet
            .rows
            .iter()
            .map(|row| {
                let used = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
                row[..used].to_vec()
            })
            .collect();

        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }
        rows
    }

    fn sheet_to_delimited_text(&self, sheet: &Sheet, separator: u8) -> Result<String, CodecError> {
        let width = sheet.width();
        if width == 0 {
            return Ok(String::new());
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(separator)
            .terminator(csv::Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(Vec::new());

        for row in &sheet.rows {
            let mut fields: Vec<String> = row.iter().map(ToString::to_string).collect();
            fields.resize(width, String::new());
            writer.write_record(&fields)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| CodecError::Io(e.into_error()))?;
        let mut text = String::from_utf8(bytes)
            .map_err(|e| CodecError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    fn write_workbook(&self, sheets: &[Sheet]) -> Result<Vec<u8>, CodecError> {
        use rust_xlsxwriter::{Workbook, Worksheet};

        let mut workbook = Workbook::new();

        for sheet in sheets {
            let mut worksheet = Worksheet::new();
            worksheet.set_name(&sheet.name)?;

            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let (r, c) = (r as u32, c as u16);
                    match cell {
                        CellValue::Empty => {}
                        CellValue::String(s) => {
                            worksheet.write_string(r, c, s)?;
                        }
                        CellValue::Int(i) => {
                            worksheet.write_number(r, c, *i as f64)?;
                        }
                        CellValue::Float(n) => {
                            worksheet.write_number(r, c, *n)?;
                        }
                        CellValue::Bool(b) => {
                            worksheet.write_boolean(r, c, *b)?;
                        }
                    }
                }
            }

            workbook.push_worksheet(worksheet);
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// Count the line breaks that open `consumed`, the bytes read to produce one
/// record. A `\n` left over from the previous record's `\r\n` is not a blank
/// line.
fn leading_blank_lines(consumed: &[u8], after_cr: bool) -> usize {
    let consumed = match consumed {
        [b'\n', rest @ ..] if after_cr => rest,
        other => other,
    };

    let mut count = 0;
    let mut i = 0;
    while let Some(&b) = consumed.get(i) {
        match b {
            b'\r' => {
                count += 1;
                if consumed.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => count += 1,
            _ => break,
        }
        i += 1;
    }
    count
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.num_seconds_from_midnight() == 0 => {
                CellValue::String(ts.format("%Y-%m-%d").to_string())
            }
            Some(ts) => CellValue::String(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}
