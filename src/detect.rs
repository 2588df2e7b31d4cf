use crate::codec::FileContent;

/// Maximum accepted upload size (10 MiB).
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Parse mode chosen from a file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
    Unsupported,
}

/// How the file bytes are handed to the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    Text,
    Binary,
}

impl FileFormat {
    /// `None` for unsupported files: they are never read.
    pub fn read_mode(self) -> Option<ReadMode> {
        match self {
            FileFormat::Csv => Some(ReadMode::Text),
            FileFormat::Spreadsheet => Some(ReadMode::Binary),
            FileFormat::Unsupported => None,
        }
    }
}

/// A file as selected by the user.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Detect the format from the file name suffix, ignoring case.
///
/// # Examples
/// ```
/// use sheetbridge::detect::{detect, FileFormat};
///
/// assert_eq!(detect("Report.CSV"), FileFormat::Csv);
/// assert_eq!(detect("book.xlsx"), FileFormat::Spreadsheet);
/// assert_eq!(detect("notes.txt"), FileFormat::Unsupported);
/// ```
pub fn detect(file_name: &str) -> FileFormat {
    let name = file_name.to_lowercase();

    if name.ends_with(".csv") {
        FileFormat::Csv
    } else if name.ends_with(".xls") || name.ends_with(".xlsx") {
        FileFormat::Spreadsheet
    } else {
        FileFormat::Unsupported
    }
}

/// Turn raw bytes into codec input for the given mode.
///
/// Text is decoded as UTF-8 with replacement characters and a leading byte
/// order mark is dropped.
pub fn read_content(file: &RawFile, mode: ReadMode) -> FileContent {
    match mode {
        ReadMode::Text => {
            let text = String::from_utf8_lossy(&file.bytes);
            let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
            FileContent::Text(text.to_string())
        }
        ReadMode::Binary => FileContent::Binary(file.bytes.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_are_case_insensitive() {
        for name in ["a.csv", "A.CSV", "dir/x.Csv"] {
            assert_eq!(detect(name), FileFormat::Csv, "{}", name);
        }
        for name in ["a.xls", "a.XLSX", "Q3 numbers.Xlsx"] {
            assert_eq!(detect(name), FileFormat::Spreadsheet, "{}", name);
        }
        for name in ["a.txt", "csv", "a.csv.bak", "a.xlsm", "", "a.ods"] {
            assert_eq!(detect(name), FileFormat::Unsupported, "{}", name);
        }
    }

    #[test]
    fn read_modes_follow_format() {
        assert_eq!(FileFormat::Csv.read_mode(), Some(ReadMode::Text));
        assert_eq!(FileFormat::Spreadsheet.read_mode(), Some(ReadMode::Binary));
        assert_eq!(FileFormat::Unsupported.read_mode(), None);
    }

    #[test]
    fn text_mode_strips_bom() {
        let file = RawFile::new("a.csv", "\u{feff}Name\nAda".as_bytes());
        assert_eq!(
            read_content(&file, ReadMode::Text),
            FileContent::Text("Name\nAda".to_string())
        );
    }
}
