use std::time::Duration;

use thiserror::Error;

/// Failures raised by the spreadsheet codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("workbook could not be read: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("delimited text could not be processed: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx could not be written: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sheet {0:?} could not be read: {1}")]
    Sheet(String, String),
}

/// Failures reported by (or while talking to) a remote service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    /// A single structured message from the backend.
    #[error("{0}")]
    Message(String),

    /// One message per rejected row.
    #[error("{}", .0.join(", "))]
    RowErrors(Vec<String>),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Text shown to the user after `Error: `.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::RowErrors(messages) if messages.is_empty() => "Unknown error".to_string(),
            RemoteError::Message(message) if message.is_empty() => "Unknown error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Reasons a submit click is refused before any remote call is made.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Please select a file")]
    NothingToSubmit,

    /// A file is loaded but it has no rows below the header.
    #[error("The selected file has no data rows to submit")]
    NoDataRows,

    #[error("A submission is already in progress")]
    InProgress,
}

/// Error taxonomy of the import and export paths.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("file is {size} bytes, the limit is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("could not read \"{file_name}\": {reason}")]
    Parse { file_name: String, reason: String },

    #[error("submission failed: {0}")]
    RemoteSubmission(#[from] RemoteError),

    #[error(transparent)]
    Rejected(#[from] SubmitRejected),

    #[error("No data available to export")]
    NoDataToExport,

    #[error(transparent)]
    Codec(#[from] CodecError),
}
