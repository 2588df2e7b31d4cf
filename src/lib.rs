/*!
# Sheetbridge

Spreadsheet import and export widgets for a record backend, built in Rust.

## Overview

Users pick a CSV or Excel file, see a preview of its first rows and submit
those rows to a backend that persists them. In the other direction, employee
and account records fetched from the backend are exported to a workbook.

## Architecture

### Import pipeline
- **Format Detector** (`detect`) - Chooses a parse mode from the file name
- **Parser Adapter** (`loader`) - Reads the first sheet into rows of cells
- **Preview Builder** (`preview`) - Caps the rows and assigns stable row/cell ids
- **Canonical Re-encoder** (`payload`) - Re-serializes the previewed window as CSV

### Collaborators
- **Codec** (`codec`) - Workbook reading and writing behind a trait
  (`calamine`, `csv`, `rust_xlsxwriter`)
- **Remote services** (`remote`) - Record source and row sink traits, with an
  HTTP implementation behind the `web` feature

### Widgets
- **ImportWidget** - File selection, preview, guarded submission
- **QuickImportWidget** - Plain CSV import that posts the whole file
- **ExportWidget** - Employees/accounts to `ExportedData.xlsx`

### Web Layer
- **Technologies**: axum, tower-http
- Serves the widgets as JSON endpoints (feature `web`)

## Modules

- **app**: Routing and handlers (feature `web`)
- **codec**: Cell, sheet and workbook types and the codec trait
- **config**: Widget and server settings
- **detect**: File format detection and reading
- **downloader**: Export of record lists to xlsx
- **error**: Error types
- **loader**: Parsing into a table
- **payload**: Submission payload
- **preview**: Preview grid
- **quick**: Plain CSV importer
- **remote**: Backend traits and HTTP client
- **widget**: Import and export widgets
*/

#[cfg(feature = "web")]
pub mod app;
pub mod codec;
pub mod config;
pub mod detect;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod payload;
pub mod preview;
pub mod quick;
pub mod remote;
pub mod widget;

pub use codec::{CellValue, FileContent, Sheet, SpreadsheetCodec, StandardCodec, Workbook};
pub use config::ImportConfig;
pub use detect::{FileFormat, RawFile, detect};
pub use error::{CodecError, ImportError, RemoteError};
pub use loader::{ParsedTable, parse};
pub use payload::to_submission_payload;
pub use preview::{Preview, PreviewCell, PreviewRow, build_preview};
pub use widget::{ExportWidget, ImportWidget, SubmitState};

/// Install the `tracing` subscriber used by the binaries.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
