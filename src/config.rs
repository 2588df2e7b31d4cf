use std::time::Duration;

use clap::Parser;

use crate::detect::MAX_FILE_BYTES;
use crate::preview::DEFAULT_ROW_CAP;

/// Settings of the import and export widgets.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportConfig {
    /// Data rows kept for preview and submission.
    pub row_cap: usize,
    pub max_file_bytes: usize,
    /// Object the import widget inserts into.
    pub target_object: String,
    /// Object the quick CSV importer inserts into.
    pub quick_target_object: String,
    pub quick_preview_rows: usize,
    pub submit_timeout: Duration,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            row_cap: DEFAULT_ROW_CAP,
            max_file_bytes: MAX_FILE_BYTES,
            target_object: "Customer__c".to_string(),
            quick_target_object: "Project__c".to_string(),
            quick_preview_rows: 5,
            submit_timeout: Duration::from_secs(30),
        }
    }
}

/// Command line of the web server. Every flag can also come from the
/// environment.
#[derive(Clone, Debug, Parser)]
#[command(name = "sheetbridge-web", about = "Spreadsheet import/export widgets over HTTP")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "SHEETBRIDGE_BIND", default_value = "127.0.0.1:3000")]
    pub bind: String,

    /// Base URL of the record/persistence backend
    #[arg(long, env = "SHEETBRIDGE_BACKEND_URL", default_value = "http://127.0.0.1:8080/api")]
    pub backend_url: String,

    /// Data rows kept for preview and submission
    #[arg(long, env = "SHEETBRIDGE_ROW_CAP", default_value_t = DEFAULT_ROW_CAP)]
    pub row_cap: usize,

    /// Seconds to wait for the backend before giving up
    #[arg(long, env = "SHEETBRIDGE_SUBMIT_TIMEOUT_SECS", default_value_t = 30)]
    pub submit_timeout_secs: u64,

    /// Object the import widget inserts into
    #[arg(long, env = "SHEETBRIDGE_TARGET_OBJECT", default_value = "Customer__c")]
    pub target_object: String,
}

impl ServerConfig {
    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            row_cap: self.row_cap,
            target_object: self.target_object.clone(),
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
            ..ImportConfig::default()
        }
    }
}
