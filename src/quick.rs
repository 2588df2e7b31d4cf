//! Plain CSV importer.
//!
//! Reads the file as text, previews the first few lines with a naive comma
//! split and sends the whole file together with its header list to the
//! backend, which answers with a message.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::codec::FileContent;
use crate::config::ImportConfig;
use crate::detect::{RawFile, ReadMode, read_content};
use crate::error::{ImportError, RemoteError, SubmitRejected};
use crate::remote::{RowSink, with_timeout};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuickCell {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuickRow {
    pub key: String,
    pub values: Vec<QuickCell>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickView {
    pub message: String,
    pub headers: Vec<String>,
    pub preview_data: Vec<QuickRow>,
}

/// The whole file and its headers, ready for `process_csv`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickSubmission {
    pub csv_data: String,
    pub object_api_name: String,
    pub headers: Vec<String>,
    generation: u64,
}

pub struct QuickImportWidget {
    config: ImportConfig,
    message: String,
    headers: Vec<String>,
    preview: Vec<QuickRow>,
    content: Option<String>,
    submitting: bool,
    generation: u64,
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(',').map(|v| v.trim().to_string()).collect()
}

impl QuickImportWidget {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            message: String::new(),
            headers: Vec::new(),
            preview: Vec::new(),
            content: None,
            submitting: false,
            generation: 0,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn preview(&self) -> &[QuickRow] {
        &self.preview
    }

    pub fn view(&self) -> QuickView {
        QuickView {
            message: self.message.clone(),
            headers: self.headers.clone(),
            preview_data: self.preview.clone(),
        }
    }

    pub fn select_file(&mut self, file: &RawFile) {
        let FileContent::Text(text) = read_content(file, ReadMode::Text) else {
            return;
        };
        self.select_text(&text);
    }

    /// Load `text`: the first non-blank line gives the headers, the next
    /// `quick_preview_rows` lines are previewed.
    pub fn select_text(&mut self, text: &str) {
        self.generation += 1;
        self.submitting = false;

        let mut lines = text.split('\n').map(str::trim).filter(|l| !l.is_empty());

        let Some(header_line) = lines.next() else {
            self.headers.clear();
            self.preview.clear();
            self.content = None;
            self.message = "File is empty".to_string();
            return;
        };

        self.headers = split_fields(header_line);
        self.preview = lines
            .take(self.config.quick_preview_rows)
            .enumerate()
            .map(|(i, line)| QuickRow {
                key: format!("row_{}", i),
                values: split_fields(line)
                    .into_iter()
                    .enumerate()
                    .map(|(j, value)| QuickCell {
                        key: format!("cell_{}_{}", i, j),
                        value,
                    })
                    .collect(),
            })
            .collect();
        self.content = Some(text.to_string());
        self.message = "File is uploaded. Preview below ⬇".to_string();
    }

    /// Hand out the loaded file for sending. Refused while a send is
    /// outstanding or before a file is loaded.
    pub fn begin_upload(&mut self) -> Result<QuickSubmission, SubmitRejected> {
        if self.submitting {
            self.message = SubmitRejected::InProgress.to_string();
            return Err(SubmitRejected::InProgress);
        }
        let Some(content) = self.content.clone() else {
            self.message = "Please select a file first".to_string();
            return Err(SubmitRejected::NothingToSubmit);
        };

        self.submitting = true;
        Ok(QuickSubmission {
            csv_data: content,
            object_api_name: self.config.quick_target_object.clone(),
            headers: self.headers.clone(),
            generation: self.generation,
        })
    }

    /// Show the backend's answer, unless another file was selected meanwhile.
    pub fn finish_upload(
        &mut self,
        submission: &QuickSubmission,
        result: Result<String, RemoteError>,
    ) -> Result<String, ImportError> {
        if submission.generation != self.generation {
            info!(ok = result.is_ok(), "outcome of a replaced file ignored");
            return result.map_err(ImportError::RemoteSubmission);
        }
        self.submitting = false;

        match result {
            Ok(answer) => {
                info!(object = %submission.object_api_name, "csv processed");
                self.message = answer.clone();
                Ok(answer)
            }
            Err(err) => {
                error!(error = %err, "csv processing failed");
                self.message = format!("Error: {}", err.user_message());
                Err(err.into())
            }
        }
    }

    /// Abandon a send whose answer will never arrive.
    pub fn cancel_upload(&mut self, submission: &QuickSubmission) {
        if submission.generation == self.generation && self.submitting {
            warn!("csv upload interrupted");
            self.submitting = false;
            self.message = "Upload was interrupted, please try again".to_string();
        }
    }

    /// Send the whole file and its headers to the backend.
    pub async fn upload<S: RowSink>(&mut self, sink: &S) -> Result<String, ImportError> {
        let submission = self.begin_upload()?;
        let limit = self.config.submit_timeout;
        let mut pending = PendingUpload {
            widget: self,
            submission,
            settled: false,
        };

        let result = with_timeout(
            limit,
            sink.process_csv(
                &pending.submission.csv_data,
                &pending.submission.object_api_name,
                &pending.submission.headers,
            ),
        )
        .await;

        pending.settled = true;
        pending.widget.finish_upload(&pending.submission, result)
    }
}

struct PendingUpload<'a> {
    widget: &'a mut QuickImportWidget,
    submission: QuickSubmission,
    settled: bool,
}

impl Drop for PendingUpload<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.widget.cancel_upload(&self.submission);
        }
    }
}
