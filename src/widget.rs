//! Import and export widgets.
//!
//! A widget owns the state of one pipeline run. Selecting a new file replaces
//! whatever the previous selection produced.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::codec::SpreadsheetCodec;
use crate::config::ImportConfig;
use crate::detect::{RawFile, detect, read_content};
use crate::downloader::{ExportFile, export_workbook};
use crate::error::{ImportError, RemoteError, SubmitRejected};
use crate::loader::parse;
use crate::payload::to_submission_payload;
use crate::preview::{Preview, PreviewRow, build_preview};
use crate::remote::{EntityKind, Record, RecordSource, RowSink, with_timeout};

/// Where the submit action stands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "camelCase")]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Failed(String),
}

/// Everything the remote insert needs, taken out of the widget so the call
/// can run without holding it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub csv_data: String,
    pub object_api_name: String,
    /// File selection the payload was taken from.
    generation: u64,
}

/// Snapshot of the import widget for rendering.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportView {
    pub message: String,
    pub file_name: Option<String>,
    pub headers: Vec<String>,
    pub preview_data: Vec<PreviewRow>,
    pub can_submit: bool,
    pub submit_state: SubmitState,
}

/// File import with preview and submission of the previewed rows.
pub struct ImportWidget<C> {
    codec: C,
    config: ImportConfig,
    message: String,
    file_name: Option<String>,
    preview: Preview,
    payload: Option<String>,
    submit_state: SubmitState,
    generation: u64,
}

impl<C: SpreadsheetCodec> ImportWidget<C> {
    pub fn new(codec: C, config: ImportConfig) -> Self {
        Self {
            codec,
            config,
            message: String::new(),
            file_name: None,
            preview: Preview::default(),
            payload: None,
            submit_state: SubmitState::Idle,
            generation: 0,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    /// The delimited text that a submit would send.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn submit_state(&self) -> &SubmitState {
        &self.submit_state
    }

    pub fn view(&self) -> ImportView {
        ImportView {
            message: self.message.clone(),
            file_name: self.file_name.clone(),
            headers: self.preview.headers.clone(),
            preview_data: self.preview.rows.clone(),
            can_submit: self.payload.is_some() && self.submit_state != SubmitState::Submitting,
            submit_state: self.submit_state.clone(),
        }
    }

    /// Handle a file selection.
    ///
    /// The outcome is always reflected in the widget message; the returned
    /// error is for callers that want to branch on it.
    pub fn select_file(&mut self, file: Option<RawFile>) -> Result<(), ImportError> {
        let Some(file) = file else {
            self.message = "No file selected".to_string();
            return Ok(());
        };

        let result = self.load(&file);
        if let Err(err) = &result {
            warn!(file_name = %file.name, error = %err, "file rejected");
            self.message = self.error_message(err);
        }
        result
    }

    fn load(&mut self, file: &RawFile) -> Result<(), ImportError> {
        if file.size() > self.config.max_file_bytes {
            return Err(ImportError::FileTooLarge {
                size: file.size(),
                limit: self.config.max_file_bytes,
            });
        }

        let format = detect(&file.name);
        let Some(mode) = format.read_mode() else {
            return Err(ImportError::UnsupportedFormat(file.name.clone()));
        };
        debug!(file_name = %file.name, ?format, size = file.size(), "reading file");

        // A new selection supersedes any submission still out for the old one
        self.generation += 1;
        self.submit_state = SubmitState::Idle;

        let content = read_content(file, mode);
        let built = parse(&self.codec, &file.name, &content).and_then(|table| {
            let preview = build_preview(&table, self.config.row_cap);
            let payload = to_submission_payload(&self.codec, &table, self.config.row_cap)?;
            Ok((table, preview, payload))
        });

        let (table, preview, payload) = match built {
            Ok(built) => built,
            Err(err) => {
                self.clear();
                return Err(err);
            }
        };

        self.file_name = Some(file.name.clone());

        if table.headers().is_none() {
            self.preview = Preview::default();
            self.payload = None;
            self.message = format!("File \"{}\" contains no data", file.name);
        } else if table.data_rows().is_empty() {
            self.preview = preview;
            self.payload = None;
            self.message = format!("File \"{}\" contains no data rows", file.name);
        } else {
            info!(
                file_name = %file.name,
                rows = preview.rows.len(),
                total_rows = table.data_rows().len(),
                "file loaded"
            );
            self.preview = preview;
            self.payload = Some(payload);
            self.message = format!("File \"{}\" loaded successfully", file.name);
        }

        Ok(())
    }

    fn clear(&mut self) {
        self.file_name = None;
        self.preview = Preview::default();
        self.payload = None;
    }

    fn error_message(&self, err: &ImportError) -> String {
        match err {
            ImportError::FileTooLarge { limit, .. } => format!(
                "File is too large. Please upload a file smaller than {}MB.",
                limit / (1024 * 1024)
            ),
            ImportError::UnsupportedFormat(_) => {
                "Unsupported file type. Please upload CSV or Excel.".to_string()
            }
            ImportError::Rejected(reason) => reason.to_string(),
            ImportError::RemoteSubmission(remote) => format!("Error: {}", remote.user_message()),
            other => format!("Error: {}", other),
        }
    }

    /// Start a submission: moves to `Submitting` and hands out the payload.
    ///
    /// Refused while another submission is outstanding or when nothing was
    /// loaded. Every `Ok` must be followed by [`finish_submit`] or
    /// [`cancel_submit`] with the returned [`Submission`].
    ///
    /// [`finish_submit`]: ImportWidget::finish_submit
    /// [`cancel_submit`]: ImportWidget::cancel_submit
    pub fn begin_submit(&mut self) -> Result<Submission, SubmitRejected> {
        let rejected = if self.submit_state == SubmitState::Submitting {
            Some(SubmitRejected::InProgress)
        } else if self.payload.is_none() && self.file_name.is_some() {
            Some(SubmitRejected::NoDataRows)
        } else if self.payload.is_none() {
            Some(SubmitRejected::NothingToSubmit)
        } else {
            None
        };

        if let Some(reason) = rejected {
            debug!(%reason, "submit refused");
            self.message = reason.to_string();
            return Err(reason);
        }

        self.submit_state = SubmitState::Submitting;
        Ok(Submission {
            csv_data: self.payload.clone().unwrap_or_default(),
            object_api_name: self.config.target_object.clone(),
            generation: self.generation,
        })
    }

    /// Apply the outcome of a remote insert. Preview and payload are kept
    /// either way, so a failed submit can be retried.
    ///
    /// An outcome for a file that has since been replaced is returned but
    /// leaves the widget alone.
    pub fn finish_submit(
        &mut self,
        submission: &Submission,
        result: Result<u64, RemoteError>,
    ) -> Result<u64, ImportError> {
        if submission.generation != self.generation {
            info!(ok = result.is_ok(), "outcome of a replaced file ignored");
            return result.map_err(ImportError::RemoteSubmission);
        }

        match result {
            Ok(count) => {
                info!(count, object = %self.config.target_object, "rows submitted");
                self.submit_state = SubmitState::Idle;
                self.message = format!("File uploaded. Inserted {} records", count);
                Ok(count)
            }
            Err(err) => {
                error!(error = %err, "submission failed");
                let text = err.user_message();
                self.submit_state = SubmitState::Failed(text.clone());
                self.message = format!("Error: {}", text);
                Err(ImportError::RemoteSubmission(err))
            }
        }
    }

    /// Submit the previewed rows to `sink` and wait for the answer.
    ///
    /// Dropping the returned future before it completes puts the widget back
    /// to `Idle`.
    pub async fn upload<S: RowSink>(&mut self, sink: &S) -> Result<u64, ImportError> {
        let submission = self.begin_submit()?;
        let limit = self.config.submit_timeout;
        let pending = PendingSubmit {
            widget: self,
            submission,
            settled: false,
        };

        let result = with_timeout(
            limit,
            sink.submit_rows(&pending.submission.csv_data, &pending.submission.object_api_name),
        )
        .await;
        pending.settle(result)
    }
}

impl<C> ImportWidget<C> {
    /// Abandon a submission whose outcome will never arrive.
    pub fn cancel_submit(&mut self, submission: &Submission) {
        if submission.generation == self.generation && self.submit_state == SubmitState::Submitting {
            warn!("submission interrupted");
            self.submit_state = SubmitState::Idle;
            self.message = "Submission was interrupted, please try again".to_string();
        }
    }
}

/// A submission in flight inside [`ImportWidget::upload`].
struct PendingSubmit<'a, C> {
    widget: &'a mut ImportWidget<C>,
    submission: Submission,
    settled: bool,
}

impl<C: SpreadsheetCodec> PendingSubmit<'_, C> {
    fn settle(mut self, result: Result<u64, RemoteError>) -> Result<u64, ImportError> {
        self.settled = true;
        self.widget.finish_submit(&self.submission, result)
    }
}

impl<C> Drop for PendingSubmit<'_, C> {
    fn drop(&mut self) {
        if !self.settled {
            self.widget.cancel_submit(&self.submission);
        }
    }
}

/// Record lists for export, fetched once from the backend.
#[derive(Clone, Debug, Default)]
pub struct ExportWidget {
    employees: Vec<Record>,
    accounts: Vec<Record>,
}

impl ExportWidget {
    pub fn new(employees: Vec<Record>, accounts: Vec<Record>) -> Self {
        Self { employees, accounts }
    }

    /// Fetch both record lists. Each fetch succeeds or fails on its own; a
    /// failed fetch is logged and leaves its list empty.
    pub async fn load<S: RecordSource>(source: &S, config: &ImportConfig) -> Self {
        let limit = config.submit_timeout;
        let (employees, accounts) = tokio::join!(
            with_timeout(limit, source.fetch_records(EntityKind::Employee)),
            with_timeout(limit, source.fetch_records(EntityKind::Account)),
        );

        Self {
            employees: records_or_empty(EntityKind::Employee, employees),
            accounts: records_or_empty(EntityKind::Account, accounts),
        }
    }

    pub async fn refresh<S: RecordSource>(&mut self, source: &S, config: &ImportConfig) {
        *self = Self::load(source, config).await;
    }

    pub fn employees(&self) -> &[Record] {
        &self.employees
    }

    pub fn accounts(&self) -> &[Record] {
        &self.accounts
    }

    pub fn export<C: SpreadsheetCodec + ?Sized>(&self, codec: &C) -> Result<ExportFile, ImportError> {
        export_workbook(codec, &self.employees, &self.accounts)
    }
}

fn records_or_empty(kind: EntityKind, result: Result<Vec<Record>, RemoteError>) -> Vec<Record> {
    match result {
        Ok(records) => {
            debug!(?kind, count = records.len(), "records fetched");
            records
        }
        Err(err) => {
            error!(?kind, error = %err, "error fetching records");
            Vec::new()
        }
    }
}
