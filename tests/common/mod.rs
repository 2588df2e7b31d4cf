#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;
use sheetbridge::RemoteError;
use sheetbridge::remote::{EntityKind, Record, RecordSource, RowSink};

/// In-memory backend: remembers submissions and serves canned records.
#[derive(Default)]
pub struct FakeBackend {
    pub employees: Vec<Record>,
    pub accounts: Vec<Record>,
    pub fail_accounts: bool,
    pub reject_with: Option<RemoteError>,
    /// How long every write call takes.
    pub delay: Option<Duration>,
    pub submissions: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    pub fn submitted(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl RecordSource for FakeBackend {
    async fn fetch_records(&self, kind: EntityKind) -> Result<Vec<Record>, RemoteError> {
        match kind {
            EntityKind::Employee => Ok(self.employees.clone()),
            EntityKind::Account if self.fail_accounts => {
                Err(RemoteError::Message("Insufficient access".to_string()))
            }
            EntityKind::Account => Ok(self.accounts.clone()),
        }
    }
}

impl RowSink for FakeBackend {
    async fn submit_rows(&self, csv_data: &str, object_api_name: &str) -> Result<u64, RemoteError> {
        self.wait().await;
        self.submissions
            .lock()
            .unwrap()
            .push((csv_data.to_string(), object_api_name.to_string()));
        match &self.reject_with {
            Some(err) => Err(err.clone()),
            None => Ok(csv_data.lines().count().saturating_sub(1) as u64),
        }
    }

    async fn process_csv(
        &self,
        csv_data: &str,
        _object_api_name: &str,
        headers: &[String],
    ) -> Result<String, RemoteError> {
        self.wait().await;
        Ok(format!(
            "Processed {} lines with {} columns",
            csv_data.lines().count(),
            headers.len()
        ))
    }
}

pub fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

pub fn account(name: &str) -> Record {
    record(json!({
        "Id": format!("001{}", name.len()),
        "Name": name,
        "Industry": "Manufacturing",
        "Phone": "555-0100"
    }))
}

pub fn employee(name: &str) -> Record {
    record(json!({
        "Id": format!("a00{}", name.len()),
        "Name": name,
        "Email__c": format!("{}@example.com", name.to_lowercase()),
        "Role__c": "Analyst"
    }))
}
