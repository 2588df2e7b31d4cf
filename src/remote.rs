//! Remote collaborators: the record source used by the export widget and the
//! row sink that persists imported rows.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// A flat record as returned by the backend.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Employee,
    Account,
}

impl EntityKind {
    /// Path segment used by the HTTP backend.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Employee => "employees",
            EntityKind::Account => "accounts",
        }
    }
}

/// Supplies records for export.
pub trait RecordSource: Send + Sync {
    fn fetch_records(&self, kind: EntityKind) -> impl Future<Output = Result<Vec<Record>, RemoteError>> + Send;
}

/// Persists delimited rows.
pub trait RowSink: Send + Sync {
    /// Insert the rows of `csv_data` into `object_api_name`, returning the
    /// number of inserted records.
    fn submit_rows(
        &self,
        csv_data: &str,
        object_api_name: &str,
    ) -> impl Future<Output = Result<u64, RemoteError>> + Send;

    /// Process a whole CSV file with an explicit header list. The backend
    /// answers with a message for the user.
    fn process_csv(
        &self,
        csv_data: &str,
        object_api_name: &str,
        headers: &[String],
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

/// Run a remote call with a deadline.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}

/// Error body shapes the backend may answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Rows(Vec<MessageBody>),
    Single(MessageBody),
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

/// Decode a failed response body into a [`RemoteError`].
pub fn decode_error_body(status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Rows(rows)) => {
            RemoteError::RowErrors(rows.into_iter().filter_map(|r| r.message).collect())
        }
        Ok(ErrorBody::Single(MessageBody { message: Some(m) })) => RemoteError::Message(m),
        _ if body.trim().is_empty() => RemoteError::Transport(format!("HTTP {}", status)),
        _ => RemoteError::Message(body.trim().to_string()),
    }
}

#[cfg(feature = "web")]
pub use http::HttpBackend;

#[cfg(feature = "web")]
mod http {
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use tracing::{debug, error};

    use super::{EntityKind, Record, RecordSource, RowSink, decode_error_body};
    use crate::error::RemoteError;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SubmitRequest<'a> {
        csv_data: &'a str,
        object_api_name: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        headers: Option<&'a [String]>,
    }

    /// JSON-over-HTTP implementation of the remote services.
    #[derive(Clone, Debug)]
    pub struct HttpBackend {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpBackend {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), base_url)
        }

        pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
            Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}/{}", self.base_url, path)
        }

        async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
            let status = response.status();
            if status.is_success() {
                return response
                    .json::<T>()
                    .await
                    .map_err(|e| RemoteError::Transport(e.to_string()));
            }

            let body = response.text().await.unwrap_or_default();
            let err = decode_error_body(status.as_u16(), &body);
            error!(%status, error = %err, "backend rejected request");
            Err(err)
        }

        async fn post<T: DeserializeOwned>(&self, path: &str, request: &SubmitRequest<'_>) -> Result<T, RemoteError> {
            let response = self
                .client
                .post(self.url(path))
                .json(request)
                .send()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            Self::read(response).await
        }
    }

    impl RecordSource for HttpBackend {
        async fn fetch_records(&self, kind: EntityKind) -> Result<Vec<Record>, RemoteError> {
            let url = self.url(&format!("records/{}", kind.collection()));
            debug!(%url, "fetching records");

            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            Self::read(response).await
        }
    }

    impl RowSink for HttpBackend {
        async fn submit_rows(&self, csv_data: &str, object_api_name: &str) -> Result<u64, RemoteError> {
            let request = SubmitRequest {
                csv_data,
                object_api_name,
                headers: None,
            };
            self.post("rows", &request).await
        }

        async fn process_csv(
            &self,
            csv_data: &str,
            object_api_name: &str,
            headers: &[String],
        ) -> Result<String, RemoteError> {
            let request = SubmitRequest {
                csv_data,
                object_api_name,
                headers: Some(headers),
            };
            self.post("csv", &request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_message() {
        let err = decode_error_body(400, r#"{"message":"Required field missing"}"#);
        assert_eq!(err, RemoteError::Message("Required field missing".to_string()));
    }

    #[test]
    fn decodes_row_messages() {
        let err = decode_error_body(400, r#"[{"message":"Row 1 bad"},{"message":"Row 2 bad"}]"#);
        assert_eq!(err.user_message(), "Row 1 bad, Row 2 bad");
    }

    #[test]
    fn falls_back_to_raw_body_or_status() {
        assert_eq!(
            decode_error_body(502, "upstream down"),
            RemoteError::Message("upstream down".to_string())
        );
        assert_eq!(
            decode_error_body(500, ""),
            RemoteError::Transport("HTTP 500".to_string())
        );
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let limit = Duration::from_millis(10);
        let result: Result<u64, RemoteError> = with_timeout(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1)
        })
        .await;
        assert_eq!(result, Err(RemoteError::Timeout(limit)));
    }

    #[test]
    fn collections_are_plural() {
        assert_eq!(EntityKind::Employee.collection(), "employees");
        assert_eq!(EntityKind::Account.collection(), "accounts");
    }
}
