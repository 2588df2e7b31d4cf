use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::codec::StandardCodec;
use crate::config::{ImportConfig, ServerConfig};
use crate::detect::RawFile;
use crate::downloader::XLSX_CONTENT_TYPE;
use crate::error::{ImportError, SubmitRejected};
use crate::quick::QuickImportWidget;
use crate::remote::{HttpBackend, RecordSource, RowSink, with_timeout};
use crate::widget::{ExportWidget, ImportWidget};

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// One widget of each kind, shared by all requests.
pub struct AppState<B> {
    backend: B,
    config: ImportConfig,
    codec: StandardCodec,
    import: Mutex<ImportWidget<StandardCodec>>,
    quick: Mutex<QuickImportWidget>,
    export: Mutex<ExportWidget>,
}

impl<B> AppState<B> {
    pub fn new(backend: B, config: ImportConfig, export: ExportWidget) -> Self {
        Self {
            backend,
            codec: StandardCodec,
            import: Mutex::new(ImportWidget::new(StandardCodec, config.clone())),
            quick: Mutex::new(QuickImportWidget::new(config.clone())),
            export: Mutex::new(export),
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "error".to_string(),
            message: Some(message.into()),
        })
    }
}

#[derive(Serialize)]
struct RecordCounts {
    employees: usize,
    accounts: usize,
}

/// Fetch the export records, then serve the widgets over HTTP until the
/// listener fails.
///
/// # Arguments
/// * `config` - Bind address, backend URL and import settings
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Only returns on a bind or serve error
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let import_config = config.import_config();
    let backend = HttpBackend::new(&config.backend_url);

    // Records are fetched once at startup, like the export widget does on init
    let export = ExportWidget::load(&backend, &import_config).await;
    info!(
        employees = export.employees().len(),
        accounts = export.accounts().len(),
        "export records loaded"
    );

    let state = Arc::new(AppState::new(backend, import_config, export));
    let app = router(state);

    let listener = TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over `state`.
///
/// # Arguments
/// * `state` - Shared widgets and the backend every handler talks to
///
/// # Returns
/// * `Router` - JSON API under `/api`, the page at `/`, with trace, CORS and
///   body-limit layers
pub fn router<B>(state: Arc<AppState<B>>) -> Router
where
    B: RowSink + RecordSource + 'static,
{
    let body_limit = state.config.max_file_bytes + 1024 * 1024;

    Router::new()
        .route("/", get(serve_index))
        .route("/api/import", get(import_view::<B>).post(import_file::<B>))
        .route("/api/import/submit", post(submit_import::<B>))
        .route("/api/quick-import", get(quick_view::<B>).post(quick_file::<B>))
        .route("/api/quick-import/submit", post(submit_quick::<B>))
        .route("/api/export", get(export_file::<B>))
        .route("/api/export/refresh", post(refresh_export::<B>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

/// Pull the uploaded file out of a multipart body. `Ok(None)` when the form
/// has no file field.
async fn read_upload(mut multipart: Multipart) -> Result<Option<RawFile>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| e.to_string())?;
        return Ok(Some(RawFile::new(name, bytes.to_vec())));
    }
    Ok(None)
}

fn import_status(err: &ImportError) -> StatusCode {
    match err {
        ImportError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ImportError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ImportError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ImportError::Rejected(SubmitRejected::InProgress) => StatusCode::CONFLICT,
        ImportError::Rejected(SubmitRejected::NothingToSubmit | SubmitRejected::NoDataRows) => {
            StatusCode::BAD_REQUEST
        }
        ImportError::RemoteSubmission(_) => StatusCode::BAD_GATEWAY,
        ImportError::NoDataToExport => StatusCode::NOT_FOUND,
        ImportError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn import_view<B>(State(state): State<Arc<AppState<B>>>) -> impl IntoResponse {
    Json(state.import.lock().await.view())
}

async fn import_file<B>(State(state): State<Arc<AppState<B>>>, multipart: Multipart) -> Response {
    let file = match read_upload(multipart).await {
        Ok(file) => file,
        Err(e) => {
            warn!(error = %e, "malformed upload");
            return (StatusCode::BAD_REQUEST, StatusResponse::error(e)).into_response();
        }
    };

    let mut widget = state.import.lock().await;
    let status = match widget.select_file(file) {
        Ok(()) => StatusCode::OK,
        Err(err) => import_status(&err),
    };
    (status, Json(widget.view())).into_response()
}

async fn submit_import<B: RowSink + 'static>(State(state): State<Arc<AppState<B>>>) -> Response {
    // The lock is released while the backend works; the submit state keeps
    // a second click from starting another insert.
    let submission = {
        let mut widget = state.import.lock().await;
        match widget.begin_submit() {
            Ok(submission) => submission,
            Err(reason) => {
                let status = import_status(&reason.into());
                return (status, Json(widget.view())).into_response();
            }
        }
    };

    // Detached, so a client that goes away cannot leave the widget submitting
    let task = tokio::spawn({
        let state = state.clone();
        let submission = submission.clone();
        async move {
            let result = with_timeout(
                state.config.submit_timeout,
                state
                    .backend
                    .submit_rows(&submission.csv_data, &submission.object_api_name),
            )
            .await;

            let mut widget = state.import.lock().await;
            let status = match widget.finish_submit(&submission, result) {
                Ok(_) => StatusCode::OK,
                Err(err) => import_status(&err),
            };
            (status, widget.view())
        }
    });

    match task.await {
        Ok((status, view)) => (status, Json(view)).into_response(),
        Err(e) => {
            error!(error = %e, "submit task failed");
            state.import.lock().await.cancel_submit(&submission);
            (StatusCode::INTERNAL_SERVER_ERROR, StatusResponse::error("Submission failed")).into_response()
        }
    }
}

async fn quick_view<B>(State(state): State<Arc<AppState<B>>>) -> impl IntoResponse {
    Json(state.quick.lock().await.view())
}

async fn quick_file<B>(State(state): State<Arc<AppState<B>>>, multipart: Multipart) -> Response {
    match read_upload(multipart).await {
        Ok(Some(file)) => {
            let mut widget = state.quick.lock().await;
            widget.select_file(&file);
            Json(widget.view()).into_response()
        }
        Ok(None) => (StatusCode::BAD_REQUEST, StatusResponse::error("No file selected")).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, StatusResponse::error(e)).into_response(),
    }
}

async fn submit_quick<B: RowSink + 'static>(State(state): State<Arc<AppState<B>>>) -> Response {
    let submission = {
        let mut widget = state.quick.lock().await;
        match widget.begin_upload() {
            Ok(submission) => submission,
            Err(reason) => {
                let status = import_status(&reason.into());
                return (status, Json(widget.view())).into_response();
            }
        }
    };

    let task = tokio::spawn({
        let state = state.clone();
        let submission = submission.clone();
        async move {
            let result = with_timeout(
                state.config.submit_timeout,
                state.backend.process_csv(
                    &submission.csv_data,
                    &submission.object_api_name,
                    &submission.headers,
                ),
            )
            .await;

            let mut widget = state.quick.lock().await;
            let status = match widget.finish_upload(&submission, result) {
                Ok(_) => StatusCode::OK,
                Err(err) => import_status(&err),
            };
            (status, widget.view())
        }
    });

    match task.await {
        Ok((status, view)) => (status, Json(view)).into_response(),
        Err(e) => {
            error!(error = %e, "csv upload task failed");
            state.quick.lock().await.cancel_upload(&submission);
            (StatusCode::INTERNAL_SERVER_ERROR, StatusResponse::error("Upload failed")).into_response()
        }
    }
}

async fn export_file<B>(State(state): State<Arc<AppState<B>>>) -> Response {
    let export = state.export.lock().await;

    match export.export(&state.codec) {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.file_name),
                ),
            ],
            file.bytes,
        )
            .into_response(),
        Err(err) => (import_status(&err), StatusResponse::error(err.to_string())).into_response(),
    }
}

async fn refresh_export<B: RecordSource>(State(state): State<Arc<AppState<B>>>) -> impl IntoResponse {
    let mut export = state.export.lock().await;
    export.refresh(&state.backend, &state.config).await;

    Json(RecordCounts {
        employees: export.employees().len(),
        accounts: export.accounts().len(),
    })
}
