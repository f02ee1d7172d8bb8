//! JSON HTTP transport over the [`Directory`] facade.
//!
//! Every handler is a thin adapter: it extracts parameters, calls one facade
//! method, and serializes the result. No business logic lives here.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/data` | All records |
//! | `GET`  | `/api/search?q=` | Records matching `q` (all when empty) |
//! | `GET`  | `/api/columns` | Column names |
//! | `GET`  | `/api/suggest?q=&limit=` | Autocomplete values |
//! | `GET`  | `/api/stats` | Contacted / not-contacted totals |
//! | `GET`  | `/api/export?q=` | Matching records as CSV |
//! | `POST` | `/api/contact-status` | Set `{record_id, status}` |
//! | `GET`  | `/api/contact-status/{id}` | Status for an identity |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "record id must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400, also for malformed JSON bodies),
//! `data_unavailable` (500), `persistence` (500), and `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a separately hosted
//! page can call the API.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use contact_directory_core::export::to_csv;
use contact_directory_core::search::{Suggestion, DEFAULT_SUGGESTION_LIMIT};
use contact_directory_core::{Directory, DirectoryError, Record, StatusLedger};

use crate::config::Config;

/// Starts the HTTP server on `config.server.bind` and runs until the process
/// is terminated.
pub async fn run_server<L>(config: &Config, directory: Arc<Directory<L>>) -> anyhow::Result<()>
where
    L: StatusLedger + 'static,
{
    let bind_addr = config.server.bind.clone();
    let app = router(directory);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "contact directory listening");
    println!("Contact directory listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router. Exposed separately so embedders can mount it.
pub fn router<L>(directory: Arc<Directory<L>>) -> Router
where
    L: StatusLedger + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/data", get(handle_data::<L>))
        .route("/api/search", get(handle_search::<L>))
        .route("/api/columns", get(handle_columns::<L>))
        .route("/api/suggest", get(handle_suggest::<L>))
        .route("/api/stats", get(handle_stats::<L>))
        .route("/api/export", get(handle_export::<L>))
        .route("/api/contact-status", post(handle_set_status::<L>))
        .route("/api/contact-status/{id}", get(handle_get_status::<L>))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(directory)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        let (status, code) = match &err {
            DirectoryError::InvalidStatus(_) | DirectoryError::InvalidRecordId => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            DirectoryError::DataUnavailable
            | DirectoryError::SourceUnavailable { .. }
            | DirectoryError::SchemaMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "data_unavailable")
            }
            DirectoryError::PersistenceError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence")
            }
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: format!("invalid request body: {}", rejection.body_text()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Records ============

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct SuggestQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

async fn handle_data<L: StatusLedger>(
    State(dir): State<Arc<Directory<L>>>,
) -> Result<Json<Vec<Record>>, AppError> {
    Ok(Json(dir.list_all()?.to_vec()))
}

async fn handle_search<L: StatusLedger>(
    State(dir): State<Arc<Directory<L>>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Record>>, AppError> {
    let hits = dir.search(&params.q)?;
    Ok(Json(hits.into_iter().cloned().collect()))
}

async fn handle_columns<L: StatusLedger>(
    State(dir): State<Arc<Directory<L>>>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(dir.columns()?.to_vec()))
}

async fn handle_suggest<L: StatusLedger>(
    State(dir): State<Arc<Directory<L>>>,
    Query(params): Query<SuggestQuery>,
) -> Result<Json<Vec<Suggestion>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    Ok(Json(dir.suggest(&params.q, limit)?))
}

#[derive(Serialize)]
struct StatsResponse {
    total: usize,
    contacted: usize,
    not_contacted: usize,
}

async fn handle_stats<L: StatusLedger>(
    State(dir): State<Arc<Directory<L>>>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = dir.stats()?;
    Ok(Json(StatsResponse {
        total: stats.total,
        contacted: stats.contacted,
        not_contacted: stats.not_contacted,
    }))
}

async fn handle_export<L: StatusLedger>(
    State(dir): State<Arc<Directory<L>>>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let columns = dir.record_set()?.columns().to_vec();
    let hits = dir.search(&params.q)?;
    let csv = to_csv(&columns, hits);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"contact_search_results.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

// ============ Contact status ============

#[derive(Deserialize)]
struct SetStatusRequest {
    #[serde(default)]
    record_id: String,
    #[serde(default)]
    status: String,
}

#[derive(Serialize)]
struct SetStatusResponse {
    success: bool,
    status: String,
}

#[derive(Serialize)]
struct GetStatusResponse {
    status: String,
}

/// Sets a status. The ledger write (file I/O under a lock) runs on the
/// blocking pool.
async fn handle_set_status<L: StatusLedger + 'static>(
    State(dir): State<Arc<Directory<L>>>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<SetStatusResponse>, AppError> {
    let Json(req) = payload?;
    let status = tokio::task::spawn_blocking(move || dir.set_status(&req.record_id, &req.status))
        .await
        .map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: format!("status update task failed: {}", e),
        })??;
    Ok(Json(SetStatusResponse {
        success: true,
        status: status.to_string(),
    }))
}

async fn handle_get_status<L: StatusLedger>(
    State(dir): State<Arc<Directory<L>>>,
    Path(id): Path<String>,
) -> Json<GetStatusResponse> {
    Json(GetStatusResponse {
        status: dir.get_status(&id).to_string(),
    })
}
