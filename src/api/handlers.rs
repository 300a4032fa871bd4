use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{AdminSession, ClientAddr, CurrentSession};
use crate::auth::{AuthError, CredentialStore, SessionStore};
use crate::data::{CacheStats, DatasetCache, LoadError, ParcelRecord};
use crate::export::{export_filename, to_spreadsheet, ExportError, XLSX_MIME};
use crate::journal::{
    AccessLog, AccessRequest, AccessRequests, JournalError, LogEntry, SubmitError,
};
use crate::query::{
    run_query, search_addresses, AddressSearch, FilterSpec, QueryOutcome, ValueStats,
    ALL_CATEGORIES,
};

/// Application state shared across handlers
pub struct AppState {
    pub datasets: DatasetCache,
    pub credentials: CredentialStore,
    pub sessions: Arc<SessionStore>,
    pub access_log: AccessLog,
    pub access_requests: AccessRequests,
    pub max_address_matches: usize,
}

/// Run synchronous file or CPU-heavy work off the async workers
async fn run_blocking<T, F>(state: &Arc<AppState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub is_admin: bool,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = request.username.clone();
    let credential = run_blocking(&state, move |state| {
        state
            .credentials
            .authenticate(&request.username, &request.password)
            .cloned()
    })
    .await?
    .map_err(|e| {
        tracing::info!(username = %username, "Login rejected: {}", e);
        ApiError::from(e)
    })?;

    let session = state.sessions.open(&credential);

    Ok(Json(LoginResponse {
        token: session.token,
        username: session.username,
        is_admin: session.is_admin,
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> StatusCode {
    state.sessions.close(&session.token);
    StatusCode::NO_CONTENT
}

// ============================================================================
// Access Requests
// ============================================================================

#[derive(Deserialize)]
pub struct AccessRequestBody {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

pub async fn submit_access_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AccessRequestBody>,
) -> Result<(StatusCode, Json<AccessRequest>), ApiError> {
    let request = run_blocking(&state, move |state| {
        state
            .access_requests
            .submit(&body.username, &body.email, &body.phone)
    })
    .await??;
    Ok((StatusCode::CREATED, Json(request)))
}

// ============================================================================
// Filters & Address Search
// ============================================================================

#[derive(Serialize)]
pub struct FilterOptionsResponse {
    /// The "all" sentinel first, then every distinct category
    pub categories: Vec<String>,
}

pub async fn filter_options(
    State(state): State<Arc<AppState>>,
    _session: CurrentSession,
) -> Result<Json<FilterOptionsResponse>, ApiError> {
    let loaded = state.datasets.get().await?;

    let categories = std::iter::once(ALL_CATEGORIES.to_string())
        .chain(loaded.dataset.categories().iter().cloned())
        .collect();

    Ok(Json(FilterOptionsResponse { categories }))
}

#[derive(Deserialize)]
pub struct AddressQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn address_search(
    State(state): State<Arc<AppState>>,
    _session: CurrentSession,
    Query(params): Query<AddressQuery>,
) -> Result<Json<AddressSearch>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::BadRequest("Search text is required".to_string()));
    }

    let loaded = state.datasets.get().await?;
    Ok(Json(search_addresses(
        loaded.dataset.addresses(),
        &params.q,
        state.max_address_matches,
    )))
}

// ============================================================================
// Query
// ============================================================================

#[derive(Deserialize)]
pub struct QueryRequest {
    #[serde(flatten)]
    pub filters: FilterSpec,
    /// Include the matching parcels in the response
    #[serde(default)]
    pub include_rows: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Matched,
    NoMatches,
}

#[derive(Serialize)]
pub struct ParcelRow {
    pub number: Option<i64>,
    pub cadastral_block: Option<String>,
    pub address: Option<String>,
    pub land_use: Option<String>,
    pub unit_value: Option<f64>,
}

impl From<&ParcelRecord> for ParcelRow {
    fn from(record: &ParcelRecord) -> Self {
        Self {
            number: record.number,
            cadastral_block: record.cadastral_block.clone(),
            address: record.address.clone(),
            land_use: record.land_use.clone(),
            unit_value: record.unit_value,
        }
    }
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub outcome: QueryStatus,
    pub result_count: usize,
    pub stats: Option<ValueStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ParcelRow>>,
    pub execution_time_ms: u64,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    ClientAddr(ip): ClientAddr,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let loaded = state.datasets.get().await?;
    let start = std::time::Instant::now();

    let outcome = run_query(&loaded.dataset, &request.filters);
    let result_count = outcome.row_count();

    let entry = LogEntry::new(&session.username, &request.filters, result_count, ip.as_deref());
    run_blocking(&state, move |state| state.access_log.record(&entry)).await?;

    let response = match outcome {
        QueryOutcome::NoMatches => QueryResponse {
            outcome: QueryStatus::NoMatches,
            result_count: 0,
            stats: None,
            rows: None,
            execution_time_ms: start.elapsed().as_millis() as u64,
        },
        QueryOutcome::Matched(result) => QueryResponse {
            outcome: QueryStatus::Matched,
            result_count,
            stats: result.stats,
            rows: request
                .include_rows
                .then(|| result.records.iter().map(|r| ParcelRow::from(*r)).collect()),
            execution_time_ms: start.elapsed().as_millis() as u64,
        },
    };

    tracing::debug!(
        username = %session.username,
        result_count,
        "Query executed"
    );

    Ok(Json(response))
}

// ============================================================================
// Export
// ============================================================================

pub async fn export(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Json(filters): Json<FilterSpec>,
) -> Result<Response, ApiError> {
    let loaded = state.datasets.get().await?;

    let built = run_blocking(&state, move |_| match run_query(&loaded.dataset, &filters) {
        QueryOutcome::NoMatches => Ok(None),
        QueryOutcome::Matched(result) => {
            to_spreadsheet(loaded.dataset.columns(), &result.records)
                .map(|bytes| Some((bytes, result.row_count())))
        }
    })
    .await??;

    let (bytes, rows) = built
        .ok_or_else(|| ApiError::NotFound("No parcels match the filters".to_string()))?;

    let filename = export_filename(&session.username, &chrono::Local::now());
    let disposition = format!(
        "attachment; filename=\"export.xlsx\"; filename*=UTF-8''{}",
        utf8_percent_encode(&filename, NON_ALPHANUMERIC)
    );
    let disposition =
        HeaderValue::from_str(&disposition).map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(
        username = %session.username,
        rows,
        "Exported query result"
    );

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_MIME)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Serialize)]
pub struct AccessRequestsResponse {
    pub requests: Vec<AccessRequest>,
}

pub async fn admin_access_requests(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
) -> Result<Json<AccessRequestsResponse>, ApiError> {
    let requests = run_blocking(&state, |state| state.access_requests.read_all()).await??;
    Ok(Json(AccessRequestsResponse { requests }))
}

#[derive(Serialize)]
pub struct QueryLogResponse {
    pub entries: Vec<LogEntry>,
}

pub async fn admin_query_log(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
) -> Result<Json<QueryLogResponse>, ApiError> {
    let entries = run_blocking(&state, |state| state.access_log.read_all()).await??;
    Ok(Json(QueryLogResponse { entries }))
}

#[derive(Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Serialize)]
pub struct DatasetStatsResponse {
    pub rows: usize,
    pub skipped_rows: usize,
    pub categories: usize,
    pub addresses: usize,
    pub columns: Vec<ColumnInfo>,
    pub cache: CacheStats,
    pub active_sessions: usize,
}

pub async fn admin_dataset(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
) -> Result<Json<DatasetStatsResponse>, ApiError> {
    let loaded = state.datasets.get().await?;
    let dataset = &loaded.dataset;

    let columns = dataset
        .schema()
        .into_iter()
        .map(|(name, dtype)| ColumnInfo {
            name,
            data_type: dtype.to_string(),
        })
        .collect();

    Ok(Json(DatasetStatsResponse {
        rows: dataset.len(),
        skipped_rows: loaded.skipped_rows,
        categories: dataset.categories().len(),
        addresses: dataset.addresses().len(),
        columns,
        cache: state.datasets.stats(),
        active_sessions: state.sessions.len(),
    }))
}

pub async fn admin_reload_dataset(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!(username = %admin.username, "Dataset reload requested");
    state.datasets.invalidate();
    let loaded = state.datasets.get().await?;

    Ok(Json(serde_json::json!({
        "rows": loaded.dataset.len(),
        "skipped_rows": loaded.skipped_rows,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound(_) => ApiError::Unauthorized("User not found".to_string()),
            AuthError::WrongPassword => ApiError::Unauthorized("Wrong password".to_string()),
            AuthError::MalformedHash => {
                ApiError::Unauthorized("Password verification failed".to_string())
            }
            AuthError::StoreUnavailable(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        ApiError::Unavailable(format!("Failed to load data: {}", err))
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::MissingField => ApiError::BadRequest(err.to_string()),
            SubmitError::Journal(e) => e.into(),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
