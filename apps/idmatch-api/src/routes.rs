use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use idmatch_service::{
	ClassifyRequest, ClassifyResponse, CompareRequest, CompareResponse, HealthReport, RankRequest,
	RankResponse, SearchRequest, SearchResponse, ServiceError,
};
use idmatch_storage::cases::CaseRecord;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/rank", post(rank))
		.route("/v1/compare", post(compare))
		.route("/v1/classify", post(classify))
		.route("/v1/records/{pid}", get(record))
		.with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
	Json(state.service.health().await)
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn rank(
	State(state): State<AppState>,
	Json(payload): Json<RankRequest>,
) -> Result<Json<RankResponse>, ApiError> {
	let items = state.service.rank(payload).await?;

	Ok(Json(RankResponse { items }))
}

async fn compare(
	State(state): State<AppState>,
	Json(payload): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, ApiError> {
	let response = state.service.compare(payload)?;

	Ok(Json(response))
}

async fn classify(
	State(state): State<AppState>,
	Json(payload): Json<ClassifyRequest>,
) -> Json<ClassifyResponse> {
	Json(state.service.classify_score(payload))
}

async fn record(
	State(state): State<AppState>,
	Path(pid): Path<String>,
) -> Result<Json<CaseRecord>, ApiError> {
	let record = state.service.record(&pid).await?;

	Ok(Json(record))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();
		let (status, error_code) = match &err {
			ServiceError::InvalidFilter { .. } => (StatusCode::BAD_REQUEST, "INVALID_FILTER"),
			ServiceError::NoEmbeddingProvided =>
				(StatusCode::BAD_REQUEST, "NO_EMBEDDING_PROVIDED"),
			ServiceError::InvalidWeight { .. } => (StatusCode::BAD_REQUEST, "INVALID_WEIGHT"),
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
			ServiceError::IndexUnavailable { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "INDEX_UNAVAILABLE"),
			ServiceError::Provider { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
			ServiceError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
		};

		if status.is_server_error() {
			tracing::error!(error_code, %message, "Request failed.");
		}

		Self::new(status, error_code, message)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
