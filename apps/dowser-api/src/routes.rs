use std::time::Duration;

use axum::{
	BoxError, Json, Router,
	error_handling::HandleErrorLayer,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::{ServiceBuilder, timeout::TimeoutLayer};

use dowser_domain::compose::SourceEntity;
use dowser_service::{
	AnswerRequest, AnswerResult, ReindexReport, ReindexRequest, RemoveRequest, RemoveResponse,
	SearchRequest, SearchResponse, ServiceError, UpsertRequest, UpsertResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	let deadline = Duration::from_millis(state.service.cfg.search.deadline_ms);

	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/answer", post(answer))
		.layer(
			ServiceBuilder::new()
				.layer(HandleErrorLayer::new(deadline_exceeded))
				.layer(TimeoutLayer::new(deadline)),
		)
		.with_state(state)
}

/// Routes that mutate the index. Served on the loopback-only admin bind.
pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/admin/index", post(admin_index))
		.route("/v1/admin/remove", post(admin_remove))
		.route("/v1/admin/reindex", post(admin_reindex))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;
	Ok(Json(response))
}

async fn answer(
	State(state): State<AppState>,
	Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
	let response = state.service.answer(payload).await?;
	Ok(Json(response))
}

async fn admin_index(
	State(state): State<AppState>,
	Json(payload): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
	let response = state.service.upsert(payload).await?;
	Ok(Json(response))
}

async fn admin_remove(
	State(state): State<AppState>,
	Json(payload): Json<RemoveRequest>,
) -> Result<Json<RemoveResponse>, ApiError> {
	let response = state.service.remove(payload).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ReindexBody {
	pub tenant_id: String,
	pub entities: Vec<SourceEntity>,
}

async fn admin_reindex(
	State(state): State<AppState>,
	Json(payload): Json<ReindexBody>,
) -> Result<Json<ReindexReport>, ApiError> {
	let report = state
		.service
		.rebuild_all(&payload.entities, ReindexRequest { tenant_id: payload.tenant_id })
		.await?;
	Ok(Json(report))
}

async fn deadline_exceeded(err: BoxError) -> ApiError {
	if err.is::<tower::timeout::error::Elapsed>() {
		json_error(
			StatusCode::REQUEST_TIMEOUT,
			"deadline_exceeded",
			"Request deadline exceeded.",
			None,
		)
	} else {
		tracing::error!(error = %err, "Request middleware failed.");

		json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error.", None)
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } => {
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None)
			},
			ServiceError::RateLimited { message } => {
				json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message, None)
			},
			ServiceError::Upstream { message } => {
				json_error(StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable", message, None)
			},
			ServiceError::Storage(err) => {
				tracing::error!(error = %err, "Storage error while serving a request.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error.", None)
			},
			ServiceError::Provider(err) => {
				tracing::error!(error = %err, "Provider error while serving a request.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error.", None)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};
		(self.status, Json(body)).into_response()
	}
}
