//! HTTP surface. Handlers stay thin: extract, delegate, map errors.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockpile_core::{AuditLogFilter, NewProduct, Operation, ProductError};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/products",
            post(create_product)
                .get(list_products)
                .delete(delete_all_products),
        )
        .route("/api/products/search", get(search_products))
        .route(
            "/api/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/audit-logs", get(list_audit_logs))
        .route("/api/audit-logs/entity/:entity_id", get(audit_logs_by_entity))
        .route("/api/audit-logs/failures", get(failed_operations))
        .route("/api/audit-logs/stats", get(chaos_statistics))
        .route("/api/audit-logs/before", delete(delete_logs_before))
        .route("/api/audit-logs/all", delete(delete_all_audit_logs))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ProductError> for ApiError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::Validation(message) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "validation",
                message,
            },
            ProductError::NotFound(_) => ApiError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message: err.to_string(),
            },
            ProductError::ConflictUnresolved(_) | ProductError::Store(_) => {
                tracing::error!(%err, "product operation failed");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: "operation failed".to_string(),
                }
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(%err, "audit query failed");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: "operation failed".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthzResponse {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn payload_of<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(name = %input.name, "request to create product");
    let payload = payload_of(&input);
    let product = state
        .auditor
        .audit(state.products.create(input), Operation::Create, None, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.products.get_all().await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.products.get_by_id(id).await?))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(id, "request to update product");
    let payload = payload_of(&input);
    let product = state
        .auditor
        .audit(
            state.products.update(id, input),
            Operation::Update,
            Some(id),
            payload,
        )
        .await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(id, "request to delete product");
    state
        .auditor
        .audit(
            state.products.delete(id),
            Operation::Delete,
            Some(id),
            serde_json::json!({ "id": id }),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    name: String,
}

async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.products.search_by_name(&query.name).await?))
}

async fn delete_all_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    tracing::warn!("request to delete ALL products");
    state.products.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_audit_logs(
    State(state): State<AppState>,
    Query(filter): Query<AuditLogFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.audit_logs.get_audit_logs(filter).await?))
}

async fn audit_logs_by_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.audit_logs.get_audit_logs_by_entity(entity_id).await?))
}

async fn failed_operations(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.audit_logs.get_failed_operations().await?))
}

async fn chaos_statistics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.audit_logs.get_chaos_statistics().await?))
}

#[derive(Debug, Deserialize)]
struct RetentionQuery {
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct DeletedBody {
    deleted: u64,
}

async fn delete_logs_before(
    State(state): State<AppState>,
    Query(query): Query<RetentionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.audit_logs.delete_logs_before(query.timestamp).await?;
    Ok(Json(DeletedBody { deleted }))
}

async fn delete_all_audit_logs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.audit_logs.delete_all().await?;
    Ok(Json(DeletedBody { deleted }))
}
