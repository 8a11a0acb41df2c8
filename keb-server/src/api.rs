use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use keb_models::OperationState;
use keb_process::storage::{Operations, StorageError};

use crate::broker::{BrokerError, UpdateDetails, UpdateEndpoint, UpdateResponse};

/// Shared API state
#[derive(Clone)]
pub struct AppState {
    pub update: Arc<UpdateEndpoint>,
    pub operations: Arc<dyn Operations>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health_check))
        .route("/v2/service_instances/:instance_id", patch(update_instance))
        .route(
            "/v2/service_instances/:instance_id/last_operation",
            get(last_operation),
        )
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("broker API listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "keb",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
struct UpdateQuery {
    #[serde(default)]
    accepts_incomplete: bool,
}

async fn update_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<UpdateQuery>,
    Json(details): Json<UpdateDetails>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let response = state
        .update
        .update(&instance_id, details, query.accepts_incomplete)
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct LastOperationQuery {
    operation: String,
}

#[derive(Debug, Serialize)]
struct LastOperationResponse {
    state: OperationState,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
}

async fn last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> Result<Json<LastOperationResponse>, ApiError> {
    let operation = state
        .operations
        .get_operation_by_id(&query.operation)
        .await
        .map_err(|err| match err {
            StorageError::NotFound(_) => {
                ApiError::NotFound(format!("operation {} not found", query.operation))
            }
            other => ApiError::Internal(other.to_string()),
        })?
        .operation()
        .clone();

    if operation.instance_id != instance_id {
        return Err(ApiError::NotFound(format!(
            "operation {} does not belong to instance {}",
            query.operation, instance_id
        )));
    }

    Ok(Json(LastOperationResponse {
        // A fresh operation has no state yet, which the OSB API has no word
        // for other than "in progress".
        state: operation.state.unwrap_or(OperationState::InProgress),
        description: operation.description,
    }))
}

enum ApiError {
    Gone(String),
    BadRequest(String),
    AsyncRequired(String),
    NotFound(String),
    Internal(String),
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::InstanceNotFound(_) => ApiError::Gone(err.to_string()),
            BrokerError::MalformedContext | BrokerError::MissingCredentials => {
                ApiError::BadRequest(err.to_string())
            }
            BrokerError::AsyncRequired => ApiError::AsyncRequired(err.to_string()),
            BrokerError::UpdateFailed(_) | BrokerError::Storage(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Gone(msg) => (StatusCode::GONE, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::AsyncRequired(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
