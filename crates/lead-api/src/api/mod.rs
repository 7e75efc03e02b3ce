//! REST API for lead routing
//!
//! | Method | Path                      | Body                      | Success |
//! |--------|---------------------------|---------------------------|---------|
//! | POST   | `/operators`              | `CreateOperatorRequest`   | 201     |
//! | GET    | `/operators`              |                           | 200     |
//! | PATCH  | `/operators/:id`          | `UpdateOperatorRequest`   | 200     |
//! | POST   | `/sources`                | `CreateSourceRequest`     | 201     |
//! | GET    | `/sources`                |                           | 200     |
//! | GET    | `/sources/:id`            |                           | 200     |
//! | PUT    | `/sources/:id/operators`  | `[OperatorWeightInput]`   | 200     |
//! | POST   | `/contacts`               | `ContactRequest`          | 201     |
//! | GET    | `/leads`                  |                           | 200     |
//! | GET    | `/stats/operators`        |                           | 200     |
//! | GET    | `/health`                 |                           | 200     |

mod error;

pub use error::{AppError, ErrorDetail, ErrorResponse};

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::Utc;
use lead_engine::types::{
    ContactRequest, ContactView, CreateOperatorRequest, CreateSourceRequest, LeadWithContacts, Operator,
    OperatorId, OperatorStats, OperatorWeightInput, Source, SourceDetail, SourceId, UpdateOperatorRequest,
};
use lead_engine::LeadRouter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// API State
#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<LeadRouter>,
}

/// Create the REST API router
pub fn create_router(router: Arc<LeadRouter>) -> Router {
    create_router_with_state(ApiState { router })
}

pub fn create_router_with_state(state: ApiState) -> Router {
    Router::new()
        // Operators
        .route("/operators", post(create_operator).get(list_operators))
        .route("/operators/:id", patch(update_operator))
        // Sources and their weight sets
        .route("/sources", post(create_source).get(list_sources))
        .route("/sources/:id", get(get_source))
        .route("/sources/:id/operators", put(replace_source_operators))
        // Contact intake
        .route("/contacts", post(create_contact))
        // Read side
        .route("/leads", get(list_leads))
        .route("/stats/operators", get(operator_stats))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn create_operator(
    State(state): State<ApiState>,
    Json(request): Json<CreateOperatorRequest>,
) -> Result<(StatusCode, Json<Operator>), AppError> {
    let operator = state.router.database().create_operator(request).await?;
    Ok((StatusCode::CREATED, Json(operator)))
}

async fn list_operators(State(state): State<ApiState>) -> Result<Json<Vec<Operator>>, AppError> {
    Ok(Json(state.router.database().list_operators().await?))
}

async fn update_operator(
    State(state): State<ApiState>,
    Path(operator_id): Path<OperatorId>,
    Json(request): Json<UpdateOperatorRequest>,
) -> Result<Json<Operator>, AppError> {
    let operator = state
        .router
        .database()
        .update_operator(operator_id, request)
        .await?;
    Ok(Json(operator))
}

async fn create_source(
    State(state): State<ApiState>,
    Json(request): Json<CreateSourceRequest>,
) -> Result<(StatusCode, Json<Source>), AppError> {
    let source = state.router.database().create_source(request).await?;
    Ok((StatusCode::CREATED, Json(source)))
}

async fn list_sources(State(state): State<ApiState>) -> Result<Json<Vec<Source>>, AppError> {
    Ok(Json(state.router.database().list_sources().await?))
}

async fn get_source(
    State(state): State<ApiState>,
    Path(source_id): Path<SourceId>,
) -> Result<Json<SourceDetail>, AppError> {
    Ok(Json(state.router.database().get_source_detail(source_id).await?))
}

async fn replace_source_operators(
    State(state): State<ApiState>,
    Path(source_id): Path<SourceId>,
    Json(weights): Json<Vec<OperatorWeightInput>>,
) -> Result<Json<SourceDetail>, AppError> {
    let detail = state
        .router
        .database()
        .replace_source_weights(source_id, weights)
        .await?;
    Ok(Json(detail))
}

async fn create_contact(
    State(state): State<ApiState>,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactView>), AppError> {
    let contact = state.router.register_contact(request).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn list_leads(State(state): State<ApiState>) -> Result<Json<Vec<LeadWithContacts>>, AppError> {
    Ok(Json(state.router.database().list_leads_with_contacts().await?))
}

async fn operator_stats(State(state): State<ApiState>) -> Result<Json<Vec<OperatorStats>>, AppError> {
    Ok(Json(state.router.database().operator_stats().await?))
}

async fn health_check(State(state): State<ApiState>) -> (StatusCode, Json<serde_json::Value>) {
    let database = state.router.database().ping().await.is_ok();
    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(serde_json::json!({
            "status": if database { "healthy" } else { "degraded" },
            "service": "lead-api",
            "database": database,
            "timestamp": Utc::now(),
        })),
    )
}
