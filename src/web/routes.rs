use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::activity::{ActivityEvent, Level};
use crate::constants::MAX_LEADERBOARD_LIMIT;
use crate::pipeline::RunReport;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/refresh", post(refresh))
        .route("/data", get(data))
        .route("/activity", get(activity))
        .route("/healthz", get(health))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

fn error_response(status: StatusCode, message: &str, output: Option<String>) -> Response {
    (
        status,
        Json(StatusResponse {
            status: "error",
            message: message.to_string(),
            report: None,
            output,
        }),
    )
        .into_response()
}

// ========== Pipeline ==========

async fn refresh(State(state): State<AppState>) -> Response {
    let pipeline = state.pipeline.clone();

    // A panicking run must not take the handler down with it
    let outcome = tokio::spawn(async move { pipeline.run_once().await }).await;

    match outcome {
        Ok(Ok(report)) => {
            let output = report
                .failed_forums()
                .next()
                .is_some()
                .then(|| report.diagnostics());
            Json(StatusResponse {
                status: "success",
                message: "Data refreshed successfully".to_string(),
                report: Some(report),
                output,
            })
            .into_response()
        }
        Ok(Err(e)) => {
            tracing::error!("Pipeline run failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Pipeline run failed",
                Some(e.to_string()),
            )
        }
        Err(e) => {
            tracing::error!("Pipeline task aborted: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Pipeline run failed",
                Some(format!("pipeline task aborted: {e}")),
            )
        }
    }
}

// ========== Leaderboard ==========

#[derive(Debug, Deserialize)]
pub struct DataParams {
    limit: Option<usize>,
}

async fn data(State(state): State<AppState>, Query(params): Query<DataParams>) -> Response {
    if !state.store.is_connected() {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database not connected",
            None,
        );
    }

    let limit = params
        .limit
        .unwrap_or(state.config.leaderboard_size)
        .min(MAX_LEADERBOARD_LIMIT);

    let leaderboard = state.store.query_latest(&state.config.forums, limit).await;
    Json(leaderboard).into_response()
}

// ========== Activity ==========

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    limit: Option<usize>,
    level: Option<String>,
    stage: Option<String>,
}

#[derive(Debug, Serialize)]
struct ActivityResponse {
    events: Vec<ActivityEvent>,
}

async fn activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Response {
    let level = match params.level.as_deref() {
        None | Some("") => None,
        Some(raw) => match Level::parse(raw) {
            Some(level) => Some(level),
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("Unknown level '{raw}'"),
                    None,
                );
            }
        },
    };

    let limit = params.limit.unwrap_or(20);
    match state
        .activity
        .recent(limit, level, params.stage.as_deref())
        .await
    {
        Ok(events) => Json(ActivityResponse { events }).into_response(),
        Err(e) => {
            tracing::error!("Failed to read activity log: {e:#}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read activity log",
                None,
            )
        }
    }
}

// ========== Health ==========

async fn health(State(state): State<AppState>) -> Response {
    let database = if state.store.is_connected() {
        "connected"
    } else {
        "disconnected"
    };

    Json(serde_json::json!({ "status": "ok", "database": database })).into_response()
}
