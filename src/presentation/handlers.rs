// HTTP request handlers
use crate::application::ports::PreferenceStore;
use crate::application::tracker::{MemoryPressure, TrackerError, TrackerStatus};
use crate::domain::credentials::Preferences;
use crate::domain::motion::ActivityTransition;
use crate::domain::position::PositionFix;
use crate::infrastructure::host_bridge::{PermissionSet, SamplingRequest};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Tracker(TrackerError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            ApiError::Tracker(TrackerError::SourceUnavailable(_) | TrackerError::ServiceStopped) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Tracker(TrackerError::Preferences(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    pub auth_token: String,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatterySample {
    pub level_percent: f32,
}

#[derive(Debug, Deserialize)]
pub struct MemoryPressureRequest {
    pub level: MemoryPressure,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn tracking_status(State(state): State<Arc<AppState>>) -> Json<TrackerStatus> {
    Json(state.tracker.status())
}

/// Start tracking, optionally storing new credentials first. The enabled flag is only
/// persisted once the position source accepted the subscription.
pub async fn start_tracking(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TrackerStatus>, ApiError> {
    match body {
        Ok(Json(request)) => store_credentials(&state, request)?,
        // No JSON body at all: start with the stored credentials
        Err(JsonRejection::MissingJsonContentType(_)) => {}
        Err(rejection) => return Err(ApiError::BadRequest(rejection.body_text())),
    }

    state.tracker.start().await?;

    let mut preferences = state.preferences.load()?;
    if !preferences.tracking_enabled {
        preferences.tracking_enabled = true;
        state.preferences.save(&preferences)?;
    }
    Ok(Json(state.tracker.status()))
}

pub async fn stop_tracking(State(state): State<Arc<AppState>>) -> Result<Json<TrackerStatus>, ApiError> {
    let mut preferences = state.preferences.load()?;
    preferences.tracking_enabled = false;
    state.preferences.save(&preferences)?;

    state.tracker.stop().await?;
    Ok(Json(state.tracker.status()))
}

pub async fn update_credentials(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<StatusCode, ApiError> {
    store_credentials(&state, request)?;
    if state.tracker.is_active() {
        // Start is idempotent; it only reloads credentials here
        state.tracker.start().await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

fn store_credentials(state: &AppState, request: CredentialsRequest) -> Result<(), ApiError> {
    if request.auth_token.trim().is_empty() {
        return Err(ApiError::BadRequest("authToken must not be blank".to_string()));
    }

    let current = state.preferences.load()?;
    let preferences = Preferences {
        auth_token: Some(request.auth_token),
        api_url: request.api_url.or(current.api_url),
        tracking_enabled: current.tracking_enabled,
    };
    state.preferences.save(&preferences)?;
    tracing::info!("Credentials updated");
    Ok(())
}

pub async fn submit_fix(
    State(state): State<Arc<AppState>>,
    Json(fix): Json<PositionFix>,
) -> Result<StatusCode, ApiError> {
    state.tracker.submit_fix(fix).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn submit_transition(
    State(state): State<Arc<AppState>>,
    Json(transition): Json<ActivityTransition>,
) -> Result<StatusCode, ApiError> {
    state.tracker.submit_transition(transition).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn submit_battery(
    State(state): State<Arc<AppState>>,
    Json(sample): Json<BatterySample>,
) -> Result<StatusCode, ApiError> {
    state.tracker.submit_battery(sample.level_percent).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn submit_memory_pressure(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MemoryPressureRequest>,
) -> Result<StatusCode, ApiError> {
    state.tracker.submit_memory_pressure(request.level).await?;
    Ok(StatusCode::ACCEPTED)
}

/// What the host's sensors should be doing right now.
pub async fn host_sampling(State(state): State<Arc<AppState>>) -> Json<SamplingRequest> {
    Json(state.bridge.current())
}

pub async fn update_permissions(
    State(state): State<Arc<AppState>>,
    Json(permissions): Json<PermissionSet>,
) -> Json<PermissionSet> {
    state.bridge.set_permissions(permissions);
    Json(state.bridge.permissions())
}
