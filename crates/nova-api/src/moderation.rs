use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use nova_types::api::ModerationRequest;
use nova_types::models::ModerationRecord;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /moderation: log an action the platform layer has carried out.
pub async fn record(
    State(state): State<AppState>,
    Json(req): Json<ModerationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let record = run_blocking(&state, move |eco| {
        eco.record_moderation(
            &req.user_id,
            &req.moderator_id,
            req.action,
            &req.reason,
            req.duration_secs,
            now,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn active(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ModerationRecord>>, ApiError> {
    let now = Utc::now();
    Ok(Json(
        run_blocking(&state, move |eco| eco.active_moderation(&user_id, now)).await?,
    ))
}

pub async fn expire(
    State(state): State<AppState>,
    Path(record_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    run_blocking(&state, move |eco| eco.expire_moderation(record_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
