use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use nova_economy::activity::DropClaim;
use nova_types::api::{ClaimDropRequest, ObservedMessageRequest, VoiceStateRequest};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /activity/messages: one observed chat message. Bot authors get 204.
pub async fn observe_message(
    State(state): State<AppState>,
    Json(req): Json<ObservedMessageRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let outcome = run_blocking(&state, move |eco| {
        eco.observe_message(
            &req.user_id,
            &req.username,
            &req.channel_id,
            req.is_bot,
            now,
            &mut rand::rng(),
        )
    })
    .await?;

    Ok(match outcome {
        Some(outcome) => Json(outcome).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /activity/voice: a voice-state change. 204 unless a session closed.
pub async fn voice_state(
    State(state): State<AppState>,
    Json(req): Json<VoiceStateRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let flush = run_blocking(&state, move |eco| {
        eco.voice_state(
            &req.user_id,
            &req.username,
            req.old_channel_id.as_deref(),
            req.new_channel_id.as_deref(),
            req.is_bot,
            now,
        )
    })
    .await?;

    Ok(match flush {
        Some(flush) => Json(flush).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn claim_drop(
    State(state): State<AppState>,
    Path(drop_id): Path<Uuid>,
    Json(req): Json<ClaimDropRequest>,
) -> Result<Json<DropClaim>, ApiError> {
    let now = Utc::now();
    let claim = run_blocking(&state, move |eco| {
        eco.claim_drop(drop_id, &req.user_id, &req.username, now)
    })
    .await?;
    Ok(Json(claim))
}
