use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use nova_economy::gang::{Disbanded, GangInfo, VaultReceipt};
use nova_types::api::{AmountRequest, GangNameRequest, LimitQuery, PromoteRequest, TargetRequest};
use nova_types::models::{Gang, GangMember};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /users/{id}/gang: found a new gang.
pub async fn create(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<GangNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let gang = run_blocking(&state, move |eco| eco.create_gang(&user_id, &req.name, now)).await?;
    Ok((StatusCode::CREATED, Json(gang)))
}

pub async fn current(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Option<Gang>>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.gang_of(&user_id)).await?))
}

pub async fn join(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<GangNameRequest>,
) -> Result<Json<GangMember>, ApiError> {
    let now = Utc::now();
    Ok(Json(
        run_blocking(&state, move |eco| eco.join_gang(&user_id, &req.name, now)).await?,
    ))
}

pub async fn leave(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Gang>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.leave_gang(&user_id)).await?))
}

pub async fn promote(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<PromoteRequest>,
) -> Result<Json<GangMember>, ApiError> {
    Ok(Json(
        run_blocking(&state, move |eco| eco.promote(&user_id, &req.target_id, req.role)).await?,
    ))
}

pub async fn kick(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<TargetRequest>,
) -> Result<StatusCode, ApiError> {
    run_blocking(&state, move |eco| eco.kick(&user_id, &req.target_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deposit(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<VaultReceipt>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.deposit(&user_id, req.amount)).await?))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<VaultReceipt>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.withdraw(&user_id, req.amount)).await?))
}

pub async fn transfer(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<TargetRequest>,
) -> Result<Json<Gang>, ApiError> {
    Ok(Json(
        run_blocking(&state, move |eco| eco.transfer_leadership(&user_id, &req.target_id)).await?,
    ))
}

/// DELETE /users/{id}/gang: leader only.
pub async fn disband(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Disbanded>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.disband(&user_id)).await?))
}

pub async fn info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<GangInfo>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.gang_info(&name)).await?))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Gang>>, ApiError> {
    Ok(Json(
        run_blocking(&state, move |eco| eco.gang_leaderboard(query.limit)).await?,
    ))
}
