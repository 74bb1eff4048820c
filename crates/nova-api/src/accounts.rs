use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use nova_economy::ledger::{DailyReceipt, LevelProgress, Profile, ProfileChange, WorkReceipt};
use nova_economy::wager::{RobOutcome, TransferReceipt};
use nova_types::api::{
    AmountRequest, CustomizeProfileRequest, EnsureAccountRequest, GiveRequest, LeaderboardQuery,
    RobRequest,
};
use nova_types::models::Account;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /users/{id}: create the account on first contact.
pub async fn ensure_account(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<EnsureAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created =
        run_blocking(&state, move |eco| eco.ensure_account(&user_id, &req.username)).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!({ "created": created }))))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.account(&user_id)).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.profile(&user_id)).await?))
}

pub async fn customize_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<CustomizeProfileRequest>,
) -> Result<Json<ProfileChange>, ApiError> {
    let change = run_blocking(&state, move |eco| {
        eco.customize_profile(&user_id, req.background.as_deref(), req.nameplate.as_deref())
    })
    .await?;
    Ok(Json(change))
}

/// POST /users/{id}/balance: signed delta, refused if it would overdraw.
pub async fn adjust_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = run_blocking(&state, move |eco| eco.adjust_balance(&user_id, req.amount)).await?;
    Ok(Json(json!({ "balance": balance })))
}

pub async fn add_experience(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<LevelProgress>, ApiError> {
    Ok(Json(
        run_blocking(&state, move |eco| eco.add_experience(&user_id, req.amount)).await?,
    ))
}

pub async fn claim_daily(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DailyReceipt>, ApiError> {
    let now = Utc::now();
    Ok(Json(run_blocking(&state, move |eco| eco.claim_daily(&user_id, now)).await?))
}

pub async fn work(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<WorkReceipt>, ApiError> {
    let now = Utc::now();
    let receipt =
        run_blocking(&state, move |eco| eco.work(&user_id, now, &mut rand::rng())).await?;
    Ok(Json(receipt))
}

pub async fn give(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<GiveRequest>,
) -> Result<Json<TransferReceipt>, ApiError> {
    let receipt =
        run_blocking(&state, move |eco| eco.give(&user_id, &req.recipient_id, req.amount)).await?;
    Ok(Json(receipt))
}

pub async fn rob(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<RobRequest>,
) -> Result<Json<RobOutcome>, ApiError> {
    let now = Utc::now();
    let outcome = run_blocking(&state, move |eco| {
        eco.rob(&user_id, &req.target_id, now, &mut rand::rng())
    })
    .await?;
    Ok(Json(outcome))
}

/// GET /leaderboards/users?metric=coins&limit=10
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let top = run_blocking(&state, move |eco| eco.leaderboard(query.metric, query.limit)).await?;
    Ok(Json(top))
}
