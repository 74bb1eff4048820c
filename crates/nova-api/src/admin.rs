//! Administrative overrides. These skip the balance guards, so the platform
//! layer must only route trusted moderators here.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use nova_economy::ledger::LevelProgress;
use nova_types::api::AmountRequest;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /admin/users/{id}/coins: signed, unguarded delta.
pub async fn adjust_coins(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Value>, ApiError> {
    let balance =
        run_blocking(&state, move |eco| eco.admin_adjust_coins(&user_id, req.amount)).await?;
    Ok(Json(json!({ "balance": balance })))
}

/// PUT /admin/users/{id}/coins
pub async fn set_coins(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Value>, ApiError> {
    let balance =
        run_blocking(&state, move |eco| eco.admin_set_coins(&user_id, req.amount)).await?;
    Ok(Json(json!({ "balance": balance })))
}

/// PUT /admin/users/{id}/experience
pub async fn set_experience(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<LevelProgress>, ApiError> {
    Ok(Json(
        run_blocking(&state, move |eco| eco.admin_set_experience(&user_id, req.amount)).await?,
    ))
}
