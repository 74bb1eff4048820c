use axum::{
    Json,
    extract::{Path, State},
};

use nova_economy::wager::WagerReceipt;
use nova_types::api::{CoinflipRequest, DiceRequest, RouletteRequest, StakeRequest};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub async fn coinflip(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<CoinflipRequest>,
) -> Result<Json<WagerReceipt>, ApiError> {
    let receipt = run_blocking(&state, move |eco| {
        eco.coinflip(&user_id, req.stake, req.call, &mut rand::rng())
    })
    .await?;
    Ok(Json(receipt))
}

pub async fn dice(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<DiceRequest>,
) -> Result<Json<WagerReceipt>, ApiError> {
    let receipt = run_blocking(&state, move |eco| {
        eco.dice(&user_id, req.stake, req.guess, &mut rand::rng())
    })
    .await?;
    Ok(Json(receipt))
}

pub async fn slots(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<StakeRequest>,
) -> Result<Json<WagerReceipt>, ApiError> {
    let receipt =
        run_blocking(&state, move |eco| eco.slots(&user_id, req.stake, &mut rand::rng())).await?;
    Ok(Json(receipt))
}

pub async fn blackjack(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<StakeRequest>,
) -> Result<Json<WagerReceipt>, ApiError> {
    let receipt =
        run_blocking(&state, move |eco| eco.blackjack(&user_id, req.stake, &mut rand::rng()))
            .await?;
    Ok(Json(receipt))
}

pub async fn roulette(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<RouletteRequest>,
) -> Result<Json<WagerReceipt>, ApiError> {
    let receipt = run_blocking(&state, move |eco| {
        eco.roulette(&user_id, req.stake, req.bet, &mut rand::rng())
    })
    .await?;
    Ok(Json(receipt))
}
