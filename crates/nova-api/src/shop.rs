use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use nova_types::api::{PurchaseRequest, ShopQuery};
use nova_types::models::{Purchase, ShopItem};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// GET /shop/items?kind=perk
pub async fn items(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<Json<Vec<ShopItem>>, ApiError> {
    Ok(Json(run_blocking(&state, move |eco| eco.shop_items(query.kind)).await?))
}

pub async fn purchase(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let receipt = run_blocking(&state, move |eco| eco.purchase(&user_id, req.item_id, now)).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn purchases(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Purchase>>, ApiError> {
    let now = Utc::now();
    Ok(Json(run_blocking(&state, move |eco| eco.purchases(&user_id, now)).await?))
}
