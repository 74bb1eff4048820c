use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::json;

use nova_economy::social::ReactionTally;
use nova_types::api::{ReactionQuery, ReactionRequest};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub async fn react(
    State(state): State<AppState>,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<ReactionTally>, ApiError> {
    let tally =
        run_blocking(&state, move |eco| eco.react(&req.actor_id, &req.target_id, req.kind))
            .await?;
    Ok(Json(tally))
}

/// GET /users/{id}/reactions?kind=hug
pub async fn received(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ReactionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind = query.kind;
    let total = run_blocking(&state, move |eco| eco.reactions_received(&user_id, kind)).await?;
    Ok(Json(json!({ "kind": kind, "received_total": total })))
}
