use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;
use crate::{accounts, activity, admin, gangs, moderation, reactions, shop, wagers};

async fn health() -> &'static str {
    "ok"
}

/// Every route of the adapter. Identity comes from the path or body; the
/// platform layer calling this is trusted.
pub fn router(state: AppState) -> Router {
    let users = Router::new()
        .route("/users/{id}", post(accounts::ensure_account).get(accounts::get_account))
        .route(
            "/users/{id}/profile",
            get(accounts::get_profile).patch(accounts::customize_profile),
        )
        .route("/users/{id}/balance", post(accounts::adjust_balance))
        .route("/users/{id}/experience", post(accounts::add_experience))
        .route("/users/{id}/daily", post(accounts::claim_daily))
        .route("/users/{id}/work", post(accounts::work))
        .route("/users/{id}/give", post(accounts::give))
        .route("/users/{id}/rob", post(accounts::rob))
        .route("/users/{id}/purchases", get(shop::purchases).post(shop::purchase))
        .route("/users/{id}/moderation", get(moderation::active))
        .route("/users/{id}/reactions", get(reactions::received));

    let gang_routes = Router::new()
        .route(
            "/users/{id}/gang",
            get(gangs::current).post(gangs::create).delete(gangs::disband),
        )
        .route("/users/{id}/gang/join", post(gangs::join))
        .route("/users/{id}/gang/leave", post(gangs::leave))
        .route("/users/{id}/gang/promote", post(gangs::promote))
        .route("/users/{id}/gang/kick", post(gangs::kick))
        .route("/users/{id}/gang/deposit", post(gangs::deposit))
        .route("/users/{id}/gang/withdraw", post(gangs::withdraw))
        .route("/users/{id}/gang/transfer", post(gangs::transfer))
        .route("/gangs/{name}", get(gangs::info));

    let wager_routes = Router::new()
        .route("/wagers/{id}/coinflip", post(wagers::coinflip))
        .route("/wagers/{id}/dice", post(wagers::dice))
        .route("/wagers/{id}/slots", post(wagers::slots))
        .route("/wagers/{id}/blackjack", post(wagers::blackjack))
        .route("/wagers/{id}/roulette", post(wagers::roulette));

    let misc = Router::new()
        .route("/activity/messages", post(activity::observe_message))
        .route("/activity/voice", post(activity::voice_state))
        .route("/activity/drops/{drop_id}/claim", post(activity::claim_drop))
        .route("/shop/items", get(shop::items))
        .route("/moderation", post(moderation::record))
        .route("/moderation/{record_id}/expire", post(moderation::expire))
        .route("/reactions", post(reactions::react))
        .route("/leaderboards/users", get(accounts::leaderboard))
        .route("/leaderboards/gangs", get(gangs::leaderboard))
        .route(
            "/admin/users/{id}/coins",
            post(admin::adjust_coins).put(admin::set_coins),
        )
        .route("/admin/users/{id}/experience", put(admin::set_experience))
        .route("/health", get(health));

    Router::new()
        .merge(users)
        .merge(gang_routes)
        .merge(wager_routes)
        .merge(misc)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use nova_db::Database;
    use nova_economy::{Economy, EconomyConfig};

    use super::*;
    use crate::state::AppStateInner;

    fn app() -> Router {
        let db = Database::open_in_memory().unwrap();
        let economy = Economy::new(Arc::new(db), EconomyConfig::default());
        router(Arc::new(AppStateInner { economy }))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn daily_then_cooldown_over_http() {
        let app = app();
        let (status, _) = send(&app, "POST", "/users/u1", json!({ "username": "alice" })).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, "POST", "/users/u1/daily", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 100);

        let (status, body) = send(&app, "POST", "/users/u1/daily", json!({})).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "cooldown_active");
        assert!(body["retry_after_secs"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn overdrawn_give_is_a_conflict() {
        let app = app();
        for id in ["a", "b"] {
            send(&app, "POST", &format!("/users/{}", id), json!({ "username": id })).await;
        }
        let (status, body) = send(
            &app,
            "POST",
            "/users/a/give",
            json!({ "recipient_id": "b", "amount": 100 }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "insufficient_funds");
    }

    #[tokio::test]
    async fn unknown_gang_is_404() {
        let app = app();
        let request = Request::builder().uri("/gangs/Nope").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
