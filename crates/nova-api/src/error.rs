use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use nova_economy::EconomyError;
use nova_types::api::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Economy(#[from] EconomyError),

    #[error("background task failed")]
    Join,
}

fn status_for(err: &EconomyError) -> StatusCode {
    use EconomyError::*;
    match err {
        NotFound(_) => StatusCode::NOT_FOUND,
        Forbidden => StatusCode::FORBIDDEN,
        CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
        InvalidTarget | InvalidName | InvalidAmount | InvalidBet | InvalidRole
        | NothingToChange => StatusCode::BAD_REQUEST,
        InsufficientFunds | AlreadyInGang | NotInGang | NotInSameGang | CannotKickLeader
        | LeaderCannotLeave | DuplicateName | AlreadyOwned | TargetProtected { .. }
        | TargetTooPoor => StatusCode::CONFLICT,
        Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Economy(err) if err.is_storage() => {
                error!("Storage failure: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: err.kind(),
                        message: "internal error".into(),
                        retry_after_secs: None,
                    },
                )
            }
            Self::Economy(err) => (
                status_for(err),
                ErrorResponse {
                    error: err.kind(),
                    message: err.to_string(),
                    retry_after_secs: err.retry_after_secs(),
                },
            ),
            Self::Join => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal",
                    message: self.to_string(),
                    retry_after_secs: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn cooldown_maps_to_429_with_retry_hint() {
        let err = ApiError::from(EconomyError::CooldownActive {
            remaining: TimeDelta::milliseconds(1_500),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            EconomyError::CooldownActive { remaining: TimeDelta::milliseconds(1_500) }
                .retry_after_secs(),
            Some(2)
        );
    }

    #[test]
    fn domain_refusals_are_not_server_errors() {
        for err in [
            EconomyError::InsufficientFunds,
            EconomyError::NotFound("gang"),
            EconomyError::InvalidBet,
            EconomyError::Forbidden,
        ] {
            let status = ApiError::from(err).into_response().status();
            assert!(status.is_client_error(), "{}", status);
        }
    }
}
