//! JSON-over-HTTP adapter for the economy core. Each handler maps one route
//! onto one core operation; nothing here renders user-facing text.

pub mod accounts;
pub mod activity;
pub mod admin;
pub mod error;
pub mod gangs;
pub mod moderation;
pub mod reactions;
pub mod routes;
pub mod shop;
pub mod state;
pub mod wagers;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
