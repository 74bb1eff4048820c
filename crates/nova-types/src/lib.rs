//! Plain data shared by the store, the economy core and the HTTP adapter.

pub mod api;
pub mod events;
pub mod models;
