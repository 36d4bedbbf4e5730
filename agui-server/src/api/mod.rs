//! AG-UI API handlers.
//!
//! # Endpoints
//!
//! - `GET /ws/agui` – WebSocket event relay

use axum::{Router, routing::get};

use crate::state::AppState;

mod relay;

/// Source stamped on records the server itself produces.
pub const SERVER_SOURCE: &str = "agui-server";

/// Build the AG-UI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws/agui", get(relay::agui_ws))
}
