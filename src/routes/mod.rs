//! HTTP surface of the server.

use axum::Router;

use crate::state::SharedState;

/// `/catalog` routes.
pub mod catalog;
/// `/chats/{chat_id}` routes.
pub mod chats;
/// Swagger UI and OpenAPI JSON.
pub mod docs;
/// `/healthcheck` route.
pub mod health;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(chats::router())
        .merge(catalog::router())
        .merge(docs::router())
        .with_state(state)
}
