use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::auth::require_credentials;
use crate::handler;
use crate::state::AppState;

/// Build the axum router for the blob endpoints.
///
/// - `GET|PUT /{access_key}/{secret_key}/{key}` pass the auth gate, then
///   reach the get/put handlers.
/// - `GET|PUT /{access_key}/{secret_key}/` answer 400 for the empty key.
/// - Every other method or path is a 404.
pub fn build_router(state: AppState) -> Router {
    let gate = middleware::from_fn_with_state(state.clone(), require_credentials);

    Router::new()
        .route(
            "/:access_key/:secret_key/:key",
            get(handler::get_blob)
                .put(handler::put_blob)
                .route_layer(gate)
                .fallback(handler::not_found),
        )
        .route(
            "/:access_key/:secret_key/",
            get(handler::missing_key)
                .put(handler::missing_key)
                .fallback(handler::not_found),
        )
        .fallback(handler::not_found)
        .with_state(state)
}
