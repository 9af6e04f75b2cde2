//! API router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`.
//! No authentication: the service assumes a single-tenant, trusted
//! caller (see DESIGN.md for the hardening required before exposure).

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::archive),
        )
        .with_state(ctx);

    // The browser UI is served from a different origin in development.
    Router::new()
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
}
