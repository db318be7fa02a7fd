//! router-api - HTTP JSON API for router management
//!
//! Exposes every catalog operation as a route. Successful operations answer
//! `200` with the result envelope; failures answer with a status derived from
//! the error kind and a `{"detail": ...}` body.
//!
//! # Usage
//!
//! ```ignore
//! use router_api::{create_router, AppState};
//!
//! let state = AppState::new(Arc::new(dispatcher));
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the router API with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health));

    for route in handlers::operations::ROUTES {
        router = router.route(route.path, route.method_router());
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
