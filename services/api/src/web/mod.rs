//! services/api/src/web/mod.rs
//!
//! The HTTP surface: session provider routes, the protected search and profile
//! routes, and the router that ties them to the shared `AppState`.

pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::ApiDoc;

use crate::error::ApiError;
use auth::{login_handler, logout_handler, signup_handler};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use rest::{current_search_handler, get_profile_handler, search_handler, update_profile_handler};
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builds the application router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            ApiError::Internal(format!(
                "Invalid allowed origin '{}': {}",
                app_state.config.allowed_origin, e
            ))
        })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/search", get(current_search_handler).post(search_handler))
        .route("/profile", get(get_profile_handler).put(update_profile_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
