//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use medimate_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

/// Name of the cookie carrying the auth session id.
pub const SESSION_COOKIE: &str = "session";

/// Extracts the auth session id from the request's `Cookie` header.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and resolves the signed-in user.
///
/// If valid, inserts the `UserSession` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_session_id = session_id_from_headers(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let session = match state.accounts.validate_auth_session(auth_session_id).await {
        Ok(session) => session,
        Err(PortError::Unauthorized) => {
            warn!("Rejected expired or unknown auth session");
            state.workspaces.forget_session(auth_session_id).await;
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            warn!("Could not validate auth session: {:?}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    state
        .workspaces
        .bind_session(auth_session_id, session.user_id)
        .await;

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
