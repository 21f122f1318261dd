//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::web::{auth::session_token_from, state::AppState};

/// Middleware that verifies the session cookie.
///
/// If valid, inserts the decoded `SessionIdentity` into request extensions for
/// handlers to use. If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token_from(req.headers()).ok_or(ApiError::Unauthenticated)?;

    let identity = state.tokens.verify(token).map_err(|e| {
        debug!("Session token rejected: {}", e);
        ApiError::Unauthenticated
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
