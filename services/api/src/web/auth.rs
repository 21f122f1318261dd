//! services/api/src/web/auth.rs
//!
//! Session endpoints: issuing the session cookie and clearing it again.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use taskboard_core::domain::SessionIdentity;
use tracing::info;

use crate::config::CookiePolicy;
use crate::error::{ApiError, ErrorBody};
use crate::web::{rest::SuccessResponse, state::AppState};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

//=========================================================================================
// Cookie Helpers
//=========================================================================================

/// Renders a `Set-Cookie` value for the session cookie.
pub fn session_cookie(policy: CookiePolicy, value: &str, max_age_secs: i64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite={}; Max-Age={}",
        SESSION_COOKIE, value, policy.same_site, max_age_secs
    );
    if policy.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Finds the session token among the request's cookies.
pub fn session_token_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /jwt - Issue a session token for the given identity payload
#[utoipa::path(
    post,
    path = "/jwt",
    responses(
        (status = 200, description = "Session cookie set", body = SuccessResponse),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn issue_token_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(claims) = payload?;
    let identity = SessionIdentity::new(claims);
    let issued = state.tokens.issue(&identity)?;
    info!(email = identity.email().unwrap_or("<none>"), "Issued session token");

    let cookie = session_cookie(
        state.config.cookie_policy,
        &issued.token,
        issued.ttl.num_seconds(),
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SuccessResponse::ok()),
    ))
}

/// POST /logout - Clear the session cookie
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = SuccessResponse)
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = session_cookie(state.config.cookie_policy, "", 0);
    ([(header::SET_COOKIE, cookie)], Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SameSite;
    use axum::http::HeaderValue;

    #[test]
    fn development_cookie_is_strict_and_not_secure() {
        let cookie = session_cookie(CookiePolicy::development(), "abc", 18000);
        assert_eq!(
            cookie,
            "token=abc; HttpOnly; Path=/; SameSite=Strict; Max-Age=18000"
        );
    }

    #[test]
    fn production_cookie_is_cross_site_and_secure() {
        let cookie = session_cookie(CookiePolicy::production(), "", 0);
        assert_eq!(
            cookie,
            "token=; HttpOnly; Path=/; SameSite=None; Max-Age=0; Secure"
        );
        let lax = CookiePolicy {
            secure: false,
            same_site: SameSite::Lax,
        };
        assert!(session_cookie(lax, "x", 1).contains("SameSite=Lax"));
    }

    #[test]
    fn token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("lang=en; token=abc.def.ghi; tokenish=no"),
        );
        assert_eq!(session_token_from(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn empty_or_missing_token_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token_from(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(session_token_from(&headers), None);
    }
}
