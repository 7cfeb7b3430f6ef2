//! Session cookie handling
//!
//! The session id is an opaque UUID; nothing else lives in the cookie.

use axum::http::{header, HeaderMap, HeaderValue};
use uuid::Uuid;

use crate::error::AppError;
use crate::staging::SessionId;

pub const SESSION_COOKIE: &str = "receipt_session";

/// Session id from the request's `Cookie` headers, if present and well-formed
pub fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value carrying the session id
pub fn session_cookie(session_id: SessionId, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, session_id
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(e.to_string()))
}
