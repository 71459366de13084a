//! Token extraction for authenticated routes.
//!
//! Reads the access token from the `Authorization` header (raw or
//! `Bearer`-prefixed) or the `accessToken` cookie, verifies signature and
//! expiry, and injects the resolved identity into the request extensions.
//! Any failure short-circuits with a 401 before the handler runs.

use crate::api::handlers::error_response;
use crate::session::Engine;
use crate::token;
use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::debug;

pub(crate) const ACCESS_COOKIE: &str = "accessToken";
pub(crate) const REFRESH_COOKIE: &str = "refreshToken";

/// Identity resolved by the token middleware, available to handlers as an
/// extension.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub name: String,
}

pub(crate) async fn require_token(
    Extension(engine): Extension<Engine>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(raw) = extract_access_token(request.headers()) else {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };

    let claims = match engine.codec().parse(&raw) {
        Ok(claims) if !claims.is_expired(token::unix_now()) => claims,
        Ok(_) => {
            debug!("access token expired");
            return error_response(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
        Err(err) => {
            debug!("access token rejected: {err}");
            return error_response(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    request.extensions_mut().insert(AuthUser { name: claims.sub });
    next.run(request).await
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_authorization_token(headers) {
        return Some(token);
    }
    extract_cookie(headers, ACCESS_COOKIE)
}

fn extract_authorization_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    // Accept a bare token as well as the `Bearer` scheme.
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Build the `Set-Cookie` value carrying a token for its whole TTL.
pub(super) fn token_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    ))
}

/// Build the `Set-Cookie` value that clears a token cookie.
pub(super) fn clear_cookie(name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}
