use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use aula_auth::JwtValidator;

use crate::context::PrincipalContext;

/// Name of the cookie `POST /auth/login` stores the token in.
pub const TOKEN_COOKIE: &str = "bearer_token";

/// Cookie holding the refresh token; only `PUT /auth/session` reads it.
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_credential(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejecting bearer credential");
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub, claims.email));

    Ok(next.run(req).await)
}

/// Bearer header first, then the login cookie.
fn extract_credential(headers: &HeaderMap) -> Result<&str, StatusCode> {
    if let Some(header) = headers.get(header::AUTHORIZATION) {
        return extract_bearer(header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?);
    }

    cookie_value(headers, TOKEN_COOKIE).ok_or(StatusCode::UNAUTHORIZED)
}

/// Non-empty value of the named cookie.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| pair.trim().strip_prefix(name)?.strip_prefix('='))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn extract_bearer(header: &str) -> Result<&str, StatusCode> {
    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
