//! Public account endpoints: signup, login, session refresh, logout.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use aula_auth::{JwtIssuer, JwtValidator, NewUser, UserAccount, hash_password, verify_password};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::middleware::{REFRESH_COOKIE, TOKEN_COOKIE, cookie_value};

pub fn router() -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/session", put(refresh_session))
        .route("/auth/logout", get(logout))
}

/// POST /auth/signup - Register an account with the default role attached
pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewUser>,
) -> Response {
    let input = match body.validated() {
        Ok(input) => input,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let users = &services.repos.users;
    match users.by_email(&input.email).await {
        Ok(Some(_)) => return errors::conflict("EMAILALREADYEXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }
    match users.by_username(&input.username).await {
        Ok(Some(_)) => return errors::conflict("USERNAMEALREADYEXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }

    let hash = match hash_password(&input.password) {
        Ok(hash) => hash,
        Err(e) => return errors::password_error_to_response(e),
    };
    let mut user = UserAccount::new(input, hash, Utc::now());

    match services.repos.roles.default_role().await {
        Ok(Some(role)) => {
            user.assign_role(role.summary());
        }
        Ok(None) => tracing::warn!("no active default role; account created without roles"),
        Err(e) => return errors::repository_error_to_response(e),
    }

    if let Err(e) = users.save(&user).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(user_id = %user.id, email = %user.email, "user signed up");

    dto::created("USERCREATED", json!({ "id": user.id.to_string() }))
}

/// POST /auth/login - Exchange credentials for a bearer token (also set as a cookie)
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> Response {
    let email = body.email.trim().to_lowercase();
    let user = match services.repos.users.by_email(&email).await {
        Ok(user) => user,
        Err(e) => return errors::repository_error_to_response(e),
    };

    let Some(user) = user.filter(|u| verify_password(&body.password, &u.password_hash)) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "INVALIDCREDENTIALS");
    };

    let now = Utc::now();
    let issued = services
        .jwt
        .issue(user.id, &user.email, now)
        .and_then(|token| Ok((token, services.jwt.issue_refresh(user.id, &user.email, now)?)));
    let (token, refresh) = match issued {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to issue token");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "failed to issue token");
        }
    };
    tracing::info!(user_id = %user.id, "user logged in");

    let mut response = dto::ok("LOGGEDIN", json!({ "token": token }));
    set_cookie(&mut response, TOKEN_COOKIE, &token, services.jwt.ttl().num_seconds());
    set_cookie(&mut response, REFRESH_COOKIE, &refresh, services.jwt.refresh_ttl().num_seconds());
    response
}

/// PUT /auth/session - Trade the refresh cookie for a new bearer token
pub async fn refresh_session(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Response {
    let Some(refresh) = cookie_value(&headers, REFRESH_COOKIE) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "REFRESHTOKENREQUIRED");
    };

    let now = Utc::now();
    let claims = match services.jwt.validate_refresh(refresh, now) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting refresh credential");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "INVALIDREFRESHTOKEN");
        }
    };

    // The account may have been removed since the refresh token was issued.
    let user = match services.repos.users.get(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "INVALIDREFRESHTOKEN"),
        Err(e) => return errors::repository_error_to_response(e),
    };

    let token = match services.jwt.issue(user.id, &user.email, now) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to issue token");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "failed to issue token");
        }
    };
    tracing::debug!(user_id = %user.id, "session refreshed");

    let mut response = dto::ok("SESSIONREFRESHED", json!({ "token": token }));
    set_cookie(&mut response, TOKEN_COOKIE, &token, services.jwt.ttl().num_seconds());
    response
}

/// GET /auth/logout - Clear the token cookies
pub async fn logout() -> Response {
    let mut response = dto::ok("LOGGEDOUT", serde_json::Value::Null);
    set_cookie(&mut response, TOKEN_COOKIE, "", 0);
    set_cookie(&mut response, REFRESH_COOKIE, "", 0);
    response
}

fn set_cookie(response: &mut Response, name: &str, value: &str, max_age: i64) {
    let cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "cookie value is not a valid header"),
    }
}
