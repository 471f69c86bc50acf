//! Operation-level permission checks.
//!
//! Permissions gate whole operations (managing roles, publishing to the
//! catalog). They are derived from the caller's active roles, which are read
//! from the user document on every check.

use axum::http::StatusCode;
use axum::response::Response;

use aula_auth::{Permission, Principal, UserAccount, authorize};

use crate::app::errors::{json_error, repository_error_to_response};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// The caller's user document; 401 if the token's subject no longer exists.
pub async fn caller(services: &AppServices, ctx: &PrincipalContext) -> Result<UserAccount, Response> {
    services
        .repos
        .users
        .get(&ctx.user_id())
        .await
        .map_err(repository_error_to_response)?
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unknown user"))
}

pub async fn principal(services: &AppServices, ctx: &PrincipalContext) -> Result<Principal, Response> {
    let user = caller(services, ctx).await?;
    Ok(Principal::from_roles(user.id, user.active_role_names()))
}

/// Check `required` before running an operation.
pub async fn require_permission(
    services: &AppServices,
    ctx: &PrincipalContext,
    required: &Permission,
) -> Result<Principal, Response> {
    let principal = principal(services, ctx).await?;
    authorize(&principal, required).map_err(|e| {
        tracing::info!(user_id = %principal.user_id, permission = %required, "permission denied");
        json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })?;
    Ok(principal)
}
