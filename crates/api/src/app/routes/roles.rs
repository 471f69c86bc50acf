//! Role and rule administration. Every endpoint requires `roles.manage`.

use std::sync::Arc;

use axum::{
    extract::Extension,
    response::Response,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use aula_auth::{Permission, Role, RoleName, RoleUpdate, UserAccount};
use aula_core::UserId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;
use crate::data_control::ScopedPath;

pub fn router() -> Router {
    Router::new()
        .route("/authorization/roles", get(list_roles).post(create_role))
        .route(
            "/authorization/roles/:name",
            get(get_role).patch(update_role).delete(delete_role),
        )
        .route("/authorization/roles/:name/rules", put(replace_rules))
        .route(
            "/authorization/users/:user_id/roles/:name",
            put(assign_role).delete(remove_role),
        )
        .route("/authorization/users/:user_id", get(get_user))
}

#[derive(Debug, Deserialize)]
pub struct RoleParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UserRoleParams {
    pub user_id: String,
    pub name: String,
}

/// GET /authorization/roles - All roles, sorted by name
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    match services.repos.roles.sorted().await {
        Ok(roles) => dto::ok("ROLESGOT", json!({ "rolesFound": dto::document(&roles) })),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// GET /authorization/roles/:name
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<RoleParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    match load_role(&services, &params.name).await {
        Ok(role) => dto::ok("ROLEGOT", dto::document(&role)),
        Err(response) => response,
    }
}

/// POST /authorization/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateRoleRequest>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    let name = match RoleName::parse(&body.name) {
        Ok(name) => name,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.repos.roles.by_name(&name).await {
        Ok(Some(_)) => return errors::conflict("ROLEALREADYEXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }

    let mut role = Role::new(name, body.description);
    role.is_default = body.is_default;
    role.is_active = body.is_active.unwrap_or(true);
    role.rules = body.rules;

    if let Err(e) = services.repos.roles.save(&role).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(role = %role.name, rules = role.rules.len(), "role created");

    dto::created(
        "ROLECREATED",
        json!({ "id": role.id.to_string(), "name": role.name.as_str() }),
    )
}

/// PATCH /authorization/roles/:name - Partial update (description, flags, rules)
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<RoleParams>,
    Json(body): Json<RoleUpdate>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    let mut role = match load_role(&services, &params.name).await {
        Ok(role) => role,
        Err(response) => return response,
    };
    role.apply(body);

    if let Err(response) = save_role(&services, &role).await {
        return response;
    }
    dto::ok("ROLEUPDATED", dto::document(&role))
}

/// PUT /authorization/roles/:name/rules - Replace the role's rule set
pub async fn replace_rules(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<RoleParams>,
    Json(body): Json<dto::ReplaceRulesRequest>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    let mut role = match load_role(&services, &params.name).await {
        Ok(role) => role,
        Err(response) => return response,
    };
    role.rules = body.rules;

    if let Err(response) = save_role(&services, &role).await {
        return response;
    }
    tracing::info!(role = %role.name, rules = role.rules.len(), "role rules replaced");
    dto::ok("RULESUPDATED", json!({ "rules": dto::document(&role.rules) }))
}

/// DELETE /authorization/roles/:name - Delete the role and detach it from users
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<RoleParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    let role = match load_role(&services, &params.name).await {
        Ok(role) => role,
        Err(response) => return response,
    };
    if let Err(e) = services.repos.roles.delete(&role.id).await {
        return errors::repository_error_to_response(e);
    }

    let holders = match services.repos.users.filter(|u| u.has_role(&role.name)).await {
        Ok(users) => users,
        Err(e) => return errors::repository_error_to_response(e),
    };
    for mut user in holders {
        user.remove_role(&role.name);
        if let Err(e) = services.repos.users.save(&user).await {
            return errors::repository_error_to_response(e);
        }
    }

    tracing::info!(role = %role.name, "role deleted");
    dto::ok("ROLEDELETED", json!({ "name": role.name.as_str() }))
}

/// PUT /authorization/users/:user_id/roles/:name - Assign a role (idempotent)
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<UserRoleParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    let mut user = match load_user(&services, &params.user_id).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let role = match load_role(&services, &params.name).await {
        Ok(role) => role,
        Err(response) => return response,
    };

    let newly_assigned = user.assign_role(role.summary());
    if let Err(e) = services.repos.users.save(&user).await {
        return errors::repository_error_to_response(e);
    }
    if newly_assigned {
        tracing::info!(user_id = %user.id, role = %role.name, "role assigned");
    }

    dto::ok("ROLEASSIGNED", json!({ "roles": dto::document(&user.roles) }))
}

/// DELETE /authorization/users/:user_id/roles/:name
pub async fn remove_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<UserRoleParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    let mut user = match load_user(&services, &params.user_id).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let name = match RoleName::parse(&params.name) {
        Ok(name) => name,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !user.remove_role(&name) {
        return errors::not_found("user does not hold this role");
    }
    if let Err(e) = services.repos.users.save(&user).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(user_id = %user.id, role = %name, "role removed");

    dto::ok("ROLEREMOVED", json!({ "roles": dto::document(&user.roles) }))
}

/// GET /authorization/users/:user_id - The user's profile (no password hash)
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<UserParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::ROLES_MANAGE).await {
        return denied;
    }

    match load_user(&services, &params.user_id).await {
        Ok(user) => dto::ok("USERGOT", dto::document(&user.profile())),
        Err(response) => response,
    }
}

async fn load_role(services: &AppServices, raw_name: &str) -> Result<Role, Response> {
    let name = RoleName::parse(raw_name).map_err(errors::domain_error_to_response)?;
    services
        .repos
        .roles
        .by_name(&name)
        .await
        .map_err(errors::repository_error_to_response)?
        .ok_or_else(|| errors::not_found("ROLENOTFOUND"))
}

async fn load_user(services: &AppServices, raw_id: &str) -> Result<UserAccount, Response> {
    let id: UserId = raw_id.parse().map_err(errors::domain_error_to_response)?;
    services
        .repos
        .users
        .get(&id)
        .await
        .map_err(errors::repository_error_to_response)?
        .ok_or_else(|| errors::not_found("USERNOTFOUND"))
}

/// Persist the role and refresh the summary embedded on every holder.
async fn save_role(services: &AppServices, role: &Role) -> Result<(), Response> {
    services
        .repos
        .roles
        .save(role)
        .await
        .map_err(errors::repository_error_to_response)?;

    let holders = services
        .repos
        .users
        .filter(|u| u.has_role(&role.name))
        .await
        .map_err(errors::repository_error_to_response)?;
    for mut user in holders {
        user.assign_role(role.summary());
        services
            .repos
            .users
            .save(&user)
            .await
            .map_err(errors::repository_error_to_response)?;
    }
    Ok(())
}
