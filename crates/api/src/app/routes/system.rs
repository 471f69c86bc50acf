use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let user = match authz::caller(&services, &principal).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    Json(serde_json::json!({
        "user_id": user.id.to_string(),
        "email": user.email,
        "username": user.username,
        "roles": user.active_role_names().iter().map(|r| r.as_str().to_string()).collect::<Vec<_>>(),
    }))
    .into_response()
}
