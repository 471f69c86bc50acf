use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Response,
    routing::{patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use aula_core::TagId;
use aula_messaging::{NewTag, Tag, TagUpdate};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::data_control::ScopedPath;

pub fn router() -> Router {
    Router::new()
        .route("/tags", post(create_tag).get(list_tags))
        .route("/tags/:id", patch(update_tag))
}

#[derive(Debug, Deserialize)]
pub struct TagParams {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TagListQuery {
    pub username: Option<String>,
}

/// POST /tags - Create a tag for an existing user
pub async fn create_tag(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewTag>,
) -> Response {
    let tag = match Tag::create(body) {
        Ok(tag) => tag,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.repos.users.by_username(&tag.username).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found("USERNOTFOUND"),
        Err(e) => return errors::repository_error_to_response(e),
    }
    match services.repos.tags.by_label(&tag.name, &tag.username).await {
        Ok(Some(_)) => return errors::conflict("TAG_ALREADY_EXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }

    if let Err(e) = services.repos.tags.save(&tag).await {
        return errors::repository_error_to_response(e);
    }
    dto::created("TAGCREATEDSUCCESSFULLY", dto::document(&tag))
}

/// PATCH /tags/:id - Rename or (de)activate a tag
pub async fn update_tag(
    Extension(services): Extension<Arc<AppServices>>,
    ScopedPath(params): ScopedPath<TagParams>,
    Json(body): Json<TagUpdate>,
) -> Response {
    let id: TagId = match params.id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let mut tag = match services.repos.tags.get(&id).await {
        Ok(Some(tag)) => tag,
        Ok(None) => return errors::not_found("TAGNOTFOUND"),
        Err(e) => return errors::repository_error_to_response(e),
    };

    if let Some(name) = body.name.as_deref().map(str::trim) {
        if name != tag.name {
            match services.repos.tags.by_label(name, &tag.username).await {
                Ok(Some(_)) => {
                    return errors::conflict("TAG_ALREADY_EXISTS");
                }
                Ok(None) => {}
                Err(e) => return errors::repository_error_to_response(e),
            }
        }
    }

    if let Err(e) = tag.apply(body) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.repos.tags.save(&tag).await {
        return errors::repository_error_to_response(e);
    }
    dto::ok("TAGUPDATEDSUCCESSFULLY", dto::document(&tag))
}

/// GET /tags?username= - Active tags of a user
pub async fn list_tags(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<TagListQuery>,
) -> Response {
    let Some(username) = query.username.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "USERNAMEREQUIRED");
    };

    match services.repos.tags.active_for(username).await {
        Ok(tags) => dto::ok("TAGSRETRIEVEDSUCCESSFULLY", json!({ "tagsFound": dto::document(&tags) })),
        Err(e) => errors::repository_error_to_response(e),
    }
}
