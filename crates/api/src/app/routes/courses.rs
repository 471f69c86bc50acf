//! Course catalog. Listing is open to any caller; changes need `catalog.write`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
    routing::{patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use aula_auth::Permission;
use aula_catalog::{Course, CourseUpdate, NewCourse, matches_any_keyword, matches_any_tag, normalize_terms};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;
use crate::data_control::ScopedPath;

pub fn router() -> Router {
    Router::new()
        .route("/courses", post(create_course).get(list_courses))
        .route("/courses/:title", patch(update_course).delete(delete_course))
        .route("/courses/:title/deactivate", post(deactivate_course))
}

#[derive(Debug, Deserialize)]
pub struct CourseParams {
    pub title: String,
}

/// POST /courses
pub async fn create_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewCourse>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let course = match Course::create(body) {
        Ok(course) => course,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.repos.courses.by_title(&course.title).await {
        Ok(Some(_)) => return errors::conflict("COURSEALREADYEXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }
    match services.repos.users.by_name_or_username(&course.publisher).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found("PUBLISHERNOTFOUND"),
        Err(e) => return errors::repository_error_to_response(e),
    }

    if let Err(e) = services.repos.courses.save(&course).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(course_id = %course.id, title = %course.title, "course created");

    dto::created("COURSECREATEDSUCCESSFULLY", dto::document(&course))
}

/// GET /courses?keywords=&tags= - Active courses; keywords match the title
pub async fn list_courses(
    Extension(services): Extension<Arc<AppServices>>,
    Query(pairs): Query<dto::QueryPairs>,
) -> Response {
    let keywords = normalize_terms(dto::query_values(&pairs, "keywords"));
    let tags = normalize_terms(dto::query_values(&pairs, "tags"));

    let courses = match services.repos.courses.active_sorted().await {
        Ok(courses) => courses,
        Err(e) => return errors::repository_error_to_response(e),
    };
    let found: Vec<Course> = courses
        .into_iter()
        .filter(|c| matches_any_keyword(&c.title, &keywords) && matches_any_tag(&c.tags, &tags))
        .collect();

    if found.is_empty() {
        return errors::not_found("COURSESNOTFOUND");
    }
    dto::ok("COURSESGOT", json!({ "coursesFound": dto::document(&found) }))
}

/// PATCH /courses/:title
pub async fn update_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<CourseParams>,
    Json(body): Json<CourseUpdate>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut course = match load_course(&services, &params.title).await {
        Ok(course) => course,
        Err(response) => return response,
    };
    if let Err(e) = course.apply(body) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.repos.courses.save(&course).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok("COURSEUPDATEDSUCCESSFULLY", dto::document(&course))
}

/// DELETE /courses/:title
pub async fn delete_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<CourseParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let course = match load_course(&services, &params.title).await {
        Ok(course) => course,
        Err(response) => return response,
    };
    if let Err(e) = services.repos.courses.delete(&course.id).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(course_id = %course.id, title = %course.title, "course deleted");

    dto::ok("COURSEDELETEDSUCCESSFULLY", json!({ "title": course.title }))
}

/// POST /courses/:title/deactivate
pub async fn deactivate_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<CourseParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut course = match load_course(&services, &params.title).await {
        Ok(course) => course,
        Err(response) => return response,
    };
    course.deactivate();
    if let Err(e) = services.repos.courses.save(&course).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok("COURSEDEACTIVATEDSUCCESSFULLY", json!({ "title": course.title, "isActive": false }))
}

async fn load_course(services: &AppServices, title: &str) -> Result<Course, Response> {
    services
        .repos
        .courses
        .by_title(title.trim())
        .await
        .map_err(errors::repository_error_to_response)?
        .ok_or_else(|| errors::not_found("COURSENOTFOUND"))
}
