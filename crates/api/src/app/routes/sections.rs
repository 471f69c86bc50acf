//! Catalog sections: named groups of media and ebooks with one level of
//! subsections. Reads are open to any caller; changes need `catalog.write`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use aula_auth::Permission;
use aula_catalog::{ContentKind, NewSection, NewSectionItem, Section, SectionItem, SectionUpdate, normalize_terms};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;
use crate::data_control::ScopedPath;

pub fn router() -> Router {
    Router::new()
        .route("/sections", post(create_section).get(list_sections))
        .route(
            "/sections/:name",
            get(get_section).patch(update_section).delete(delete_section),
        )
        .route("/sections/:name/deactivate", post(deactivate_section))
        .route("/sections/:name/content", put(add_section_content))
        .route(
            "/sections/:name/subsections",
            post(create_subsection).get(list_subsections),
        )
        .route(
            "/sections/:name/subsections/:subsection/content",
            put(add_subsection_content),
        )
        .route(
            "/sections/:name/subsections/:subsection/deactivate",
            post(deactivate_subsection),
        )
}

#[derive(Debug, Deserialize)]
pub struct SectionParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SubsectionParams {
    pub name: String,
    pub subsection: String,
}

/// POST /sections
pub async fn create_section(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewSection>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let section = match Section::create(body) {
        Ok(section) => section,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.repos.sections.by_name(&section.name).await {
        Ok(Some(_)) => return errors::conflict("SECTIONALREADYEXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }

    if let Err(e) = services.repos.sections.save(&section).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(section_id = %section.id, name = %section.name, "section created");

    dto::created("SECTIONCREATEDSUCCESSFULLY", dto::document(&section))
}

/// GET /sections?keywords=&tags= - Active sections; keywords match name or description
pub async fn list_sections(
    Extension(services): Extension<Arc<AppServices>>,
    Query(pairs): Query<dto::QueryPairs>,
) -> Response {
    let keywords = normalize_terms(dto::query_values(&pairs, "keywords"));
    let tags = normalize_terms(dto::query_values(&pairs, "tags"));

    let found: Vec<Section> = match services.repos.sections.active_sorted().await {
        Ok(sections) => sections
            .into_iter()
            .filter(|s| s.matches(&keywords, &tags))
            .collect(),
        Err(e) => return errors::repository_error_to_response(e),
    };

    if found.is_empty() {
        return errors::not_found("SECTIONSNOTFOUND");
    }
    dto::ok("SECTIONSGOT", json!({ "sectionsFound": dto::document(&found) }))
}

/// GET /sections/:name - Section with its content and active subsections
pub async fn get_section(
    Extension(services): Extension<Arc<AppServices>>,
    ScopedPath(params): ScopedPath<SectionParams>,
) -> Response {
    let mut section = match load_section(&services, &params.name).await {
        Ok(section) if section.is_active => section,
        Ok(_) => return errors::not_found("SECTIONNOTFOUND"),
        Err(response) => return response,
    };
    section.subsections.retain(|s| s.is_active);

    dto::ok("SECTIONGOT", dto::document(&section))
}

/// PATCH /sections/:name
pub async fn update_section(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<SectionParams>,
    Json(body): Json<SectionUpdate>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    section.apply(body);
    if let Err(e) = services.repos.sections.save(&section).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok("SECTIONUPDATEDSUCCESSFULLY", dto::document(&section))
}

/// DELETE /sections/:name
pub async fn delete_section(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<SectionParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    if let Err(e) = services.repos.sections.delete(&section.id).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(section_id = %section.id, name = %section.name, "section deleted");

    dto::ok("SECTIONDELETEDSUCCESSFULLY", json!({ "name": section.name }))
}

/// POST /sections/:name/deactivate
pub async fn deactivate_section(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<SectionParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    section.deactivate();
    if let Err(e) = services.repos.sections.save(&section).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok("SECTIONDEACTIVATEDSUCCESSFULLY", json!({ "name": section.name, "isActive": false }))
}

/// PUT /sections/:name/content - Attach a media file or ebook
pub async fn add_section_content(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<SectionParams>,
    Json(body): Json<NewSectionItem>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let item = match checked_item(&services, body).await {
        Ok(item) => item,
        Err(response) => return response,
    };
    let mut section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    if let Err(e) = section.add_item(item) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.repos.sections.save(&section).await {
        return errors::repository_error_to_response(e);
    }

    dto::created("MEDIAOREBOOKADDEDSUCCESSFULLY", json!({ "name": section.name }))
}

/// POST /sections/:name/subsections
pub async fn create_subsection(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<SectionParams>,
    Json(body): Json<NewSection>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    let payload = match section.add_subsection(body) {
        Ok(subsection) => dto::document(subsection),
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = services.repos.sections.save(&section).await {
        return errors::repository_error_to_response(e);
    }

    dto::created("SUBSECTIONCREATEDSUCCESSFULLY", payload)
}

/// GET /sections/:name/subsections - Active subsections of a section
pub async fn list_subsections(
    Extension(services): Extension<Arc<AppServices>>,
    ScopedPath(params): ScopedPath<SectionParams>,
) -> Response {
    let section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    let found: Vec<_> = section.active_subsections().collect();

    dto::ok("SUBSECTIONSGOT", json!({ "subsectionsFound": dto::document(&found) }))
}

/// PUT /sections/:name/subsections/:subsection/content
pub async fn add_subsection_content(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<SubsectionParams>,
    Json(body): Json<NewSectionItem>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let item = match checked_item(&services, body).await {
        Ok(item) => item,
        Err(response) => return response,
    };
    let mut section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    let Some(subsection) = section.subsection_mut(params.subsection.trim()) else {
        return errors::not_found("SUBSECTIONNOTFOUND");
    };
    if let Err(e) = subsection.add_item(item) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.repos.sections.save(&section).await {
        return errors::repository_error_to_response(e);
    }

    dto::created(
        "MEDIAOREBOOKADDEDSUCCESSFULLY",
        json!({ "name": section.name, "subsection": params.subsection.trim() }),
    )
}

/// POST /sections/:name/subsections/:subsection/deactivate
pub async fn deactivate_subsection(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<SubsectionParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut section = match load_section(&services, &params.name).await {
        Ok(section) => section,
        Err(response) => return response,
    };
    let Some(subsection) = section.subsection_mut(params.subsection.trim()) else {
        return errors::not_found("SUBSECTIONNOTFOUND");
    };
    subsection.is_active = false;
    let name = subsection.name.clone();
    if let Err(e) = services.repos.sections.save(&section).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok(
        "SUBSECTIONDEACTIVATEDSUCCESSFULLY",
        json!({ "name": section.name, "subsection": name, "isActive": false }),
    )
}

async fn load_section(services: &AppServices, name: &str) -> Result<Section, Response> {
    services
        .repos
        .sections
        .by_name(name.trim())
        .await
        .map_err(errors::repository_error_to_response)?
        .ok_or_else(|| errors::not_found("SECTIONNOTFOUND"))
}

/// Validate an item; ebooks must already be in the catalog.
async fn checked_item(services: &AppServices, body: NewSectionItem) -> Result<SectionItem, Response> {
    let item = body.validated().map_err(errors::domain_error_to_response)?;
    if item.kind == ContentKind::Ebook {
        services
            .repos
            .ebooks
            .by_url(&item.url)
            .await
            .map_err(errors::repository_error_to_response)?
            .ok_or_else(|| errors::not_found("EBOOKNOTFOUND"))?;
    }
    Ok(item)
}
