//! Ebook catalog. The same title may be published once per format.

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
use aula_catalog::{Ebook, EbookFormat, EbookUpdate, NewEbook, matches_any_keyword, normalize_terms};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;
use crate::data_control::ScopedPath;

pub fn router() -> Router {
    Router::new()
        .route("/ebooks", post(create_ebook).get(list_ebooks))
        .route("/ebooks/:title/:format", patch(update_ebook).delete(delete_ebook))
        .route("/ebooks/:title/:format/deactivate", post(deactivate_ebook))
}

#[derive(Debug, Deserialize)]
pub struct EditionParams {
    pub title: String,
    pub format: String,
}

/// POST /ebooks
pub async fn create_ebook(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewEbook>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let ebook = match Ebook::create(body) {
        Ok(ebook) => ebook,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.repos.ebooks.by_url(&ebook.url).await {
        Ok(Some(_)) => return errors::conflict("EBOOKALREADYEXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }
    match services.repos.ebooks.edition(&ebook.title, ebook.format).await {
        Ok(Some(_)) => return errors::conflict("EBOOKALREADYEXISTS"),
        Ok(None) => {}
        Err(e) => return errors::repository_error_to_response(e),
    }

    if let Err(e) = services.repos.ebooks.save(&ebook).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(ebook_id = %ebook.id, title = %ebook.title, format = %ebook.format, "ebook created");

    dto::created("EBOOKCREATEDSUCCESSFULLY", dto::document(&ebook))
}

/// GET /ebooks?keywords= - Active ebooks; keywords match the title
pub async fn list_ebooks(
    Extension(services): Extension<Arc<AppServices>>,
    Query(pairs): Query<dto::QueryPairs>,
) -> Response {
    let keywords = normalize_terms(dto::query_values(&pairs, "keywords"));

    let found: Vec<Ebook> = match services.repos.ebooks.active_sorted().await {
        Ok(ebooks) => ebooks
            .into_iter()
            .filter(|e| matches_any_keyword(&e.title, &keywords))
            .collect(),
        Err(e) => return errors::repository_error_to_response(e),
    };

    if found.is_empty() {
        return errors::not_found("EBOOKNOTFOUND");
    }
    dto::ok("EBOOKSGOT", json!({ "ebooksFound": dto::document(&found) }))
}

/// PATCH /ebooks/:title/:format
pub async fn update_ebook(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<EditionParams>,
    Json(body): Json<EbookUpdate>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut ebook = match load_edition(&services, &params).await {
        Ok(ebook) => ebook,
        Err(response) => return response,
    };

    if let Err(e) = ebook.apply(body) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.repos.ebooks.save(&ebook).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok("EBOOKUPDATEDSUCCESSFULLY", dto::document(&ebook))
}

/// DELETE /ebooks/:title/:format
pub async fn delete_ebook(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<EditionParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let ebook = match load_edition(&services, &params).await {
        Ok(ebook) => ebook,
        Err(response) => return response,
    };
    if let Err(e) = services.repos.ebooks.delete(&ebook.id).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(ebook_id = %ebook.id, "ebook deleted");

    dto::ok(
        "EBOOKDELETEDSUCCESSFULLY",
        json!({ "title": ebook.title, "format": ebook.format }),
    )
}

/// POST /ebooks/:title/:format/deactivate
pub async fn deactivate_ebook(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ScopedPath(params): ScopedPath<EditionParams>,
) -> Response {
    if let Err(denied) = authz::require_permission(&services, &principal, &Permission::CATALOG_WRITE).await {
        return denied;
    }

    let mut ebook = match load_edition(&services, &params).await {
        Ok(ebook) => ebook,
        Err(response) => return response,
    };
    ebook.deactivate();
    if let Err(e) = services.repos.ebooks.save(&ebook).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok(
        "EBOOKDEACTIVATEDSUCCESSFULLY",
        json!({ "title": ebook.title, "format": ebook.format, "isActive": false }),
    )
}

async fn load_edition(services: &AppServices, params: &EditionParams) -> Result<Ebook, Response> {
    let format: EbookFormat = params.format.parse().map_err(errors::domain_error_to_response)?;
    services
        .repos
        .ebooks
        .edition(params.title.trim(), format)
        .await
        .map_err(errors::repository_error_to_response)?
        .ok_or_else(|| errors::not_found("EBOOKNOTFOUND"))
}
