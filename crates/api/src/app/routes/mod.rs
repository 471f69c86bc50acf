use axum::{routing::get, Router};

pub mod auth;
pub mod courses;
pub mod ebooks;
pub mod messages;
pub mod roles;
pub mod sections;
pub mod system;
pub mod tags;

/// Router for all authenticated endpoints.
///
/// Areas are merged rather than nested so the access control layer sees the
/// full route and every path parameter.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(roles::router())
        .merge(messages::router())
        .merge(tags::router())
        .merge(courses::router())
        .merge(ebooks::router())
        .merge(sections::router())
}
