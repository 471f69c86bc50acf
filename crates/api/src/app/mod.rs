//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, cache, repositories, rule source, token codec
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and the response envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::data_control::{self, DataControlState};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(build_app_with(services, config))
}

/// Router over already-wired services.
pub fn build_app_with(services: Arc<services::AppServices>, config: &AppConfig) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
    };
    let data_state = DataControlState {
        rules: services.rules.clone(),
        max_body_bytes: config.max_body_bytes,
    };

    // Protected routes: data control runs inside auth, so it sees the principal.
    let protected = routes::router()
        .layer(axum::middleware::from_fn_with_state(
            data_state,
            data_control::data_control,
        ))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::auth::router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services)),
        )
}
