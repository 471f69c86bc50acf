use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use aula_auth::PasswordError;
use aula_core::DomainError;
use aula_infra::RepositoryError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::BAD_REQUEST, "conflict", msg),
    }
}

/// Duplicate of an existing document; `code` is the client-facing message.
pub fn conflict(code: &'static str) -> axum::response::Response {
    domain_error_to_response(DomainError::conflict(code))
}

pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    tracing::error!(error = %err, "document store failure");
    match err {
        RepositoryError::Store(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
        RepositoryError::Decode { .. } | RepositoryError::Encode { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "serialization_error",
            err.to_string(),
        ),
    }
}

pub fn password_error_to_response(err: PasswordError) -> axum::response::Response {
    match err {
        PasswordError::TooShort(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        PasswordError::Entropy(_) | PasswordError::Hash(_) => {
            tracing::error!(error = %err, "password hashing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "hash_error", "failed to hash password")
        }
    }
}

pub fn not_found(message: &'static str) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
