//! User-to-user messages.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use aula_catalog::normalize_terms;
use aula_core::MessageId;
use aula_messaging::{Message, MessageQuery, MessageStatus, NewMessage, TagAction};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;
use crate::data_control::ScopedPath;

pub fn router() -> Router {
    Router::new()
        .route("/messages", post(send_message).get(list_messages))
        .route("/messages/tags", patch(update_tags))
        .route("/messages/:id", get(get_message))
        .route("/messages/:id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct MessageParams {
    pub id: String,
}

/// POST /messages - Send a message from the caller to an existing user
pub async fn send_message(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::SendMessageRequest>,
) -> Response {
    let sender = match authz::caller(&services, &principal).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let recipient = body.to.trim().to_lowercase();
    match services.repos.users.by_email(&recipient).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found("RECIPIENTNOTFOUND"),
        Err(e) => return errors::repository_error_to_response(e),
    }

    let input = NewMessage {
        from: sender.email,
        to: recipient,
        subject: body.subject,
        body: body.body,
    };
    let message = match Message::send(input, Utc::now()) {
        Ok(message) => message,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.repos.messages.save(&message).await {
        return errors::repository_error_to_response(e);
    }
    tracing::info!(message_id = %message.id, "message sent");

    dto::created("MESSAGECREATED", json!({ "id": message.id.to_string() }))
}

/// GET /messages?email=&filter=&keywords=&tags= - A user's mailbox
pub async fn list_messages(
    Extension(services): Extension<Arc<AppServices>>,
    Query(pairs): Query<dto::QueryPairs>,
) -> Response {
    let Some(email) = dto::query_value(&pairs, "email") else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "EMAILREQUIRED");
    };

    let filter = match dto::query_value(&pairs, "filter").map(str::parse::<MessageStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(e)) => return errors::domain_error_to_response(e),
        None => None,
    };

    let query = MessageQuery {
        email: email.to_lowercase(),
        filter,
        keywords: normalize_terms(dto::query_values(&pairs, "keywords")),
        tags: normalize_terms(dto::query_values(&pairs, "tags")),
    };

    match services.repos.messages.search(&query).await {
        Ok(messages) => dto::ok("MESSAGESGOT", json!({ "messagesFound": dto::document(&messages) })),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// GET /messages/:id
pub async fn get_message(
    Extension(services): Extension<Arc<AppServices>>,
    ScopedPath(params): ScopedPath<MessageParams>,
) -> Response {
    match load_message(&services, &params.id).await {
        Ok(message) => dto::ok("MESSAGEGOT", dto::document(&message)),
        Err(response) => response,
    }
}

/// PUT /messages/:id/status - Move a message to a status
pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    ScopedPath(params): ScopedPath<MessageParams>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> Response {
    let status = match body.status.parse::<MessageStatus>() {
        Ok(status) => status,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let mut message = match load_message(&services, &params.id).await {
        Ok(message) => message,
        Err(response) => return response,
    };

    message.apply_status(status);
    if let Err(e) = services.repos.messages.save(&message).await {
        return errors::repository_error_to_response(e);
    }

    dto::ok("MESSAGESTATUSUPDATED", dto::document(&message))
}

/// PATCH /messages/tags - Add or eliminate tag names on a message
pub async fn update_tags(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::MessageTagsRequest>,
) -> Response {
    let mut message = match load_message(&services, &body.id).await {
        Ok(message) => message,
        Err(response) => return response,
    };

    let names = normalize_terms(&body.tags_names);
    if message.apply_tags(body.action, &names) {
        if let Err(e) = services.repos.messages.save(&message).await {
            return errors::repository_error_to_response(e);
        }
    }

    let code = match body.action {
        TagAction::Add => "TAGSADDEDSUCCESSFULLY",
        TagAction::Eliminate => "TAGSELIMINATEDSUCCESSFULLY",
    };
    dto::ok(code, json!({ "tags": message.tags }))
}

async fn load_message(services: &AppServices, raw_id: &str) -> Result<Message, Response> {
    let id: MessageId = raw_id.parse().map_err(errors::domain_error_to_response)?;
    services
        .repos
        .messages
        .get(&id)
        .await
        .map_err(errors::repository_error_to_response)?
        .ok_or_else(|| errors::not_found("MESSAGENOTFOUND"))
}
