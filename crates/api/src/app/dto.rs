//! Request DTOs and the success envelope shared by every route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use aula_auth::Rule;
use aula_messaging::TagAction;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRulesRequest {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTagsRequest {
    pub id: String,
    pub tags_names: Vec<String>,
    pub action: TagAction,
}

/// Raw listing query; keys may repeat (`tags=a&tags=b`).
pub type QueryPairs = Vec<(String, String)>;

/// Every value supplied for `key`, in order.
pub fn query_values<'a>(pairs: &'a [(String, String)], key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    pairs
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub fn query_value<'a>(pairs: &'a [(String, String)], key: &'a str) -> Option<&'a str> {
    query_values(pairs, key).map(str::trim).find(|v| !v.is_empty())
}

// -------------------------
// Responses
// -------------------------

/// `{statusCode, message}` plus `payload`'s fields at the top level.
///
/// Non-object payloads are nested under `data`.
pub fn envelope(status: StatusCode, message: &'static str, payload: Value) -> Response {
    let mut body = Map::new();
    body.insert("statusCode".to_string(), json!(status.as_u16()));
    body.insert("message".to_string(), json!(message));
    match payload {
        Value::Object(fields) => body.extend(fields),
        Value::Null => {}
        other => {
            body.insert("data".to_string(), other);
        }
    }
    (status, Json(Value::Object(body))).into_response()
}

pub fn ok(message: &'static str, payload: Value) -> Response {
    envelope(StatusCode::OK, message, payload)
}

pub fn created(message: &'static str, payload: Value) -> Response {
    envelope(StatusCode::CREATED, message, payload)
}

/// Serialize a document for a response body.
pub fn document<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response document");
        Value::Null
    })
}
