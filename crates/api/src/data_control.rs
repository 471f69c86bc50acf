//! Data-shape access control for protected routes.
//!
//! Runs after [`crate::middleware::auth_middleware`]. For every request it
//! loads the caller's rule set, finds the rule governing the request and
//! narrows what crosses the boundary:
//!
//! - path parameters, exposed to handlers through [`ScopedPath`],
//! - the query string, rewritten in the request URI,
//! - a JSON request body, re-serialized before the handler reads it,
//! - a JSON response body, on the way back out.
//!
//! A request no rule governs passes through untouched. A restricted JSON
//! request body is always buffered; one larger than the configured limit is
//! refused with 413. Payloads that are not JSON or do not parse are logged
//! and passed through as they are.

use std::sync::Arc;

use axum::{
    async_trait,
    body::{Body, Bytes, to_bytes},
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header, request::Parts, uri::PathAndQuery},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use aula_auth::{HttpMethod, Rule, filter_fields, filter_pairs, is_unrestricted, match_rule};
use aula_infra::{RuleSource, RuleStoreError};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct DataControlState {
    pub rules: Arc<dyn RuleSource>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Error)]
pub enum AccessControlError {
    #[error("identity could not be resolved: {0}")]
    IdentityResolution(String),

    #[error("rule lookup failed: {0}")]
    RuleLookup(String),
}

impl From<RuleStoreError> for AccessControlError {
    fn from(err: RuleStoreError) -> Self {
        match err {
            RuleStoreError::UnknownUser(id) => Self::IdentityResolution(format!("unknown user {id}")),
            RuleStoreError::Repository(e) => Self::RuleLookup(e.to_string()),
        }
    }
}

impl IntoResponse for AccessControlError {
    fn into_response(self) -> Response {
        match self {
            Self::IdentityResolution(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::RuleLookup(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "rule_lookup_failed", msg),
        }
    }
}

/// Path parameters that survived the matched rule's `dataIn.parameters`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopedParams(pub Vec<(String, String)>);

/// Path extractor that only sees the parameters the caller may send.
///
/// `T` is deserialized from an object of string values keyed by parameter
/// name. A parameter removed by the access rule is simply missing, so a
/// handler that requires it answers 400.
#[derive(Debug, Clone)]
pub struct ScopedPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ScopedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pairs = match parts.extensions.get::<ScopedParams>() {
            Some(scoped) => scoped.0.clone(),
            None => RawPathParams::from_request_parts(parts, state)
                .await
                .map_err(IntoResponse::into_response)?
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        };

        let object: Map<String, Value> = pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();

        serde_json::from_value(Value::Object(object))
            .map(ScopedPath)
            .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_path_parameters", e.to_string()))
    }
}

pub async fn data_control(
    State(state): State<DataControlState>,
    raw_params: Option<RawPathParams>,
    req: Request,
    next: Next,
) -> Response {
    let Some(principal) = req.extensions().get::<PrincipalContext>().cloned() else {
        return AccessControlError::IdentityResolution("request carries no identity".to_string())
            .into_response();
    };

    let rules = match state.rules.rules_for_user(principal.user_id()).await {
        Ok(rules) => rules,
        Err(e) => {
            let err = AccessControlError::from(e);
            tracing::warn!(user_id = %principal.user_id(), error = %err, "access control aborted request");
            return err.into_response();
        }
    };

    let Ok(method) = req.method().as_str().parse::<HttpMethod>() else {
        return next.run(req).await;
    };

    let params: Vec<(String, String)> = raw_params
        .map(|raw| {
            raw.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let path = decode_path(req.uri().path());

    let Some(rule) = match_rule(&rules, method, &path, &params).cloned() else {
        tracing::debug!(%method, path = %path, "no rule governs request; passing through unfiltered");
        return next.run(req).await;
    };
    tracing::debug!(
        user_id = %principal.user_id(),
        %method,
        route = %rule.route,
        "filtering request with matched rule"
    );

    let req = match filter_request(req, &rule, params, state.max_body_bytes).await {
        Ok(req) => req,
        Err(response) => return response,
    };
    let response = next.run(req).await;
    filter_response(response, &rule).await
}

async fn filter_request(
    req: Request,
    rule: &Rule,
    params: Vec<(String, String)>,
    max_body_bytes: usize,
) -> Result<Request, Response> {
    let (mut parts, body) = req.into_parts();

    let scoped = filter_pairs(params, rule.data_in.parameters.as_deref());
    parts.extensions.insert(ScopedParams(scoped));

    if let Some(uri) = filter_query(&parts.uri, rule.data_in.queries.as_deref()) {
        parts.uri = uri;
    }

    let allowed = rule.data_in.body.as_deref();
    if is_unrestricted(allowed) || !is_json(&parts.headers) {
        return Ok(Request::from_parts(parts, body));
    }

    if declared_length(&parts.headers).is_some_and(|len| len > max_body_bytes) {
        return Err(body_too_large(max_body_bytes));
    }

    let bytes = match to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let inner = e.into_inner();
            if inner.is::<LengthLimitError>() {
                return Err(body_too_large(max_body_bytes));
            }
            tracing::warn!(error = %inner, "failed to read request body");
            return Err(json_error(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                "request body could not be read",
            ));
        }
    };

    let body = rewrite_body(&mut parts.headers, bytes, allowed);
    Ok(Request::from_parts(parts, body))
}

fn body_too_large(max_body_bytes: usize) -> Response {
    tracing::warn!(max_body_bytes, "restricted request body exceeds the buffer limit");
    json_error(
        StatusCode::PAYLOAD_TOO_LARGE,
        "payload_too_large",
        format!("request body exceeds {max_body_bytes} bytes"),
    )
}

async fn filter_response(response: Response, rule: &Rule) -> Response {
    let allowed = rule.data_out.body.as_deref();
    if is_unrestricted(allowed) || !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to read response body");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "response_error",
                "response body could not be read",
            );
        }
    };

    let body = rewrite_body(&mut parts.headers, bytes, allowed);
    Response::from_parts(parts, body)
}

/// Filter a buffered JSON body. Unparseable bodies are returned unchanged.
fn rewrite_body(headers: &mut HeaderMap, bytes: Bytes, allowed: Option<&[String]>) -> Body {
    if bytes.is_empty() {
        return Body::from(bytes);
    }

    let mut value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "json payload could not be parsed; passing through unfiltered");
            return Body::from(bytes);
        }
    };
    filter_fields(&mut value, allowed);

    match serde_json::to_vec(&value) {
        Ok(rewritten) => {
            headers.remove(header::TRANSFER_ENCODING);
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
            Body::from(rewritten)
        }
        Err(e) => {
            tracing::warn!(error = %e, "filtered payload could not be serialized; passing through");
            Body::from(bytes)
        }
    }
}

/// Rebuild `uri` keeping only allowed query keys. `None` leaves it as is.
fn filter_query(uri: &Uri, allowed: Option<&[String]>) -> Option<Uri> {
    let query = uri.query()?;
    if is_unrestricted(allowed) {
        return None;
    }

    let pairs: Vec<(String, &str)> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let key = segment.split_once('=').map_or(segment, |(key, _)| key);
            (decode_query_key(key), segment)
        })
        .collect();
    let kept: Vec<&str> = filter_pairs(pairs, allowed)
        .into_iter()
        .map(|(_, segment)| segment)
        .collect();

    let path_and_query = if kept.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), kept.join("&"))
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = match PathAndQuery::try_from(path_and_query.as_str()) {
        Ok(pq) => Some(pq),
        Err(e) => {
            tracing::warn!(error = %e, "filtered query could not be rebuilt; passing through");
            return None;
        }
    };
    Uri::from_parts(parts).ok()
}

/// Percent-decode a request path. `+` is literal in a path.
fn decode_path(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Decode a form-encoded query key, where `+` stands for a space.
fn decode_query_key(raw: &str) -> String {
    decode_path(&raw.replace('+', " "))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|mime| {
            let mime = mime.to_ascii_lowercase();
            mime.starts_with("application/json") || mime.contains("+json")
        })
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn query_keeps_only_allowed_keys_in_order() {
        let uri: Uri = "/messages?email=a%40b.c&secret=1&tags=x&tags=y".parse().unwrap();
        let allowed = fields(&["email", "tags"]);
        let out = filter_query(&uri, Some(allowed.as_slice())).unwrap();
        assert_eq!(out.path(), "/messages");
        assert_eq!(out.query(), Some("email=a%40b.c&tags=x&tags=y"));
    }

    #[test]
    fn query_keys_are_compared_decoded() {
        let uri: Uri = "/courses?key%77ords=rust&other=1".parse().unwrap();
        let allowed = fields(&["keywords"]);
        let out = filter_query(&uri, Some(allowed.as_slice())).unwrap();
        assert_eq!(out.query(), Some("key%77ords=rust"));
    }

    #[test]
    fn query_without_allowed_keys_is_dropped() {
        let uri: Uri = "/tags?username=ana".parse().unwrap();
        let allowed = fields(&["email"]);
        let out = filter_query(&uri, Some(allowed.as_slice())).unwrap();
        assert_eq!(out.query(), None);
        assert_eq!(out.path(), "/tags");
    }

    #[test]
    fn unrestricted_query_is_left_alone() {
        let uri: Uri = "/tags?username=ana".parse().unwrap();
        assert!(filter_query(&uri, None).is_none());
        assert!(filter_query(&uri, Some(&[][..])).is_none());
    }

    #[test]
    fn plus_is_literal_in_paths_but_a_space_in_query_keys() {
        assert_eq!(decode_path("/courses/C++"), "/courses/C++");
        assert_eq!(decode_path("/courses/C%2B%2B%20intro"), "/courses/C++ intro");
        assert_eq!(decode_query_key("sort+by"), "sort by");
    }

    #[test]
    fn json_body_is_filtered_and_length_updated() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(999usize));
        let allowed = fields(&["subject"]);
        let bytes = Bytes::from_static(br#"{"subject":"hi","from":"spoof@x.y"}"#);

        let _ = rewrite_body(&mut headers, bytes, Some(allowed.as_slice()));
        let expected = br#"{"subject":"hi"}"#.len();
        assert_eq!(declared_length(&headers), Some(expected));
    }

    #[test]
    fn unparseable_body_passes_through() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(9usize));
        let allowed = fields(&["a"]);

        let _ = rewrite_body(&mut headers, Bytes::from_static(b"not json!"), Some(allowed.as_slice()));
        assert_eq!(declared_length(&headers), Some(9));
    }

    #[test]
    fn json_content_types_are_recognized() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/problem+json"));
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn rule_store_errors_map_to_access_control_errors() {
        let id = aula_core::UserId::new();
        let err = AccessControlError::from(RuleStoreError::UnknownUser(id));
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

        let err = AccessControlError::RuleLookup("down".to_string());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
