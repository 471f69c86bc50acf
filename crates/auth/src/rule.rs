//! Data-shape permission rules.
//!
//! A rule binds an HTTP verb and a route template to the fields a caller may
//! send in (`dataIn`) and receive back (`dataOut`). Rules are persisted as
//! JSON on role documents, so deserialization is lenient: an allow-list that
//! is missing, `null` or malformed means "unrestricted" for that category.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// HTTP verb a rule applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl core::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported http method '{0}'")]
pub struct UnsupportedMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Fields allowed into the handler, per request component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIn {
    #[serde(default, deserialize_with = "lenient_allow_list", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<String>>,

    /// Declared path parameter names. Doubles as the placeholder list used
    /// when matching parameterized routes.
    #[serde(default, deserialize_with = "lenient_allow_list", skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_allow_list", skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
}

/// Fields allowed back out to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataOut {
    #[serde(default, deserialize_with = "lenient_allow_list", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<String>>,
}

/// A permission entry belonging to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub method: HttpMethod,
    pub route: String,
    #[serde(default, alias = "data_in")]
    pub data_in: DataIn,
    #[serde(default, alias = "data_out")]
    pub data_out: DataOut,
}

impl Rule {
    pub fn new(method: HttpMethod, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            data_in: DataIn::default(),
            data_out: DataOut::default(),
        }
    }

    pub fn with_body_in<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_in.body = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_parameters<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_in.parameters = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_queries<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_in.queries = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_body_out<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_out.body = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn declared_parameters(&self) -> &[String] {
        self.data_in.parameters.as_deref().unwrap_or(&[])
    }
}

fn lenient_allow_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let items = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::warn!(value = %other, "ignoring malformed allow-list (expected an array)");
            return Ok(None);
        }
    };

    let mut fields = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(field) => fields.push(field),
            other => {
                tracing::warn!(value = %other, "ignoring malformed allow-list (non-string entry)");
                return Ok(None);
            }
        }
    }
    Ok(Some(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!(" Patch ".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn rule_deserializes_camel_case_document() {
        let rule: Rule = serde_json::from_value(json!({
            "method": "GET",
            "route": "/messages/:id",
            "dataIn": { "body": [], "parameters": ["id"], "queries": ["email"] },
            "dataOut": { "body": ["id", "subject"] }
        }))
        .unwrap();

        assert_eq!(rule.method, HttpMethod::Get);
        assert_eq!(rule.declared_parameters(), ["id".to_string()]);
        assert_eq!(rule.data_in.queries.as_deref(), Some(&["email".to_string()][..]));
        assert_eq!(
            rule.data_out.body,
            Some(vec!["id".to_string(), "subject".to_string()])
        );
    }

    #[test]
    fn rule_accepts_snake_case_sections() {
        let rule: Rule = serde_json::from_value(json!({
            "method": "put",
            "route": "/tags/id",
            "data_in": { "parameters": ["id"] },
            "data_out": { "body": ["statusCode"] }
        }))
        .unwrap();

        assert_eq!(rule.method, HttpMethod::Put);
        assert_eq!(rule.declared_parameters(), ["id".to_string()]);
        assert!(rule.data_out.body.is_some());
    }

    #[test]
    fn missing_sections_default_to_unrestricted() {
        let rule: Rule = serde_json::from_value(json!({ "method": "DELETE", "route": "/tags" })).unwrap();
        assert_eq!(rule.data_in, DataIn::default());
        assert_eq!(rule.data_out, DataOut::default());
    }

    #[test]
    fn malformed_allow_list_is_treated_as_absent() {
        let rule: Rule = serde_json::from_value(json!({
            "method": "POST",
            "route": "/messages",
            "dataIn": { "body": "subject", "queries": ["ok", 3] },
            "dataOut": { "body": null }
        }))
        .unwrap();

        assert_eq!(rule.data_in.body, None);
        assert_eq!(rule.data_in.queries, None);
        assert_eq!(rule.data_out.body, None);
    }

    #[test]
    fn serialization_keeps_document_shape() {
        let rule = Rule::new(HttpMethod::Get, "/courses").with_body_out(["title"]);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["dataOut"]["body"], json!(["title"]));
        assert!(json["dataIn"].as_object().unwrap().is_empty());
    }
}
