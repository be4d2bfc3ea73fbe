//! HTTP wire types shared by the engine and its transports

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{HEADER_ACCEPT, HEADER_CONTENT_TYPE};
use crate::errors::{ClientError, Result};

/// HTTP verbs used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Merge,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Merge => "MERGE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "MERGE" => Ok(Self::Merge),
            "DELETE" => Ok(Self::Delete),
            other => Err(ClientError::invalid_input(format!("unsupported HTTP method: {other}"))),
        }
    }
}

/// A fully rendered HTTP request.
///
/// Headers keep insertion order so batch parts serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: IndexMap::new(), body: None }
    }

    /// Request carrying a JSON body with matching content headers.
    pub fn json(method: HttpMethod, url: impl Into<String>, body: &serde_json::Value) -> Self {
        let mut request = Self::new(method, url);
        request.set_header(HEADER_CONTENT_TYPE, "application/json");
        request.body = Some(body.to_string());
        request
    }

    /// Look up a header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a header, ignoring ASCII case of existing names.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(existing) =
            self.headers.keys().find(|k| k.eq_ignore_ascii_case(&name)).cloned()
        {
            self.headers.insert(existing, value.into());
        } else {
            self.headers.insert(name, value.into());
        }
    }

    /// Insert a header only when it is not present yet.
    pub fn ensure_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if self.header(&name).is_none() {
            self.headers.insert(name, value.into());
        }
    }

    pub fn accept_json(&mut self, accept: &str) {
        self.ensure_header(HEADER_ACCEPT, accept);
    }
}

/// A received HTTP response, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: IndexMap::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON; an empty body is `None`.
    pub fn json(&self) -> Result<Option<serde_json::Value>> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|e| ClientError::decode(format!("invalid JSON response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_any_case() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!("DELETE".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut request = RequestOptions::new(HttpMethod::Get, "https://host/users");
        request.set_header("content-type", "text/plain");
        request.set_header("Content-Type", "application/json");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn ensure_header_keeps_existing_value() {
        let mut request = RequestOptions::new(HttpMethod::Get, "https://host/users");
        request.set_header("Accept", "application/xml");
        request.ensure_header("accept", "application/json");
        assert_eq!(request.header("Accept"), Some("application/xml"));
    }

    #[test]
    fn empty_body_is_not_json() {
        assert_eq!(HttpResponse::new(204, "").json().unwrap(), None);
        assert!(HttpResponse::new(200, "{not json").json().is_err());
    }
}
