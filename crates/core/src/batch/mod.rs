//! `$batch` multipart codec
//!
//! Requests are encoded as `multipart/mixed` with one `application/http`
//! part per query. Responses are correlated purely by position: the n-th
//! `application/http` part answers the n-th request.
//!
//! Part parsing is deliberately flat: a status line, header lines up to the
//! first blank line, then the body. Folded headers, chunked part bodies and
//! nested change sets are not understood.

use odatalink_domain::constants::{
    APPLICATION_HTTP, BATCH_BOUNDARY_PREFIX, BATCH_SEGMENT, HEADER_CONTENT_TRANSFER_ENCODING,
    HEADER_CONTENT_TYPE, HTTP_VERSION, MULTIPART_MIXED, TRANSFER_ENCODING_BINARY,
};
use odatalink_domain::{ClientError, HttpMethod, HttpResponse, RequestOptions, Result};
use uuid::Uuid;

const CRLF: &str = "\r\n";

/// One outgoing batch, identified by its boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    boundary: String,
}

impl Default for BatchRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRequest {
    /// Batch with a fresh `batch_<uuid>` boundary.
    pub fn new() -> Self {
        Self { boundary: format!("{BATCH_BOUNDARY_PREFIX}{}", Uuid::new_v4()) }
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self { boundary: boundary.into() }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("{MULTIPART_MIXED}; boundary={}", self.boundary)
    }

    /// Serialize `parts` in order as the multipart body.
    pub fn encode(&self, parts: &[RequestOptions]) -> String {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{}{CRLF}", self.boundary));
            body.push_str(&format!("{HEADER_CONTENT_TYPE}: {APPLICATION_HTTP}{CRLF}"));
            body.push_str(&format!(
                "{HEADER_CONTENT_TRANSFER_ENCODING}: {TRANSFER_ENCODING_BINARY}{CRLF}"
            ));
            body.push_str(CRLF);

            body.push_str(&format!("{} {} {HTTP_VERSION}{CRLF}", part.method, part.url));
            for (name, value) in &part.headers {
                body.push_str(&format!("{name}: {value}{CRLF}"));
            }
            body.push_str(CRLF);
            if let Some(payload) = &part.body {
                body.push_str(payload);
                body.push_str(CRLF);
            }
        }
        body.push_str(&format!("--{}--{CRLF}", self.boundary));
        body
    }

    /// `POST {service_root}$batch` carrying the encoded parts.
    pub fn build(&self, service_root: &str, parts: &[RequestOptions]) -> RequestOptions {
        let mut request =
            RequestOptions::new(HttpMethod::Post, format!("{service_root}{BATCH_SEGMENT}"));
        request.set_header(HEADER_CONTENT_TYPE, self.content_type());
        request.body = Some(self.encode(parts));
        request
    }

    /// Split a multipart response into its `application/http` parts, in order.
    pub fn decode_response(response: &HttpResponse) -> Result<Vec<HttpResponse>> {
        let content_type = response
            .header(HEADER_CONTENT_TYPE)
            .ok_or_else(|| ClientError::decode("batch response has no Content-Type"))?;
        let boundary = parse_boundary(content_type).ok_or_else(|| {
            ClientError::decode(format!("batch response has no boundary: {content_type}"))
        })?;
        decode_parts(&response.body, &boundary)
    }
}

fn parse_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').map(str::trim).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|boundary| !boundary.is_empty())
    })
}

/// Parse a multipart body delimited by `boundary`.
pub fn decode_parts(body: &str, boundary: &str) -> Result<Vec<HttpResponse>> {
    let body = body.replace(CRLF, "\n");
    let delimiter = format!("--{boundary}");
    let mut responses = Vec::new();

    for chunk in body.split(delimiter.as_str()).skip(1) {
        if chunk.starts_with("--") {
            break;
        }
        let chunk = chunk.trim_start_matches('\n');
        let (headers, payload) = chunk.split_once("\n\n").unwrap_or((chunk, ""));
        let is_http = headers.lines().any(|line| {
            line.split_once(':').is_some_and(|(name, value)| {
                name.trim().eq_ignore_ascii_case(HEADER_CONTENT_TYPE)
                    && value.trim().to_ascii_lowercase().starts_with(APPLICATION_HTTP)
            })
        });
        if is_http {
            responses.push(parse_part(payload)?);
        }
    }
    Ok(responses)
}

fn parse_part(payload: &str) -> Result<HttpResponse> {
    let payload = payload.trim_start_matches('\n');
    let (head, body) = payload.split_once("\n\n").unwrap_or((payload, ""));
    let mut lines = head.lines();

    let status_line = lines
        .next()
        .ok_or_else(|| ClientError::decode("batch part has no status line"))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ClientError::decode(format!("invalid batch part status line: {status_line}")))?;

    let mut response = HttpResponse::new(status, body.trim_end_matches('\n'));
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            response.headers.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(response)
}
