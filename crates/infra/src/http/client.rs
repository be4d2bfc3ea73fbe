use std::thread;
use std::time::Duration;

use odatalink_core::HttpTransport;
use odatalink_domain::{ClientConfig, ClientError, HttpResponse, RequestOptions, Result};
use reqwest::blocking::{Client as ReqwestClient, RequestBuilder, Response};
use reqwest::Method;
use tracing::{debug, instrument};

use crate::errors::InfraError;

/// Blocking HTTP transport with built-in retry and timeout support.
///
/// Non-2xx responses are returned as `Ok`; the engine decides what they
/// mean. Only 5xx statuses and network failures are retried.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Client honouring the timeout, attempts and user agent of `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .user_agent(config.user_agent.clone())
            .build()
    }

    fn prepare(&self, request: &RequestOptions) -> Result<RequestBuilder> {
        let method = Method::from_bytes(request.method.as_str().as_bytes()).map_err(|err| {
            ClientError::invalid_input(format!("invalid HTTP method {}: {err}", request.method))
        })?;
        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

impl HttpTransport for HttpClient {
    /// Execute the request with retry semantics.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    fn send(&self, request: &RequestOptions) -> Result<HttpResponse> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let built = self.prepare(request)?.build().map_err(|err| {
                let infra: InfraError = err.into();
                ClientError::from(infra)
            })?;

            debug!(attempt = attempt + 1, "sending HTTP request");

            match self.client.execute(built) {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1);
                        continue;
                    }

                    return read_response(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1);
                        continue;
                    }

                    let infra: InfraError = err.into();
                    return Err(ClientError::from(infra));
                }
            }
        }

        Err(ClientError::internal("http client exhausted retries without producing a result"))
    }
}

fn read_response(response: Response) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.text().map_err(|err| {
        let infra: InfraError = err.into();
        ClientError::from(infra)
    })?;
    Ok(HttpResponse { status, headers, body })
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 1,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            ClientError::from(infra)
        })?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use odatalink_domain::HttpMethod;
    use tokio::runtime::Runtime;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_with_defaults() -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(10))
            .max_attempts(3)
            .build()
            .expect("http client")
    }

    fn start_server(runtime: &Runtime) -> MockServer {
        runtime.block_on(MockServer::start())
    }

    #[test]
    fn forwards_method_headers_and_body() {
        let runtime = Runtime::new().unwrap();
        let server = start_server(&runtime);
        runtime.block_on(
            Mock::given(method("PATCH"))
                .and(path("/users/7"))
                .and(header("content-type", "application/json"))
                .and(body_string(r#"{"displayName":"Ada"}"#))
                .respond_with(
                    ResponseTemplate::new(204).insert_header("request-id", "abc"),
                )
                .expect(1)
                .mount(&server),
        );

        let request = RequestOptions::json(
            HttpMethod::Patch,
            format!("{}/users/7", server.uri()),
            &serde_json::json!({"displayName": "Ada"}),
        );
        let response = client_with_defaults().send(&request).expect("response");

        assert_eq!(response.status, 204);
        assert_eq!(response.header("Request-Id"), Some("abc"));
        assert!(response.body.is_empty());
    }

    #[test]
    fn extension_methods_are_sent_verbatim() {
        let runtime = Runtime::new().unwrap();
        let server = start_server(&runtime);
        runtime.block_on(
            Mock::given(method("MERGE"))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server),
        );

        let request = RequestOptions::new(HttpMethod::Merge, server.uri());
        let response = client_with_defaults().send(&request).expect("response");
        assert_eq!(response.status, 204);
    }

    #[test]
    fn retries_server_errors_until_success() {
        let runtime = Runtime::new().unwrap();
        let server = start_server(&runtime);
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        runtime.block_on(
            Mock::given(method("GET"))
                .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                    let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
                    if current < 2 {
                        ResponseTemplate::new(500)
                    } else {
                        ResponseTemplate::new(200).set_body_string(r#"{"value":[]}"#)
                    }
                })
                .expect(3)
                .mount(&server),
        );

        let request = RequestOptions::new(HttpMethod::Get, server.uri());
        let response = client_with_defaults().send(&request).expect("response");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"value":[]}"#);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn does_not_retry_client_errors() {
        let runtime = Runtime::new().unwrap();
        let server = start_server(&runtime);
        runtime.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
                .expect(1)
                .mount(&server),
        );

        let request = RequestOptions::new(HttpMethod::Get, server.uri());
        let response = client_with_defaults().send(&request).expect("response");

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "missing");
        let requests = runtime.block_on(server.received_requests()).unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn network_failure_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        let url = format!("http://{}", addr);

        let client = HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("http client");

        let result = client.send(&RequestOptions::new(HttpMethod::Get, url));
        match result {
            Err(ClientError::Transport { status: None, body, .. }) => {
                assert!(body.to_lowercase().contains("http"));
            }
            other => panic!("expected network error, got {:?}", other),
        }
    }
}
