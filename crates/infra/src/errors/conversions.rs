//! Conversions from external infrastructure errors into domain errors.

use odatalink_domain::ClientError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ClientError);

impl From<InfraError> for ClientError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ClientError> for InfraError {
    fn from(value: ClientError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoClientError {
    fn into_client_error(self) -> ClientError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ClientError */
/* -------------------------------------------------------------------------- */

impl IntoClientError for HttpError {
    fn into_client_error(self) -> ClientError {
        let url = self.url().map(ToString::to_string).unwrap_or_default();

        if let Some(status) = self.status() {
            let code = status.as_u16();
            return match code {
                401 | 403 => ClientError::auth(format!("{url} rejected credentials ({code})")),
                _ => ClientError::transport(Some(code), url, self.to_string()),
            };
        }
        if self.is_builder() {
            return ClientError::invalid_input(format!("invalid HTTP request: {self}"));
        }
        if self.is_decode() || self.is_body() {
            return ClientError::decode(format!("failed to read HTTP response body: {self}"));
        }

        let reason = if self.is_timeout() {
            "request timed out"
        } else if self.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        ClientError::transport(None, url, format!("http {reason}: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_client_error())
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use super::*;

    fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/")
    }

    #[test]
    fn connection_failures_become_transport_without_status() {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .no_proxy()
            .build()
            .unwrap();
        let url = refused_url();
        let err = client.get(&url).send().unwrap_err();

        let converted: ClientError = InfraError::from(err).into();
        match converted {
            ClientError::Transport { status, url: reported, body } => {
                assert_eq!(status, None);
                assert_eq!(reported, url);
                assert!(body.starts_with("http "));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_urls_are_invalid_input() {
        let client = reqwest::blocking::Client::new();
        let err = client.get("not a url").send().unwrap_err();

        let converted: ClientError = InfraError::from(err).into();
        assert!(matches!(converted, ClientError::InvalidInput { .. }));
    }

    #[test]
    fn domain_errors_round_trip_through_newtype() {
        let original = ClientError::config("missing root");
        let wrapped = InfraError::from(original.clone());
        assert_eq!(ClientError::from(wrapped), original);
    }
}
