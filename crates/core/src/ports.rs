//! Port interfaces for the engine's external collaborators
//!
//! Both ports are synchronous: the only suspension point of a drain pass
//! is the blocking transport call.

use odatalink_domain::{HttpResponse, RequestOptions, Result};

/// Trait for sending a rendered request over the wire
///
/// Implementations return `Ok` for any response the server produced,
/// including non-2xx statuses; the engine classifies those. `Err` is for
/// requests that never produced a response (connection, TLS, timeout).
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &RequestOptions) -> Result<HttpResponse>;
}

/// Trait for attaching credentials to an outgoing request
///
/// Implementations may perform their own network calls (token refresh);
/// that traffic is invisible to the query queue.
pub trait Authenticator: Send + Sync {
    fn sign(&self, request: &mut RequestOptions) -> Result<()>;
}

/// Authenticator that leaves requests untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuthentication;

impl Authenticator for NoAuthentication {
    fn sign(&self, _request: &mut RequestOptions) -> Result<()> {
        Ok(())
    }
}

impl<F> Authenticator for F
where
    F: Fn(&mut RequestOptions) -> Result<()> + Send + Sync,
{
    fn sign(&self, request: &mut RequestOptions) -> Result<()> {
        self(request)
    }
}
