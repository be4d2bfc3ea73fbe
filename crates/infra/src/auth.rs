//! Bearer-token authentication
//!
//! Signs outgoing requests with `Authorization: Bearer <token>`. Tokens come
//! from an [`AccessTokenProvider`]; the refreshing provider caches a token
//! until shortly before it expires.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use odatalink_core::Authenticator;
use odatalink_domain::constants::HEADER_AUTHORIZATION;
use odatalink_domain::{ClientError, RequestOptions, Result};
use tracing::debug;

/// Default margin before expiry at which a cached token is refreshed.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid access token, refreshing it if needed.
    fn access_token(&self) -> Result<String>;
}

/// Provider returning one fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl AccessTokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(ClientError::auth("access token is empty"));
        }
        Ok(self.token.clone())
    }
}

/// Token as issued by an authorization server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Duration,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

type FetchToken = dyn Fn() -> Result<IssuedToken> + Send + Sync;

/// Provider that calls `fetch` for a new token whenever the cached one is
/// missing or within the refresh margin of its expiry.
pub struct RefreshingTokenProvider {
    fetch: Box<FetchToken>,
    refresh_margin: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingTokenProvider {
    pub fn new<F>(fetch: F) -> Self
    where
        F: Fn() -> Result<IssuedToken> + Send + Sync + 'static,
    {
        Self { fetch: Box::new(fetch), refresh_margin: DEFAULT_REFRESH_MARGIN, cached: Mutex::new(None) }
    }

    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Drop the cached token so the next request fetches a fresh one.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
    }
}

impl AccessTokenProvider for RefreshingTokenProvider {
    fn access_token(&self) -> Result<String> {
        let mut cached =
            self.cached.lock().map_err(|_| ClientError::internal("token cache lock poisoned"))?;
        let now = Instant::now();
        if let Some(current) = cached.as_ref().filter(|current| now < current.refresh_at) {
            return Ok(current.token.clone());
        }

        debug!("refreshing access token");
        let issued = (self.fetch)()?;
        if issued.access_token.trim().is_empty() {
            return Err(ClientError::auth("token endpoint returned an empty access token"));
        }
        let lifetime = issued.expires_in.saturating_sub(self.refresh_margin);
        *cached = Some(CachedToken { token: issued.access_token.clone(), refresh_at: now + lifetime });
        Ok(issued.access_token)
    }
}

/// Authenticator adding `Authorization: Bearer <token>` to every request.
#[derive(Clone)]
pub struct BearerTokenAuthenticator {
    provider: Arc<dyn AccessTokenProvider>,
}

impl BearerTokenAuthenticator {
    pub fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self { provider }
    }

    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticTokenProvider::new(token)))
    }
}

impl Authenticator for BearerTokenAuthenticator {
    fn sign(&self, request: &mut RequestOptions) -> Result<()> {
        let token = self.provider.access_token()?;
        request.set_header(HEADER_AUTHORIZATION, format!("Bearer {token}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use odatalink_domain::HttpMethod;

    use super::*;

    #[test]
    fn bearer_header_is_added() {
        let auth = BearerTokenAuthenticator::with_static_token("abc");
        let mut request = RequestOptions::new(HttpMethod::Get, "https://host/me");
        auth.sign(&mut request).unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer abc"));
    }

    #[test]
    fn empty_static_token_is_an_auth_error() {
        let auth = BearerTokenAuthenticator::with_static_token("  ");
        let mut request = RequestOptions::new(HttpMethod::Get, "https://host/me");
        assert!(matches!(auth.sign(&mut request), Err(ClientError::Auth { .. })));
        assert!(request.header("authorization").is_none());
    }

    #[test]
    fn refreshing_provider_caches_until_margin() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = RefreshingTokenProvider::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(IssuedToken { access_token: format!("token-{n}"), expires_in: Duration::from_secs(3600) })
        });

        assert_eq!(provider.access_token().unwrap(), "token-0");
        assert_eq!(provider.access_token().unwrap(), "token-0");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        provider.invalidate();
        assert_eq!(provider.access_token().unwrap(), "token-1");
    }

    #[test]
    fn short_lived_tokens_are_refreshed_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = RefreshingTokenProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(IssuedToken { access_token: "t".into(), expires_in: Duration::from_secs(60) })
        });

        provider.access_token().unwrap();
        provider.access_token().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fetch_errors_propagate() {
        let provider =
            RefreshingTokenProvider::new(|| Err(ClientError::auth("invalid_client")))
                .with_refresh_margin(Duration::ZERO);
        assert!(matches!(provider.access_token(), Err(ClientError::Auth { .. })));
    }
}
