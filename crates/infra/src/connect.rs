//! Wiring a ready `ClientContext` from configuration

use std::sync::Arc;

use odatalink_core::{Authenticator, ClientContext, ClientContextBuilder, NoAuthentication};
use odatalink_domain::{ClientConfig, Result};
use tracing::info;

use crate::auth::{AccessTokenProvider, BearerTokenAuthenticator};
use crate::http::HttpClient;

/// Validate `config` and build a context over the blocking HTTP client.
///
/// A configured `access_token` signs every request as a bearer token;
/// without one, requests go out unsigned.
pub fn connect(config: ClientConfig) -> Result<ClientContext> {
    let authenticator: Arc<dyn Authenticator> = match &config.access_token {
        Some(token) => Arc::new(BearerTokenAuthenticator::with_static_token(token.clone())),
        None => Arc::new(NoAuthentication),
    };
    build(config, authenticator)
}

/// Like [`connect`], taking tokens from `provider` instead of the config.
pub fn connect_with_provider(
    config: ClientConfig,
    provider: Arc<dyn AccessTokenProvider>,
) -> Result<ClientContext> {
    build(config, Arc::new(BearerTokenAuthenticator::new(provider)))
}

fn build(config: ClientConfig, authenticator: Arc<dyn Authenticator>) -> Result<ClientContext> {
    let config = config.validate()?;
    let transport = HttpClient::from_config(&config)?;
    info!(
        service_root = %config.service_root_url,
        dialect = %config.json_format.dialect,
        batch = config.batch_by_default,
        "connecting client context"
    );
    ClientContextBuilder::from_config(&config)
        .transport(Arc::new(transport))
        .authenticator(authenticator)
        .build()
}
