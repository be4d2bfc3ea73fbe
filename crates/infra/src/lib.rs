//! # ODataLink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The blocking `reqwest` transport with retry support
//! - Bearer-token authentication and token providers
//! - Configuration loading (env, `.env`, JSON, TOML)
//! - `connect`, which wires a `ClientContext` from configuration
//!
//! ## Architecture
//! - Implements traits defined in `odatalink-core`
//! - Depends on `odatalink-domain` and `odatalink-core`
//! - Contains all "impure" code (network, environment, files)

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;

mod connect;

// Re-export commonly used items
pub use auth::{
    AccessTokenProvider, BearerTokenAuthenticator, IssuedToken, RefreshingTokenProvider,
    StaticTokenProvider,
};
pub use connect::{connect, connect_with_provider};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
