//! # ODataLink Core
//!
//! The deferred query engine - no network code.
//!
//! This crate contains:
//! - `ResourcePath`, the immutable address of a remote resource
//! - The client object arena: entity proxies, collections, result holders
//! - The per-entity-kind table (key binding and navigation rules)
//! - Query variants and their request rendering / response mapping
//! - `ClientContext`, the pending request queue with hooks and drain loop
//! - The `$batch` multipart codec
//!
//! ## Architecture Principles
//! - Only depends on `odatalink-domain`
//! - Transport and authentication are ports (`HttpTransport`,
//!   `Authenticator`) implemented by `odatalink-infra`
//! - Single-threaded and strictly ordered per context

pub mod batch;
pub mod context;
pub mod objects;
pub mod paths;
pub mod ports;
pub mod queries;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use batch::BatchRequest;
pub use context::{
    http_method_override, ClientContext, ClientContextBuilder, ExecutionSummary, HookId, HookScope,
};
pub use objects::{
    ArenaStats, ClientObject, ClientResult, EntityCollection, EntityKind, EntityKindBuilder,
    JsonScope, KeyBinding, KeyBindingInput, KindRef, Navigation, NavigationTarget,
};
pub use paths::{KeyStyle, PathSegment, ResourcePath};
pub use ports::{Authenticator, HttpTransport, NoAuthentication};
pub use queries::{
    ClientQuery, CreatePayload, QueryKind, QueryState, ReturnTarget, ServiceOperation,
};
