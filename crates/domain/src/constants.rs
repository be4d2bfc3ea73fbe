//! Protocol constants
//!
//! Centralized location for wire-level names used by the engine and its
//! adapters.

// Query option names
pub const QUERY_FILTER: &str = "$filter";
pub const QUERY_ORDER_BY: &str = "$orderby";
pub const QUERY_SKIP: &str = "$skip";
pub const QUERY_TOP: &str = "$top";
pub const QUERY_SELECT: &str = "$select";
pub const QUERY_EXPAND: &str = "$expand";

// Batch wire format
pub const BATCH_SEGMENT: &str = "$batch";
pub const BATCH_BOUNDARY_PREFIX: &str = "batch_";
pub const MULTIPART_MIXED: &str = "multipart/mixed";
pub const APPLICATION_HTTP: &str = "application/http";
pub const TRANSFER_ENCODING_BINARY: &str = "binary";
pub const HTTP_VERSION: &str = "HTTP/1.1";

// Headers
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
pub const HEADER_HTTP_METHOD: &str = "X-HTTP-Method";

// JSON payload keys
pub const LIGHT_COLLECTION_KEY: &str = "value";
pub const LIGHT_NEXT_LINK_KEY: &str = "@odata.nextLink";
pub const LIGHT_CONTROL_PREFIX: &str = "@odata.";
pub const VERBOSE_ROOT_KEY: &str = "d";
pub const VERBOSE_COLLECTION_KEY: &str = "results";
pub const VERBOSE_NEXT_LINK_KEY: &str = "__next";
pub const VERBOSE_METADATA_KEY: &str = "__metadata";
pub const VERBOSE_DEFERRED_KEY: &str = "__deferred";

// Entity defaults
pub const DEFAULT_KEY_PROPERTY: &str = "id";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: usize = 1;
pub const DEFAULT_USER_AGENT: &str = concat!("odatalink/", env!("CARGO_PKG_VERSION"));
