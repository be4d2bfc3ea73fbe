//! Domain types and models

pub mod format;
pub mod handles;
pub mod http;
pub mod query_options;
pub mod value;

pub use format::{JsonDialect, JsonFormat, PropertyCasing};
pub use handles::{CollectionId, EntityId, ObjectRef, QueryId, ResultId};
pub use http::{HttpMethod, HttpResponse, RequestOptions};
pub use query_options::QueryOptions;
pub use value::{Value, ValueObject};
