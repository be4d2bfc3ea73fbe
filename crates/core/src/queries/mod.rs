//! Deferred queries
//!
//! A query records one intended operation against a binding target. The
//! context renders it into a request (`build`), sends it, and hands the
//! response back for mapping onto the proxy graph (`process`).

mod build;
mod process;

use std::fmt;

use odatalink_domain::{
    impl_domain_status_conversions, CollectionId, EntityId, HttpMethod, ObjectRef, QueryId,
    Result, ResultId, Value,
};
use serde_json::Value as Json;
use tracing::debug;

use crate::context::ClientContext;

/// Lifecycle of a query inside one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryState {
    #[default]
    Queued,
    Built,
    Sent,
    Completed,
    Failed,
}

impl_domain_status_conversions!(QueryState {
    Queued => "queued",
    Built => "built",
    Sent => "sent",
    Completed => "completed",
    Failed => "failed",
});

/// Where a query's response lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTarget {
    Object(ObjectRef),
    Result(ResultId),
}

impl From<ObjectRef> for ReturnTarget {
    fn from(target: ObjectRef) -> Self {
        Self::Object(target)
    }
}

impl From<EntityId> for ReturnTarget {
    fn from(target: EntityId) -> Self {
        Self::Object(ObjectRef::Entity(target))
    }
}

impl From<CollectionId> for ReturnTarget {
    fn from(target: CollectionId) -> Self {
        Self::Object(ObjectRef::Collection(target))
    }
}

impl From<ResultId> for ReturnTarget {
    fn from(target: ResultId) -> Self {
        Self::Result(target)
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePayload {
    /// The return target's own property bag.
    Target,
    /// An explicit payload, independent of the proxy's bag.
    Json(Json),
}

/// A named service operation (action or function).
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOperation {
    pub name: String,
    /// Rendered into the URL as `name(args)`; `None` leaves the bare name.
    pub url_params: Option<Vec<Value>>,
    pub body: Option<Json>,
    /// Wraps the body as `{payload_key: body}`.
    pub payload_key: Option<String>,
    pub method: HttpMethod,
}

impl ServiceOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_params: None,
            body: None,
            payload_key: None,
            method: HttpMethod::Post,
        }
    }

    /// Function call: `GET name(args)`.
    pub fn function(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::new(name).with_params(args).with_method(HttpMethod::Get)
    }

    #[must_use]
    pub fn with_params(mut self, args: Vec<Value>) -> Self {
        self.url_params = Some(args);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Json) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_payload_key(mut self, key: impl Into<String>) -> Self {
        self.payload_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Read {
        select: Vec<String>,
        expand: Vec<String>,
        /// Continuation link; used verbatim instead of the binding path.
        next_url: Option<String>,
        /// Queue the next page after this one is mapped.
        follow_next: bool,
    },
    Create(CreatePayload),
    Update,
    Delete,
    ServiceOperation(ServiceOperation),
}

impl QueryKind {
    pub fn read() -> Self {
        Self::Read { select: Vec::new(), expand: Vec::new(), next_url: None, follow_next: false }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Create(_) => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ServiceOperation(_) => "service_operation",
        }
    }
}

/// Callback run after a query's response was mapped. It may queue
/// follow-up queries; those run in a later drain pass of the same call.
pub type Completion = Box<dyn FnOnce(&mut ClientContext) -> Result<()> + Send>;

pub struct ClientQuery {
    id: QueryId,
    binding: ObjectRef,
    return_target: Option<ReturnTarget>,
    is_static: bool,
    kind: QueryKind,
    state: QueryState,
    on_completed: Option<Completion>,
    scratch: Option<CollectionId>,
}

impl ClientQuery {
    /// The id is assigned when the query is added to a context.
    pub fn new(binding: impl Into<ObjectRef>, kind: QueryKind) -> Self {
        Self {
            id: QueryId::default(),
            binding: binding.into(),
            return_target: None,
            is_static: false,
            kind,
            state: QueryState::Queued,
            on_completed: None,
            scratch: None,
        }
    }

    pub fn read(binding: impl Into<ObjectRef>) -> Self {
        Self::new(binding, QueryKind::read())
    }

    #[must_use]
    pub fn with_return_target(mut self, target: impl Into<ReturnTarget>) -> Self {
        self.return_target = Some(target.into());
        self
    }

    /// Address a service operation by type name instead of the binding path.
    #[must_use]
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn on_completed<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut ClientContext) -> Result<()> + Send + 'static,
    {
        self.on_completed = Some(Box::new(callback));
        self
    }

    /// Collection used only while this query runs; the context releases it
    /// once the query completes, fails, or is discarded.
    #[must_use]
    pub fn with_scratch(mut self, collection: CollectionId) -> Self {
        self.scratch = Some(collection);
        self
    }

    pub fn scratch(&self) -> Option<CollectionId> {
        self.scratch
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: QueryId) {
        self.id = id;
    }

    pub fn binding(&self) -> ObjectRef {
        self.binding
    }

    pub fn return_target(&self) -> Option<ReturnTarget> {
        self.return_target
    }

    /// Return target, defaulting to the binding object.
    pub fn target(&self) -> ReturnTarget {
        self.return_target.unwrap_or(ReturnTarget::Object(self.binding))
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub(crate) fn transition(&mut self, next: QueryState) {
        debug!(query = %self.id, kind = self.kind.name(), from = %self.state, to = %next, "query state");
        self.state = next;
    }

    pub(crate) fn take_completion(&mut self) -> Option<Completion> {
        self.on_completed.take()
    }
}

impl fmt::Debug for ClientQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientQuery")
            .field("id", &self.id)
            .field("binding", &self.binding)
            .field("return_target", &self.return_target)
            .field("is_static", &self.is_static)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("on_completed", &self.on_completed.is_some())
            .field("scratch", &self.scratch)
            .finish()
    }
}
