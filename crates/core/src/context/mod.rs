//! Runtime context: object arena, pending request queue, hooks, drain loop
//!
//! A `ClientContext` is one logical session against one service root. It
//! owns every proxy it hands out (callers hold `Copy` handles), queues
//! deferred queries in submission order and resolves them on `execute_*`,
//! either one request per query or coalesced into one `$batch` request.

mod collection_ops;
mod entity_ops;
mod hooks;
mod mapping;
mod pending;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use odatalink_domain::{
    normalize_service_root, ClientConfig, ClientError, CollectionId, EntityId, HttpResponse,
    JsonFormat, ObjectRef, QueryId, RequestOptions, Result, ResultId,
};
use tracing::{info, instrument, warn};
use url::Url;

pub use hooks::{http_method_override, HookId, HookScope};
use hooks::HookRegistry;
use pending::PendingRequest;

use crate::batch::BatchRequest;
use crate::objects::{ArenaStats, EntityCollection, ObjectStore};
use crate::ports::{Authenticator, HttpTransport, NoAuthentication};
use crate::queries::{ClientQuery, QueryState};

type PageLoaded = Box<dyn FnMut(&EntityCollection) + Send>;

/// Counters for one `execute_*` call, across all of its drain passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub requests_sent: usize,
    pub queries_completed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainMode {
    Sequential,
    Batch,
}

pub struct ClientContext {
    service_root: String,
    transport: Arc<dyn HttpTransport>,
    authenticator: Arc<dyn Authenticator>,
    json_format: JsonFormat,
    batch_by_default: bool,
    store: ObjectStore,
    pending: PendingRequest,
    hooks: HookRegistry,
    page_listeners: HashMap<CollectionId, Vec<PageLoaded>>,
    draining: bool,
}

/// Builder for [`ClientContext`].
pub struct ClientContextBuilder {
    service_root: String,
    transport: Option<Arc<dyn HttpTransport>>,
    authenticator: Arc<dyn Authenticator>,
    json_format: JsonFormat,
    batch_by_default: bool,
}

impl ClientContextBuilder {
    pub fn new(service_root: impl Into<String>) -> Self {
        Self {
            service_root: service_root.into(),
            transport: None,
            authenticator: Arc::new(NoAuthentication),
            json_format: JsonFormat::default(),
            batch_by_default: false,
        }
    }

    /// Start from a validated configuration (format and batch default).
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.service_root_url.clone())
            .json_format(config.json_format)
            .batch_by_default(config.batch_by_default)
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    pub fn batch_by_default(mut self, enabled: bool) -> Self {
        self.batch_by_default = enabled;
        self
    }

    pub fn build(self) -> Result<ClientContext> {
        let root = self.service_root.trim();
        let parsed = Url::parse(root)
            .map_err(|e| ClientError::config(format!("invalid service root URL '{root}': {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::config(format!("service root URL is not a base URL: {root}")));
        }
        let transport = self
            .transport
            .ok_or_else(|| ClientError::config("no HTTP transport configured"))?;

        Ok(ClientContext {
            service_root: normalize_service_root(root),
            transport,
            authenticator: self.authenticator,
            json_format: self.json_format,
            batch_by_default: self.batch_by_default,
            store: ObjectStore::default(),
            pending: PendingRequest::default(),
            hooks: HookRegistry::default(),
            page_listeners: HashMap::new(),
            draining: false,
        })
    }
}

impl ClientContext {
    pub fn builder(service_root: impl Into<String>) -> ClientContextBuilder {
        ClientContextBuilder::new(service_root)
    }

    pub fn new(
        service_root: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        Self::builder(service_root).transport(transport).authenticator(authenticator).build()
    }

    #[must_use]
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Service root, always ending with `/`.
    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    pub fn json_format(&self) -> &JsonFormat {
        &self.json_format
    }

    // --- queue ---

    /// Enqueue a query; nothing touches the network until `execute_*`.
    pub fn add_query(&mut self, query: ClientQuery) -> QueryId {
        self.pending.add(query)
    }

    pub fn has_pending_request(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending query without sending it.
    pub fn clear_queries(&mut self) {
        for query in self.pending.take_all() {
            self.retire(&query);
        }
    }

    // --- arena ---

    pub fn arena_stats(&self) -> ArenaStats {
        self.store.stats()
    }

    /// Free an entity, unlink it from its parent collection and free the
    /// navigation children it owns. Released handles fail with `Addressing`.
    pub fn release_entity(&mut self, id: EntityId) -> Result<()> {
        self.store.entity(id)?;
        self.release(ObjectRef::Entity(id));
        Ok(())
    }

    /// Free a collection and the items whose back-link points at it.
    pub fn release_collection(&mut self, id: CollectionId) -> Result<()> {
        self.store.collection(id)?;
        self.release(ObjectRef::Collection(id));
        Ok(())
    }

    pub fn release_result(&mut self, id: ResultId) -> Result<()> {
        self.store
            .remove_result(id)
            .map(drop)
            .ok_or_else(|| ClientError::addressing(format!("unknown result handle {id}")))
    }

    pub(crate) fn release(&mut self, target: ObjectRef) {
        let mut stack = vec![target];
        while let Some(target) = stack.pop() {
            match target {
                ObjectRef::Entity(id) => {
                    let Some(entity) = self.store.remove_entity(id) else {
                        continue;
                    };
                    if let Some(parent) = entity.parent_collection() {
                        if let Ok(collection) = self.store.collection_mut(parent) {
                            collection.remove(id);
                        }
                    }
                    stack.extend(entity.navigation_children());
                }
                ObjectRef::Collection(id) => {
                    let Some(collection) = self.store.remove_collection(id) else {
                        continue;
                    };
                    self.page_listeners.remove(&id);
                    for item in collection.items() {
                        let owned = self
                            .store
                            .entity(*item)
                            .is_ok_and(|entity| entity.parent_collection() == Some(id));
                        if owned {
                            stack.push(ObjectRef::Entity(*item));
                        }
                    }
                }
            }
        }
    }

    /// Free what a finished or discarded query kept only for itself.
    fn retire(&mut self, query: &ClientQuery) {
        if let Some(scratch) = query.scratch() {
            self.release(ObjectRef::Collection(scratch));
        }
    }

    // --- hooks ---

    /// Hook run on every rendered request before it is signed and sent.
    pub fn before_execute<F>(&mut self, action: F, once: bool) -> HookId
    where
        F: FnMut(&mut RequestOptions) + Send + 'static,
    {
        self.hooks.add_before(HookScope::All, once, Box::new(action))
    }

    /// Hook run on every raw response, before it is mapped.
    pub fn after_execute<F>(&mut self, action: F, once: bool) -> HookId
    where
        F: FnMut(&HttpResponse) + Send + 'static,
    {
        self.hooks.add_after(HookScope::All, once, Box::new(action))
    }

    /// Request hook for a single query, e.g. a method override.
    pub fn before_query<F>(&mut self, query: QueryId, action: F) -> HookId
    where
        F: FnMut(&mut RequestOptions) + Send + 'static,
    {
        self.hooks.add_before(HookScope::Query(query), true, Box::new(action))
    }

    pub fn after_query<F>(&mut self, query: QueryId, action: F) -> HookId
    where
        F: FnMut(&HttpResponse) + Send + 'static,
    {
        self.hooks.add_after(HookScope::Query(query), true, Box::new(action))
    }

    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }

    // --- execution ---

    /// Drain using the configured default mode.
    pub fn execute(&mut self) -> Result<ExecutionSummary> {
        if self.batch_by_default {
            self.execute_batch()
        } else {
            self.execute_query()
        }
    }

    /// Drain one request per query, each resolved before the next is built.
    #[instrument(skip(self), fields(pending = self.pending.len()))]
    pub fn execute_query(&mut self) -> Result<ExecutionSummary> {
        self.drain(DrainMode::Sequential)
    }

    /// Drain each pass as one `$batch` request.
    #[instrument(skip(self), fields(pending = self.pending.len()))]
    pub fn execute_batch(&mut self) -> Result<ExecutionSummary> {
        self.drain(DrainMode::Batch)
    }

    /// Sign and send a request outside the queue. Non-2xx is an error.
    pub fn execute_request_direct(&self, mut request: RequestOptions) -> Result<HttpResponse> {
        self.authenticator.sign(&mut request)?;
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(ClientError::transport(Some(response.status), request.url, response.body));
        }
        Ok(response)
    }

    fn drain(&mut self, mode: DrainMode) -> Result<ExecutionSummary> {
        if self.draining {
            return Err(ClientError::internal("execute called while the queue is draining"));
        }
        self.draining = true;
        let result = self.drain_passes(mode);
        self.draining = false;
        result
    }

    fn drain_passes(&mut self, mode: DrainMode) -> Result<ExecutionSummary> {
        let mut summary = ExecutionSummary::default();
        let mut pass = 0_usize;
        while !self.pending.is_empty() {
            pass += 1;
            let queries = self.pending.take_all();
            let size = queries.len();
            let outcome = match mode {
                DrainMode::Sequential => self.run_sequential(queries, &mut summary),
                DrainMode::Batch => self.run_batch(queries, &mut summary),
            };
            info!(
                pass,
                queries = size,
                requests_sent = summary.requests_sent,
                queries_completed = summary.queries_completed,
                hooks = self.hooks.len(),
                "drain pass finished"
            );
            outcome?;
        }
        Ok(summary)
    }

    fn run_sequential(
        &mut self,
        queries: Vec<ClientQuery>,
        summary: &mut ExecutionSummary,
    ) -> Result<()> {
        let mut queries = queries.into_iter();
        while let Some(mut query) = queries.next() {
            let outcome = self.run_single(&mut query, summary);
            self.retire(&query);
            if let Err(err) = outcome {
                query.transition(QueryState::Failed);
                let discarded: Vec<_> = queries.collect();
                if !discarded.is_empty() {
                    warn!(
                        query = %query.id(),
                        discarded = discarded.len(),
                        error = %err,
                        "aborting drain pass"
                    );
                }
                for query in &discarded {
                    self.retire(query);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn run_single(&mut self, query: &mut ClientQuery, summary: &mut ExecutionSummary) -> Result<()> {
        let mut request = query.build_request(self)?;
        query.transition(QueryState::Built);

        self.hooks.run_before(query.id(), &mut request);
        self.authenticator.sign(&mut request)?;
        let response = self.transport.send(&request)?;
        summary.requests_sent += 1;
        query.transition(QueryState::Sent);

        self.hooks.run_after(query.id(), &response);
        if !response.is_success() {
            return Err(ClientError::transport(Some(response.status), request.url, response.body));
        }
        self.complete(query, &response)?;
        summary.queries_completed += 1;
        Ok(())
    }

    fn run_batch(
        &mut self,
        mut queries: Vec<ClientQuery>,
        summary: &mut ExecutionSummary,
    ) -> Result<()> {
        let outcome = self.send_batch(&mut queries, summary);
        for query in &queries {
            self.retire(query);
        }
        outcome
    }

    fn send_batch(
        &mut self,
        queries: &mut [ClientQuery],
        summary: &mut ExecutionSummary,
    ) -> Result<()> {
        let total = queries.len();
        let mut parts = Vec::with_capacity(total);
        let mut unbuilt = None;
        for query in queries.iter_mut() {
            match query.build_request(self) {
                Ok(mut request) => {
                    query.transition(QueryState::Built);
                    self.hooks.run_before(query.id(), &mut request);
                    parts.push(request);
                }
                Err(err) => {
                    warn!(query = %query.id(), discarded = total, error = %err, "batch not sent");
                    unbuilt = Some(err);
                    break;
                }
            }
        }
        if let Some(err) = unbuilt {
            fail_all(queries);
            return Err(err);
        }

        let batch = BatchRequest::new();
        let mut request = batch.build(&self.service_root, &parts);
        let sent = self
            .authenticator
            .sign(&mut request)
            .and_then(|()| self.transport.send(&request));
        let response = match sent {
            Ok(response) => response,
            Err(err) => {
                fail_all(queries);
                warn!(discarded = total, error = %err, "batch not sent");
                return Err(err);
            }
        };
        summary.requests_sent += 1;
        for query in queries.iter_mut() {
            query.transition(QueryState::Sent);
        }

        if !response.is_success() {
            fail_all(queries);
            warn!(status = response.status, parts = total, "batch request failed");
            return Err(ClientError::transport(Some(response.status), request.url, response.body));
        }
        let responses = match BatchRequest::decode_response(&response) {
            Ok(responses) => responses,
            Err(err) => {
                fail_all(queries);
                warn!(parts = total, error = %err, "batch response not decoded");
                return Err(err);
            }
        };
        if responses.len() != total {
            fail_all(queries);
            warn!(received = responses.len(), parts = total, "batch response part count mismatch");
            return Err(ClientError::decode(format!(
                "batch response has {} parts, expected {total}",
                responses.len()
            )));
        }

        let mut first_failure = None;
        for ((query, part), sent) in queries.iter_mut().zip(responses).zip(&parts) {
            self.hooks.run_after(query.id(), &part);
            let outcome = if part.is_success() {
                self.complete(query, &part)
            } else {
                Err(ClientError::transport(Some(part.status), sent.url.clone(), part.body.clone()))
            };
            match outcome {
                Ok(()) => summary.queries_completed += 1,
                Err(err) => {
                    query.transition(QueryState::Failed);
                    warn!(query = %query.id(), error = %err, "batch part failed");
                    first_failure.get_or_insert(err);
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    fn complete(&mut self, query: &mut ClientQuery, response: &HttpResponse) -> Result<()> {
        query.process_response(self, response)?;
        query.transition(QueryState::Completed);
        if let Some(callback) = query.take_completion() {
            callback(self)?;
        }
        Ok(())
    }

    /// Invoke `paged` listeners after a page was mapped into `id`.
    pub(crate) fn notify_page_loaded(&mut self, id: CollectionId) -> Result<()> {
        let Some(mut listeners) = self.page_listeners.remove(&id) else {
            return Ok(());
        };
        let outcome = self.store.collection(id).map(|collection| {
            for listener in &mut listeners {
                listener(collection);
            }
        });
        self.page_listeners.insert(id, listeners);
        outcome
    }
}

fn fail_all(queries: &mut [ClientQuery]) {
    for query in queries {
        query.transition(QueryState::Failed);
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("service_root", &self.service_root)
            .field("json_format", &self.json_format)
            .field("batch_by_default", &self.batch_by_default)
            .field("pending", &self.pending.len())
            .field("draining", &self.draining)
            .finish_non_exhaustive()
    }
}
