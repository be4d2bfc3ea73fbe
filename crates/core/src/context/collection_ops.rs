//! Entity collection operations

use std::sync::Arc;

use odatalink_domain::{
    ClientError, CollectionId, EntityId, QueryId, Result, Value, ValueObject,
};
use serde_json::Value as Json;

use super::ClientContext;
use crate::objects::{ClientObject, EntityCollection, EntityKind, KeyBindingInput};
use crate::paths::{KeyStyle, ResourcePath};
use crate::queries::{ClientQuery, CreatePayload, QueryKind};

/// How many matches `first`/`single` accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cardinality {
    First,
    Single,
}

impl Cardinality {
    /// `$top` for the match read; `single` needs a second row to detect
    /// ambiguity.
    fn top(self) -> u64 {
        match self {
            Self::First => 1,
            Self::Single => 2,
        }
    }
}

impl ClientContext {
    pub fn create_collection(
        &mut self,
        item_kind: Arc<EntityKind>,
        path: Option<ResourcePath>,
    ) -> CollectionId {
        self.store.insert_collection(EntityCollection::new(item_kind, path))
    }

    pub fn collection(&self, id: CollectionId) -> Result<&EntityCollection> {
        self.store.collection(id)
    }

    /// Mutable access for chaining query options:
    /// `ctx.collection_mut(users)?.filter("...").top(5);`
    pub fn collection_mut(&mut self, id: CollectionId) -> Result<&mut EntityCollection> {
        self.store.collection_mut(id)
    }

    /// New proxy of the item kind, back-linked to the collection but not
    /// appended. Defaults to an unresolved item under the collection path.
    pub fn create_typed_object(
        &mut self,
        id: CollectionId,
        initial_properties: Option<ValueObject>,
        path: Option<ResourcePath>,
    ) -> Result<EntityId> {
        let collection = self.store.collection(id)?;
        let kind = Arc::clone(collection.item_kind());
        let path = path.or_else(|| {
            collection.resource_path().map(|parent| ResourcePath::unresolved_item(Some(parent)))
        });
        let mut entity = ClientObject::new(kind, path);
        entity.set_parent_collection(Some(id));
        let child = self.store.insert_entity(entity);

        for (name, value) in initial_properties.into_iter().flatten() {
            if !value.is_null() {
                self.set_property(child, &name, value, true)?;
            }
        }
        Ok(child)
    }

    /// Append an existing proxy and point its back-link at the collection.
    pub fn add_child(&mut self, id: CollectionId, child: EntityId) -> Result<()> {
        self.store.entity_mut(child)?.set_parent_collection(Some(id));
        self.store.collection_mut(id)?.push(child);
        Ok(())
    }

    pub fn remove_child(&mut self, id: CollectionId, child: EntityId) -> Result<bool> {
        Ok(self.store.collection_mut(id)?.remove(child))
    }

    pub fn collection_to_json(&self, id: CollectionId) -> Result<Json> {
        self.store.collection_to_json(id, &self.json_format)
    }

    /// Queue a read of one page. `len` afterwards counts that page only.
    pub fn get(&mut self, id: CollectionId) -> Result<QueryId> {
        self.store.collection(id)?;
        Ok(self.add_query(ClientQuery::read(id)))
    }

    /// Enable server-driven paging: mapped pages append instead of
    /// replacing, and `page_size` becomes `$top`.
    pub fn paged(&mut self, id: CollectionId, page_size: Option<u64>) -> Result<()> {
        self.store.collection_mut(id)?.set_paged(page_size);
        Ok(())
    }

    /// Register a listener run after each page is mapped into `id`.
    pub fn on_page_loaded<F>(&mut self, id: CollectionId, listener: F) -> Result<()>
    where
        F: FnMut(&EntityCollection) + Send + 'static,
    {
        self.store.collection(id)?;
        self.page_listeners.entry(id).or_default().push(Box::new(listener));
        Ok(())
    }

    /// Read every page. Each follow-up read is queued only once its
    /// predecessor's response is mapped, and all of them complete within
    /// the same `execute_*` call.
    pub fn get_all(&mut self, id: CollectionId, page_size: Option<u64>) -> Result<QueryId> {
        self.store.collection_mut(id)?.set_paged(page_size);
        Ok(self.add_query(ClientQuery::new(
            id,
            QueryKind::Read {
                select: Vec::new(),
                expand: Vec::new(),
                next_url: None,
                follow_next: true,
            },
        )))
    }

    /// Queue a single next-page read without chaining further pages.
    pub fn get_next(&mut self, id: CollectionId) -> Result<QueryId> {
        let next = self
            .store
            .collection(id)?
            .next_link()
            .map(str::to_string)
            .ok_or_else(|| ClientError::addressing("collection has no next page"))?;
        Ok(self.add_query(ClientQuery::new(
            id,
            QueryKind::Read {
                select: Vec::new(),
                expand: Vec::new(),
                next_url: Some(next),
                follow_next: false,
            },
        )))
    }

    /// Optimistically append a new proxy and queue its create. The proxy
    /// stays unresolved until the response supplies its key.
    pub fn add<I, K, V>(&mut self, id: CollectionId, properties: I) -> Result<EntityId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let initial = properties.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let child = self.create_typed_object(id, Some(initial), None)?;
        self.add_child(id, child)?;
        self.add_query(
            ClientQuery::new(id, QueryKind::Create(CreatePayload::Target))
                .with_return_target(child),
        );
        Ok(child)
    }

    /// Create with an explicit payload; the new proxy receives the response.
    pub fn add_value(&mut self, id: CollectionId, payload: Json) -> Result<EntityId> {
        let child = self.create_typed_object(id, None, None)?;
        self.add_child(id, child)?;
        self.add_query(
            ClientQuery::new(id, QueryKind::Create(CreatePayload::Json(payload)))
                .with_return_target(child),
        );
        Ok(child)
    }

    /// First match of `expression`; fails with `NotFound` at execute time
    /// when there is none.
    pub fn first(&mut self, id: CollectionId, expression: &str) -> Result<EntityId> {
        self.match_filter(id, expression, Cardinality::First)
    }

    /// The only match of `expression`; fails with `NotFound` for zero and
    /// `AmbiguousResult` for more than one match.
    pub fn single(&mut self, id: CollectionId, expression: &str) -> Result<EntityId> {
        self.match_filter(id, expression, Cardinality::Single)
    }

    /// Reads into a scratch collection released once the query finishes.
    /// The match's properties and navigation children move to `target`.
    fn match_filter(
        &mut self,
        id: CollectionId,
        expression: &str,
        cardinality: Cardinality,
    ) -> Result<EntityId> {
        let target = self.create_typed_object(id, None, None)?;
        let source = self.store.collection(id)?;
        let mut scratch = EntityCollection::new(
            Arc::clone(source.item_kind()),
            source.resource_path().cloned(),
        );
        scratch.set_parent(source.parent());
        if let Some(order_by) = source.query_options().order_by.clone() {
            scratch.order_by(order_by);
        }
        scratch.filter(expression).top(cardinality.top());
        let scratch = self.store.insert_collection(scratch);

        let expression = expression.to_string();
        let query = ClientQuery::read(scratch).with_scratch(scratch).on_completed(
            move |ctx: &mut ClientContext| {
                let matches = ctx.collection(scratch)?.items().to_vec();
                let found = match (matches.as_slice(), cardinality) {
                    ([], _) => {
                        return Err(ClientError::not_found(format!(
                            "Not found for filter: {expression}"
                        )))
                    }
                    ([found], _) | ([found, ..], Cardinality::First) => *found,
                    (_, Cardinality::Single) => {
                        return Err(ClientError::ambiguous(format!(
                            "Ambiguous match found for filter: {expression}"
                        )))
                    }
                };
                let properties = ctx.properties(found)?.clone();
                for (name, value) in properties {
                    ctx.set_property(target, &name, value, false)?;
                }
                ctx.adopt_navigation(found, target)
            },
        );
        self.add_query(query);
        Ok(target)
    }

    /// Locally materialized item at `index`; no network call.
    pub fn item_at(&self, id: CollectionId, index: usize) -> Result<EntityId> {
        let collection = self.store.collection(id)?;
        collection.get(index).ok_or_else(|| {
            ClientError::addressing(format!(
                "index {index} out of range for collection of {}",
                collection.len()
            ))
        })
    }

    /// Unresolved proxy addressed by `key` under the collection. Nothing is
    /// fetched until the proxy is loaded or mutated.
    pub fn item_by_id(&mut self, id: CollectionId, key: &str) -> Result<EntityId> {
        let collection = self.store.collection(id)?;
        let parent = collection.resource_path().cloned();
        let input = KeyBindingInput { key, current: None, collection: parent.as_ref() };
        let path = collection
            .item_kind()
            .key_binding()
            .rebind(&input)
            .unwrap_or_else(|| ResourcePath::item(key, KeyStyle::Segment, parent.as_ref()));
        self.create_typed_object(id, None, Some(path))
    }

    /// `collection[key]`: integers index local items, strings address by id.
    pub fn get_item(&mut self, id: CollectionId, key: &Value) -> Result<EntityId> {
        match key {
            Value::Number(n) => {
                let index = n
                    .as_u64()
                    .and_then(|index| usize::try_from(index).ok())
                    .ok_or_else(|| ClientError::addressing(format!("invalid collection index: {n}")))?;
                self.item_at(id, index)
            }
            Value::String(key) if !key.is_empty() => self.item_by_id(id, key),
            other => Err(ClientError::addressing(format!(
                "invalid key type for collection indexing: {other:?}"
            ))),
        }
    }
}
