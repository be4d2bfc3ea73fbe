//! Entity proxy operations

use std::sync::Arc;

use odatalink_domain::{
    ClientError, EntityId, ObjectRef, QueryId, Result, ResultId, Value, ValueObject,
};
use serde_json::Value as Json;
use tracing::debug;

use super::ClientContext;
use crate::objects::{
    ClientObject, ClientResult, EntityCollection, EntityKind, JsonScope, KeyBindingInput,
    NavigationTarget,
};
use crate::paths::ResourcePath;
use crate::queries::{ClientQuery, QueryKind, ReturnTarget, ServiceOperation};

impl ClientContext {
    /// Register a proxy of `kind` addressed by `path`.
    pub fn create_entity(&mut self, kind: Arc<EntityKind>, path: Option<ResourcePath>) -> EntityId {
        self.store.insert_entity(ClientObject::new(kind, path))
    }

    pub fn entity(&self, id: EntityId) -> Result<&ClientObject> {
        self.store.entity(id)
    }

    pub fn result(&self, id: ResultId) -> Result<&ClientResult> {
        self.store.result(id)
    }

    /// Fresh result holder for a service operation.
    pub fn create_result(&mut self) -> ResultId {
        self.store.insert_result(ClientResult::default())
    }

    pub(crate) fn set_result(&mut self, id: ResultId, value: Value) -> Result<()> {
        self.store.result_mut(id)?.set_value(value);
        Ok(())
    }

    pub fn resource_path(&self, id: EntityId) -> Result<Option<&ResourcePath>> {
        Ok(self.store.entity(id)?.resource_path())
    }

    pub fn set_resource_path(&mut self, id: EntityId, path: ResourcePath) -> Result<()> {
        self.store.entity_mut(id)?.set_resource_path(path);
        Ok(())
    }

    pub fn properties(&self, id: EntityId) -> Result<&ValueObject> {
        Ok(self.store.entity(id)?.properties())
    }

    pub fn is_property_available(&self, id: EntityId, name: &str) -> Result<bool> {
        Ok(self.store.entity(id)?.is_property_available(name))
    }

    /// Stored value only; no navigation defaults.
    pub fn property(&self, id: EntityId, name: &str) -> Result<Option<&Value>> {
        Ok(self.store.entity(id)?.property(name))
    }

    /// Stored value, or the lazily constructed navigation child when the
    /// kind has a rule for `name`. `None` when neither exists.
    pub fn get_property(&mut self, id: EntityId, name: &str) -> Result<Option<Value>> {
        let entity = self.store.entity(id)?;
        if let Some(value) = entity.property(name) {
            return Ok(Some(value.clone()));
        }
        if entity.kind().navigation(name).is_none() {
            return Ok(None);
        }
        Ok(Some(self.navigation(id, name)?.into()))
    }

    /// Write a property. Setting the kind's key property rebinds the
    /// proxy's resource path through the kind's key binding.
    pub fn set_property(
        &mut self,
        id: EntityId,
        name: &str,
        value: impl Into<Value>,
        persist_changes: bool,
    ) -> Result<()> {
        let value = value.into();
        let key = value.as_key();
        let entity = self.store.entity_mut(id)?;
        let is_key = entity.kind().is_key(name);
        entity.insert_property(name, value, persist_changes);
        match key {
            Some(key) if is_key => self.rebind(id, &key),
            _ => Ok(()),
        }
    }

    fn rebind(&mut self, id: EntityId, key: &str) -> Result<()> {
        let entity = self.store.entity(id)?;
        let collection_path = match entity.parent_collection() {
            Some(collection) => self.store.collection(collection)?.resource_path().cloned(),
            None => None,
        };
        let input = KeyBindingInput {
            key,
            current: entity.resource_path(),
            collection: collection_path.as_ref(),
        };
        if let Some(path) = entity.kind().key_binding().rebind(&input) {
            debug!(entity = %id, path = %path, "rebinding resource path");
            self.store.entity_mut(id)?.set_resource_path(path);
        }
        Ok(())
    }

    pub(crate) fn clear_changes(&mut self, id: EntityId) -> Result<()> {
        self.store.entity_mut(id)?.clear_changes();
        Ok(())
    }

    /// Child proxy or collection for a navigation property, addressed
    /// under this entity's path. Built once, then reused; it is not stored
    /// in the property bag until a payload carries it.
    pub fn navigation(&mut self, id: EntityId, name: &str) -> Result<ObjectRef> {
        let entity = self.store.entity(id)?;
        let stored = match entity.property(name) {
            Some(Value::Entity(child)) => Some(ObjectRef::Entity(*child)),
            Some(Value::Collection(child)) => Some(ObjectRef::Collection(*child)),
            _ => None,
        };
        // released children are rebuilt
        if let Some(child) = stored.or(entity.cached_navigation(name)) {
            if self.store.contains(child) {
                return Ok(child);
            }
        }
        let navigation = entity.kind().navigation(name).cloned().ok_or_else(|| {
            ClientError::addressing(format!(
                "{} has no navigation property '{name}'",
                entity.entity_type_name()
            ))
        })?;

        let path = entity.resource_path().map(|path| path.child(navigation.segment.as_str()));
        let kind = navigation.kind.resolve();
        let child = match navigation.target {
            NavigationTarget::Entity => {
                ObjectRef::Entity(self.store.insert_entity(ClientObject::new(kind, path)))
            }
            NavigationTarget::Collection => {
                let mut collection = EntityCollection::new(kind, path);
                collection.set_parent(Some(id));
                ObjectRef::Collection(self.store.insert_collection(collection))
            }
        };
        self.store.entity_mut(id)?.cache_navigation(name, child);
        Ok(child)
    }

    /// Move `from`'s navigation children onto `to`, so they outlive `from`.
    pub(crate) fn adopt_navigation(&mut self, from: EntityId, to: EntityId) -> Result<()> {
        let children = self.store.entity_mut(from)?.take_navigation();
        for (name, child) in children {
            if let ObjectRef::Collection(collection) = child {
                self.store.collection_mut(collection)?.set_parent(Some(to));
            }
            self.store.entity_mut(to)?.cache_navigation(&name, child);
        }
        Ok(())
    }

    /// Type name of an entity, or the item type of a collection.
    pub fn type_name_of(&self, target: ObjectRef) -> Result<String> {
        Ok(match target {
            ObjectRef::Entity(id) => self.store.entity(id)?.entity_type_name().to_string(),
            ObjectRef::Collection(id) => {
                self.store.collection(id)?.item_kind().type_name().to_string()
            }
        })
    }

    pub fn entity_to_json(&self, id: EntityId, scope: JsonScope) -> Result<Json> {
        self.store.entity_to_json(id, scope, &self.json_format)
    }

    /// Set the `$select` list used when `target` is read.
    pub fn select(&mut self, target: ObjectRef, names: &[&str]) -> Result<()> {
        let names: Vec<String> = names.iter().map(|name| (*name).to_string()).collect();
        match target {
            ObjectRef::Entity(id) => self.store.entity_mut(id)?.query_options_mut().select = names,
            ObjectRef::Collection(id) => {
                self.store.collection_mut(id)?.select(names);
            }
        }
        Ok(())
    }

    /// Set the `$expand` list used when `target` is read.
    pub fn expand(&mut self, target: ObjectRef, names: &[&str]) -> Result<()> {
        let names: Vec<String> = names.iter().map(|name| (*name).to_string()).collect();
        match target {
            ObjectRef::Entity(id) => self.store.entity_mut(id)?.query_options_mut().expand = names,
            ObjectRef::Collection(id) => {
                self.store.collection_mut(id)?.expand(names);
            }
        }
        Ok(())
    }

    /// Queue a read of `target`. Names that are navigation properties of
    /// the target's kind are expanded as well as selected.
    pub fn load(&mut self, target: impl Into<ObjectRef>, properties: &[&str]) -> Result<QueryId> {
        let query = self.read_query(target.into(), properties)?;
        Ok(self.add_query(query))
    }

    /// Like [`Self::load`], running `on_loaded` once the response is mapped.
    pub fn load_with<F>(
        &mut self,
        target: impl Into<ObjectRef>,
        properties: &[&str],
        on_loaded: F,
    ) -> Result<QueryId>
    where
        F: FnOnce(&mut ClientContext) -> Result<()> + Send + 'static,
    {
        let query = self.read_query(target.into(), properties)?.on_completed(on_loaded);
        Ok(self.add_query(query))
    }

    fn read_query(&self, target: ObjectRef, properties: &[&str]) -> Result<ClientQuery> {
        let kind = match target {
            ObjectRef::Entity(id) => Arc::clone(self.store.entity(id)?.kind()),
            ObjectRef::Collection(id) => Arc::clone(self.store.collection(id)?.item_kind()),
        };
        let mut select = Vec::new();
        let mut expand = Vec::new();
        for name in properties {
            if kind.navigation(name).is_some() {
                expand.push((*name).to_string());
            }
            select.push((*name).to_string());
        }
        Ok(ClientQuery::new(
            target,
            QueryKind::Read { select, expand, next_url: None, follow_next: false },
        ))
    }

    /// Queue an update carrying the properties changed since the last sync.
    pub fn update(&mut self, id: EntityId) -> Result<QueryId> {
        self.store.entity(id)?;
        Ok(self.add_query(ClientQuery::new(id, QueryKind::Update)))
    }

    /// Queue a delete; on success the proxy leaves its parent collection.
    pub fn delete_object(&mut self, id: EntityId) -> Result<QueryId> {
        self.store.entity(id)?;
        Ok(self.add_query(ClientQuery::new(id, QueryKind::Delete)))
    }

    pub fn remove_from_parent_collection(&mut self, id: EntityId) -> Result<()> {
        let Some(collection) = self.store.entity(id)?.parent_collection() else {
            return Ok(());
        };
        self.store.collection_mut(collection)?.remove(id);
        Ok(())
    }

    /// Queue a service operation bound to `binding`.
    pub fn service_operation(
        &mut self,
        binding: impl Into<ObjectRef>,
        operation: ServiceOperation,
        return_target: Option<ReturnTarget>,
    ) -> Result<QueryId> {
        let mut query = ClientQuery::new(binding, QueryKind::ServiceOperation(operation));
        if let Some(target) = return_target {
            query = query.with_return_target(target);
        }
        self.check_binding(query.binding())?;
        Ok(self.add_query(query))
    }

    /// Queue a static operation, addressed as `{root}{type}.{name}`.
    pub fn static_operation(
        &mut self,
        binding: impl Into<ObjectRef>,
        operation: ServiceOperation,
        return_target: Option<ReturnTarget>,
    ) -> Result<QueryId> {
        let mut query =
            ClientQuery::new(binding, QueryKind::ServiceOperation(operation)).as_static();
        if let Some(target) = return_target {
            query = query.with_return_target(target);
        }
        self.check_binding(query.binding())?;
        Ok(self.add_query(query))
    }

    /// Queue a service operation whose result lands in a new holder.
    pub fn invoke(
        &mut self,
        binding: impl Into<ObjectRef>,
        operation: ServiceOperation,
    ) -> Result<ResultId> {
        let result = self.create_result();
        self.service_operation(binding, operation, Some(ReturnTarget::Result(result)))?;
        Ok(result)
    }

    fn check_binding(&self, binding: ObjectRef) -> Result<()> {
        match binding {
            ObjectRef::Entity(id) => self.store.entity(id).map(|_| ()),
            ObjectRef::Collection(id) => self.store.collection(id).map(|_| ()),
        }
    }
}
