//! Arena owning every proxy, collection and result of one context
//!
//! Slots are generational. Releasing an object frees its slot for reuse
//! and bumps the slot generation, so handles issued before the release
//! resolve to an addressing error instead of a different object.

use odatalink_domain::{
    ClientError, CollectionId, EntityId, JsonFormat, ObjectRef, ResultId, Result, Value,
};
use serde_json::{Map, Value as Json};

use super::{ClientObject, ClientResult, EntityCollection};

/// Which properties `to_json` serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonScope {
    /// Properties marked changed (update payloads).
    Changed,
    /// Every stored property (create payloads).
    All,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { slots: Vec::new(), free: Vec::new() }
    }
}

impl<T> Arena<T> {
    fn insert(&mut self, value: T) -> (usize, u32) {
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index) {
                slot.value = Some(value);
                return (index, slot.generation);
            }
        }
        self.slots.push(Slot { generation: 0, value: Some(value) });
        (self.slots.len() - 1, 0)
    }

    fn get(&self, index: usize, generation: u32) -> Option<&T> {
        self.slots
            .get(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    fn get_mut(&mut self, index: usize, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
    }

    fn remove(&mut self, index: usize, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index).filter(|slot| slot.generation == generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Some(value)
    }

    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Live and allocated slot counts of a context's arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    pub entities: usize,
    pub collections: usize,
    pub results: usize,
    /// Slots ever allocated, live or free.
    pub slots: usize,
}

#[derive(Debug, Default)]
pub(crate) struct ObjectStore {
    entities: Arena<ClientObject>,
    collections: Arena<EntityCollection>,
    results: Arena<ClientResult>,
}

impl ObjectStore {
    pub fn insert_entity(&mut self, entity: ClientObject) -> EntityId {
        let (index, generation) = self.entities.insert(entity);
        EntityId::new(index, generation)
    }

    pub fn insert_collection(&mut self, collection: EntityCollection) -> CollectionId {
        let (index, generation) = self.collections.insert(collection);
        CollectionId::new(index, generation)
    }

    pub fn insert_result(&mut self, result: ClientResult) -> ResultId {
        let (index, generation) = self.results.insert(result);
        ResultId::new(index, generation)
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.get(id.index(), id.generation()).is_some()
    }

    pub fn contains_collection(&self, id: CollectionId) -> bool {
        self.collections.get(id.index(), id.generation()).is_some()
    }

    pub fn contains(&self, target: ObjectRef) -> bool {
        match target {
            ObjectRef::Entity(id) => self.contains_entity(id),
            ObjectRef::Collection(id) => self.contains_collection(id),
        }
    }

    pub fn entity(&self, id: EntityId) -> Result<&ClientObject> {
        self.entities
            .get(id.index(), id.generation())
            .ok_or_else(|| ClientError::addressing(format!("unknown entity handle {id}")))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut ClientObject> {
        self.entities
            .get_mut(id.index(), id.generation())
            .ok_or_else(|| ClientError::addressing(format!("unknown entity handle {id}")))
    }

    pub fn collection(&self, id: CollectionId) -> Result<&EntityCollection> {
        self.collections
            .get(id.index(), id.generation())
            .ok_or_else(|| ClientError::addressing(format!("unknown collection handle {id}")))
    }

    pub fn collection_mut(&mut self, id: CollectionId) -> Result<&mut EntityCollection> {
        self.collections
            .get_mut(id.index(), id.generation())
            .ok_or_else(|| ClientError::addressing(format!("unknown collection handle {id}")))
    }

    pub fn result(&self, id: ResultId) -> Result<&ClientResult> {
        self.results
            .get(id.index(), id.generation())
            .ok_or_else(|| ClientError::addressing(format!("unknown result handle {id}")))
    }

    pub fn result_mut(&mut self, id: ResultId) -> Result<&mut ClientResult> {
        self.results
            .get_mut(id.index(), id.generation())
            .ok_or_else(|| ClientError::addressing(format!("unknown result handle {id}")))
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<ClientObject> {
        self.entities.remove(id.index(), id.generation())
    }

    pub fn remove_collection(&mut self, id: CollectionId) -> Option<EntityCollection> {
        self.collections.remove(id.index(), id.generation())
    }

    pub fn remove_result(&mut self, id: ResultId) -> Option<ClientResult> {
        self.results.remove(id.index(), id.generation())
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            entities: self.entities.live(),
            collections: self.collections.live(),
            results: self.results.live(),
            slots: self.entities.capacity()
                + self.collections.capacity()
                + self.results.capacity(),
        }
    }

    pub fn entity_to_json(&self, id: EntityId, scope: JsonScope, format: &JsonFormat) -> Result<Json> {
        let entity = self.entity(id)?;
        let mut out = Map::new();
        match scope {
            JsonScope::All => {
                for (name, value) in entity.properties() {
                    out.insert(format.casing.apply(name), self.value_to_json(value, format)?);
                }
            }
            JsonScope::Changed => {
                for name in entity.changed_properties() {
                    if let Some(value) = entity.property(name) {
                        out.insert(format.casing.apply(name), self.value_to_json(value, format)?);
                    }
                }
            }
        }
        Ok(Json::Object(out))
    }

    pub fn collection_to_json(&self, id: CollectionId, format: &JsonFormat) -> Result<Json> {
        let items = self
            .collection(id)?
            .items()
            .iter()
            .map(|item| self.entity_to_json(*item, JsonScope::All, format))
            .collect::<Result<Vec<_>>>()?;
        Ok(Json::Array(items))
    }

    fn value_to_json(&self, value: &Value, format: &JsonFormat) -> Result<Json> {
        Ok(match value {
            Value::Entity(id) => self.entity_to_json(*id, JsonScope::All, format)?,
            Value::Collection(id) => self.collection_to_json(*id, format)?,
            Value::List(items) => Json::Array(
                items.iter().map(|item| self.value_to_json(item, format)).collect::<Result<_>>()?,
            ),
            Value::Object(map) => {
                let mut out = Map::new();
                for (name, inner) in map {
                    out.insert(format.casing.apply(name), self.value_to_json(inner, format)?);
                }
                Json::Object(out)
            }
            scalar => scalar.to_plain_json().unwrap_or(Json::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use odatalink_domain::PropertyCasing;
    use serde_json::json;

    use super::*;
    use crate::objects::EntityKind;

    #[test]
    fn invalid_handles_are_addressing_errors() {
        let store = ObjectStore::default();
        assert!(matches!(store.entity(EntityId::new(4, 0)), Err(ClientError::Addressing { .. })));
        assert!(matches!(
            store.collection(CollectionId::new(0, 0)),
            Err(ClientError::Addressing { .. })
        ));
    }

    #[test]
    fn released_slots_are_reused_under_a_new_generation() {
        let mut store = ObjectStore::default();
        let first = store.insert_entity(ClientObject::new(EntityKind::generic(), None));
        assert!(store.remove_entity(first).is_some());
        assert!(store.remove_entity(first).is_none());

        let second = store.insert_entity(ClientObject::new(EntityKind::generic(), None));
        assert_eq!(second.index(), first.index());
        assert_ne!(second, first);
        assert!(matches!(store.entity(first), Err(ClientError::Addressing { .. })));
        assert!(store.entity(second).is_ok());

        let stats = store.stats();
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.slots, 1);
    }

    #[test]
    fn to_json_scopes_and_nested_proxies() {
        let mut store = ObjectStore::default();
        let mut manager = ClientObject::new(EntityKind::generic(), None);
        manager.insert_property("id", "m1".into(), false);
        let manager = store.insert_entity(manager);

        let mut user = ClientObject::new(EntityKind::generic(), None);
        user.insert_property("DisplayName", "Alex".into(), true);
        user.insert_property("Manager", Value::Entity(manager), false);
        let user = store.insert_entity(user);

        let format = JsonFormat::light().with_casing(PropertyCasing::Camel);
        assert_eq!(
            store.entity_to_json(user, JsonScope::Changed, &format).unwrap(),
            json!({"displayName": "Alex"})
        );
        assert_eq!(
            store.entity_to_json(user, JsonScope::All, &format).unwrap(),
            json!({"displayName": "Alex", "manager": {"id": "m1"}})
        );
    }
}
