//! Entity proxy

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use odatalink_domain::{CollectionId, ObjectRef, QueryOptions, Value, ValueObject};

use super::kind::EntityKind;
use crate::paths::ResourcePath;

/// Local stand-in for a remote entity.
///
/// The property bag keeps server order. Navigation children built on
/// demand live in a side cache and only enter the bag once a payload
/// actually carries them.
#[derive(Debug, Clone)]
pub struct ClientObject {
    kind: Arc<EntityKind>,
    resource_path: Option<ResourcePath>,
    properties: ValueObject,
    changed: IndexSet<String>,
    parent_collection: Option<CollectionId>,
    navigation_cache: HashMap<String, ObjectRef>,
    query_options: QueryOptions,
}

impl ClientObject {
    pub fn new(kind: Arc<EntityKind>, resource_path: Option<ResourcePath>) -> Self {
        Self {
            kind,
            resource_path,
            properties: ValueObject::new(),
            changed: IndexSet::new(),
            parent_collection: None,
            navigation_cache: HashMap::new(),
            query_options: QueryOptions::default(),
        }
    }

    pub fn kind(&self) -> &Arc<EntityKind> {
        &self.kind
    }

    pub fn entity_type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn resource_path(&self) -> Option<&ResourcePath> {
        self.resource_path.as_ref()
    }

    pub fn set_resource_path(&mut self, path: ResourcePath) {
        self.resource_path = Some(path);
    }

    pub fn parent_collection(&self) -> Option<CollectionId> {
        self.parent_collection
    }

    pub(crate) fn set_parent_collection(&mut self, collection: Option<CollectionId>) {
        self.parent_collection = collection;
    }

    pub fn properties(&self) -> &ValueObject {
        &self.properties
    }

    /// Stored property value; `None` is the absence sentinel.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn is_property_available(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Write into the bag without key rebinding. See
    /// `ClientContext::set_property` for the full contract.
    pub(crate) fn insert_property(&mut self, name: &str, value: Value, persist_changes: bool) {
        self.properties.insert(name.to_string(), value);
        if persist_changes {
            self.changed.insert(name.to_string());
        }
    }

    /// Names marked for the next update payload, in the order first set.
    pub fn changed_properties(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub(crate) fn clear_changes(&mut self) {
        self.changed.clear();
    }

    /// Current key value, matched case-insensitively against the kind's key property.
    pub fn key(&self) -> Option<String> {
        self.properties
            .iter()
            .find(|(name, _)| self.kind.is_key(name))
            .and_then(|(_, value)| value.as_key())
    }

    pub(crate) fn cached_navigation(&self, name: &str) -> Option<ObjectRef> {
        self.navigation_cache.get(name).copied()
    }

    pub(crate) fn cache_navigation(&mut self, name: &str, child: ObjectRef) {
        self.navigation_cache.insert(name.to_string(), child);
    }

    pub(crate) fn take_navigation(&mut self) -> HashMap<String, ObjectRef> {
        std::mem::take(&mut self.navigation_cache)
    }

    pub(crate) fn navigation_children(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.navigation_cache.values().copied()
    }

    /// Drop the bag and pending changes ahead of a fresh server payload.
    /// Navigation children stay cached so they are refreshed in place.
    pub(crate) fn reset_properties(&mut self) {
        self.properties.clear();
        self.changed.clear();
    }

    pub fn query_options(&self) -> &QueryOptions {
        &self.query_options
    }

    pub fn query_options_mut(&mut self) -> &mut QueryOptions {
        &mut self.query_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_tracking_follows_persist_flag() {
        let mut entity = ClientObject::new(EntityKind::generic(), None);
        entity.insert_property("displayName", "Alex".into(), true);
        entity.insert_property("mail", "alex@example.com".into(), false);

        assert_eq!(entity.changed_properties().collect::<Vec<_>>(), vec!["displayName"]);
        assert!(entity.is_property_available("mail"));
        assert!(entity.property("jobTitle").is_none());

        entity.clear_changes();
        assert!(!entity.has_changes());
    }

    #[test]
    fn key_lookup_ignores_case() {
        let kind = EntityKind::builder("SP.ListItem").key_property("Id").build();
        let mut entity = ClientObject::new(kind, None);
        assert_eq!(entity.key(), None);
        entity.insert_property("ID", Value::from(7_i64), false);
        assert_eq!(entity.key().as_deref(), Some("7"));
    }
}
