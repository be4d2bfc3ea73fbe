//! JSON payload to proxy graph

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use odatalink_domain::{CollectionId, EntityId, ObjectRef, Result, Value};
use serde_json::Value as Json;

use super::ClientContext;
use crate::objects::EntityKind;

impl ClientContext {
    /// Merge an entity payload into the proxy's bag. Navigation properties
    /// with a rule become child proxies (reusing cached ones); control and
    /// deferred fields are skipped. Non-object payloads are ignored.
    pub(crate) fn map_entity_json(&mut self, id: EntityId, json: &Json) -> Result<()> {
        let Json::Object(fields) = json else {
            return Ok(());
        };
        let format = self.json_format;
        for (name, value) in fields {
            if format.is_control_key(name) || format.is_deferred(value) {
                continue;
            }
            let has_rule = self.store.entity(id)?.kind().navigation(name).is_some();
            if !has_rule || value.is_null() {
                self.set_property(id, name, Value::from_json(value.clone()), false)?;
                continue;
            }
            let child = self.navigation(id, name)?;
            match child {
                ObjectRef::Entity(child) => self.map_entity_json(child, value)?,
                ObjectRef::Collection(child) => self.map_collection_json(child, value, false)?,
            }
            self.set_property(id, name, child, false)?;
        }
        Ok(())
    }

    /// Materialize a collection payload in response order. `append` keeps
    /// existing items (next-page reads). Otherwise the page replaces the
    /// current items unless the collection is paged: items whose key comes
    /// back keep their handle and are refreshed in place, and the rest are
    /// released.
    pub(crate) fn map_collection_json(
        &mut self,
        id: CollectionId,
        json: &Json,
        append: bool,
    ) -> Result<()> {
        let format = self.json_format;
        let collection = self.store.collection_mut(id)?;
        let previous =
            if append || collection.is_paged() { Vec::new() } else { collection.items().to_vec() };
        if !append {
            collection.clear();
        }
        let kind = Arc::clone(collection.item_kind());

        let items = format.collection_items(json);
        let incoming: HashSet<String> =
            items.into_iter().flatten().filter_map(|item| payload_key(&kind, item)).collect();

        // release dropped items first so their slots serve the new page
        let mut by_key = HashMap::new();
        for item in previous {
            let Ok(entity) = self.store.entity(item) else {
                continue;
            };
            let owned = entity.parent_collection() == Some(id);
            match entity.key().filter(|key| incoming.contains(key)) {
                Some(key) if !by_key.contains_key(&key) => {
                    by_key.insert(key, item);
                }
                _ if owned => self.release(ObjectRef::Entity(item)),
                _ => {}
            }
        }

        let next_link = format.next_link(json);
        for item in items.into_iter().flatten() {
            let reused = payload_key(&kind, item).and_then(|key| by_key.remove(&key));
            let child = match reused {
                Some(existing) => {
                    self.store.entity_mut(existing)?.reset_properties();
                    existing
                }
                None => self.create_typed_object(id, None, None)?,
            };
            self.add_child(id, child)?;
            self.map_entity_json(child, item)?;
        }
        self.store.collection_mut(id)?.set_next_link(next_link);
        Ok(())
    }
}

/// Key carried by an item payload, matched like `ClientObject::key`.
fn payload_key(kind: &EntityKind, item: &Json) -> Option<String> {
    let Json::Object(fields) = item else {
        return None;
    };
    fields
        .iter()
        .find(|(name, _)| kind.is_key(name))
        .and_then(|(_, value)| Value::from_json(value.clone()).as_key())
}
