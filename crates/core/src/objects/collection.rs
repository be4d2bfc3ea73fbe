//! Entity collection

use std::sync::Arc;

use odatalink_domain::{EntityId, QueryOptions};

use super::kind::EntityKind;
use crate::paths::ResourcePath;

/// Ordered, lazily populated container of entity proxies.
///
/// Query option setters return `&mut Self` so they chain; the fetch
/// itself is queued through `ClientContext::get`.
#[derive(Debug, Clone)]
pub struct EntityCollection {
    item_kind: Arc<EntityKind>,
    resource_path: Option<ResourcePath>,
    items: Vec<EntityId>,
    query_options: QueryOptions,
    next_link: Option<String>,
    paged: bool,
    parent: Option<EntityId>,
}

impl EntityCollection {
    pub fn new(item_kind: Arc<EntityKind>, resource_path: Option<ResourcePath>) -> Self {
        Self {
            item_kind,
            resource_path,
            items: Vec::new(),
            query_options: QueryOptions::default(),
            next_link: None,
            paged: false,
            parent: None,
        }
    }

    pub fn filter(&mut self, expression: impl Into<String>) -> &mut Self {
        self.query_options.filter = Some(expression.into());
        self
    }

    pub fn order_by(&mut self, expression: impl Into<String>) -> &mut Self {
        self.query_options.order_by = Some(expression.into());
        self
    }

    pub fn skip(&mut self, count: u64) -> &mut Self {
        self.query_options.skip = Some(count);
        self
    }

    pub fn top(&mut self, count: u64) -> &mut Self {
        self.query_options.top = Some(count);
        self
    }

    pub fn select<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query_options.select = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn expand<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query_options.expand = names.into_iter().map(Into::into).collect();
        self
    }

    /// Empty local items (kept in paged mode) and forget the next link.
    pub fn clear(&mut self) -> &mut Self {
        if !self.paged {
            self.items.clear();
        }
        self.next_link = None;
        self
    }

    pub fn item_kind(&self) -> &Arc<EntityKind> {
        &self.item_kind
    }

    pub fn resource_path(&self) -> Option<&ResourcePath> {
        self.resource_path.as_ref()
    }

    pub fn query_options(&self) -> &QueryOptions {
        &self.query_options
    }

    pub fn items(&self) -> &[EntityId] {
        &self.items
    }

    /// Locally materialized items only; never fetches.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<EntityId> {
        self.items.get(index).copied()
    }

    pub fn has_next(&self) -> bool {
        self.next_link.is_some()
    }

    pub fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }

    pub(crate) fn set_next_link(&mut self, link: Option<String>) {
        self.next_link = link;
    }

    pub fn is_paged(&self) -> bool {
        self.paged
    }

    pub(crate) fn set_paged(&mut self, page_size: Option<u64>) {
        self.paged = true;
        if let Some(size) = page_size {
            self.query_options.top = Some(size);
        }
    }

    /// Owning entity, for navigation collections.
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    pub fn entity_type_name(&self) -> String {
        self.item_kind.collection_type_name()
    }

    pub(crate) fn push(&mut self, item: EntityId) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }

    pub(crate) fn remove(&mut self, item: EntityId) -> bool {
        let before = self.items.len();
        self.items.retain(|candidate| *candidate != item);
        self.items.len() != before
    }
}
