//! Per-entity-kind rule table
//!
//! Server property names that need special handling (the key field, lazy
//! navigation properties) are looked up in an explicit table injected
//! into every proxy, instead of being special-cased by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use odatalink_domain::constants::DEFAULT_KEY_PROPERTY;

use crate::paths::{KeyStyle, PathSegment, ResourcePath};

/// Inputs available when a proxy's key property is set.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindingInput<'a> {
    pub key: &'a str,
    pub current: Option<&'a ResourcePath>,
    pub collection: Option<&'a ResourcePath>,
}

impl KeyBindingInput<'_> {
    /// Parent collection path, falling back to the parent of an
    /// unresolved current path.
    fn base(&self) -> Option<&ResourcePath> {
        self.collection.or_else(|| {
            self.current
                .filter(|path| matches!(path.segment(), PathSegment::Item { key: None, .. }))
                .and_then(ResourcePath::parent)
        })
    }
}

type CustomBinding = Arc<dyn Fn(&KeyBindingInput<'_>) -> Option<ResourcePath> + Send + Sync>;

/// How a proxy's resource path is rebuilt once its key is known.
#[derive(Clone, Default)]
pub enum KeyBinding {
    /// `collection/key`; keeps the current path when there is no collection
    #[default]
    UnderCollection,
    /// `current.parent/key`
    ReplaceLast,
    /// `collection(key)`
    Parenthesized,
    /// `collection/name('key')`, e.g. `getById`
    ServiceOperation(String),
    /// Never rebind.
    Fixed,
    Custom(CustomBinding),
}

impl KeyBinding {
    pub fn custom<F>(rule: F) -> Self
    where
        F: Fn(&KeyBindingInput<'_>) -> Option<ResourcePath> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(rule))
    }

    /// New path for the given key, or `None` to keep the current one.
    pub fn rebind(&self, input: &KeyBindingInput<'_>) -> Option<ResourcePath> {
        match self {
            Self::UnderCollection => input
                .base()
                .map(|base| ResourcePath::item(input.key, KeyStyle::Segment, Some(base))),
            Self::ReplaceLast => {
                let parent = input.current.and_then(ResourcePath::parent).or(input.collection);
                Some(ResourcePath::item(input.key, KeyStyle::Segment, parent))
            }
            Self::Parenthesized => input
                .base()
                .map(|base| ResourcePath::item(input.key, KeyStyle::Parenthesized, Some(base))),
            Self::ServiceOperation(name) => input.base().map(|base| {
                ResourcePath::service_operation(name.clone(), Some(vec![input.key.into()]), Some(base))
            }),
            Self::Fixed => None,
            Self::Custom(rule) => rule(input),
        }
    }
}

impl fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnderCollection => f.write_str("UnderCollection"),
            Self::ReplaceLast => f.write_str("ReplaceLast"),
            Self::Parenthesized => f.write_str("Parenthesized"),
            Self::ServiceOperation(name) => f.debug_tuple("ServiceOperation").field(name).finish(),
            Self::Fixed => f.write_str("Fixed"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Reference to an entity kind. `Lazy` lets kinds refer to themselves
/// (a user's `manager` is a user).
#[derive(Clone)]
pub enum KindRef {
    Resolved(Arc<EntityKind>),
    Lazy(fn() -> Arc<EntityKind>),
}

impl KindRef {
    pub fn resolve(&self) -> Arc<EntityKind> {
        match self {
            Self::Resolved(kind) => Arc::clone(kind),
            Self::Lazy(factory) => factory(),
        }
    }
}

impl From<Arc<EntityKind>> for KindRef {
    fn from(kind: Arc<EntityKind>) -> Self {
        Self::Resolved(kind)
    }
}

impl From<fn() -> Arc<EntityKind>> for KindRef {
    fn from(factory: fn() -> Arc<EntityKind>) -> Self {
        Self::Lazy(factory)
    }
}

impl fmt::Debug for KindRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(kind) => write!(f, "Resolved({})", kind.type_name()),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    Entity,
    Collection,
}

/// Default-construction rule for a navigation property.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub target: NavigationTarget,
    pub kind: KindRef,
    /// URL segment under the owning proxy's path.
    pub segment: String,
}

/// Descriptor of one entity kind: how to name, key, and navigate it.
#[derive(Debug, Clone)]
pub struct EntityKind {
    type_name: String,
    key_property: String,
    key_binding: KeyBinding,
    navigation: HashMap<String, Navigation>,
}

impl EntityKind {
    pub fn builder(type_name: impl Into<String>) -> EntityKindBuilder {
        EntityKindBuilder::new(type_name)
    }

    /// Kind with an `id` key and no navigation properties.
    pub fn generic() -> Arc<Self> {
        Self::builder("Entity").build()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn key_property(&self) -> &str {
        &self.key_property
    }

    pub fn key_binding(&self) -> &KeyBinding {
        &self.key_binding
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.key_property.eq_ignore_ascii_case(name)
    }

    pub fn navigation(&self, name: &str) -> Option<&Navigation> {
        self.navigation.get(name)
    }

    pub fn collection_type_name(&self) -> String {
        format!("Collection({})", self.type_name)
    }
}

/// Builder for [`EntityKind`].
#[derive(Debug)]
pub struct EntityKindBuilder {
    kind: EntityKind,
}

impl EntityKindBuilder {
    fn new(type_name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind {
                type_name: type_name.into(),
                key_property: DEFAULT_KEY_PROPERTY.to_string(),
                key_binding: KeyBinding::default(),
                navigation: HashMap::new(),
            },
        }
    }

    pub fn key_property(mut self, name: impl Into<String>) -> Self {
        self.kind.key_property = name.into();
        self
    }

    pub fn key_binding(mut self, binding: KeyBinding) -> Self {
        self.kind.key_binding = binding;
        self
    }

    /// Lazily constructed single-valued navigation property.
    pub fn entity(mut self, name: impl Into<String>, kind: impl Into<KindRef>) -> Self {
        let name = name.into();
        self.kind.navigation.insert(
            name.clone(),
            Navigation { target: NavigationTarget::Entity, kind: kind.into(), segment: name },
        );
        self
    }

    /// Lazily constructed collection-valued navigation property.
    pub fn collection(mut self, name: impl Into<String>, kind: impl Into<KindRef>) -> Self {
        let name = name.into();
        self.kind.navigation.insert(
            name.clone(),
            Navigation { target: NavigationTarget::Collection, kind: kind.into(), segment: name },
        );
        self
    }

    /// Navigation property whose URL segment differs from its name.
    pub fn navigation(mut self, name: impl Into<String>, navigation: Navigation) -> Self {
        self.kind.navigation.insert(name.into(), navigation);
        self
    }

    pub fn build(self) -> Arc<EntityKind> {
        Arc::new(self.kind)
    }
}
