//! Client object graph: entity kinds, proxies, collections, results

mod collection;
mod entity;
mod kind;
mod result;
mod store;

pub use collection::EntityCollection;
pub use entity::ClientObject;
pub use kind::{
    EntityKind, EntityKindBuilder, KeyBinding, KeyBindingInput, KindRef, Navigation,
    NavigationTarget,
};
pub use result::ClientResult;
pub use store::{ArenaStats, JsonScope};
pub(crate) use store::ObjectStore;
