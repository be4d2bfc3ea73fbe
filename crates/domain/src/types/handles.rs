//! Arena handles
//!
//! Proxies never own their parents. Every back-reference between client
//! objects is one of these `Copy` handles into the arena owned by the
//! runtime context.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        ///
        /// A slot index plus the generation it was issued under; once the
        /// slot is released and reused, older handles no longer resolve.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            index: usize,
            generation: u32,
        }

        impl $name {
            pub const fn new(index: usize, generation: u32) -> Self {
                Self { index, generation }
            }

            pub const fn index(self) -> usize {
                self.index
            }

            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}v{}", self.index, self.generation)
            }
        }
    };
}

arena_handle!(
    /// Handle to an entity proxy.
    EntityId
);
arena_handle!(
    /// Handle to an entity collection.
    CollectionId
);
arena_handle!(
    /// Handle to a service operation result holder.
    ResultId
);

/// Monotonic query identifier, used for correlation in logs and hooks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct QueryId(pub u64);

/// Either kind of addressable client object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRef {
    Entity(EntityId),
    Collection(CollectionId),
}

impl From<EntityId> for ObjectRef {
    fn from(id: EntityId) -> Self {
        Self::Entity(id)
    }
}

impl From<CollectionId> for ObjectRef {
    fn from(id: CollectionId) -> Self {
        Self::Collection(id)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "entity#{id}"),
            Self::Collection(id) => write!(f, "collection#{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_slot_and_generation() {
        assert_eq!(EntityId::new(3, 0), EntityId::new(3, 0));
        assert_ne!(EntityId::new(3, 0), EntityId::new(3, 1));
        assert_eq!(ObjectRef::from(CollectionId::new(2, 1)).to_string(), "collection#2v1");
    }
}
