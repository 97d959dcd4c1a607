use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::PhysicsError;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Integer identifiers handed out by a [`HandleTable`]
pub trait TableId: Copy + Eq + Hash + fmt::Debug {
    /// Human-readable kind used in error messages
    const KIND: &'static str;

    fn from_raw(raw: i32) -> Self;

    fn raw(self) -> i32;
}

macro_rules! table_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
        pub struct $name(pub(crate) i32);

        impl $name {
            /// The raw integer value
            #[inline]
            pub fn raw(self) -> i32 {
                self.0
            }
        }

        impl TableId for $name {
            const KIND: &'static str = $kind;

            #[inline]
            fn from_raw(raw: i32) -> Self {
                Self(raw)
            }

            #[inline]
            fn raw(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

table_id!(
    /// Identifier of a body owned by the world
    BodyId, "body"
);
table_id!(
    /// Identifier of a joint owned by the world
    JointId, "joint"
);
table_id!(
    /// Identifier of a force field owned by the world
    ForceFieldId, "force field"
);

/// Maps dense integer IDs to values (usually kernel handles).
///
/// IDs increase monotonically and are never reissued, even after removal.
#[derive(Debug, Clone)]
pub struct HandleTable<I: TableId, V> {
    items: HashMap<I, V>,
    next_id: i32,
}

impl<I: TableId, V> Default for HandleTable<I, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: TableId, V> HandleTable<I, V> {
    /// Creates a new empty table
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next_id: 1, // Start at 1, so 0 can represent invalid handle
        }
    }

    /// Adds a value and returns its freshly issued ID
    pub fn insert(&mut self, value: V) -> I {
        let id = I::from_raw(self.next_id);
        self.next_id += 1;
        self.items.insert(id, value);
        id
    }

    /// Looks up a value, returning an error if the ID is unknown
    pub fn get(&self, id: I) -> Result<&V> {
        self.items
            .get(&id)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("{} {} not found", I::KIND, id.raw())))
    }

    /// Looks up a value mutably, returning an error if the ID is unknown
    pub fn get_mut(&mut self, id: I) -> Result<&mut V> {
        self.items
            .get_mut(&id)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("{} {} not found", I::KIND, id.raw())))
    }

    pub fn remove(&mut self, id: I) -> Option<V> {
        self.items.remove(&id)
    }

    pub fn contains(&self, id: I) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes every entry; the ID counter keeps counting
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// IDs currently present, in ascending order
    pub fn ids(&self) -> Vec<I>
    where
        I: Ord,
    {
        let mut ids: Vec<I> = self.items.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &V)> + '_ {
        self.items.iter().map(|(id, value)| (*id, value))
    }
}
