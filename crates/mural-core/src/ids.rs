//! Identifier newtypes and the counters that mint them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// Identifier of an item in the workspace.
    ItemId,
    "item#"
);
id_type!(
    /// Identifier of a connected view.
    ViewId,
    "view#"
);
id_type!(
    /// Identifier of a view group.
    GroupId,
    "group#"
);

/// An entity with a stable identifier.
pub trait Identifiable {
    type Id: Copy + Eq + fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// Monotonic id source. Ids handed out are never reused.
#[derive(Debug, Clone)]
pub struct IdCounter {
    next: u64,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next raw id.
    pub fn next_raw(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn next<T: From<u64>>(&mut self) -> T {
        T::from(self.next_raw())
    }
}
