//! Identifiers for items, containers and characters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network-stable item identifier.
///
/// `0` is reserved as the "empty slot" marker on the wire, so a live item
/// never carries it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(u16);

impl ItemId {
    /// Wire value of an empty slot
    pub const EMPTY_WIRE: u16 = 0;

    /// Create from a raw network value. Returns `None` for the empty marker.
    #[inline]
    pub const fn new(raw: u16) -> Option<Self> {
        if raw == Self::EMPTY_WIRE {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw network value
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Encode an optional id for the wire (`None` -> 0)
    #[inline]
    pub fn to_wire(id: Option<ItemId>) -> u16 {
        id.map(|id| id.0).unwrap_or(Self::EMPTY_WIRE)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a container inside an [`ItemWorld`](crate::world::ItemWorld)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub u32);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container:{}", self.0)
    }
}

/// Opaque handle of a character (a wearer of equipment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "character:{}", self.0)
    }
}

/// Allocates item ids.
///
/// The cursor only moves forward and wraps past `u16::MAX`, so a freed id is
/// handed out again only after the whole range has been cycled through.
#[derive(Debug, Clone)]
pub struct ItemIdAllocator {
    cursor: u16,
}

impl ItemIdAllocator {
    /// Create an allocator starting at the first valid id
    pub const fn new() -> Self {
        Self { cursor: 1 }
    }

    /// Allocate the next id for which `in_use` returns false
    pub fn allocate(&mut self, in_use: impl Fn(ItemId) -> bool) -> Option<ItemId> {
        for _ in 0..u16::MAX {
            let candidate = ItemId(self.cursor);
            self.cursor = match self.cursor.wrapping_add(1) {
                0 => 1,
                next => next,
            };
            if !in_use(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Make sure a later `allocate` does not hand out ids at or below `id`
    /// before wrapping. Used when mirroring ids assigned by a server.
    pub fn observe(&mut self, id: ItemId) {
        if id.0 >= self.cursor {
            self.cursor = match id.0.wrapping_add(1) {
                0 => 1,
                next => next,
            };
        }
    }
}

impl Default for ItemIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
