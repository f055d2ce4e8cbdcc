//! Collaborator hooks and inventory events

use crate::id::{CharacterId, ContainerId, ItemId};

/// Simulated body of an item in the world
pub trait PhysicsBridge {
    /// Item went into a container; disable its body
    fn detach_body(&mut self, item: ItemId);
    /// Item was dropped; re-enable its body at `position`
    fn reattach_body(&mut self, item: ItemId, position: [f32; 3]);
}

/// Physics bridge for headless simulations
#[derive(Debug, Default)]
pub struct NoPhysics;

impl PhysicsBridge for NoPhysics {
    fn detach_body(&mut self, _item: ItemId) {}
    fn reattach_body(&mut self, _item: ItemId, _position: [f32; 3]) {}
}

/// Reactive behavior tied to containment changes
pub trait InventoryHooks {
    /// `item` entered the inventory owned by `owner`
    fn on_contained(&mut self, _owner: ItemId, _item: ItemId) {}
    /// `item` left the inventory owned by `owner`
    fn on_removed(&mut self, _owner: ItemId, _item: ItemId) {}
    /// `item` now occupies a body slot of `wearer`
    fn on_equipped(&mut self, _item: ItemId, _wearer: CharacterId) {}
    /// `item` no longer occupies any body slot of `wearer`
    fn on_unequipped(&mut self, _item: ItemId, _wearer: CharacterId) {}
}

/// Hooks that do nothing
#[derive(Debug, Default)]
pub struct NoHooks;

impl InventoryHooks for NoHooks {}

/// Why a slot is highlighted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    /// A placement into the slot was refused
    Rejected,
    /// The slot blocked an equip group
    Conflict,
}

/// Whether a mutation originates here or replays authoritative state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationSource {
    /// Player action or gameplay logic; schedules synchronization
    Local,
    /// Applying state received over the network
    Replay,
}

/// Inventory events
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryEvent {
    /// Item put into one or more slots
    ItemPlaced {
        item: ItemId,
        container: ContainerId,
        slots: Vec<usize>,
    },
    /// Item taken out of a container
    ItemRemoved { item: ItemId, container: ContainerId },
    /// Two items traded places
    ItemsSwapped {
        container: ContainerId,
        first: ItemId,
        second: ItemId,
    },
    /// Incoming item combined into the target
    ItemsCombined { target: ItemId, incoming: ItemId },
    /// Item entered a body slot
    Equipped { item: ItemId, wearer: CharacterId },
    /// Item left every body slot
    Unequipped { item: ItemId, wearer: CharacterId },
    /// Item dropped into the world
    ItemDropped { item: ItemId, position: [f32; 3] },
    /// Item destroyed
    ItemDestroyed { item: ItemId },
    /// Transient UI feedback
    SlotHighlight {
        container: ContainerId,
        index: usize,
        kind: HighlightKind,
    },
}

/// Side effect recorded during an operation and dispatched once it commits
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    DetachBody(ItemId),
    ReattachBody(ItemId, [f32; 3]),
    Contained { owner: ItemId, item: ItemId },
    Removed { owner: ItemId, item: ItemId },
    Event(InventoryEvent),
}
