//! Void Inventory - Item Ownership and Placement
//!
//! This crate provides slot-addressed inventories and the rules that move
//! items between them.
//!
//! # Features
//!
//! - Item arena with network-stable ids and ownership back-references
//! - Fixed-capacity containers with acceptance filters
//! - Equipment containers with tagged slots and atomic multi-slot groups
//! - Combine-then-swap placement with full rollback
//! - Containment cycle guard
//! - Explicit drag-and-drop sessions
//!
//! # Example
//!
//! ```ignore
//! use void_inventory::prelude::*;
//!
//! let mut world = ItemWorld::new();
//! let gear = world.create_equipment(CharacterId(1), vec![SlotTags::HEAD, SlotTags::TORSO]);
//!
//! let hazmat = world.create_item(Arc::new(
//!     ItemPrefab::new("hazmat", "Hazmat Suit").with_allowed_slots([SlotTags::HEAD | SlotTags::TORSO]),
//! ))?;
//! assert!(world.try_put_item(hazmat, gear, MutationSource::Local));
//! ```

pub mod config;
pub mod drag;
pub mod equipment;
pub mod error;
pub mod guard;
pub mod hooks;
pub mod id;
pub mod inventory;
pub mod item;
pub mod placement;
pub mod rules;
pub mod world;

pub mod prelude {
    pub use crate::config::InventoryConfig;
    pub use crate::drag::{DragContext, DragOutcome, DragSession, DropTarget};
    pub use crate::equipment::SlotTags;
    pub use crate::error::{ConfigError, InventoryError, InventoryResult};
    pub use crate::hooks::{
        HighlightKind, InventoryEvent, InventoryHooks, MutationSource, NoHooks, NoPhysics,
        PhysicsBridge,
    };
    pub use crate::id::{CharacterId, ContainerId, ItemId};
    pub use crate::inventory::{Container, ContainerLayout, ContainerOwner};
    pub use crate::item::{Item, ItemPrefab};
    pub use crate::placement::{CombineIntent, PlaceOptions, PlaceResult};
    pub use crate::rules::{CombineOutcome, CombineRule, PrefabFilter, SlotFilter, StackMergeRule, TagFilter};
    pub use crate::world::ItemWorld;
}

pub use prelude::*;
