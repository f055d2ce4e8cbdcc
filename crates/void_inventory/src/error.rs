//! Inventory errors
//!
//! Routine "does not fit" outcomes are not errors; they come back as
//! `false` or [`PlaceResult::Rejected`](crate::placement::PlaceResult).
//! The variants here describe corrupted containment state.

use crate::id::{ContainerId, ItemId};
use thiserror::Error;

/// Containment invariant violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Item id does not resolve to a live item
    #[error("Unknown item {0}")]
    UnknownItem(ItemId),
    /// Container handle does not resolve to a live container
    #[error("Unknown {0}")]
    UnknownContainer(ContainerId),
    /// Item would be (or is) held by two containers at once
    #[error("Item {item} is already held by {holder}")]
    DuplicateOwnership { item: ItemId, holder: ContainerId },
    /// Item's parent reference disagrees with the slot arrays
    #[error("Item {0} has a broken parent reference")]
    BrokenBackReference(ItemId),
    /// Target slot holds a different item
    #[error("Slot {index} of {container} is occupied")]
    SlotOccupied { container: ContainerId, index: usize },
    /// Slot index outside the container's capacity
    #[error("Slot {index} is out of range for {container}")]
    SlotOutOfRange { container: ContainerId, index: usize },
    /// Item would end up (directly or transitively) inside itself
    #[error("Item {item} cannot be placed inside {container}: containment cycle")]
    ContainmentCycle { item: ItemId, container: ContainerId },
    /// Containment chain deeper than the configured bound
    #[error("Containment chain exceeds {max} levels")]
    NestingTooDeep { max: usize },
    /// Requested id is already taken
    #[error("Item id {0} is already in use")]
    IdInUse(ItemId),
    /// Every network id is taken
    #[error("Item ids exhausted")]
    IdsExhausted,
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON document
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    /// Semantically invalid value
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
