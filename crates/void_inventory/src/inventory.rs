//! Slot-addressed containers

use crate::equipment::SlotTags;
use crate::id::{CharacterId, ContainerId, ItemId};
use crate::rules::SlotFilter;
use std::fmt;
use std::sync::Arc;

/// Entity that owns a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerOwner {
    /// Equipment and pockets of a character
    Character(CharacterId),
    /// The own inventory of an item (backpack, crate, weapon magazine well)
    Item(ItemId),
    /// Inert container; rejects every placement
    None,
}

/// Slot layout of a container
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerLayout {
    /// Every slot is interchangeable
    Plain,
    /// Each slot carries a body-part tag
    Equip(Vec<SlotTags>),
}

/// Fixed-capacity array of optional item references
#[derive(Clone)]
pub struct Container {
    id: ContainerId,
    owner: ContainerOwner,
    pub(crate) slots: Vec<Option<ItemId>>,
    layout: ContainerLayout,
    pub(crate) filter: Option<Arc<dyn SlotFilter>>,
    pub(crate) locked: bool,
    pub(crate) allow_swapping: bool,
    pub(crate) dirty: bool,
}

impl Container {
    pub(crate) fn new(id: ContainerId, owner: ContainerOwner, capacity: usize) -> Self {
        Self {
            id,
            owner,
            slots: vec![None; capacity],
            layout: ContainerLayout::Plain,
            filter: None,
            locked: false,
            allow_swapping: true,
            dirty: false,
        }
    }

    pub(crate) fn with_slot_tags(id: ContainerId, owner: ContainerOwner, tags: Vec<SlotTags>) -> Self {
        let mut container = Self::new(id, owner, tags.len());
        container.layout = ContainerLayout::Equip(tags);
        container
    }

    /// Container handle
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Owning entity
    pub fn owner(&self) -> ContainerOwner {
        self.owner
    }

    /// Item owning this container, if any
    pub fn owner_item(&self) -> Option<ItemId> {
        match self.owner {
            ContainerOwner::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Character owning this container, if any
    pub fn owner_character(&self) -> Option<CharacterId> {
        match self.owner {
            ContainerOwner::Character(character) => Some(character),
            _ => None,
        }
    }

    /// Slot layout
    pub fn layout(&self) -> &ContainerLayout {
        &self.layout
    }

    /// Check if slots carry body-part tags
    pub fn is_equipment(&self) -> bool {
        matches!(self.layout, ContainerLayout::Equip(_))
    }

    /// Tag of a slot. Plain containers report `ANY` for every slot.
    pub fn slot_tag(&self, index: usize) -> Option<SlotTags> {
        if index >= self.slots.len() {
            return None;
        }
        match &self.layout {
            ContainerLayout::Plain => Some(SlotTags::ANY),
            ContainerLayout::Equip(tags) => tags.get(index).copied(),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Raw slot contents
    pub fn slots(&self) -> &[Option<ItemId>] {
        &self.slots
    }

    /// Item in a slot
    pub fn item_at(&self, index: usize) -> Option<ItemId> {
        self.slots.get(index).copied().flatten()
    }

    /// Check if the item occupies any slot
    pub fn contains(&self, item: ItemId) -> bool {
        self.slots.iter().any(|s| *s == Some(item))
    }

    /// First slot holding the item
    pub fn find_index(&self, item: ItemId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(item))
    }

    /// Every slot holding the item (multi-slot equipment spans several)
    pub fn find_indices(&self, item: ItemId) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Some(item))
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct items, each reported once in slot order
    pub fn all_items(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = Vec::new();
        for item in self.slots.iter().flatten() {
            if !items.contains(item) {
                items.push(*item);
            }
        }
        items
    }

    /// First occupied slot's item
    pub fn first_item(&self) -> Option<ItemId> {
        self.slots.iter().flatten().next().copied()
    }

    /// Last occupied slot's item
    pub fn last_item(&self) -> Option<ItemId> {
        self.slots.iter().rev().flatten().next().copied()
    }

    /// Number of occupied slots
    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.used_slots() == 0
    }

    /// Check if every slot is occupied
    pub fn is_full(&self) -> bool {
        self.used_slots() == self.capacity()
    }

    /// Check if placement is disabled
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Check if items already inside may trade places
    pub fn allows_swapping(&self) -> bool {
        self.allow_swapping
    }

    /// Check if the container changed since the last sync
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Slot contents as wire ids (`0` = empty)
    pub fn wire_ids(&self) -> Vec<u16> {
        self.slots.iter().map(|s| ItemId::to_wire(*s)).collect()
    }

    /// Slots whose tag intersects `group`, ignoring the generic `ANY` bit
    pub(crate) fn slots_covered_by(&self, group: SlotTags) -> Vec<usize> {
        let body = group - SlotTags::ANY;
        if body.is_empty() {
            return Vec::new();
        }
        match &self.layout {
            ContainerLayout::Plain => Vec::new(),
            ContainerLayout::Equip(tags) => tags
                .iter()
                .enumerate()
                .filter(|(_, tag)| body.intersects(**tag) && **tag != SlotTags::ANY)
                .map(|(i, _)| i)
                .collect(),
        }
    }

    /// Check if the item sits in a body slot (a non-`ANY` tagged slot)
    pub(crate) fn is_equipped(&self, item: ItemId) -> bool {
        match &self.layout {
            ContainerLayout::Plain => false,
            ContainerLayout::Equip(tags) => self
                .slots
                .iter()
                .zip(tags)
                .any(|(slot, tag)| *slot == Some(item) && *tag != SlotTags::ANY),
        }
    }

    pub(crate) fn clear_item(&mut self, item: ItemId) -> Vec<usize> {
        let mut cleared = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if *slot == Some(item) {
                *slot = None;
                cleared.push(i);
            }
        }
        cleared
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("slots", &self.slots)
            .field("layout", &self.layout)
            .field("locked", &self.locked)
            .field("dirty", &self.dirty)
            .finish()
    }
}
