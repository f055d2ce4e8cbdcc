//! Item prefabs and live item instances

use crate::equipment::SlotTags;
use crate::id::{ContainerId, ItemId};
use crate::rules::{CombineRule, SlotFilter};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Static, resolved item-type data shared by every instance of the type
#[derive(Clone)]
pub struct ItemPrefab {
    /// Unique type identifier
    pub identifier: String,
    /// Display name
    pub name: String,
    /// Upper bound for an instance's condition
    pub max_condition: f32,
    /// Slot groups the item may be equipped into, in order of preference
    pub allowed_slots: Vec<SlotTags>,
    /// Tags every new instance starts with
    pub default_tags: Vec<String>,
    /// Capacity of the item's own inventory, if it is a container
    pub own_capacity: Option<usize>,
    /// Acceptance predicate for the item's own inventory
    pub contents_filter: Option<Arc<dyn SlotFilter>>,
    /// How another item dropped onto this one merges into it
    pub combine: Option<Arc<dyn CombineRule>>,
}

impl ItemPrefab {
    /// Create a new prefab that fits any generic slot
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            max_condition: 100.0,
            allowed_slots: vec![SlotTags::ANY],
            default_tags: Vec::new(),
            own_capacity: None,
            contents_filter: None,
            combine: None,
        }
    }

    /// Set max condition
    pub fn with_max_condition(mut self, max: f32) -> Self {
        self.max_condition = max.max(0.0);
        self
    }

    /// Replace the allowed slot groups
    pub fn with_allowed_slots(mut self, groups: impl IntoIterator<Item = SlotTags>) -> Self {
        self.allowed_slots = groups.into_iter().collect();
        self
    }

    /// Add a default tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tags.push(tag.into());
        self
    }

    /// Give the item an inventory of its own
    pub fn with_own_inventory(mut self, capacity: usize) -> Self {
        self.own_capacity = Some(capacity);
        self
    }

    /// Restrict what the item's own inventory accepts
    pub fn with_contents_filter(mut self, filter: Arc<dyn SlotFilter>) -> Self {
        self.contents_filter = Some(filter);
        self
    }

    /// Set the combine rule
    pub fn with_combine(mut self, rule: Arc<dyn CombineRule>) -> Self {
        self.combine = Some(rule);
        self
    }

    /// Check if the prefab can sit in a generic slot
    pub fn fits_any_slot(&self) -> bool {
        self.allowed_slots.iter().any(|g| g.contains(SlotTags::ANY))
    }
}

impl fmt::Debug for ItemPrefab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemPrefab")
            .field("identifier", &self.identifier)
            .field("max_condition", &self.max_condition)
            .field("allowed_slots", &self.allowed_slots)
            .field("own_capacity", &self.own_capacity)
            .field("combine", &self.combine.is_some())
            .finish()
    }
}

/// A live item
#[derive(Debug, Clone)]
pub struct Item {
    id: ItemId,
    prefab: Arc<ItemPrefab>,
    condition: f32,
    tags: BTreeSet<String>,
    /// Item whose own inventory holds this one
    pub(crate) container: Option<ItemId>,
    /// Container whose slots currently hold this item
    pub(crate) parent: Option<ContainerId>,
    /// Inventory owned by this item
    pub(crate) own_inventory: Option<ContainerId>,
    /// Last known world position, used when the item is dropped
    pub(crate) position: [f32; 3],
}

impl Item {
    pub(crate) fn new(id: ItemId, prefab: Arc<ItemPrefab>) -> Self {
        let tags = prefab.default_tags.iter().cloned().collect();
        Self {
            id,
            condition: prefab.max_condition,
            prefab,
            tags,
            container: None,
            parent: None,
            own_inventory: None,
            position: [0.0; 3],
        }
    }

    /// Network id
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Static type data
    pub fn prefab(&self) -> &Arc<ItemPrefab> {
        &self.prefab
    }

    /// Type identifier
    pub fn identifier(&self) -> &str {
        &self.prefab.identifier
    }

    /// Current condition
    pub fn condition(&self) -> f32 {
        self.condition
    }

    /// Max condition
    pub fn max_condition(&self) -> f32 {
        self.prefab.max_condition
    }

    /// Set condition, clamped to `[0, max_condition]`
    pub fn set_condition(&mut self, condition: f32) {
        self.condition = if condition.is_nan() {
            0.0
        } else {
            condition.clamp(0.0, self.prefab.max_condition)
        };
    }

    /// Condition as a fraction of the maximum
    pub fn condition_fraction(&self) -> f32 {
        if self.prefab.max_condition <= 0.0 {
            0.0
        } else {
            self.condition / self.prefab.max_condition
        }
    }

    /// Check if condition is at its maximum
    pub fn is_full_condition(&self) -> bool {
        self.condition >= self.prefab.max_condition
    }

    /// Tags
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Check if item has a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Add a tag
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Match against a tag, the type identifier or the display name
    pub fn matches_key(&self, key: &str) -> bool {
        self.has_tag(key) || self.prefab.identifier == key || self.prefab.name == key
    }

    /// Ordered slot groups this item may be equipped into
    pub fn allowed_slots(&self) -> &[SlotTags] {
        &self.prefab.allowed_slots
    }

    /// Item whose own inventory holds this item
    pub fn container(&self) -> Option<ItemId> {
        self.container
    }

    /// Container currently holding this item
    pub fn parent(&self) -> Option<ContainerId> {
        self.parent
    }

    /// This item's own inventory
    pub fn own_inventory(&self) -> Option<ContainerId> {
        self.own_inventory
    }

    /// Check if the item is loose in the world
    pub fn is_dropped(&self) -> bool {
        self.parent.is_none()
    }

    /// Last known world position
    pub fn position(&self) -> [f32; 3] {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helmet() -> Arc<ItemPrefab> {
        Arc::new(
            ItemPrefab::new("helmet", "Diving Helmet")
                .with_max_condition(50.0)
                .with_allowed_slots([SlotTags::HEAD, SlotTags::ANY])
                .with_tag("wearable"),
        )
    }

    #[test]
    fn test_new_item_starts_detached_and_full() {
        let item = Item::new(ItemId::new(3).unwrap(), helmet());

        assert!(item.is_dropped());
        assert!(item.container().is_none());
        assert!(item.is_full_condition());
        assert!(item.has_tag("wearable"));
    }

    #[test]
    fn test_condition_is_clamped() {
        let mut item = Item::new(ItemId::new(3).unwrap(), helmet());

        item.set_condition(80.0);
        assert_eq!(item.condition(), 50.0);

        item.set_condition(-4.0);
        assert_eq!(item.condition(), 0.0);

        item.set_condition(f32::NAN);
        assert_eq!(item.condition(), 0.0);

        item.set_condition(25.0);
        assert_eq!(item.condition_fraction(), 0.5);
    }

    #[test]
    fn test_matches_key() {
        let mut item = Item::new(ItemId::new(3).unwrap(), helmet());
        item.add_tag("diving");

        assert!(item.matches_key("helmet"));
        assert!(item.matches_key("Diving Helmet"));
        assert!(item.matches_key("diving"));
        assert!(!item.matches_key("suit"));

        assert!(item.remove_tag("diving"));
        assert!(!item.matches_key("diving"));
    }

    #[test]
    fn test_prefab_any_slot() {
        assert!(helmet().fits_any_slot());
        let suit = ItemPrefab::new("suit", "Suit").with_allowed_slots([SlotTags::HEAD | SlotTags::TORSO]);
        assert!(!suit.fits_any_slot());
    }
}
