//! Item-type capabilities: combining and container acceptance

use crate::item::Item;
use std::collections::HashSet;

/// Result of dropping one item onto another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOutcome {
    /// Nothing happened; placement continues with swap or rejection
    NotCombined,
    /// Both items survive with modified state
    Combined,
    /// The dropped item was used up
    ConsumedIncoming,
    /// The item in the slot was used up
    ConsumedTarget,
}

impl CombineOutcome {
    /// Check if the combine took place
    pub fn is_combined(self) -> bool {
        !matches!(self, Self::NotCombined)
    }
}

/// Merges an incoming item into the one already occupying a slot
pub trait CombineRule: Send + Sync {
    fn combine(&self, target: &mut Item, incoming: &mut Item) -> CombineOutcome;
}

/// Treats condition as a quantity and tops up items of the same type
/// (partial stacks, magazines, fuel tanks)
#[derive(Debug, Clone, Copy, Default)]
pub struct StackMergeRule;

impl CombineRule for StackMergeRule {
    fn combine(&self, target: &mut Item, incoming: &mut Item) -> CombineOutcome {
        if target.identifier() != incoming.identifier() || target.is_full_condition() {
            return CombineOutcome::NotCombined;
        }

        let space = target.max_condition() - target.condition();
        let moved = incoming.condition().min(space);
        if moved <= 0.0 {
            return CombineOutcome::NotCombined;
        }

        target.set_condition(target.condition() + moved);
        incoming.set_condition(incoming.condition() - moved);

        if incoming.condition() <= 0.0 {
            CombineOutcome::ConsumedIncoming
        } else {
            CombineOutcome::Combined
        }
    }
}

/// Container-specific acceptance predicate
pub trait SlotFilter: Send + Sync {
    fn accepts(&self, item: &Item) -> bool;
}

/// Accepts items carrying any of the listed tags
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    tags: Vec<String>,
}

impl TagFilter {
    pub fn new(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

impl SlotFilter for TagFilter {
    fn accepts(&self, item: &Item) -> bool {
        self.tags.iter().any(|t| item.has_tag(t))
    }
}

/// Accepts only the listed item types
#[derive(Debug, Clone, Default)]
pub struct PrefabFilter {
    identifiers: HashSet<String>,
}

impl PrefabFilter {
    pub fn new(identifiers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }
}

impl SlotFilter for PrefabFilter {
    fn accepts(&self, item: &Item) -> bool {
        self.identifiers.contains(item.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemId;
    use crate::item::ItemPrefab;
    use std::sync::Arc;

    fn magazine(id: u16, rounds: f32) -> Item {
        let prefab = Arc::new(ItemPrefab::new("magazine", "Magazine").with_max_condition(30.0));
        let mut item = Item::new(ItemId::new(id).unwrap(), prefab);
        item.set_condition(rounds);
        item
    }

    #[test]
    fn test_stack_merge_partial() {
        let mut target = magazine(1, 20.0);
        let mut incoming = magazine(2, 25.0);

        let outcome = StackMergeRule.combine(&mut target, &mut incoming);
        assert_eq!(outcome, CombineOutcome::Combined);
        assert_eq!(target.condition(), 30.0);
        assert_eq!(incoming.condition(), 15.0);
    }

    #[test]
    fn test_stack_merge_consumes_incoming() {
        let mut target = magazine(1, 10.0);
        let mut incoming = magazine(2, 5.0);

        let outcome = StackMergeRule.combine(&mut target, &mut incoming);
        assert_eq!(outcome, CombineOutcome::ConsumedIncoming);
        assert_eq!(target.condition(), 15.0);
    }

    #[test]
    fn test_stack_merge_full_target() {
        let mut target = magazine(1, 30.0);
        let mut incoming = magazine(2, 5.0);

        assert_eq!(
            StackMergeRule.combine(&mut target, &mut incoming),
            CombineOutcome::NotCombined
        );
        assert_eq!(incoming.condition(), 5.0);
    }

    #[test]
    fn test_filters() {
        let prefab = Arc::new(ItemPrefab::new("rifle", "Rifle").with_tag("firearm"));
        let rifle = Item::new(ItemId::new(1).unwrap(), prefab);

        assert!(TagFilter::new(["firearm"]).accepts(&rifle));
        assert!(!TagFilter::new(["wearable"]).accepts(&rifle));
        assert!(PrefabFilter::new(["rifle", "shotgun"]).accepts(&rifle));
        assert!(!PrefabFilter::new(["shotgun"]).accepts(&rifle));
    }
}
