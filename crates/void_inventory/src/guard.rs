//! Containment cycle guard

use crate::error::{InventoryError, InventoryResult};
use crate::id::{ContainerId, ItemId};
use crate::world::ItemWorld;

impl ItemWorld {
    /// Check if putting `item` into `container` would make the item hold
    /// itself, directly or through the items it already contains.
    ///
    /// Walks upward from the owner of `container`. A chain longer than
    /// `max_nesting_depth` is reported as corrupted state.
    pub fn would_create_cycle(&self, item: ItemId, container: ContainerId) -> InventoryResult<bool> {
        let max = self.config().max_nesting_depth;
        let mut current = self.containers.get(&container).and_then(|c| c.owner_item());
        let mut depth = 0;

        while let Some(owner) = current {
            if owner == item {
                return Ok(true);
            }
            depth += 1;
            if depth > max {
                log::error!(
                    "Containment chain above {} is deeper than {} levels",
                    container,
                    max
                );
                return Err(InventoryError::NestingTooDeep { max });
            }
            current = self
                .items
                .get(&owner)
                .and_then(|o| o.parent)
                .and_then(|p| self.containers.get(&p))
                .and_then(|c| c.owner_item());
        }
        Ok(false)
    }

    /// Check if `item` sits inside `ancestor`'s own inventory, at any depth
    pub fn is_contained_in(&self, item: ItemId, ancestor: ItemId) -> bool {
        let mut current = self.items.get(&item).and_then(|i| i.container());
        for _ in 0..=self.config().max_nesting_depth {
            match current {
                Some(owner) if owner == ancestor => return true,
                Some(owner) => current = self.items.get(&owner).and_then(|i| i.container()),
                None => return false,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::config::InventoryConfig;
    use crate::error::InventoryError;
    use crate::hooks::MutationSource;
    use crate::item::ItemPrefab;
    use crate::world::ItemWorld;
    use std::sync::Arc;

    fn bag() -> Arc<ItemPrefab> {
        Arc::new(ItemPrefab::new("bag", "Bag").with_own_inventory(2))
    }

    #[test]
    fn test_self_placement_is_a_cycle() {
        let mut world = ItemWorld::new();
        let outer = world.create_item(bag()).unwrap();
        let own = world.item(outer).unwrap().own_inventory().unwrap();

        assert_eq!(world.would_create_cycle(outer, own), Ok(true));
        assert!(!world.can_accept(outer, own, 0));
    }

    #[test]
    fn test_transitive_cycle() {
        let mut world = ItemWorld::new();
        let outer = world.create_item(bag()).unwrap();
        let inner = world.create_item(bag()).unwrap();
        let outer_inv = world.item(outer).unwrap().own_inventory().unwrap();
        let inner_inv = world.item(inner).unwrap().own_inventory().unwrap();

        world.place(inner, outer_inv, 0, true, MutationSource::Local).unwrap();

        assert!(world.is_contained_in(inner, outer));
        assert!(!world.is_contained_in(outer, inner));
        assert_eq!(world.would_create_cycle(outer, inner_inv), Ok(true));
        assert_eq!(
            world.place(outer, inner_inv, 0, true, MutationSource::Local),
            Err(InventoryError::ContainmentCycle { item: outer, container: inner_inv })
        );
        assert!(world.item(outer).unwrap().is_dropped());
        assert!(world.container(inner_inv).unwrap().is_empty());
    }

    #[test]
    fn test_depth_bound() {
        let mut world = ItemWorld::new().with_config(InventoryConfig::default().with_max_nesting_depth(2));
        let bags: Vec<_> = (0..3).map(|_| world.create_item(bag()).unwrap()).collect();
        for pair in bags.windows(2) {
            let inv = world.item(pair[0]).unwrap().own_inventory().unwrap();
            world.place(pair[1], inv, 0, true, MutationSource::Local).unwrap();
        }
        let deepest = world.item(bags[2]).unwrap().own_inventory().unwrap();
        let loose = world.create_item(bag()).unwrap();

        assert_eq!(
            world.would_create_cycle(loose, deepest),
            Err(InventoryError::NestingTooDeep { max: 2 })
        );
        assert!(!world.can_accept(loose, deepest, 0));
    }
}
