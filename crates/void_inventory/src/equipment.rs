//! Equipment slots and equip-group placement

use crate::hooks::{HighlightKind, InventoryEvent, MutationSource};
use crate::id::{ContainerId, ItemId};
use crate::inventory::{ContainerLayout, ContainerOwner};
use crate::world::ItemWorld;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Body-part tags of equipment slots.
    ///
    /// An item's allowed groups are unions of these; a group such as
    /// `HEAD | TORSO` has to be filled as a whole.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SlotTags: u16 {
        /// Generic pocket slot
        const ANY = 1 << 0;
        const RIGHT_HAND = 1 << 1;
        const LEFT_HAND = 1 << 2;
        const HEAD = 1 << 3;
        const TORSO = 1 << 4;
        const LEGS = 1 << 5;
        const FACE = 1 << 6;
        const HEADSET = 1 << 7;
        const CARD = 1 << 8;
        const BAG = 1 << 9;
        /// Both hands (two-handed tools and weapons)
        const HANDS = Self::LEFT_HAND.bits() | Self::RIGHT_HAND.bits();
    }
}

impl SlotTags {
    /// Check if this is a body slot tag (anything but the generic pocket)
    pub fn is_body(self) -> bool {
        !(self - SlotTags::ANY).is_empty()
    }
}

impl Default for SlotTags {
    fn default() -> Self {
        SlotTags::ANY
    }
}

impl ItemWorld {
    /// Place `item` into the first feasible slot group of `candidate_groups`.
    ///
    /// Succeeds without moving anything if the item already sits in a slot
    /// covered by one of the groups. `ANY` in the list means "any free
    /// pocket" and is tried before the body groups. Body groups are tried in
    /// the given order and filled atomically.
    pub fn try_place_acceptably(
        &mut self,
        item: ItemId,
        container: ContainerId,
        candidate_groups: &[SlotTags],
        source: MutationSource,
    ) -> bool {
        self.commit(&[item], |world| {
            world.place_acceptably(item, container, candidate_groups, source)
        })
    }

    /// [`try_place_acceptably`](Self::try_place_acceptably) with the item's
    /// own allowed groups
    pub fn try_put_item(&mut self, item: ItemId, container: ContainerId, source: MutationSource) -> bool {
        let Some(groups) = self.items.get(&item).map(|i| i.allowed_slots().to_vec()) else {
            return false;
        };
        self.try_place_acceptably(item, container, &groups, source)
    }

    pub(crate) fn place_acceptably(
        &mut self,
        item: ItemId,
        container: ContainerId,
        groups: &[SlotTags],
        source: MutationSource,
    ) -> bool {
        let Some(c) = self.containers.get(&container) else {
            return false;
        };
        if c.owner() == ContainerOwner::None || c.is_locked() || !self.items.contains_key(&item) {
            return false;
        }

        let ContainerLayout::Equip(tags) = c.layout() else {
            if c.contains(item) {
                return true;
            }
            return match self.find_free_slot(item, container) {
                Some(index) => self.commit_slots(item, container, &[index], source),
                None => false,
            };
        };

        // already where it belongs
        let placed = c
            .find_indices(item)
            .into_iter()
            .any(|i| groups.iter().any(|g| g.contains(tags[i])));
        if placed {
            return true;
        }

        if groups.iter().any(|g| g.contains(SlotTags::ANY)) {
            let pocket = (0..tags.len())
                .find(|i| tags[*i] == SlotTags::ANY && self.can_accept(item, container, *i));
            if let Some(index) = pocket {
                return self.commit_slots(item, container, &[index], source);
            }
        }

        self.place_in_groups(item, container, groups, source)
    }

    /// Fill the first group whose covered slots are all free (or already hold
    /// `item`). Groups with a conflicting slot are skipped; if none fits, the
    /// blocking slots are highlighted and nothing is mutated.
    pub(crate) fn place_in_groups(
        &mut self,
        item: ItemId,
        container: ContainerId,
        groups: &[SlotTags],
        source: MutationSource,
    ) -> bool {
        let Some(c) = self.containers.get(&container) else {
            return false;
        };
        let Some(it) = self.items.get(&item) else {
            return false;
        };
        if let Some(filter) = &c.filter {
            if !filter.accepts(it) {
                return false;
            }
        }
        if !matches!(self.would_create_cycle(item, container), Ok(false)) {
            return false;
        }

        let mut conflicts = Vec::new();
        for group in groups {
            let covered = c.slots_covered_by(*group);
            if covered.is_empty() {
                continue;
            }
            let blocked: Vec<usize> = covered
                .iter()
                .copied()
                .filter(|i| matches!(c.slots[*i], Some(other) if other != item))
                .collect();
            if blocked.is_empty() {
                return self.commit_slots(item, container, &covered, source);
            }
            conflicts.extend(blocked);
        }

        conflicts.sort_unstable();
        conflicts.dedup();
        for index in conflicts {
            self.push_event(InventoryEvent::SlotHighlight {
                container,
                index,
                kind: HighlightKind::Conflict,
            });
        }
        false
    }

    pub(crate) fn commit_slots(
        &mut self,
        item: ItemId,
        container: ContainerId,
        indices: &[usize],
        source: MutationSource,
    ) -> bool {
        match self.place_in_slots(item, container, indices, true, source) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Placement of item {} into {} refused: {}", item, container, err);
                false
            }
        }
    }
}
