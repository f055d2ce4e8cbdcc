//! Slot-targeted placement: combine, swap and rollback

use crate::equipment::SlotTags;
use crate::hooks::{Effect, HighlightKind, InventoryEvent, MutationSource};
use crate::id::{ContainerId, ItemId};
use crate::inventory::ContainerOwner;
use crate::rules::CombineOutcome;
use crate::world::ItemWorld;

/// How a targeted placement may resolve an occupied slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceOptions {
    /// Trade places with the occupant if the item is already in this container
    pub allow_swap: bool,
    /// Let the occupant's combine rule absorb the item
    pub allow_combine: bool,
    /// Origin of the mutation
    pub source: MutationSource,
}

impl PlaceOptions {
    /// Player or gameplay action
    pub fn local() -> Self {
        Self {
            allow_swap: true,
            allow_combine: true,
            source: MutationSource::Local,
        }
    }

    /// Reapplying authoritative state. Never combines.
    pub fn replay() -> Self {
        Self {
            allow_swap: true,
            allow_combine: false,
            source: MutationSource::Replay,
        }
    }

    /// Set swap permission
    pub fn with_swap(mut self, allow: bool) -> Self {
        self.allow_swap = allow;
        self
    }

    /// Set combine permission
    pub fn with_combine(mut self, allow: bool) -> Self {
        self.allow_combine = allow;
        self
    }
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self::local()
    }
}

/// Outcome of [`ItemWorld::try_place_at`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceResult {
    /// Item written into the slot (and its group)
    Placed,
    /// Occupant's combine rule absorbed the item
    Combined,
    /// Item and occupant traded places
    Swapped,
    /// Item was already in the slot
    Unchanged,
    /// Nothing changed
    Rejected,
}

impl PlaceResult {
    /// Check if the request was honored
    pub fn succeeded(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// A combine performed by a local mutation, for the authority to replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineIntent {
    /// Container holding the target
    pub container: ContainerId,
    /// Target slot
    pub index: usize,
    /// Item that was dropped onto the target
    pub incoming: ItemId,
}

/// Conditions to restore if a withheld item comes back
#[derive(Debug, Clone, Copy)]
pub(crate) struct Withheld {
    partner: ItemId,
    condition: f32,
    partner_condition: f32,
}

struct SwapCheckpoint {
    slots: Vec<Option<ItemId>>,
    dirty: bool,
    refs: [(ItemId, Option<ContainerId>, Option<ItemId>); 2],
    effects: usize,
}

impl ItemWorld {
    /// Put `item` into `container[index]`.
    ///
    /// An empty slot takes the item if its tag admits it (equip slots fill the
    /// whole group). An occupied slot first tries the occupant's combine rule,
    /// then a swap. A failed swap is rolled back completely.
    pub fn try_place_at(
        &mut self,
        item: ItemId,
        container: ContainerId,
        index: usize,
        options: PlaceOptions,
    ) -> PlaceResult {
        let mut involved = vec![item];
        if let Some(occupant) = self.container(container).and_then(|c| c.item_at(index)) {
            if occupant != item {
                involved.push(occupant);
            }
        }
        self.commit(&involved, |world| world.place_at(item, container, index, options))
    }

    pub(crate) fn place_at(
        &mut self,
        item: ItemId,
        container: ContainerId,
        index: usize,
        options: PlaceOptions,
    ) -> PlaceResult {
        let Some(c) = self.containers.get(&container) else {
            log::warn!("Placement into unknown {}", container);
            return PlaceResult::Rejected;
        };
        let Some(parent) = self.items.get(&item).map(|i| i.parent()) else {
            log::warn!("Placement of unknown item {}", item);
            return PlaceResult::Rejected;
        };
        if index >= c.capacity() {
            log::warn!("Slot {} is out of range for {}", index, container);
            return PlaceResult::Rejected;
        }
        if c.owner() == ContainerOwner::None || c.is_locked() {
            return PlaceResult::Rejected;
        }
        let swappable = c.allows_swapping() && parent == Some(container);

        match c.item_at(index) {
            None => self.place_into_empty(item, container, index, options.source),
            Some(occupant) if occupant == item => PlaceResult::Unchanged,
            Some(occupant) => {
                if options.allow_combine {
                    if let Some(result) = self.try_combine(item, occupant, container, index, options) {
                        return result;
                    }
                }
                if options.allow_swap && swappable {
                    return self.swap(item, occupant, container, index, options.source);
                }
                self.highlight(container, index, HighlightKind::Rejected);
                PlaceResult::Rejected
            }
        }
    }

    fn place_into_empty(
        &mut self,
        item: ItemId,
        container: ContainerId,
        index: usize,
        source: MutationSource,
    ) -> PlaceResult {
        let tag = self
            .containers
            .get(&container)
            .and_then(|c| c.slot_tag(index))
            .unwrap_or(SlotTags::ANY);

        let placed = if tag.is_body() {
            let groups: Vec<SlotTags> = self
                .items
                .get(&item)
                .map(|i| i.allowed_slots().iter().copied().filter(|g| g.intersects(tag)).collect())
                .unwrap_or_default();
            self.place_in_groups(item, container, &groups, source)
        } else {
            self.can_accept(item, container, index) && self.commit_slots(item, container, &[index], source)
        };

        if placed {
            PlaceResult::Placed
        } else {
            self.highlight(container, index, HighlightKind::Rejected);
            PlaceResult::Rejected
        }
    }

    fn try_combine(
        &mut self,
        incoming: ItemId,
        target: ItemId,
        container: ContainerId,
        index: usize,
        options: PlaceOptions,
    ) -> Option<PlaceResult> {
        let rule = self.items.get(&target)?.prefab().combine.clone()?;
        let mut incoming_item = self.items.remove(&incoming)?;
        let incoming_condition = incoming_item.condition();
        let (outcome, target_condition) = match self.items.get_mut(&target) {
            Some(target_item) => {
                let before = target_item.condition();
                (rule.combine(target_item, &mut incoming_item), before)
            }
            None => (CombineOutcome::NotCombined, 0.0),
        };
        self.items.insert(incoming, incoming_item);

        if !outcome.is_combined() {
            return None;
        }
        log::debug!("Combined item {} into {} ({:?})", incoming, target, outcome);
        self.push_event(InventoryEvent::ItemsCombined { target, incoming });
        if options.source == MutationSource::Local {
            self.combines.push(CombineIntent {
                container,
                index,
                incoming,
            });
        }

        match outcome {
            CombineOutcome::ConsumedIncoming => {
                let held = Withheld {
                    partner: target,
                    condition: incoming_condition,
                    partner_condition: target_condition,
                };
                self.consume(incoming, held, options.source);
            }
            CombineOutcome::ConsumedTarget => {
                let held = Withheld {
                    partner: incoming,
                    condition: target_condition,
                    partner_condition: incoming_condition,
                };
                self.consume(target, held, options.source);
                // the slot is free now
                let moved = self.place_at(incoming, container, index, options.with_combine(false));
                if !moved.succeeded() {
                    log::debug!(
                        "Item {} could not take slot {} of {} freed by {}",
                        incoming,
                        index,
                        container,
                        target
                    );
                }
            }
            _ => {}
        }
        Some(PlaceResult::Combined)
    }

    fn consume(&mut self, item: ItemId, held: Withheld, source: MutationSource) {
        if source == MutationSource::Local && self.config().withhold_consumed {
            self.withhold(item, held);
        } else if let Err(err) = self.destroy_inner(item, source) {
            log::error!("Failed to destroy consumed item {}: {}", item, err);
        }
    }

    /// Take a consumed item out of play without destroying it. Leaving the
    /// container is not a local change, the combine request carries it.
    fn withhold(&mut self, item: ItemId, held: Withheld) {
        match self.items.get(&item).and_then(|i| i.parent()) {
            Some(parent) => {
                self.detach_from(item, parent, MutationSource::Replay);
            }
            None => self.effects.push(Effect::DetachBody(item)),
        }
        log::debug!("Withholding consumed item {} until destruction is confirmed", item);
        self.withheld.insert(item, held);
    }

    /// Undo the conditions of a combine that never happened upstream
    pub(crate) fn reinstate(&mut self, item: ItemId) {
        let Some(held) = self.withheld.remove(&item) else {
            return;
        };
        if let Some(it) = self.items.get_mut(&item) {
            it.set_condition(held.condition);
        }
        if let Some(partner) = self.items.get_mut(&held.partner) {
            partner.set_condition(held.partner_condition);
        }
        log::debug!("Reinstated withheld item {}", item);
    }

    /// Check if `item` was consumed locally and awaits confirmation
    pub fn is_withheld(&self, item: ItemId) -> bool {
        self.withheld.contains_key(&item)
    }

    /// Take combines performed by local mutations, in order
    pub fn drain_combines(&mut self) -> Vec<CombineIntent> {
        std::mem::take(&mut self.combines)
    }

    fn swap(
        &mut self,
        item: ItemId,
        occupant: ItemId,
        container: ContainerId,
        index: usize,
        source: MutationSource,
    ) -> PlaceResult {
        let Some(c) = self.containers.get(&container) else {
            return PlaceResult::Rejected;
        };
        let item_indices = c.find_indices(item);
        let occupant_indices = c.find_indices(occupant);
        let Some(old_index) = item_indices
            .iter()
            .copied()
            .find(|i| c.slot_tag(*i) == Some(SlotTags::ANY))
            .or_else(|| item_indices.first().copied())
        else {
            return PlaceResult::Rejected;
        };
        let item_was_equipped = c.is_equipped(item);

        let checkpoint = SwapCheckpoint {
            slots: c.slots.clone(),
            dirty: c.dirty,
            refs: [self.refs_of(item), self.refs_of(occupant)],
            effects: self.effects.len(),
        };

        if let Some(c) = self.containers.get_mut(&container) {
            for i in item_indices.iter().chain(&occupant_indices) {
                c.slots[*i] = None;
            }
        }

        let sub = PlaceOptions {
            allow_swap: false,
            allow_combine: false,
            source,
        };
        let committed = if item_was_equipped {
            self.place_at(item, container, index, sub).succeeded()
                && self.place_at(occupant, container, old_index, sub).succeeded()
        } else {
            self.place_at(occupant, container, old_index, sub).succeeded()
                && self.place_at(item, container, index, sub).succeeded()
        };

        if committed {
            log::debug!("Swapped items {} and {} in {}", item, occupant, container);
            self.push_event(InventoryEvent::ItemsSwapped {
                container,
                first: item,
                second: occupant,
            });
            PlaceResult::Swapped
        } else {
            log::debug!("Swap of {} and {} in {} rolled back", item, occupant, container);
            self.rollback(container, checkpoint);
            self.highlight(container, index, HighlightKind::Rejected);
            PlaceResult::Rejected
        }
    }

    fn refs_of(&self, item: ItemId) -> (ItemId, Option<ContainerId>, Option<ItemId>) {
        let (parent, owner) = self
            .items
            .get(&item)
            .map(|i| (i.parent, i.container))
            .unwrap_or((None, None));
        (item, parent, owner)
    }

    fn rollback(&mut self, container: ContainerId, checkpoint: SwapCheckpoint) {
        if let Some(c) = self.containers.get_mut(&container) {
            c.slots = checkpoint.slots;
            c.dirty = checkpoint.dirty;
        }
        for (id, parent, owner) in checkpoint.refs {
            if let Some(item) = self.items.get_mut(&id) {
                item.parent = parent;
                item.container = owner;
            }
        }
        self.effects.truncate(checkpoint.effects);
    }

    fn highlight(&mut self, container: ContainerId, index: usize, kind: HighlightKind) {
        self.push_event(InventoryEvent::SlotHighlight { container, index, kind });
    }
}
