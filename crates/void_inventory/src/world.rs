//! Item world: owns every item and container and keeps the containment
//! graph consistent

use crate::config::InventoryConfig;
use crate::equipment::SlotTags;
use crate::error::{InventoryError, InventoryResult};
use crate::hooks::{
    Effect, InventoryEvent, InventoryHooks, MutationSource, NoHooks, NoPhysics, PhysicsBridge,
};
use crate::id::{CharacterId, ContainerId, ItemId, ItemIdAllocator};
use crate::inventory::{Container, ContainerLayout, ContainerOwner};
use crate::item::{Item, ItemPrefab};
use crate::placement::{CombineIntent, Withheld};
use crate::rules::SlotFilter;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Arena of items and containers.
///
/// Items refer to their holders by handle only; the world is the single
/// owner of both, so a move between containers is always a remove followed
/// by an insert and never a copy.
pub struct ItemWorld {
    config: InventoryConfig,
    pub(crate) items: HashMap<ItemId, Item>,
    pub(crate) containers: HashMap<ContainerId, Container>,
    characters: HashMap<CharacterId, [f32; 3]>,
    ids: ItemIdAllocator,
    next_container: u32,
    physics: Box<dyn PhysicsBridge>,
    hooks: Box<dyn InventoryHooks>,
    pub(crate) effects: Vec<Effect>,
    events: VecDeque<InventoryEvent>,
    pub(crate) combines: Vec<CombineIntent>,
    pub(crate) withheld: HashMap<ItemId, Withheld>,
    destroyed: Vec<ItemId>,
}

impl ItemWorld {
    /// Create an empty world with headless collaborators
    pub fn new() -> Self {
        Self {
            config: InventoryConfig::default(),
            items: HashMap::new(),
            containers: HashMap::new(),
            characters: HashMap::new(),
            ids: ItemIdAllocator::new(),
            next_container: 1,
            physics: Box::new(NoPhysics),
            hooks: Box::new(NoHooks),
            effects: Vec::new(),
            events: VecDeque::new(),
            combines: Vec::new(),
            withheld: HashMap::new(),
            destroyed: Vec::new(),
        }
    }

    /// Set configuration
    pub fn with_config(mut self, config: InventoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the physics collaborator
    pub fn with_physics(mut self, physics: Box<dyn PhysicsBridge>) -> Self {
        self.physics = physics;
        self
    }

    /// Set the containment hooks
    pub fn with_hooks(mut self, hooks: Box<dyn InventoryHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    // ---- characters -------------------------------------------------------

    /// Register a character (or move it)
    pub fn set_character_position(&mut self, character: CharacterId, position: [f32; 3]) {
        self.characters.insert(character, position);
    }

    /// Character position
    pub fn character_position(&self, character: CharacterId) -> Option<[f32; 3]> {
        self.characters.get(&character).copied()
    }

    // ---- items ------------------------------------------------------------

    /// Spawn a detached item with a freshly allocated id
    pub fn create_item(&mut self, prefab: Arc<ItemPrefab>) -> InventoryResult<ItemId> {
        let items = &self.items;
        let id = self
            .ids
            .allocate(|id| items.contains_key(&id))
            .ok_or(InventoryError::IdsExhausted)?;
        self.insert_item(id, prefab);
        Ok(id)
    }

    /// Spawn a detached item with an id assigned elsewhere (mirroring a server)
    pub fn spawn_item_with_id(&mut self, id: ItemId, prefab: Arc<ItemPrefab>) -> InventoryResult<ItemId> {
        if self.items.contains_key(&id) {
            return Err(InventoryError::IdInUse(id));
        }
        self.ids.observe(id);
        self.insert_item(id, prefab);
        Ok(id)
    }

    fn insert_item(&mut self, id: ItemId, prefab: Arc<ItemPrefab>) {
        let own = prefab.own_capacity.map(|capacity| {
            let container = self.allocate_container(ContainerOwner::Item(id), capacity);
            if let Some(filter) = &prefab.contents_filter {
                if let Some(c) = self.containers.get_mut(&container) {
                    c.filter = Some(filter.clone());
                }
            }
            container
        });
        let mut item = Item::new(id, prefab);
        item.own_inventory = own;
        self.items.insert(id, item);
        log::debug!("Created item {} ({})", id, self.items[&id].identifier());
    }

    /// Look up an item
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Mutable item access (condition, tags)
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// All live items
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Update the last known world position of a loose item
    pub fn set_item_position(&mut self, id: ItemId, position: [f32; 3]) {
        if let Some(item) = self.items.get_mut(&id) {
            item.position = position;
        }
    }

    // ---- containers -------------------------------------------------------

    fn allocate_container(&mut self, owner: ContainerOwner, capacity: usize) -> ContainerId {
        let id = ContainerId(self.next_container);
        self.next_container += 1;
        self.containers.insert(id, Container::new(id, owner, capacity));
        id
    }

    /// Create a plain container
    pub fn create_container(&mut self, owner: ContainerOwner, capacity: usize) -> ContainerId {
        let id = self.allocate_container(owner, capacity);
        if let ContainerOwner::Item(owner) = owner {
            if let Some(item) = self.items.get_mut(&owner) {
                item.own_inventory.get_or_insert(id);
            }
        }
        id
    }

    /// Create an equipment container with one tag per slot
    pub fn create_equipment(&mut self, character: CharacterId, slot_tags: Vec<SlotTags>) -> ContainerId {
        let id = ContainerId(self.next_container);
        self.next_container += 1;
        self.containers.insert(
            id,
            Container::with_slot_tags(id, ContainerOwner::Character(character), slot_tags),
        );
        self.characters.entry(character).or_insert([0.0; 3]);
        id
    }

    /// Look up a container
    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    /// All containers
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// Set the acceptance predicate of a container
    pub fn set_filter(&mut self, container: ContainerId, filter: Option<Arc<dyn SlotFilter>>) {
        if let Some(c) = self.containers.get_mut(&container) {
            c.filter = filter;
        }
    }

    /// Lock or unlock a container
    pub fn set_locked(&mut self, container: ContainerId, locked: bool) {
        if let Some(c) = self.containers.get_mut(&container) {
            c.locked = locked;
        }
    }

    /// Allow or forbid swapping items already inside a container
    pub fn set_allow_swapping(&mut self, container: ContainerId, allow: bool) {
        if let Some(c) = self.containers.get_mut(&container) {
            c.allow_swapping = allow;
        }
    }

    // ---- synchronization bookkeeping --------------------------------------

    pub(crate) fn mark_dirty(&mut self, container: ContainerId, source: MutationSource) {
        if source == MutationSource::Local {
            if let Some(c) = self.containers.get_mut(&container) {
                c.dirty = true;
            }
        }
    }

    /// Schedule a container for synchronization regardless of mutation source
    pub fn mark_container_dirty(&mut self, container: ContainerId) {
        self.mark_dirty(container, MutationSource::Local);
    }

    /// Take every container changed by a local mutation, in handle order
    pub fn drain_dirty(&mut self) -> Vec<ContainerId> {
        let mut dirty: Vec<ContainerId> = self
            .containers
            .values_mut()
            .filter(|c| c.dirty)
            .map(|c| {
                c.dirty = false;
                c.id()
            })
            .collect();
        dirty.sort();
        dirty
    }

    /// Take items destroyed by local mutations, in destruction order
    pub fn drain_destroyed(&mut self) -> Vec<ItemId> {
        std::mem::take(&mut self.destroyed)
    }

    // ---- events -----------------------------------------------------------

    /// Take queued inventory events
    pub fn drain_events(&mut self) -> Vec<InventoryEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn push_event(&mut self, event: InventoryEvent) {
        self.effects.push(Effect::Event(event));
    }

    /// Dispatch recorded effects to the collaborators
    pub(crate) fn flush_effects(&mut self) {
        for effect in std::mem::take(&mut self.effects) {
            match effect {
                Effect::DetachBody(item) => self.physics.detach_body(item),
                Effect::ReattachBody(item, position) => self.physics.reattach_body(item, position),
                Effect::Contained { owner, item } => self.hooks.on_contained(owner, item),
                Effect::Removed { owner, item } => self.hooks.on_removed(owner, item),
                Effect::Event(event) => {
                    match &event {
                        InventoryEvent::Equipped { item, wearer } => {
                            self.hooks.on_equipped(*item, *wearer)
                        }
                        InventoryEvent::Unequipped { item, wearer } => {
                            self.hooks.on_unequipped(*item, *wearer)
                        }
                        _ => {}
                    }
                    self.events.push_back(event);
                }
            }
        }
    }

    /// Wearer whose body slot the item occupies
    pub fn wearer_of(&self, item: ItemId) -> Option<CharacterId> {
        let parent = self.items.get(&item)?.parent?;
        let container = self.containers.get(&parent)?;
        if container.is_equipped(item) {
            container.owner_character()
        } else {
            None
        }
    }

    pub(crate) fn equip_states(&self, items: &[ItemId]) -> Vec<(ItemId, Option<CharacterId>)> {
        items.iter().map(|i| (*i, self.wearer_of(*i))).collect()
    }

    /// Record equip/unequip transitions relative to `before`
    pub(crate) fn emit_transitions(&mut self, before: &[(ItemId, Option<CharacterId>)]) {
        for (item, was) in before {
            let now = self.wearer_of(*item);
            if *was == now {
                continue;
            }
            if let Some(wearer) = was {
                log::debug!("Item {} unequipped from {}", item, wearer);
                self.push_event(InventoryEvent::Unequipped { item: *item, wearer: *wearer });
            }
            if let Some(wearer) = now {
                log::debug!("Item {} equipped by {}", item, wearer);
                self.push_event(InventoryEvent::Equipped { item: *item, wearer });
            }
        }
    }

    /// Run a mutation, then record transitions and dispatch its effects
    pub(crate) fn commit<R>(&mut self, involved: &[ItemId], op: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.equip_states(involved);
        let result = op(self);
        self.emit_transitions(&before);
        self.flush_effects();
        result
    }

    // ---- queries ----------------------------------------------------------

    /// Check if `item` may go into `container[index]` right now
    pub fn can_accept(&self, item: ItemId, container: ContainerId, index: usize) -> bool {
        let (Some(c), Some(it)) = (self.containers.get(&container), self.items.get(&item)) else {
            return false;
        };
        if c.owner() == ContainerOwner::None || c.locked {
            return false;
        }
        match c.slots.get(index) {
            Some(None) => {}
            _ => return false,
        }
        if let Some(filter) = &c.filter {
            if !filter.accepts(it) {
                return false;
            }
        }
        if let ContainerLayout::Equip(tags) = c.layout() {
            let tag = tags[index];
            if !it.allowed_slots().iter().any(|g| g.intersects(tag)) {
                return false;
            }
        }
        matches!(self.would_create_cycle(item, container), Ok(false))
    }

    /// First slot that would accept the item; `None` if it is already inside
    /// or nothing fits
    pub fn find_free_slot(&self, item: ItemId, container: ContainerId) -> Option<usize> {
        let c = self.containers.get(&container)?;
        if c.contains(item) {
            return None;
        }
        (0..c.capacity()).find(|i| self.can_accept(item, container, *i))
    }

    /// First item whose tag, identifier or name equals `key`
    pub fn find_by_tag_or_name(&self, container: ContainerId, key: &str) -> Option<ItemId> {
        let c = self.containers.get(&container)?;
        c.slots
            .iter()
            .flatten()
            .copied()
            .find(|id| self.items.get(id).is_some_and(|i| i.matches_key(key)))
    }

    /// First item matching `predicate`, optionally descending into the own
    /// inventories of contained items
    pub fn find_item(
        &self,
        container: ContainerId,
        predicate: &dyn Fn(&Item) -> bool,
        recursive: bool,
    ) -> Option<ItemId> {
        let contents = self.containers.get(&container)?.all_items();
        let direct = contents
            .iter()
            .copied()
            .find(|id| self.items.get(id).is_some_and(|i| predicate(i)));
        if direct.is_some() || !recursive {
            return direct;
        }
        contents.iter().find_map(|id| {
            let own = self.items.get(id)?.own_inventory?;
            self.find_item(own, predicate, true)
        })
    }

    /// Every item matching `predicate`
    pub fn find_all_items(
        &self,
        container: ContainerId,
        predicate: &dyn Fn(&Item) -> bool,
        recursive: bool,
    ) -> Vec<ItemId> {
        let mut found = Vec::new();
        self.collect_items(container, predicate, recursive, &mut found);
        found
    }

    fn collect_items(
        &self,
        container: ContainerId,
        predicate: &dyn Fn(&Item) -> bool,
        recursive: bool,
        found: &mut Vec<ItemId>,
    ) {
        let Some(c) = self.containers.get(&container) else {
            return;
        };
        for id in c.all_items() {
            let Some(item) = self.items.get(&id) else {
                continue;
            };
            if predicate(item) {
                found.push(id);
            }
            if recursive {
                if let Some(own) = item.own_inventory {
                    self.collect_items(own, predicate, true, found);
                }
            }
        }
    }

    /// Check if the item occupies a slot whose tag is covered by `tags`
    pub fn is_in_slot(&self, item: ItemId, tags: SlotTags) -> bool {
        let Some(parent) = self.items.get(&item).and_then(|i| i.parent) else {
            return false;
        };
        let Some(c) = self.containers.get(&parent) else {
            return false;
        };
        c.find_indices(item)
            .into_iter()
            .filter_map(|i| c.slot_tag(i))
            .any(|tag| tags.contains(tag))
    }

    /// Items occupying body slots of an equipment container
    pub fn equipped_items(&self, container: ContainerId) -> Vec<ItemId> {
        self.containers
            .get(&container)
            .map(|c| c.all_items().into_iter().filter(|i| c.is_equipped(*i)).collect())
            .unwrap_or_default()
    }

    /// Position a dropped item would reappear at
    pub(crate) fn holder_position(&self, container: ContainerId) -> [f32; 3] {
        let mut current = container;
        for _ in 0..=self.config.max_nesting_depth {
            let Some(c) = self.containers.get(&current) else {
                break;
            };
            match c.owner() {
                ContainerOwner::Character(character) => {
                    return self.characters.get(&character).copied().unwrap_or_default();
                }
                ContainerOwner::Item(owner) => match self.items.get(&owner) {
                    Some(owner) => match owner.parent {
                        Some(parent) => current = parent,
                        None => return owner.position,
                    },
                    None => break,
                },
                ContainerOwner::None => break,
            }
        }
        [0.0; 3]
    }

    // ---- mutation primitives ----------------------------------------------

    /// Write `item` into `indices` of `container`, detaching it from wherever
    /// it lived before when `detach_prior` is set.
    pub(crate) fn place_in_slots(
        &mut self,
        item: ItemId,
        container: ContainerId,
        indices: &[usize],
        detach_prior: bool,
        source: MutationSource,
    ) -> InventoryResult<()> {
        let prior = self.items.get(&item).ok_or(InventoryError::UnknownItem(item))?.parent;
        {
            let c = self
                .containers
                .get(&container)
                .ok_or(InventoryError::UnknownContainer(container))?;
            for &index in indices {
                match c.slots.get(index) {
                    None => return Err(InventoryError::SlotOutOfRange { container, index }),
                    Some(Some(other)) if *other != item => {
                        return Err(InventoryError::SlotOccupied { container, index })
                    }
                    _ => {}
                }
            }
        }
        if self.would_create_cycle(item, container)? {
            log::error!("Refused to place item {} inside {}: containment cycle", item, container);
            return Err(InventoryError::ContainmentCycle { item, container });
        }

        if prior.is_none() && self.withheld.contains_key(&item) {
            self.reinstate(item);
        }

        match prior {
            Some(p) if p == container => {
                if let Some(c) = self.containers.get_mut(&container) {
                    c.clear_item(item);
                }
            }
            Some(p) if detach_prior => {
                self.detach_from(item, p, source);
            }
            Some(p) => {
                log::error!("Item {} is already held by {}", item, p);
                return Err(InventoryError::DuplicateOwnership { item, holder: p });
            }
            None => {}
        }

        let owner_item = {
            let c = self
                .containers
                .get_mut(&container)
                .ok_or(InventoryError::UnknownContainer(container))?;
            for &index in indices {
                c.slots[index] = Some(item);
            }
            c.owner_item()
        };
        if let Some(it) = self.items.get_mut(&item) {
            it.parent = Some(container);
            it.container = owner_item;
        }

        if prior.is_none() {
            self.effects.push(Effect::DetachBody(item));
        }
        if prior != Some(container) {
            if let Some(owner) = owner_item {
                self.effects.push(Effect::Contained { owner, item });
            }
        }
        self.push_event(InventoryEvent::ItemPlaced {
            item,
            container,
            slots: indices.to_vec(),
        });
        self.mark_dirty(container, source);
        Ok(())
    }

    /// Clear every slot of `container` holding `item` and null its back
    /// references. Returns false if the item was not there.
    pub(crate) fn detach_from(&mut self, item: ItemId, container: ContainerId, source: MutationSource) -> bool {
        let Some(c) = self.containers.get_mut(&container) else {
            return false;
        };
        if c.clear_item(item).is_empty() {
            return false;
        }
        let owner_item = c.owner_item();
        if let Some(it) = self.items.get_mut(&item) {
            if it.parent == Some(container) {
                it.parent = None;
                it.container = None;
            }
        }
        if let Some(owner) = owner_item {
            self.effects.push(Effect::Removed { owner, item });
        }
        self.push_event(InventoryEvent::ItemRemoved { item, container });
        self.mark_dirty(container, source);
        true
    }

    fn drop_inner(&mut self, item: ItemId, source: MutationSource) -> bool {
        let Some(parent) = self.items.get(&item).and_then(|i| i.parent) else {
            return false;
        };
        let position = self.holder_position(parent);
        if !self.detach_from(item, parent, source) {
            return false;
        }
        if let Some(it) = self.items.get_mut(&item) {
            it.position = position;
        }
        self.effects.push(Effect::ReattachBody(item, position));
        self.push_event(InventoryEvent::ItemDropped { item, position });
        true
    }

    pub(crate) fn destroy_inner(&mut self, item: ItemId, source: MutationSource) -> InventoryResult<()> {
        let (parent, own, position) = {
            let it = self.items.get(&item).ok_or(InventoryError::UnknownItem(item))?;
            (it.parent, it.own_inventory, it.position)
        };
        let position = parent.map(|p| self.holder_position(p)).unwrap_or(position);

        if let Some(own) = own {
            let contents = self.containers.get(&own).map(|c| c.all_items()).unwrap_or_default();
            for content in contents {
                self.detach_from(content, own, source);
                if let Some(it) = self.items.get_mut(&content) {
                    it.position = position;
                }
                self.effects.push(Effect::ReattachBody(content, position));
                self.push_event(InventoryEvent::ItemDropped { item: content, position });
            }
            self.containers.remove(&own);
        }
        if let Some(parent) = parent {
            self.detach_from(item, parent, source);
        }
        self.items.remove(&item);
        self.withheld.remove(&item);
        if source == MutationSource::Local {
            self.destroyed.push(item);
        }
        self.push_event(InventoryEvent::ItemDestroyed { item });
        log::debug!("Destroyed item {}", item);
        Ok(())
    }

    fn delete_recursive(&mut self, item: ItemId, source: MutationSource) -> InventoryResult<()> {
        let own = self.items.get(&item).and_then(|i| i.own_inventory);
        if let Some(own) = own {
            let contents = self.containers.get(&own).map(|c| c.all_items()).unwrap_or_default();
            for content in contents {
                self.delete_recursive(content, source)?;
            }
        }
        self.destroy_inner(item, source)
    }

    // ---- public mutations -------------------------------------------------

    /// Write `item` into `container[index]` without acceptance checks.
    ///
    /// Callers check [`can_accept`](Self::can_accept) first. Duplicate
    /// ownership and containment cycles are still refused.
    pub fn place(
        &mut self,
        item: ItemId,
        container: ContainerId,
        index: usize,
        detach_prior: bool,
        source: MutationSource,
    ) -> InventoryResult<()> {
        self.commit(&[item], |world| {
            world.place_in_slots(item, container, &[index], detach_prior, source)
        })
    }

    /// Place authoritative state the local rules would reject (filters,
    /// tags, locks). Moves the item out of its previous holder.
    pub fn force_to_slot(
        &mut self,
        item: ItemId,
        container: ContainerId,
        index: usize,
        source: MutationSource,
    ) -> InventoryResult<()> {
        self.force_to_slots(item, container, &[index], source)
    }

    /// [`force_to_slot`](Self::force_to_slot) for an item spanning several
    /// slots. Replaces the item's current slots in `container`.
    pub fn force_to_slots(
        &mut self,
        item: ItemId,
        container: ContainerId,
        indices: &[usize],
        source: MutationSource,
    ) -> InventoryResult<()> {
        self.commit(&[item], |world| {
            world.place_in_slots(item, container, indices, true, source)
        })
    }

    /// Remove the item from every slot of `container`. No-op if absent.
    pub fn remove(&mut self, item: ItemId, container: ContainerId, source: MutationSource) -> bool {
        self.commit(&[item], |world| world.detach_from(item, container, source))
    }

    /// Take the item out of its container and put it back into the world at
    /// the position of its former holder
    pub fn drop_item(&mut self, item: ItemId, source: MutationSource) -> bool {
        self.commit(&[item], |world| world.drop_inner(item, source))
    }

    /// Destroy an item. Its own contents are dropped, not destroyed.
    pub fn destroy_item(&mut self, item: ItemId, source: MutationSource) -> InventoryResult<()> {
        self.commit(&[item], |world| world.destroy_inner(item, source))
    }

    /// Destroy every item in a container, recursing into their own inventories
    pub fn delete_all_items(&mut self, container: ContainerId, source: MutationSource) -> InventoryResult<()> {
        let contents = self
            .containers
            .get(&container)
            .ok_or(InventoryError::UnknownContainer(container))?
            .all_items();
        self.commit(&contents, |world| {
            contents
                .iter()
                .try_for_each(|item| world.delete_recursive(*item, source))
        })
    }

    // ---- integrity --------------------------------------------------------

    /// Audit the whole containment graph
    pub fn verify_integrity(&self) -> InventoryResult<()> {
        let mut holder: HashMap<ItemId, ContainerId> = HashMap::new();
        for c in self.containers.values() {
            for id in c.slots.iter().flatten() {
                let item = self.items.get(id).ok_or(InventoryError::UnknownItem(*id))?;
                if let Some(previous) = holder.insert(*id, c.id()) {
                    if previous != c.id() {
                        return Err(InventoryError::DuplicateOwnership {
                            item: *id,
                            holder: previous,
                        });
                    }
                }
                if item.parent != Some(c.id()) || item.container != c.owner_item() {
                    return Err(InventoryError::BrokenBackReference(*id));
                }
            }
        }

        for item in self.items.values() {
            if let Some(parent) = item.parent {
                if holder.get(&item.id()) != Some(&parent) {
                    return Err(InventoryError::BrokenBackReference(item.id()));
                }
            }
            if let Some(own) = item.own_inventory {
                let mut seen = HashSet::new();
                let mut current = item.parent;
                while let Some(c) = current {
                    if !seen.insert(c) {
                        break;
                    }
                    if c == own {
                        return Err(InventoryError::ContainmentCycle {
                            item: item.id(),
                            container: own,
                        });
                    }
                    current = self
                        .containers
                        .get(&c)
                        .and_then(|c| c.owner_item())
                        .and_then(|o| self.items.get(&o))
                        .and_then(|o| o.parent);
                }
            }
        }
        Ok(())
    }
}

impl Default for ItemWorld {
    fn default() -> Self {
        Self::new()
    }
}
