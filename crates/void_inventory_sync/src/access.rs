//! Server-side access control

use void_inventory::{CharacterId, ContainerId, ContainerOwner, ItemId, ItemWorld};

/// Decides whether a client's character may change a container or take an
/// item out of wherever it is
pub trait AccessControl {
    fn can_access(&self, actor: CharacterId, world: &ItemWorld, container: ContainerId) -> bool;

    /// Held items follow their container. Loose items are refused unless
    /// the policy says otherwise.
    fn can_take(&self, actor: CharacterId, world: &ItemWorld, item: ItemId) -> bool {
        match world.item(item).and_then(|i| i.parent()) {
            Some(parent) => self.can_access(actor, world, parent),
            None => false,
        }
    }
}

impl<F> AccessControl for F
where
    F: Fn(CharacterId, &ItemWorld, ContainerId) -> bool,
{
    fn can_access(&self, actor: CharacterId, world: &ItemWorld, container: ContainerId) -> bool {
        self(actor, world, container)
    }
}

/// Grants everything. Single-player and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn can_access(&self, _actor: CharacterId, _world: &ItemWorld, _container: ContainerId) -> bool {
        true
    }

    fn can_take(&self, _actor: CharacterId, _world: &ItemWorld, _item: ItemId) -> bool {
        true
    }
}

/// Grants access to containers carried by the actor, and to loose items
/// (and their contents) within reach of the actor's character. Containers
/// carried by other characters are off limits.
#[derive(Debug, Clone, Copy)]
pub struct CarrierAccess {
    /// Largest distance between character and loose item
    pub reach: f32,
}

impl CarrierAccess {
    pub const DEFAULT_REACH: f32 = 2.5;

    pub fn new(reach: f32) -> Self {
        Self { reach }
    }

    fn within_reach(&self, actor: CharacterId, world: &ItemWorld, item: ItemId) -> bool {
        let (Some(at), Some(item)) = (world.character_position(actor), world.item(item)) else {
            return false;
        };
        let position = item.position();
        let distance_sq: f32 = at.iter().zip(position).map(|(a, b)| (a - b) * (a - b)).sum();
        distance_sq <= self.reach * self.reach
    }
}

impl Default for CarrierAccess {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REACH)
    }
}

impl AccessControl for CarrierAccess {
    fn can_access(&self, actor: CharacterId, world: &ItemWorld, container: ContainerId) -> bool {
        match root_owner(world, container) {
            Some(ContainerOwner::Character(carrier)) => carrier == actor,
            Some(ContainerOwner::Item(root)) => self.within_reach(actor, world, root),
            Some(ContainerOwner::None) | None => false,
        }
    }

    fn can_take(&self, actor: CharacterId, world: &ItemWorld, item: ItemId) -> bool {
        match world.item(item).and_then(|i| i.parent()) {
            Some(parent) => self.can_access(actor, world, parent),
            None => self.within_reach(actor, world, item),
        }
    }
}

/// Outermost holder of a container: the character carrying it, or the
/// loose item at the top of the chain
pub fn root_owner(world: &ItemWorld, container: ContainerId) -> Option<ContainerOwner> {
    let mut current = container;
    for _ in 0..=world.config().max_nesting_depth {
        let owner = world.container(current)?.owner();
        match owner {
            ContainerOwner::Item(item) => match world.item(item)?.parent() {
                Some(parent) => current = parent,
                None => return Some(owner),
            },
            _ => return Some(owner),
        }
    }
    None
}
