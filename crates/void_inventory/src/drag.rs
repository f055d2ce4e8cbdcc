//! Drag-and-drop gestures

use crate::hooks::MutationSource;
use crate::id::{ContainerId, ItemId};
use crate::placement::PlaceOptions;
use crate::world::ItemWorld;

/// Where the pointer was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// A specific slot
    Slot { container: ContainerId, index: usize },
    /// A container as a whole (its window or owner), first acceptable slot
    Container(ContainerId),
    /// Outside every inventory
    World,
}

/// How a gesture ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Item placed, combined, swapped or left where it was
    Placed,
    /// Target refused; the item stays in its origin slot
    Rejected,
    /// Item dropped into the world
    Dropped,
    /// Item vanished or moved elsewhere during the gesture
    Cancelled,
}

/// One drag gesture, from pointer-down over an occupied slot to release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    item: ItemId,
    origin: ContainerId,
    origin_index: usize,
}

impl DragSession {
    /// Start dragging the item in `container[index]`. `None` for an empty slot.
    pub fn begin(world: &ItemWorld, container: ContainerId, index: usize) -> Option<Self> {
        let item = world.container(container)?.item_at(index)?;
        log::debug!("Dragging item {} from {}[{}]", item, container, index);
        Some(Self {
            item,
            origin: container,
            origin_index: index,
        })
    }

    /// Item being dragged
    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Container the gesture started in
    pub fn origin(&self) -> ContainerId {
        self.origin
    }

    /// Slot the gesture started in
    pub fn origin_index(&self) -> usize {
        self.origin_index
    }

    /// Check if the item is still where the gesture picked it up
    pub fn is_valid(&self, world: &ItemWorld) -> bool {
        world
            .item(self.item)
            .is_some_and(|item| item.parent() == Some(self.origin))
    }

    /// Resolve the gesture
    pub fn release(self, world: &mut ItemWorld, target: DropTarget) -> DragOutcome {
        if !self.is_valid(world) {
            log::debug!("Drag of item {} cancelled", self.item);
            return DragOutcome::Cancelled;
        }

        match target {
            DropTarget::Slot { container, index } => {
                if world.try_place_at(self.item, container, index, PlaceOptions::local()).succeeded() {
                    DragOutcome::Placed
                } else {
                    DragOutcome::Rejected
                }
            }
            DropTarget::Container(container) if container == self.origin => DragOutcome::Placed,
            DropTarget::Container(container) => {
                if world.try_put_item(self.item, container, MutationSource::Local) {
                    DragOutcome::Placed
                } else if world.drop_item(self.item, MutationSource::Local) {
                    DragOutcome::Dropped
                } else {
                    DragOutcome::Rejected
                }
            }
            DropTarget::World => {
                if world.drop_item(self.item, MutationSource::Local) {
                    DragOutcome::Dropped
                } else {
                    DragOutcome::Rejected
                }
            }
        }
    }
}

/// Drag state of one input handler
#[derive(Debug, Default)]
pub struct DragContext {
    session: Option<DragSession>,
}

impl DragContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer pressed over a slot. Returns true if a drag started.
    pub fn pointer_down(&mut self, world: &ItemWorld, container: ContainerId, index: usize) -> bool {
        self.session = DragSession::begin(world, container, index);
        self.session.is_some()
    }

    /// Item under the pointer, if the drag is still valid
    pub fn currently_dragged_item(&mut self, world: &ItemWorld) -> Option<ItemId> {
        if self.session.is_some_and(|s| !s.is_valid(world)) {
            self.session = None;
        }
        self.session.map(|s| s.item())
    }

    /// Pointer released. `None` if nothing was being dragged.
    pub fn pointer_up(&mut self, world: &mut ItemWorld, target: DropTarget) -> Option<DragOutcome> {
        self.session.take().map(|s| s.release(world, target))
    }

    /// Abort the gesture without touching the world
    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// Active session
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }
}
