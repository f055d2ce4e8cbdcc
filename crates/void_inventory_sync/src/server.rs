//! Authoritative server role

use crate::access::AccessControl;
use crate::apply::{drop_mismatched, resolve_ids};
use crate::codec::{decode_message, decode_slots, encode_slots};
use crate::error::{SyncError, SyncResult};
use crate::message::SyncMessage;
use void_inventory::{CharacterId, ContainerId, ItemId, ItemWorld, MutationSource, PlaceOptions, PlaceResult};

/// Server side of inventory synchronization.
///
/// Requests that fail access checks or do not decode are dropped without a
/// reply; the next broadcast corrects the client.
pub struct ServerSync {
    access: Box<dyn AccessControl>,
}

impl ServerSync {
    pub fn new(access: Box<dyn AccessControl>) -> Self {
        Self { access }
    }

    /// Snapshot every container changed since the last call, followed by
    /// the items destroyed since then
    pub fn collect_broadcasts(&mut self, world: &mut ItemWorld) -> Vec<SyncMessage> {
        // combines done here are already part of the state
        world.drain_combines();

        let mut out: Vec<SyncMessage> = world
            .drain_dirty()
            .into_iter()
            .filter_map(|container| match encode_slots(world, container) {
                Ok(payload) => Some(SyncMessage::StateBroadcast { container, payload }),
                Err(err) => {
                    log::warn!("Skipping broadcast of {}: {}", container, err);
                    None
                }
            })
            .collect();

        let destroyed: Vec<u16> = world.drain_destroyed().into_iter().map(ItemId::raw).collect();
        if !destroyed.is_empty() {
            out.push(SyncMessage::ItemsDestroyed { items: destroyed });
        }
        out
    }

    /// Parse and handle a framed client message
    pub fn handle_frame(&mut self, world: &mut ItemWorld, actor: CharacterId, frame: &[u8]) -> Vec<SyncMessage> {
        match decode_message(frame) {
            Ok(message) => self.handle_request(world, actor, &message),
            Err(err) => {
                log::debug!("Dropping malformed frame from {}: {}", actor, err);
                Vec::new()
            }
        }
    }

    /// Apply a client's requested container state or combine. Returns the
    /// broadcasts to send right away, empty if the request was dropped.
    pub fn handle_request(
        &mut self,
        world: &mut ItemWorld,
        actor: CharacterId,
        message: &SyncMessage,
    ) -> Vec<SyncMessage> {
        let result = match message {
            SyncMessage::StateRequest { container, payload } => {
                self.apply_request(world, actor, *container, payload)
            }
            SyncMessage::CombineRequest {
                container,
                index,
                incoming,
            } => self.apply_combine(world, actor, *container, *index, *incoming),
            _ => {
                log::debug!("Ignoring broadcast sent by client {}", actor);
                return Vec::new();
            }
        };

        match result {
            Ok(true) => self.collect_broadcasts(world),
            Ok(false) => Vec::new(),
            Err(err) => {
                log::debug!("Dropping request from {}: {}", actor, err);
                Vec::new()
            }
        }
    }

    /// Container checks shared by every request kind
    fn may_change(&self, world: &ItemWorld, actor: CharacterId, container: ContainerId) -> SyncResult<bool> {
        let c = world
            .container(container)
            .ok_or(SyncError::UnknownContainer(container))?;
        if !self.access.can_access(actor, world, container) {
            log::debug!("{} may not access {}", actor, container);
            return Ok(false);
        }
        if c.is_locked() {
            log::debug!("{} is locked, ignoring request from {}", container, actor);
            return Ok(false);
        }
        Ok(true)
    }

    /// Items pulled in from elsewhere must come out of an unlocked container
    /// or off the floor, and the access policy must allow taking them
    fn may_take(&self, world: &ItemWorld, actor: CharacterId, container: ContainerId, item: ItemId) -> bool {
        let source = world.item(item).and_then(|i| i.parent());
        if source == Some(container) {
            return true;
        }
        if let Some(source) = source {
            if world.container(source).map_or(true, |c| c.is_locked()) {
                log::debug!("{} may not take item {} out of locked {}", actor, item, source);
                return false;
            }
        }
        if !self.access.can_take(actor, world, item) {
            log::debug!("{} may not take item {}", actor, item);
            return false;
        }
        true
    }

    fn apply_request(
        &self,
        world: &mut ItemWorld,
        actor: CharacterId,
        container: ContainerId,
        payload: &[u8],
    ) -> SyncResult<bool> {
        if !self.may_change(world, actor, container)? {
            return Ok(false);
        }
        let capacity = world
            .container(container)
            .ok_or(SyncError::UnknownContainer(container))?
            .capacity();
        let ids = decode_slots(payload, capacity)?;
        let wanted = resolve_ids(world, container, &ids);

        if !wanted.iter().flatten().all(|item| self.may_take(world, actor, container, *item)) {
            return Ok(false);
        }

        drop_mismatched(world, container, &wanted, MutationSource::Local);
        for (index, want) in wanted.iter().enumerate() {
            if let Some(item) = want {
                world.try_place_at(*item, container, index, PlaceOptions::local());
            }
        }
        // the requester gets the outcome even if nothing changed
        world.mark_container_dirty(container);
        Ok(true)
    }

    fn apply_combine(
        &self,
        world: &mut ItemWorld,
        actor: CharacterId,
        container: ContainerId,
        index: usize,
        incoming: u16,
    ) -> SyncResult<bool> {
        if !self.may_change(world, actor, container)? {
            return Ok(false);
        }
        let target = world.container(container).and_then(|c| c.item_at(index));
        let Some(item) = ItemId::new(incoming).filter(|id| world.item(*id).is_some()) else {
            log::debug!("Combine request from {} names unknown item {}", actor, incoming);
            return Ok(false);
        };
        if target.is_none() || target == Some(item) {
            log::debug!("Nothing at slot {} of {} for {} to combine with", index, container, item);
            return Ok(false);
        }
        if !self.may_take(world, actor, container, item) {
            return Ok(false);
        }

        let source = world.item(item).and_then(|i| i.parent());
        let result = world.try_place_at(item, container, index, PlaceOptions::local().with_swap(false));
        if result != PlaceResult::Combined {
            log::debug!("Combine of {} into {} slot {} refused ({:?})", item, container, index, result);
            // the client predicted a combine, send both sides back
            if let Some(source) = source {
                world.mark_container_dirty(source);
            }
        }
        world.mark_container_dirty(container);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AllowAll, CarrierAccess};
    use crate::codec::{encode_ids, encode_message};
    use std::sync::Arc;
    use void_inventory::{ContainerOwner, ItemPrefab, StackMergeRule};

    struct Fixture {
        world: ItemWorld,
        pockets: ContainerId,
        locker: ContainerId,
        flare: ItemId,
    }

    const ALICE: CharacterId = CharacterId(1);
    const BOB: CharacterId = CharacterId(2);

    fn fixture() -> Fixture {
        let mut world = ItemWorld::new();
        let pockets = world.create_container(ContainerOwner::Character(ALICE), 3);
        let locker = world.create_container(ContainerOwner::Character(BOB), 3);
        let flare = world.create_item(Arc::new(ItemPrefab::new("flare", "Flare"))).unwrap();
        world.place(flare, pockets, 0, true, MutationSource::Local).unwrap();
        world.drain_dirty();
        Fixture {
            world,
            pockets,
            locker,
            flare,
        }
    }

    fn ammo() -> Arc<ItemPrefab> {
        Arc::new(
            ItemPrefab::new("rounds", "Rounds")
                .with_max_condition(30.0)
                .with_combine(Arc::new(StackMergeRule)),
        )
    }

    /// Pockets holding a 20 round stack at slot 1 and a 5 round stack at slot 2
    fn with_rounds(f: &mut Fixture) -> (ItemId, ItemId) {
        let full = f.world.create_item(ammo()).unwrap();
        let partial = f.world.create_item(ammo()).unwrap();
        f.world.item_mut(full).unwrap().set_condition(20.0);
        f.world.item_mut(partial).unwrap().set_condition(5.0);
        f.world.place(full, f.pockets, 1, true, MutationSource::Replay).unwrap();
        f.world.place(partial, f.pockets, 2, true, MutationSource::Replay).unwrap();
        (full, partial)
    }

    fn request(container: ContainerId, ids: &[u16]) -> SyncMessage {
        SyncMessage::StateRequest {
            container,
            payload: encode_ids(ids),
        }
    }

    #[test]
    fn test_applies_and_rebroadcasts() {
        let mut f = fixture();
        let mut server = ServerSync::new(Box::new(AllowAll));

        let out = server.handle_request(&mut f.world, ALICE, &request(f.pockets, &[0, 0, f.flare.raw()]));

        assert_eq!(f.world.container(f.pockets).unwrap().item_at(2), Some(f.flare));
        assert_eq!(
            out,
            vec![SyncMessage::StateBroadcast {
                container: f.pockets,
                payload: encode_ids(&[0, 0, f.flare.raw()]),
            }]
        );
    }

    #[test]
    fn test_move_rebroadcasts_both_containers() {
        let mut f = fixture();
        let mut server = ServerSync::new(Box::new(AllowAll));

        let out = server.handle_request(&mut f.world, BOB, &request(f.locker, &[f.flare.raw(), 0, 0]));

        let containers: Vec<ContainerId> = out.iter().filter_map(|m| m.container()).collect();
        assert_eq!(containers, vec![f.pockets, f.locker]);
        assert!(f.world.container(f.pockets).unwrap().is_empty());
    }

    #[test]
    fn test_unauthorized_request_dropped() {
        let mut f = fixture();
        let mut server = ServerSync::new(Box::new(CarrierAccess::default()));

        let out = server.handle_request(&mut f.world, BOB, &request(f.pockets, &[0, 0, 0]));

        assert!(out.is_empty());
        assert_eq!(f.world.container(f.pockets).unwrap().item_at(0), Some(f.flare));
    }

    #[test]
    fn test_taking_from_foreign_container_dropped() {
        let mut f = fixture();
        let mut server = ServerSync::new(Box::new(CarrierAccess::default()));

        // Bob owns the locker but may not pull Alice's flare into it
        let out = server.handle_request(&mut f.world, BOB, &request(f.locker, &[f.flare.raw(), 0, 0]));

        assert!(out.is_empty());
        assert!(f.world.container(f.locker).unwrap().is_empty());
    }

    #[test]
    fn test_far_loose_item_dropped() {
        let mut f = fixture();
        let wrench = f.world.create_item(Arc::new(ItemPrefab::new("wrench", "Wrench"))).unwrap();
        f.world.set_character_position(ALICE, [0.0, 0.0, 0.0]);
        f.world.set_item_position(wrench, [100.0, 0.0, 0.0]);
        let mut server = ServerSync::new(Box::new(CarrierAccess::default()));

        let out = server.handle_request(
            &mut f.world,
            ALICE,
            &request(f.pockets, &[f.flare.raw(), wrench.raw(), 0]),
        );

        assert!(out.is_empty());
        assert!(f.world.item(wrench).unwrap().parent().is_none());
        assert_eq!(f.world.container(f.pockets).unwrap().item_at(1), None);
    }

    #[test]
    fn test_loose_item_within_reach_picked_up() {
        let mut f = fixture();
        let wrench = f.world.create_item(Arc::new(ItemPrefab::new("wrench", "Wrench"))).unwrap();
        f.world.set_character_position(ALICE, [0.0, 0.0, 0.0]);
        f.world.set_item_position(wrench, [1.0, 0.0, 0.0]);
        let mut server = ServerSync::new(Box::new(CarrierAccess::default()));

        let out = server.handle_request(
            &mut f.world,
            ALICE,
            &request(f.pockets, &[f.flare.raw(), wrench.raw(), 0]),
        );

        assert_eq!(out.len(), 1);
        assert_eq!(f.world.container(f.pockets).unwrap().item_at(1), Some(wrench));
    }

    #[test]
    fn test_combine_request_applied() {
        let mut f = fixture();
        let (full, partial) = with_rounds(&mut f);
        let mut server = ServerSync::new(Box::new(CarrierAccess::default()));
        let combine = SyncMessage::CombineRequest {
            container: f.pockets,
            index: 1,
            incoming: partial.raw(),
        };

        let out = server.handle_request(&mut f.world, ALICE, &combine);

        assert_eq!(f.world.item(full).unwrap().condition(), 25.0);
        assert!(f.world.item(partial).is_none());
        assert_eq!(
            out,
            vec![
                SyncMessage::StateBroadcast {
                    container: f.pockets,
                    payload: encode_ids(&[f.flare.raw(), full.raw(), 0]),
                },
                SyncMessage::ItemsDestroyed {
                    items: vec![partial.raw()]
                },
            ]
        );
    }

    #[test]
    fn test_combine_request_checked() {
        let mut f = fixture();
        let (full, partial) = with_rounds(&mut f);
        let mut server = ServerSync::new(Box::new(CarrierAccess::default()));
        let combine = |index: usize, incoming: u16| SyncMessage::CombineRequest {
            container: f.pockets,
            index,
            incoming,
        };

        // not Bob's pockets
        assert!(server.handle_request(&mut f.world, BOB, &combine(1, partial.raw())).is_empty());
        // no item, self target, unknown item
        assert!(server.handle_request(&mut f.world, ALICE, &combine(0, 0)).is_empty());
        assert!(server.handle_request(&mut f.world, ALICE, &combine(1, full.raw())).is_empty());
        assert!(server.handle_request(&mut f.world, ALICE, &combine(1, 999)).is_empty());

        assert_eq!(f.world.item(full).unwrap().condition(), 20.0);
        assert!(f.world.item(partial).is_some());
    }

    #[test]
    fn test_refused_combine_rebroadcasts_state() {
        let mut f = fixture();
        let (_, partial) = with_rounds(&mut f);
        let mut server = ServerSync::new(Box::new(AllowAll));
        let combine = SyncMessage::CombineRequest {
            container: f.pockets,
            index: 0,
            incoming: partial.raw(),
        };

        // the flare has no combine rule
        let out = server.handle_request(&mut f.world, ALICE, &combine);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].container(), Some(f.pockets));
        assert_eq!(f.world.container(f.pockets).unwrap().item_at(2), Some(partial));
    }

    #[test]
    fn test_locked_container_dropped() {
        let mut f = fixture();
        f.world.set_locked(f.pockets, true);
        let mut server = ServerSync::new(Box::new(AllowAll));

        let out = server.handle_request(&mut f.world, ALICE, &request(f.pockets, &[0, f.flare.raw(), 0]));

        assert!(out.is_empty());
        assert_eq!(f.world.container(f.pockets).unwrap().item_at(0), Some(f.flare));
    }

    #[test]
    fn test_malformed_requests_dropped() {
        let mut f = fixture();
        let mut server = ServerSync::new(Box::new(AllowAll));

        assert!(server.handle_request(&mut f.world, ALICE, &request(f.pockets, &[0, 0])).is_empty());
        assert!(server
            .handle_request(&mut f.world, ALICE, &request(ContainerId(99), &[0]))
            .is_empty());
        assert!(server.handle_frame(&mut f.world, ALICE, &[0xff, 0x01]).is_empty());

        let broadcast = SyncMessage::StateBroadcast {
            container: f.pockets,
            payload: encode_ids(&[0, 0, 0]),
        };
        assert!(server.handle_request(&mut f.world, ALICE, &broadcast).is_empty());
        assert_eq!(f.world.container(f.pockets).unwrap().item_at(0), Some(f.flare));
    }

    #[test]
    fn test_handle_frame() {
        let mut f = fixture();
        let mut server = ServerSync::new(Box::new(AllowAll));
        let frame = encode_message(&request(f.pockets, &[0, f.flare.raw(), 0])).unwrap();

        let out = server.handle_frame(&mut f.world, ALICE, &frame);

        assert_eq!(out.len(), 1);
        assert_eq!(f.world.container(f.pockets).unwrap().item_at(1), Some(f.flare));
    }
}
