//! Predicting client role

use crate::apply::apply_authoritative;
use crate::codec::{decode_message, decode_slots, encode_slots};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::message::SyncMessage;
use std::collections::HashMap;
use std::time::Duration;
use void_inventory::{ContainerId, ItemId, ItemWorld, MutationSource};

/// Authoritative state held back by the pending window
#[derive(Debug, Clone)]
struct BufferedState {
    ids: Vec<u16>,
    /// Clock time the oldest unapplied broadcast arrived
    since: Duration,
}

#[derive(Debug, Clone, Default)]
struct ContainerSync {
    /// Clock time the pending window closes
    window_until: Duration,
    buffered: Option<BufferedState>,
}

/// Client side of inventory synchronization.
///
/// Local changes are applied immediately and sent to the server. For
/// `pending_window` after each send, broadcasts for that container are held
/// back so the player does not see their move undone by a snapshot taken
/// before the server processed it. Held-back state is applied once the
/// window closes, or once it is older than `max_staleness`.
#[derive(Debug, Clone)]
pub struct ClientSync {
    config: SyncConfig,
    clock: Duration,
    containers: HashMap<ContainerId, ContainerSync>,
}

impl ClientSync {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            clock: Duration::ZERO,
            containers: HashMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Time accumulated through [`tick`](Self::tick)
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Check if broadcasts for `container` are currently held back
    pub fn is_pending(&self, container: ContainerId) -> bool {
        self.containers
            .get(&container)
            .is_some_and(|s| self.clock < s.window_until)
    }

    /// Check if authoritative state is waiting to be applied
    pub fn has_buffered(&self, container: ContainerId) -> bool {
        self.containers
            .get(&container)
            .is_some_and(|s| s.buffered.is_some())
    }

    /// Turn local changes into requests and (re)open their pending windows.
    /// Combines go first so the server sees them before any slot state that
    /// already reflects them.
    pub fn collect_requests(&mut self, world: &mut ItemWorld) -> Vec<SyncMessage> {
        let mut requests = Vec::new();
        for intent in world.drain_combines() {
            self.open_window(intent.container);
            requests.push(SyncMessage::CombineRequest {
                container: intent.container,
                index: intent.index,
                incoming: intent.incoming.raw(),
            });
        }
        // destruction is announced by the server
        world.drain_destroyed();

        for container in world.drain_dirty() {
            let payload = match encode_slots(world, container) {
                Ok(payload) => payload,
                Err(err) => {
                    log::warn!("Skipping request for {}: {}", container, err);
                    continue;
                }
            };
            self.open_window(container);
            requests.push(SyncMessage::StateRequest { container, payload });
        }
        requests
    }

    fn open_window(&mut self, container: ContainerId) {
        self.containers.entry(container).or_default().window_until = self.clock + self.config.pending_window;
    }

    /// Parse and handle a framed server message
    pub fn receive_frame(&mut self, world: &mut ItemWorld, frame: &[u8]) -> bool {
        match decode_message(frame) {
            Ok(message) => self.receive_broadcast(world, &message),
            Err(err) => {
                log::warn!("Dropping malformed frame: {}", err);
                false
            }
        }
    }

    /// Handle an authoritative broadcast. Returns true if it was applied now,
    /// false if it was buffered or dropped. Destruction notices are never
    /// held back.
    pub fn receive_broadcast(&mut self, world: &mut ItemWorld, message: &SyncMessage) -> bool {
        let (container, payload) = match message {
            SyncMessage::StateBroadcast { container, payload } => (container, payload),
            SyncMessage::ItemsDestroyed { items } => {
                Self::destroy(world, items);
                return true;
            }
            _ => {
                log::debug!("Ignoring request echoed to client");
                return false;
            }
        };
        let ids = match Self::decode(world, *container, payload) {
            Ok(ids) => ids,
            Err(err) => {
                log::warn!("Dropping broadcast for {}: {}", container, err);
                return false;
            }
        };

        let clock = self.clock;
        let staleness = self.config.max_staleness;
        let state = self.containers.entry(*container).or_default();
        if clock >= state.window_until {
            state.buffered = None;
            apply_authoritative(world, *container, &ids);
            return true;
        }

        let since = state.buffered.as_ref().map_or(clock, |b| b.since);
        if clock.saturating_sub(since) >= staleness {
            log::debug!("Applying stale state of {} despite pending window", container);
            state.buffered = None;
            apply_authoritative(world, *container, &ids);
            return true;
        }

        log::debug!("Holding back state of {} until the pending window closes", container);
        state.buffered = Some(BufferedState { ids, since });
        false
    }

    fn destroy(world: &mut ItemWorld, items: &[u16]) {
        for item in items.iter().filter_map(|raw| ItemId::new(*raw)) {
            if world.item(item).is_none() {
                continue;
            }
            if let Err(err) = world.destroy_item(item, MutationSource::Replay) {
                log::warn!("Failed to destroy item {}: {}", item, err);
            }
        }
    }

    /// Advance the clock and apply held-back state whose window closed or
    /// whose age exceeds the staleness bound. Returns the containers updated.
    pub fn tick(&mut self, world: &mut ItemWorld, dt: Duration) -> Vec<ContainerId> {
        self.clock += dt;
        let clock = self.clock;
        let staleness = self.config.max_staleness;

        let mut due: Vec<(ContainerId, Vec<u16>)> = self
            .containers
            .iter_mut()
            .filter_map(|(id, state)| {
                let ready = state.buffered.as_ref().is_some_and(|b| {
                    clock >= state.window_until || clock.saturating_sub(b.since) >= staleness
                });
                if ready {
                    state.buffered.take().map(|b| (*id, b.ids))
                } else {
                    None
                }
            })
            .collect();
        due.sort_by_key(|(id, _)| *id);

        for (container, ids) in &due {
            log::debug!("Applying held-back state of {}", container);
            apply_authoritative(world, *container, ids);
        }
        due.into_iter().map(|(id, _)| id).collect()
    }

    fn decode(world: &ItemWorld, container: ContainerId, payload: &[u8]) -> SyncResult<Vec<u16>> {
        let capacity = world
            .container(container)
            .ok_or(SyncError::UnknownContainer(container))?
            .capacity();
        decode_slots(payload, capacity)
    }
}

impl Default for ClientSync {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
