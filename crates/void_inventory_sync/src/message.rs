//! Sync message envelope

use serde::{Deserialize, Serialize};
use void_inventory::ContainerId;

/// Inventory traffic between clients and the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Client -> server: the slot state the client wants
    StateRequest { container: ContainerId, payload: Vec<u8> },
    /// Server -> clients: authoritative slot state
    StateBroadcast { container: ContainerId, payload: Vec<u8> },
    /// Client -> server: drop item `incoming` onto the occupant of
    /// `container[index]` and let its combine rule run
    CombineRequest {
        container: ContainerId,
        index: usize,
        incoming: u16,
    },
    /// Server -> clients: items that no longer exist
    ItemsDestroyed { items: Vec<u16> },
}

impl SyncMessage {
    /// Container the message describes, if any
    pub fn container(&self) -> Option<ContainerId> {
        match self {
            Self::StateRequest { container, .. }
            | Self::StateBroadcast { container, .. }
            | Self::CombineRequest { container, .. } => Some(*container),
            Self::ItemsDestroyed { .. } => None,
        }
    }

    /// Encoded slot ids of a state message
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::StateRequest { payload, .. } | Self::StateBroadcast { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Check if this is a client request
    pub fn is_request(&self) -> bool {
        matches!(self, Self::StateRequest { .. } | Self::CombineRequest { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let combine = SyncMessage::CombineRequest {
            container: ContainerId(3),
            index: 1,
            incoming: 7,
        };
        assert_eq!(combine.container(), Some(ContainerId(3)));
        assert_eq!(combine.payload(), None);
        assert!(combine.is_request());

        let destroyed = SyncMessage::ItemsDestroyed { items: vec![7] };
        assert_eq!(destroyed.container(), None);
        assert!(!destroyed.is_request());

        let state = SyncMessage::StateBroadcast {
            container: ContainerId(3),
            payload: vec![1, 0],
        };
        assert_eq!(state.payload(), Some(&[1u8, 0][..]));
        assert!(!state.is_request());
    }
}
