//! Wire codec
//!
//! A container's state is one little-endian `u16` item id per slot, in slot
//! order, with `0` for an empty slot. No length prefix: both ends know the
//! capacity. Messages are framed with bincode.

use crate::error::{SyncError, SyncResult};
use crate::message::SyncMessage;
use void_inventory::{ContainerId, ItemWorld};

/// Bytes per slot on the wire
pub const SLOT_WIDTH: usize = std::mem::size_of::<u16>();

/// Encode raw slot ids
pub fn encode_ids(ids: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ids.len() * SLOT_WIDTH);
    for id in ids {
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    bytes
}

/// Encode the current slot state of a container
pub fn encode_slots(world: &ItemWorld, container: ContainerId) -> SyncResult<Vec<u8>> {
    let c = world
        .container(container)
        .ok_or(SyncError::UnknownContainer(container))?;
    Ok(encode_ids(&c.wire_ids()))
}

/// Decode exactly `capacity` slot ids
pub fn decode_slots(bytes: &[u8], capacity: usize) -> SyncResult<Vec<u16>> {
    let expected = capacity * SLOT_WIDTH;
    if bytes.len() < expected {
        return Err(SyncError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(SyncError::CapacityMismatch {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(SLOT_WIDTH)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Frame a message
pub fn encode_message(message: &SyncMessage) -> SyncResult<Vec<u8>> {
    Ok(bincode::serialize(message)?)
}

/// Parse a framed message
pub fn decode_message(bytes: &[u8]) -> SyncResult<SyncMessage> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use void_inventory::{CharacterId, ContainerOwner, ItemPrefab, MutationSource};

    #[test]
    fn test_layout_is_little_endian() {
        assert_eq!(encode_ids(&[0x0102, 0, 7]), vec![0x02, 0x01, 0, 0, 7, 0]);
    }

    #[test]
    fn test_container_round_trip() {
        let mut world = ItemWorld::new();
        let pockets = world.create_container(ContainerOwner::Character(CharacterId(1)), 4);
        let item = world.create_item(Arc::new(ItemPrefab::new("flare", "Flare"))).unwrap();
        world.place(item, pockets, 2, true, MutationSource::Local).unwrap();

        let bytes = encode_slots(&world, pockets).unwrap();
        let ids = decode_slots(&bytes, 4).unwrap();

        assert_eq!(ids, world.container(pockets).unwrap().wire_ids());
        assert_eq!(ids, vec![0, 0, item.raw(), 0]);
    }

    #[test]
    fn test_truncated_payload() {
        let result = decode_slots(&[1, 0, 2], 2);
        assert!(matches!(result, Err(SyncError::Truncated { expected: 4, actual: 3 })));
    }

    #[test]
    fn test_oversized_payload() {
        let result = decode_slots(&[1, 0, 2, 0], 1);
        assert!(matches!(result, Err(SyncError::CapacityMismatch { expected: 2, actual: 4 })));
    }

    #[test]
    fn test_unknown_container() {
        let world = ItemWorld::new();
        assert!(matches!(
            encode_slots(&world, ContainerId(9)),
            Err(SyncError::UnknownContainer(ContainerId(9)))
        ));
    }

    #[test]
    fn test_message_framing() {
        let message = SyncMessage::StateBroadcast {
            container: ContainerId(3),
            payload: encode_ids(&[4, 0]),
        };
        let frame = encode_message(&message).unwrap();
        assert_eq!(decode_message(&frame).unwrap(), message);
        assert!(matches!(decode_message(&frame[..2]), Err(SyncError::Envelope(_))));
    }
}
