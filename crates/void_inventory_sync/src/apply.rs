//! Applying received slot state to a local container

use void_inventory::{ContainerId, ItemId, ItemWorld, MutationSource, PlaceOptions};

/// Map wire ids to live items. Ids that name no item count as empty.
pub(crate) fn resolve_ids(world: &ItemWorld, container: ContainerId, ids: &[u16]) -> Vec<Option<ItemId>> {
    ids.iter()
        .enumerate()
        .map(|(index, raw)| {
            let id = ItemId::new(*raw)?;
            if world.item(id).is_none() {
                log::warn!(
                    "Slot {} of {} names unknown item {}; treating it as empty",
                    index,
                    container,
                    id
                );
                return None;
            }
            Some(id)
        })
        .collect()
}

/// Drop every item whose slot disagrees with `wanted`
pub(crate) fn drop_mismatched(
    world: &mut ItemWorld,
    container: ContainerId,
    wanted: &[Option<ItemId>],
    source: MutationSource,
) {
    let current: Vec<Option<ItemId>> = match world.container(container) {
        Some(c) => c.slots().to_vec(),
        None => return,
    };
    for (slot, want) in current.iter().zip(wanted) {
        let Some(item) = *slot else {
            continue;
        };
        let still_here = world.item(item).is_some_and(|i| i.parent() == Some(container));
        if *want != Some(item) && still_here {
            world.drop_item(item, source);
        }
    }
}

/// Overwrite a container with authoritative state.
///
/// Mismatching items are dropped, every wanted item goes through the normal
/// placement rules, and whatever those rules refuse is forced into place.
pub(crate) fn apply_authoritative(world: &mut ItemWorld, container: ContainerId, ids: &[u16]) {
    let wanted = resolve_ids(world, container, ids);
    drop_mismatched(world, container, &wanted, MutationSource::Replay);

    for (index, want) in wanted.iter().enumerate() {
        let Some(item) = *want else {
            continue;
        };
        if world.container(container).and_then(|c| c.item_at(index)) == Some(item) {
            continue;
        }
        world.try_place_at(item, container, index, PlaceOptions::replay());
    }

    reconcile(world, container, &wanted);
}

/// Force the exact slot layout for items the placement rules left elsewhere
fn reconcile(world: &mut ItemWorld, container: ContainerId, wanted: &[Option<ItemId>]) {
    let current: Vec<Option<ItemId>> = match world.container(container) {
        Some(c) => c.slots().to_vec(),
        None => return,
    };
    if current == wanted {
        return;
    }

    let mut targets: Vec<(ItemId, Vec<usize>)> = Vec::new();
    for (index, want) in wanted.iter().enumerate() {
        let Some(item) = *want else {
            continue;
        };
        match targets.iter_mut().find(|(id, _)| *id == item) {
            Some((_, indices)) => indices.push(index),
            None => targets.push((item, vec![index])),
        }
    }

    let indices_of = |slots: &[Option<ItemId>], item: ItemId| -> Vec<usize> {
        slots
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Some(item))
            .map(|(i, _)| i)
            .collect()
    };

    let mut present: Vec<ItemId> = Vec::new();
    for item in current.iter().flatten() {
        if !present.contains(item) {
            present.push(*item);
        }
    }
    for item in present {
        match targets.iter().find(|(id, _)| *id == item) {
            None => {
                world.drop_item(item, MutationSource::Replay);
            }
            Some((_, indices)) if *indices != indices_of(&current, item) => {
                world.remove(item, container, MutationSource::Replay);
            }
            Some(_) => {}
        }
    }

    for (item, indices) in targets {
        let placed = world
            .container(container)
            .map(|c| c.find_indices(item))
            .unwrap_or_default();
        if placed == indices {
            continue;
        }
        log::debug!("Forcing item {} into {} slots {:?}", item, container, indices);
        if let Err(err) = world.force_to_slots(item, container, &indices, MutationSource::Replay) {
            log::warn!("Could not apply state of {}: {}", container, err);
        }
    }
}
