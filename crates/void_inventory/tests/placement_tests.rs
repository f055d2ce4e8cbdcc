//! Integration tests for void_inventory ownership and placement guarantees

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use void_inventory::*;

fn prefab(id: &str, groups: &[SlotTags]) -> Arc<ItemPrefab> {
    Arc::new(ItemPrefab::new(id, id).with_allowed_slots(groups.iter().copied()))
}

fn holders(world: &ItemWorld, item: ItemId) -> usize {
    world.containers().filter(|c| c.contains(item)).count()
}

#[derive(Default)]
struct HookLog {
    calls: Vec<String>,
}

struct RecordingHooks(Rc<RefCell<HookLog>>);

impl InventoryHooks for RecordingHooks {
    fn on_contained(&mut self, owner: ItemId, item: ItemId) {
        self.0.borrow_mut().calls.push(format!("contained {} in {}", item, owner));
    }
    fn on_removed(&mut self, owner: ItemId, item: ItemId) {
        self.0.borrow_mut().calls.push(format!("removed {} from {}", item, owner));
    }
    fn on_equipped(&mut self, item: ItemId, wearer: CharacterId) {
        self.0.borrow_mut().calls.push(format!("equipped {} on {}", item, wearer));
    }
    fn on_unequipped(&mut self, item: ItemId, wearer: CharacterId) {
        self.0.borrow_mut().calls.push(format!("unequipped {} from {}", item, wearer));
    }
}

#[test]
fn test_no_aliasing_across_moves() {
    let mut world = ItemWorld::new();
    let a = world.create_container(ContainerOwner::Character(CharacterId(1)), 3);
    let b = world.create_container(ContainerOwner::Character(CharacterId(2)), 3);
    let crate_item = world
        .create_item(Arc::new(ItemPrefab::new("crate", "Crate").with_own_inventory(2)))
        .unwrap();
    let inner = world.item(crate_item).unwrap().own_inventory().unwrap();
    let items: Vec<ItemId> = (0..3)
        .map(|i| world.create_item(prefab(&format!("tool{}", i), &[SlotTags::ANY])).unwrap())
        .collect();

    let targets = [(a, 0), (b, 2), (inner, 1), (a, 2), (b, 0), (inner, 0), (a, 1)];
    for (step, (container, index)) in targets.iter().enumerate() {
        let item = items[step % items.len()];
        world.try_place_at(item, *container, *index, PlaceOptions::local());

        for item in &items {
            assert!(holders(&world, *item) <= 1, "item {} aliased at step {}", item, step);
        }
        assert!(world.verify_integrity().is_ok());
    }
}

#[test]
fn test_cycle_freedom() {
    let mut world = ItemWorld::new();
    let backpack = world
        .create_item(Arc::new(ItemPrefab::new("backpack", "Backpack").with_own_inventory(2)))
        .unwrap();
    let pouch = world
        .create_item(Arc::new(ItemPrefab::new("pouch", "Pouch").with_own_inventory(2)))
        .unwrap();
    let backpack_inv = world.item(backpack).unwrap().own_inventory().unwrap();
    let pouch_inv = world.item(pouch).unwrap().own_inventory().unwrap();

    assert_eq!(world.try_place_at(pouch, backpack_inv, 0, PlaceOptions::local()), PlaceResult::Placed);

    assert_eq!(world.try_place_at(backpack, pouch_inv, 0, PlaceOptions::local()), PlaceResult::Rejected);
    assert_eq!(world.try_place_at(backpack, backpack_inv, 1, PlaceOptions::local()), PlaceResult::Rejected);
    assert!(!world.try_put_item(backpack, pouch_inv, MutationSource::Local));
    assert_eq!(world.find_free_slot(backpack, pouch_inv), None);

    assert!(world.container(pouch_inv).unwrap().is_empty());
    assert_eq!(world.container(backpack_inv).unwrap().slots(), &[Some(pouch), None]);
    assert!(world.item(backpack).unwrap().is_dropped());
    assert!(world.verify_integrity().is_ok());
}

#[test]
fn test_equip_group_atomicity() {
    let mut world = ItemWorld::new();
    let gear = world.create_equipment(
        CharacterId(1),
        vec![SlotTags::HEAD, SlotTags::TORSO, SlotTags::LEGS],
    );
    let trousers = world.create_item(prefab("trousers", &[SlotTags::LEGS])).unwrap();
    let coverall = world
        .create_item(prefab("coverall", &[SlotTags::HEAD | SlotTags::TORSO | SlotTags::LEGS]))
        .unwrap();

    assert!(world.try_put_item(trousers, gear, MutationSource::Local));
    world.drain_events();

    assert!(!world.try_put_item(coverall, gear, MutationSource::Local));
    assert_eq!(world.try_place_at(coverall, gear, 0, PlaceOptions::local()), PlaceResult::Rejected);

    let c = world.container(gear).unwrap();
    assert_eq!(c.slots(), &[None, None, Some(trousers)]);
    assert!(world.item(coverall).unwrap().is_dropped());
    assert!(world
        .drain_events()
        .iter()
        .all(|e| matches!(e, InventoryEvent::SlotHighlight { .. })));
}

#[test]
fn test_swap_rolls_back_completely() {
    let hooks = Rc::new(RefCell::new(HookLog::default()));
    let mut world = ItemWorld::new().with_hooks(Box::new(RecordingHooks(hooks.clone())));
    let chest = world
        .create_item(Arc::new(ItemPrefab::new("chest", "Chest").with_own_inventory(2)))
        .unwrap();
    let c = world.item(chest).unwrap().own_inventory().unwrap();
    let a = world.create_item(prefab("a", &[SlotTags::ANY])).unwrap();
    let b = world.create_item(prefab("b", &[SlotTags::ANY])).unwrap();
    world.try_place_at(a, c, 0, PlaceOptions::local());
    world.try_place_at(b, c, 1, PlaceOptions::local());
    world.drain_events();
    world.drain_dirty();
    hooks.borrow_mut().calls.clear();

    // B may no longer go back in
    world.set_filter(c, Some(Arc::new(PrefabFilter::new(["a"]))));

    assert_eq!(world.try_place_at(a, c, 1, PlaceOptions::local()), PlaceResult::Rejected);

    assert_eq!(world.container(c).unwrap().slots(), &[Some(a), Some(b)]);
    assert_eq!(world.item(a).unwrap().parent(), Some(c));
    assert_eq!(world.item(b).unwrap().parent(), Some(c));
    assert_eq!(world.item(b).unwrap().container(), Some(chest));
    assert!(hooks.borrow().calls.is_empty());
    assert!(world.drain_dirty().is_empty());
    assert_eq!(
        world.drain_events(),
        vec![InventoryEvent::SlotHighlight {
            container: c,
            index: 1,
            kind: HighlightKind::Rejected,
        }]
    );
    assert!(world.verify_integrity().is_ok());
}

#[test]
fn test_acceptable_placement_is_idempotent() {
    let mut world = ItemWorld::new();
    let gear = world.create_equipment(CharacterId(1), vec![SlotTags::ANY, SlotTags::HEAD]);
    let helmet = world.create_item(prefab("helmet", &[SlotTags::HEAD])).unwrap();

    assert!(world.try_place_acceptably(helmet, gear, &[SlotTags::HEAD], MutationSource::Local));
    assert!(world.try_place_acceptably(helmet, gear, &[SlotTags::HEAD], MutationSource::Local));
    assert_eq!(world.container(gear).unwrap().slots(), &[None, Some(helmet)]);
}

#[test]
fn test_helmet_blocked_by_hazmat() {
    let hooks = Rc::new(RefCell::new(HookLog::default()));
    let mut world = ItemWorld::new().with_hooks(Box::new(RecordingHooks(hooks.clone())));
    let diver = CharacterId(4);
    let gear = world.create_equipment(diver, vec![SlotTags::HEAD, SlotTags::TORSO]);
    let helmet = world.create_item(prefab("helmet", &[SlotTags::HEAD])).unwrap();
    let hazmat = world
        .create_item(prefab("hazmat", &[SlotTags::HEAD | SlotTags::TORSO]))
        .unwrap();

    assert!(world.try_put_item(hazmat, gear, MutationSource::Local));
    assert_eq!(world.container(gear).unwrap().slots(), &[Some(hazmat), Some(hazmat)]);
    assert_eq!(hooks.borrow().calls, vec![format!("equipped {} on {}", hazmat, diver)]);

    assert!(!world.try_place_acceptably(helmet, gear, &[SlotTags::HEAD], MutationSource::Local));
    assert_eq!(world.container(gear).unwrap().slots(), &[Some(hazmat), Some(hazmat)]);
    assert!(world.item(helmet).unwrap().is_dropped());
    assert_eq!(world.equipped_items(gear), vec![hazmat]);
}

#[test]
fn test_contained_hooks_fire_for_item_owner() {
    let hooks = Rc::new(RefCell::new(HookLog::default()));
    let mut world = ItemWorld::new().with_hooks(Box::new(RecordingHooks(hooks.clone())));
    let toolbox = world
        .create_item(Arc::new(ItemPrefab::new("toolbox", "Toolbox").with_own_inventory(4)))
        .unwrap();
    let inner = world.item(toolbox).unwrap().own_inventory().unwrap();
    let wrench = world.create_item(prefab("wrench", &[SlotTags::ANY])).unwrap();

    assert!(world.try_put_item(wrench, inner, MutationSource::Local));
    assert!(world.remove(wrench, inner, MutationSource::Local));

    assert_eq!(
        hooks.borrow().calls,
        vec![
            format!("contained {} in {}", wrench, toolbox),
            format!("removed {} from {}", wrench, toolbox),
        ]
    );
}

#[test]
fn test_unequip_on_removal() {
    let hooks = Rc::new(RefCell::new(HookLog::default()));
    let mut world = ItemWorld::new().with_hooks(Box::new(RecordingHooks(hooks.clone())));
    let diver = CharacterId(2);
    let gear = world.create_equipment(diver, vec![SlotTags::LEFT_HAND, SlotTags::RIGHT_HAND]);
    let crowbar = world.create_item(prefab("crowbar", &[SlotTags::HANDS])).unwrap();

    assert!(world.try_put_item(crowbar, gear, MutationSource::Local));
    assert!(world.drop_item(crowbar, MutationSource::Local));

    assert_eq!(
        hooks.borrow().calls,
        vec![
            format!("equipped {} on {}", crowbar, diver),
            format!("unequipped {} from {}", crowbar, diver),
        ]
    );
    assert!(world.container(gear).unwrap().is_empty());
}
