//! Loopback synchronization demo
//!
//! This example shows:
//! - A server thread owning the authoritative world
//! - A predicting client talking to it over channels
//! - The pending window holding back the server's answer
//! - An equip move converging on both ends

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use void_inventory::prelude::*;
use void_inventory_sync::prelude::*;

const DIVER: CharacterId = CharacterId(1);
const LATENCY: Duration = Duration::from_millis(150);
const TICK: Duration = Duration::from_millis(100);

fn build_world(ids: Option<&[ItemId]>) -> (ItemWorld, ContainerId, ContainerId, Vec<ItemId>) {
    let mut world = ItemWorld::new();
    let pockets = world.create_container(ContainerOwner::Character(DIVER), 4);
    let gear = world.create_equipment(DIVER, vec![SlotTags::ANY, SlotTags::HEAD, SlotTags::TORSO]);
    let prefabs = [
        Arc::new(ItemPrefab::new("flare", "Flare")),
        Arc::new(ItemPrefab::new("hazmat", "Hazmat Suit").with_allowed_slots([SlotTags::HEAD | SlotTags::TORSO])),
    ];

    let items = match ids {
        Some(ids) => prefabs
            .into_iter()
            .zip(ids)
            .filter_map(|(p, id)| world.spawn_item_with_id(*id, p).ok())
            .collect(),
        None => prefabs.into_iter().filter_map(|p| world.create_item(p).ok()).collect(),
    };
    (world, pockets, gear, items)
}

fn run_server(requests: Receiver<Vec<u8>>, broadcasts: Sender<Vec<u8>>, ready: Sender<Vec<ItemId>>) {
    let (mut world, pockets, _gear, items) = build_world(None);
    for (index, item) in items.iter().enumerate() {
        if let Err(err) = world.place(*item, pockets, index, true, MutationSource::Local) {
            log::error!("Server setup failed: {}", err);
            return;
        }
    }
    let _ = ready.send(items);

    let mut sync = ServerSync::new(Box::new(CarrierAccess::default()));
    let send_all = |messages: Vec<SyncMessage>| {
        for message in messages {
            if let Ok(frame) = encode_message(&message) {
                let _ = broadcasts.send(frame);
            }
        }
    };
    send_all(sync.collect_broadcasts(&mut world));

    for frame in requests.iter() {
        thread::sleep(LATENCY);
        let replies = sync.handle_frame(&mut world, DIVER, &frame);
        log::info!("Server applied request, {} broadcast(s)", replies.len());
        send_all(replies);
    }
}

fn print_state(label: &str, world: &ItemWorld, containers: &[ContainerId]) {
    let state: Vec<Vec<u16>> = containers
        .iter()
        .filter_map(|c| world.container(*c).map(|c| c.wire_ids()))
        .collect();
    println!("{:<28} {:?}", label, state);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Inventory Sync Loopback Demo");
    println!("============================\n");

    let (request_tx, request_rx) = unbounded();
    let (broadcast_tx, broadcast_rx) = unbounded();
    let (ready_tx, ready_rx) = unbounded();
    let server = thread::spawn(move || run_server(request_rx, broadcast_tx, ready_tx));

    let Ok(ids) = ready_rx.recv() else {
        eprintln!("Server did not start");
        return;
    };
    let (mut world, pockets, gear, items) = build_world(Some(ids.as_slice()));
    let mut sync = ClientSync::new(SyncConfig::default());
    let containers = [pockets, gear];

    let pump = |sync: &mut ClientSync, world: &mut ItemWorld| {
        while let Ok(frame) = broadcast_rx.try_recv() {
            let applied = sync.receive_frame(world, &frame);
            log::info!("Client received broadcast (applied now: {})", applied);
        }
    };

    // initial snapshot
    thread::sleep(LATENCY);
    pump(&mut sync, &mut world);
    print_state("client after snapshot:", &world, &containers);

    // equip the suit locally, the server answers after the round trip
    let hazmat = items[1];
    if world.try_put_item(hazmat, gear, MutationSource::Local) {
        print_state("client predicted equip:", &world, &containers);
    }
    for request in sync.collect_requests(&mut world) {
        if let Ok(frame) = encode_message(&request) {
            let _ = request_tx.send(frame);
        }
    }

    for _ in 0..15 {
        thread::sleep(TICK);
        pump(&mut sync, &mut world);
        let applied = sync.tick(&mut world, TICK);
        if !applied.is_empty() {
            print_state("client applied server truth:", &world, &containers);
        }
    }

    drop(request_tx);
    let _ = server.join();

    print_state("client final:", &world, &containers);
    match world.verify_integrity() {
        Ok(()) => println!("\n✓ Client state consistent"),
        Err(err) => eprintln!("\n❌ Integrity check failed: {}", err),
    }
}
