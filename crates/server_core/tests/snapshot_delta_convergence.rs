//! After the first full announcement, movement flows as partial-only deltas.

use glam::Vec2;
use net_core::object::PartialData;
use server_core::tick::{DirectDamage, Simulation};
use server_core::Defs;

#[test]
fn movement_is_partial_only_after_first_full() {
    let mut sim = Simulation::new(512.0, 512.0, Defs::load_default().expect("defs"), 5);
    let mover = sim.add_player(Vec2::new(100.0, 100.0));
    let watcher = sim.add_player(Vec2::new(300.0, 300.0));
    let mut sink = DirectDamage;

    let packets = sim.run_tick(Vec::new(), &mut sink);
    assert_eq!(packets[0].1.full_objects.len(), 2);
    assert!(packets[0].1.partial_objects.is_empty());

    let target = Vec2::new(104.5, 101.25);
    sim.world.move_player(mover, target, 1.0);
    let packets = sim.run_tick(Vec::new(), &mut sink);
    let watcher_packet = packets
        .iter()
        .find(|(id, _)| *id == watcher)
        .map(|(_, p)| p)
        .expect("watcher packet");
    assert!(watcher_packet.full_objects.is_empty());
    assert_eq!(watcher_packet.partial_objects.len(), 1);
    let rec = &watcher_packet.partial_objects[0];
    assert_eq!(rec.id, mover.0);
    let PartialData::Player(p) = &rec.data else {
        panic!("expected a player partial");
    };
    assert!((p.position[0] - target.x).abs() < 1e-6);
    assert!((p.position[1] - target.y).abs() < 1e-6);
    assert!((p.rotation - 1.0).abs() < 1e-6);

    // quiet tick replicates nothing
    let packets = sim.run_tick(Vec::new(), &mut sink);
    let quiet = packets
        .iter()
        .find(|(id, _)| *id == watcher)
        .map(|(_, p)| p)
        .expect("watcher packet");
    assert!(quiet.full_objects.is_empty());
    assert!(quiet.partial_objects.is_empty());
    assert!(quiet.deleted.is_empty());
}
