//! A destroyed barrel reports its explosion in the tick's packets.

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use server_core::obstacle;
use server_core::tick::{DirectDamage, Simulation};
use server_core::Defs;

#[test]
fn barrel_destruction_emits_explosion_rep() {
    let mut sim = Simulation::new(512.0, 512.0, Defs::load_default().expect("defs"), 9);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let _viewer = sim.add_player(Vec2::new(50.0, 50.0));
    let barrel = obstacle::spawn(
        &mut sim.world,
        &sim.defs,
        "barrel",
        Vec2::new(200.0, 200.0),
        0,
        0,
        &mut rng,
    )
    .expect("barrel");
    let mut sink = DirectDamage;
    sim.run_tick(Vec::new(), &mut sink);

    // route the kill through the staged damage path
    let shooter = sim.add_player(Vec2::new(180.0, 200.0));
    let barrett = sim.defs.weapons.gun_id("barrett").expect("barrett");
    sim.world.player_mut(shooter).expect("p").gun = Some(barrett);
    sim.run_tick(Vec::new(), &mut sink);

    let mut explosion_seen = false;
    for _ in 0..10 {
        let fired = sim.fire_gun(shooter);
        let packets = sim.run_tick(fired, &mut sink);
        if sim.world.obstacle(barrel).expect("barrel").dead {
            let expected = sim.defs.explosion_id("barrel_explosion").expect("id");
            let packet = &packets[0].1;
            assert!(packet
                .explosions
                .iter()
                .any(|e| e.def_id == expected));
            explosion_seen = true;
            break;
        }
    }
    assert!(explosion_seen, "barrel should die to sustained fire");
}
