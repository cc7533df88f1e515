//! Fixed-order tick orchestration.
//!
//! Order per tick: melee resolution, bullet sweeps, staged damage
//! application, death handling, queued despawns, gas, snapshot assembly,
//! dirty clear. Everything runs on one thread; systems communicate only
//! through the world and the staged damage list.

use crate::bullet::{self, Bullet};
use crate::gas::Gas;
use crate::melee;
use crate::object::{ObjectId, ObjectKind, PlayerState, PLAYER_RADIUS};
use crate::obstacle::{self, DamageSource, ExplosionSpawn};
use crate::snapshot::{self, ClientView, TickOutput};
use crate::world::World;
use crate::{DamageRecord, Defs};
use geom_core::math::direction;
use glam::Vec2;
use net_core::update::{BulletSpawnRep, EmoteRep, ExplosionRep, UpdatePacket};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Receives player damage after combat resolution. The simulation applies
/// world-state effects; game rules (armor, knockout states) hook in here.
pub trait DamageSink {
    fn player_damaged(&mut self, world: &mut World, target: ObjectId, amount: f32);
}

/// Plain damage: subtract and clamp.
#[derive(Debug, Default)]
pub struct DirectDamage;

impl DamageSink for DirectDamage {
    fn player_damaged(&mut self, world: &mut World, target: ObjectId, amount: f32) {
        world.damage_player(target, amount);
    }
}

pub struct Simulation {
    pub world: World,
    pub defs: Defs,
    pub gas: Gas,
    bullets: Vec<Bullet>,
    clients: Vec<ClientView>,
    pending_despawns: Vec<ObjectId>,
    pending_emotes: Vec<EmoteRep>,
    tick: u64,
    rng: ChaCha8Rng,
}

impl Simulation {
    #[must_use]
    pub fn new(width: f32, height: f32, defs: Defs, seed: u64) -> Self {
        Self {
            world: World::new(width, height),
            defs,
            gas: Gas::new(width, height),
            bullets: Vec::new(),
            clients: Vec::new(),
            pending_despawns: Vec::new(),
            pending_emotes: Vec::new(),
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn tick_number(&self) -> u64 {
        self.tick
    }

    /// Add a player and a replication view for their connection.
    pub fn add_player(&mut self, position: Vec2) -> ObjectId {
        let position = self.world.clamp_position(position);
        let id = self
            .world
            .spawn(ObjectKind::Player(PlayerState::new(position)));
        self.clients.push(ClientView::new(id));
        log::info!("player {id:?} joined at {position}");
        id
    }

    /// Disconnect: the object despawns at the next tick boundary.
    pub fn remove_player(&mut self, id: ObjectId) {
        self.clients.retain(|c| c.player != id);
        self.pending_despawns.push(id);
    }

    pub fn queue_despawn(&mut self, id: ObjectId) {
        self.pending_despawns.push(id);
    }

    pub fn queue_emote(&mut self, player: ObjectId, emote_id: u8) {
        self.pending_emotes.push(EmoteRep {
            emote_id,
            player_id: player.0,
        });
    }

    pub fn set_attacking(&mut self, id: ObjectId, attacking: bool) {
        if let Some(p) = self.world.player_mut(id) {
            p.attacking = attacking;
        }
        if attacking {
            melee::start_swing(&mut self.world, &self.defs, self.tick, id);
        }
    }

    /// Fire the player's gun: one bullet per pellet, each with its own spread
    /// roll, spawned just past the player's own hitbox.
    pub fn fire_gun(&mut self, shooter: ObjectId) -> Vec<BulletSpawnRep> {
        let Some(p) = self.world.player(shooter) else {
            return Vec::new();
        };
        if p.dead {
            return Vec::new();
        }
        let Some(weapon) = p.gun else {
            return Vec::new();
        };
        let Some(def) = self.defs.weapons.gun(weapon) else {
            return Vec::new();
        };
        let base_rotation = p.rotation;
        let origin = p.position;
        let spread = def.spread_deg.to_radians();
        let count = def.bullet_count;
        let mut reps = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let rotation = if spread > 0.0 {
                base_rotation + self.rng.gen_range(-spread..=spread)
            } else {
                base_rotation
            };
            let position = origin + direction(rotation) * (PLAYER_RADIUS + 1.0);
            let variance: f32 = self.rng.gen_range(0.0..=1.0);
            if let Some(b) = Bullet::spawn(
                &self.defs,
                weapon,
                shooter,
                position,
                rotation,
                variance,
                0,
            ) {
                reps.push(BulletSpawnRep {
                    weapon_id: weapon,
                    position: position.to_array(),
                    rotation: b.rotation,
                    variance,
                    reflection_count: 0,
                    shooter_id: shooter.0,
                });
                self.bullets.push(b);
            }
        }
        metrics::counter!("gun.fired").increment(1);
        reps
    }

    /// Run one tick. `fired` is the spawn records from this tick's accepted
    /// fire inputs (already spawned via [`Self::fire_gun`]). Returns one
    /// packet per connected client.
    pub fn run_tick(
        &mut self,
        fired: Vec<BulletSpawnRep>,
        sink: &mut dyn DamageSink,
    ) -> Vec<(ObjectId, UpdatePacket)> {
        let start = std::time::Instant::now();
        let dt = crate::tick_dt();
        let mut damage: Vec<DamageRecord> = Vec::new();
        let mut explosions: Vec<ExplosionSpawn> = Vec::new();

        // melee lands before bullets within a tick
        damage.extend(melee::run(&mut self.world, &self.defs, self.tick));

        let mut reflected: Vec<Bullet> = Vec::new();
        bullet::update(
            &self.world,
            &self.defs,
            &mut self.bullets,
            dt,
            &mut damage,
            &mut reflected,
        );
        let mut bullet_reps = fired;
        bullet_reps.extend(reflected.iter().map(|b| BulletSpawnRep {
            weapon_id: b.weapon,
            position: b.position.to_array(),
            rotation: b.rotation,
            variance: b.variance,
            reflection_count: b.reflection_count,
            shooter_id: b.shooter.0,
        }));

        self.gas.advance(dt, &mut self.rng);
        let gas_dps = self.gas.dps();
        if gas_dps > 0.0 {
            for id in self.world.player_ids() {
                let Some(p) = self.world.player(id) else {
                    continue;
                };
                if !p.dead && !self.gas.contains(p.position) {
                    damage.push(DamageRecord {
                        target: id,
                        amount: gas_dps * dt,
                        position: p.position,
                        source: DamageSource::Explosion,
                    });
                }
            }
        }

        // staged damage all lands at once
        for record in damage {
            match self.world.get(record.target).map(|o| &o.kind) {
                Some(ObjectKind::Player(_)) => {
                    sink.player_damaged(&mut self.world, record.target, record.amount);
                }
                Some(ObjectKind::Obstacle(_)) => obstacle::damage(
                    &mut self.world,
                    &self.defs,
                    record.target,
                    record.amount,
                    record.position,
                    record.source,
                    &mut self.rng,
                    &mut explosions,
                ),
                _ => {}
            }
        }

        // deaths after all of the tick's damage is in
        for id in self.world.player_ids() {
            let died = {
                let Some(p) = self.world.player(id) else {
                    continue;
                };
                !p.dead && p.health <= 0.0
            };
            if died {
                if let Some(p) = self.world.player_mut(id) {
                    p.dead = true;
                }
                self.world.mark_full_dirty(id);
                log::info!("player {id:?} died on tick {}", self.tick);
                metrics::counter!("player.died").increment(1);
            }
        }

        for id in std::mem::take(&mut self.pending_despawns) {
            self.world.despawn(id);
        }

        let explosion_reps: Vec<ExplosionRep> = explosions
            .iter()
            .filter_map(|e| {
                let def_id = self.defs.explosion_id(&e.def)?;
                Some(ExplosionRep {
                    def_id,
                    position: e.position.to_array(),
                })
            })
            .collect();

        let output = TickOutput {
            bullets: bullet_reps,
            explosions: explosion_reps,
            emotes: std::mem::take(&mut self.pending_emotes),
            gas: self.gas.dirty.then(|| self.gas.rep()),
            gas_percentage: (!self.gas.dirty && self.gas.percentage_dirty)
                .then_some(self.gas.percentage),
        };

        let frame = self.world.drain_dirty();
        let packets = self
            .clients
            .iter_mut()
            .map(|view| {
                let id = view.player;
                (id, snapshot::assemble(&self.world, &frame, &output, view))
            })
            .collect();

        self.gas.clear_dirty();
        self.tick += 1;
        metrics::histogram!("tick.ms").record(start.elapsed().as_secs_f64() * 1000.0);
        packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulation {
        Simulation::new(512.0, 512.0, Defs::load_default().expect("defs"), 42)
    }

    #[test]
    fn gun_fire_produces_packets_and_kills() {
        let mut sim = sim();
        let shooter = sim.add_player(Vec2::new(50.0, 100.0));
        let target = sim.add_player(Vec2::new(80.0, 100.0));
        let ak = sim.defs.weapons.gun_id("ak47").expect("ak");
        sim.world.player_mut(shooter).expect("p").gun = Some(ak);
        let mut sink = DirectDamage;

        // announce both spawns
        let packets = sim.run_tick(Vec::new(), &mut sink);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].1.full_objects.len(), 2);

        let before = sim.world.player(target).expect("t").health;
        let mut hit = false;
        for _ in 0..120 {
            let fired = sim.fire_gun(shooter);
            assert!(!fired.is_empty());
            sim.run_tick(fired, &mut sink);
            if sim.world.player(target).expect("t").health < before {
                hit = true;
                break;
            }
        }
        assert!(hit, "sustained fire eventually lands");
    }

    #[test]
    fn fired_records_reach_every_client_packet() {
        let mut sim = sim();
        let shooter = sim.add_player(Vec2::new(50.0, 100.0));
        let _other = sim.add_player(Vec2::new(400.0, 400.0));
        let m9 = sim.defs.weapons.gun_id("m9").expect("m9");
        sim.world.player_mut(shooter).expect("p").gun = Some(m9);
        let mut sink = DirectDamage;
        sim.run_tick(Vec::new(), &mut sink);

        let fired = sim.fire_gun(shooter);
        assert_eq!(fired.len(), 1);
        let packets = sim.run_tick(fired, &mut sink);
        for (_, packet) in &packets {
            assert_eq!(packet.bullets.len(), 1);
            assert_eq!(packet.bullets[0].shooter_id, shooter.0);
        }
    }

    #[test]
    fn shotgun_fires_a_pellet_per_bullet_count() {
        let mut sim = sim();
        let shooter = sim.add_player(Vec2::new(50.0, 100.0));
        let shotgun = sim.defs.weapons.gun_id("m870").expect("m870");
        sim.world.player_mut(shooter).expect("p").gun = Some(shotgun);
        let fired = sim.fire_gun(shooter);
        let def = sim.defs.weapons.gun(shotgun).expect("def");
        assert_eq!(fired.len(), def.bullet_count as usize);
    }

    #[test]
    fn disconnect_despawns_on_next_tick() {
        let mut sim = sim();
        let a = sim.add_player(Vec2::new(50.0, 100.0));
        let b = sim.add_player(Vec2::new(80.0, 100.0));
        let mut sink = DirectDamage;
        sim.run_tick(Vec::new(), &mut sink);
        sim.remove_player(b);
        let packets = sim.run_tick(Vec::new(), &mut sink);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].0, a);
        assert_eq!(packets[0].1.deleted, vec![b.0]);
        assert!(sim.world.get(b).is_none());
    }

    #[test]
    fn melee_kill_is_announced_as_full_dead() {
        let mut sim = sim();
        let attacker = sim.add_player(Vec2::new(100.0, 100.0));
        let victim = sim.add_player(Vec2::new(104.0, 100.0));
        sim.world.player_mut(victim).expect("v").health = 15.0;
        let mut sink = DirectDamage;
        sim.run_tick(Vec::new(), &mut sink);

        sim.set_attacking(attacker, true);
        let mut died_packet = None;
        for _ in 0..20 {
            let packets = sim.run_tick(Vec::new(), &mut sink);
            if sim.world.player(victim).expect("v").dead {
                died_packet = Some(packets);
                break;
            }
        }
        let packets = died_packet.expect("victim dies");
        let full = &packets[0].1.full_objects;
        assert!(full.iter().any(|r| {
            r.id == victim.0
                && matches!(
                    &r.data,
                    net_core::object::FullData::Player(p) if p.dead
                )
        }));
    }
}
