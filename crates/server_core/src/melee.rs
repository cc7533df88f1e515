//! Melee swings, scheduled on tick numbers.
//!
//! A swing is two moments: the start (input accepted, cooldown charged) and
//! the landing, `swing_delay` later, when the probe is evaluated against
//! whatever is there at that point. Cooldown is an explicit next-eligible
//! tick on the player, so dropped input packets cannot desync it.

use crate::object::{ObjectId, ObjectKind};
use crate::obstacle::DamageSource;
use crate::world::World;
use crate::{DamageRecord, Defs, TICKS_PER_SECOND};
use data_runtime::defs::weapons::MeleeDef;
use geom_core::layer::adjacent_or_equal_layer;
use geom_core::Hitbox;
use glam::Vec2;

fn ms_to_ticks(ms: u32) -> u64 {
    u64::from(ms.saturating_mul(TICKS_PER_SECOND)).div_ceil(1000)
}

/// Begin a swing if the player is alive and off cooldown. Returns whether a
/// swing was started.
pub fn start_swing(world: &mut World, defs: &Defs, tick: u64, player_id: ObjectId) -> bool {
    let Some(p) = world.player(player_id) else {
        return false;
    };
    if p.dead || p.swing_lands_tick.is_some() || tick < p.next_swing_tick {
        return false;
    }
    let Some(def) = defs.weapons.melee(p.melee) else {
        return false;
    };
    let lands = tick + ms_to_ticks(def.swing_delay_ms);
    let next = tick + ms_to_ticks(def.cooldown_ms);
    let Some(p) = world.player_mut(player_id) else {
        return false;
    };
    p.swing_lands_tick = Some(lands);
    p.next_swing_tick = next;
    metrics::counter!("melee.swing").increment(1);
    true
}

/// Resolve landing swings and re-arm auto weapons. Produces staged damage;
/// nothing is mutated here beyond the players' own swing state.
pub fn run(world: &mut World, defs: &Defs, tick: u64) -> Vec<DamageRecord> {
    let mut damage = Vec::new();
    for player_id in world.player_ids() {
        let Some(p) = world.player(player_id) else {
            continue;
        };
        let Some(def) = defs.weapons.melee(p.melee) else {
            continue;
        };
        let landing = p.swing_lands_tick == Some(tick);
        let auto_rearm = def.auto && p.attacking && p.swing_lands_tick.is_none();
        let def = def.clone();
        if landing {
            let Some(p) = world.player_mut(player_id) else {
                continue;
            };
            p.swing_lands_tick = None;
            if !p.dead {
                resolve_swing(world, defs, &def, player_id, &mut damage);
            }
        }
        if auto_rearm {
            start_swing(world, defs, tick, player_id);
        }
    }
    damage
}

fn resolve_swing(
    world: &World,
    defs: &Defs,
    def: &MeleeDef,
    attacker: ObjectId,
    damage: &mut Vec<DamageRecord>,
) {
    let Some(p) = world.player(attacker) else {
        return;
    };
    let probe_center = p.position + Vec2::from_angle(p.rotation).rotate(Vec2::from_array(def.offset));
    let probe = Hitbox::circle(def.radius, probe_center);
    let attacker_hitbox = p.hitbox();
    let attacker_layer = p.layer;
    let attacker_team = p.team;

    let mut targets: Vec<(f32, ObjectId)> = Vec::new();
    for cand in world.grid.query_hitbox(&probe) {
        if cand == attacker {
            continue;
        }
        let Some(obj) = world.get(cand) else {
            continue;
        };
        if !adjacent_or_equal_layer(attacker_layer, obj.layer()) {
            continue;
        }
        let order = match &obj.kind {
            ObjectKind::Player(other) => {
                if other.dead || !probe.collides_with(&other.hitbox()) {
                    continue;
                }
                if attacker_team.is_some() && other.team == attacker_team {
                    // teammates go to the back of the order; they only soak
                    // the swing when nothing else qualifies
                    f32::INFINITY
                } else {
                    other.hitbox().distance_to(&attacker_hitbox).distance
                }
            }
            ObjectKind::Obstacle(o) => {
                if o.dead || !probe.collides_with(&o.hitbox) {
                    continue;
                }
                let Some(odef) = defs.obstacles.get(o.def_id) else {
                    continue;
                };
                if odef.no_melee_collision {
                    f32::INFINITY
                } else {
                    o.hitbox.distance_to(&attacker_hitbox).distance
                }
            }
            _ => continue,
        };
        targets.push((order, cand));
    }
    targets.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    for (_, target) in targets.into_iter().take(def.max_targets as usize) {
        let Some(obj) = world.get(target) else {
            continue;
        };
        match &obj.kind {
            ObjectKind::Player(_) => damage.push(DamageRecord {
                target,
                amount: def.damage,
                position: probe_center,
                source: DamageSource::Melee {
                    piercing: def.piercing_multiplier.is_some(),
                },
            }),
            ObjectKind::Obstacle(o) => {
                let Some(odef) = defs.obstacles.get(o.def_id) else {
                    continue;
                };
                let multiplier = match def.piercing_multiplier {
                    Some(m) if odef.impenetrable => m,
                    _ => def.obstacle_multiplier,
                };
                damage.push(DamageRecord {
                    target,
                    amount: def.damage * multiplier,
                    position: probe_center,
                    source: DamageSource::Melee {
                        piercing: def.piercing_multiplier.is_some(),
                    },
                });
            }
            _ => {}
        }
    }
}
