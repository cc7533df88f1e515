//! Bullet sweep and hit resolution.
//!
//! Bullets are server-internal: clients only ever see spawn records and the
//! damage results. Each tick a bullet sweeps a segment, gathers every
//! surface crossing from the broad phase, and walks them in hit order until
//! something stops it. Objects it has already damaged are skipped, so
//! resolving a bullet is idempotent across penetration and re-checks.

use crate::object::{ObjectId, ObjectKind};
use crate::obstacle::DamageSource;
use crate::world::World;
use crate::{DamageRecord, Defs};
use geom_core::layer::adjacent_or_equal_layer;
use geom_core::math::{direction, normalize_angle};
use geom_core::Hitbox;
use glam::Vec2;

/// Reflections stop after this many bounces.
pub const MAX_REFLECTIONS: u8 = 3;

/// Distance a reflected bullet is nudged along its new heading so it cannot
/// immediately re-hit the surface it bounced off.
const REFLECT_NUDGE: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct Bullet {
    pub weapon: u16,
    pub shooter: ObjectId,
    pub position: Vec2,
    pub rotation: f32,
    pub variance: f32,
    pub reflection_count: u8,
    pub speed: f32,
    pub range: f32,
    pub traveled: f32,
    pub damage: f32,
    pub obstacle_multiplier: f32,
    pub penetrates_players: bool,
    pub penetrates_obstacles: bool,
    pub dead: bool,
    damaged: Vec<ObjectId>,
}

impl Bullet {
    /// Build a bullet from its gun def. Returns `None` for an unknown weapon
    /// id.
    #[must_use]
    pub fn spawn(
        defs: &Defs,
        weapon: u16,
        shooter: ObjectId,
        position: Vec2,
        rotation: f32,
        variance: f32,
        reflection_count: u8,
    ) -> Option<Self> {
        let def = defs.weapons.gun(weapon)?;
        Some(Self {
            weapon,
            shooter,
            position,
            rotation: normalize_angle(rotation),
            variance,
            reflection_count,
            speed: def.speed,
            range: def.range,
            traveled: 0.0,
            damage: def.damage,
            obstacle_multiplier: def.obstacle_multiplier,
            penetrates_players: def.penetration.players,
            penetrates_obstacles: def.penetration.obstacles,
            dead: false,
            damaged: Vec::new(),
        })
    }

    /// Damage falls off by half per prior reflection.
    #[must_use]
    pub fn falloff_damage(&self) -> f32 {
        self.damage / f32::from(self.reflection_count + 1)
    }
}

#[derive(Debug, Clone, Copy)]
struct Crossing {
    t: f32,
    target: ObjectId,
    point: Vec2,
    normal: Vec2,
    is_player: bool,
}

/// Advance every bullet one tick. Staged damage goes into `damage`.
/// Reflections join `bullets` (they start moving next tick) and are also
/// left in `spawned` so the caller can announce them to clients.
pub fn update(
    world: &World,
    defs: &Defs,
    bullets: &mut Vec<Bullet>,
    dt: f32,
    damage: &mut Vec<DamageRecord>,
    spawned: &mut Vec<Bullet>,
) {
    let mut children = Vec::new();
    for bullet in bullets.iter_mut() {
        if bullet.dead {
            continue;
        }
        step(world, defs, bullet, dt, damage, &mut children);
    }
    bullets.retain(|b| !b.dead);
    bullets.extend(children.iter().cloned());
    spawned.append(&mut children);
}

fn step(
    world: &World,
    defs: &Defs,
    bullet: &mut Bullet,
    dt: f32,
    damage: &mut Vec<DamageRecord>,
    spawned: &mut Vec<Bullet>,
) {
    // a bullet dies with its shooter
    if world.player(bullet.shooter).map_or(true, |p| p.dead) {
        bullet.dead = true;
        return;
    }

    let old = bullet.position;
    let mut travel = bullet.speed * dt;
    let mut exhausted = false;
    if bullet.traveled + travel >= bullet.range {
        travel = bullet.range - bullet.traveled;
        exhausted = true;
    }
    let new = old + direction(bullet.rotation) * travel;
    bullet.traveled += travel;
    bullet.position = new;

    if !world.in_bounds(new) {
        bullet.dead = true;
        return;
    }

    let shooter_layer = world.player(bullet.shooter).map_or(0, |p| p.layer);
    let (min, max) = Hitbox::from_line(old, new).bounds();
    // an axis-aligned sweep is a zero-area rect; pad so the query sees it
    let pad = Vec2::splat(1e-3);
    let mut crossings: Vec<Crossing> = Vec::new();
    for cand in world.grid.query_rect(min - pad, max + pad) {
        if bullet.damaged.contains(&cand) {
            continue;
        }
        let Some(obj) = world.get(cand) else {
            continue;
        };
        if !adjacent_or_equal_layer(shooter_layer, obj.layer()) {
            continue;
        }
        match &obj.kind {
            ObjectKind::Player(p) => {
                if p.dead {
                    continue;
                }
                if let Some(hit) = p.hitbox().intersect_segment(old, new) {
                    crossings.push(Crossing {
                        t: hit.t,
                        target: cand,
                        point: hit.point,
                        normal: hit.normal,
                        is_player: true,
                    });
                }
            }
            ObjectKind::Obstacle(o) => {
                if o.dead {
                    continue;
                }
                if let Some(hit) = o.hitbox.intersect_segment(old, new) {
                    crossings.push(Crossing {
                        t: hit.t,
                        target: cand,
                        point: hit.point,
                        normal: hit.normal,
                        is_player: false,
                    });
                }
            }
            _ => {}
        }
    }
    crossings.sort_by(|a, b| a.t.total_cmp(&b.t).then(a.target.cmp(&b.target)));

    for crossing in crossings {
        if crossing.is_player {
            bullet.damaged.push(crossing.target);
            damage.push(DamageRecord {
                target: crossing.target,
                amount: bullet.falloff_damage(),
                position: crossing.point,
                source: DamageSource::Bullet,
            });
            if !bullet.penetrates_players {
                bullet.position = crossing.point;
                bullet.dead = true;
                break;
            }
        } else {
            let Some(o) = world.obstacle(crossing.target) else {
                continue;
            };
            let Some(odef) = defs.obstacles.get(o.def_id) else {
                continue;
            };
            bullet.damaged.push(crossing.target);
            damage.push(DamageRecord {
                target: crossing.target,
                amount: bullet.falloff_damage() * bullet.obstacle_multiplier,
                position: crossing.point,
                source: DamageSource::Bullet,
            });
            // bushes never stop a bullet, they just take the hit
            if odef.no_collisions || (bullet.penetrates_obstacles && !odef.impenetrable) {
                continue;
            }
            bullet.position = crossing.point;
            if odef.reflect_bullets && bullet.reflection_count < MAX_REFLECTIONS {
                reflect(defs, bullet, crossing.point, crossing.normal, spawned);
            }
            bullet.dead = true;
            break;
        }
    }

    if exhausted && !bullet.dead {
        bullet.dead = true;
    }
}

fn reflect(defs: &Defs, bullet: &Bullet, point: Vec2, normal: Vec2, spawned: &mut Vec<Bullet>) {
    // mirror the heading about the outward surface normal
    let normal_angle = normal.y.atan2(normal.x);
    let rotation = normalize_angle(2.0 * normal_angle + std::f32::consts::PI - bullet.rotation);
    let position = point + direction(rotation) * REFLECT_NUDGE;
    if let Some(child) = Bullet::spawn(
        defs,
        bullet.weapon,
        bullet.shooter,
        position,
        rotation,
        bullet.variance,
        bullet.reflection_count + 1,
    ) {
        metrics::counter!("bullet.reflected").increment(1);
        spawned.push(child);
    }
}
