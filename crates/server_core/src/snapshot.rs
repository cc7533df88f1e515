//! Per-client delta packet assembly.
//!
//! Object deltas are shared across clients (the world's dirty frame is
//! computed once per tick); stat sections are private, so each client view
//! tracks what it last saw and only re-sends on change.

use crate::object::{GameObject, ObjectId, ObjectKind};
use crate::world::{DirtyFrame, World};
use net_core::object::{
    BuildingFull, BuildingPartial, DecalFull, FullData, FullRecord, LootFull, LootPartial,
    ObstacleFull, ObstaclePartial, PartialData, PartialRecord, PlayerFull, PlayerPartial,
};
use net_core::update::{BulletSpawnRep, EmoteRep, ExplosionRep, StatRanges, UpdatePacket};

/// One connected client's replication state.
#[derive(Debug, Clone)]
pub struct ClientView {
    pub player: ObjectId,
    ranges: StatRanges,
    ranges_sent: bool,
    last_health: f32,
    last_adrenaline: f32,
    last_zoom: u8,
    last_alive: Option<u8>,
}

impl ClientView {
    #[must_use]
    pub fn new(player: ObjectId) -> Self {
        Self {
            player,
            ranges: StatRanges::default(),
            ranges_sent: false,
            last_health: f32::NAN,
            last_adrenaline: f32::NAN,
            last_zoom: 0,
            last_alive: None,
        }
    }

    /// Quantization ranges this client currently decodes with.
    #[must_use]
    pub fn ranges(&self) -> &StatRanges {
        &self.ranges
    }
}

/// Spawn-record and gas inputs for one tick's packets, shared by all
/// clients.
#[derive(Debug, Default, Clone)]
pub struct TickOutput {
    pub bullets: Vec<BulletSpawnRep>,
    pub explosions: Vec<ExplosionRep>,
    pub emotes: Vec<EmoteRep>,
    pub gas: Option<net_core::update::GasRep>,
    pub gas_percentage: Option<f32>,
}

fn full_record(obj: &GameObject) -> FullRecord {
    let data = match &obj.kind {
        ObjectKind::Player(p) => FullData::Player(PlayerFull {
            partial: PlayerPartial {
                position: p.position.to_array(),
                rotation: p.rotation,
            },
            layer: p.layer,
            dead: p.dead,
        }),
        ObjectKind::Obstacle(o) => FullData::Obstacle(ObstacleFull {
            partial: ObstaclePartial {
                scale: o.scale,
                dead: o.dead,
                door_offset: o.door.map(|d| d.offset),
            },
            def_id: o.def_id,
            position: o.position.to_array(),
            orientation: o.orientation,
            variation: o.variation,
            layer: o.layer,
        }),
        ObjectKind::Loot(l) => FullData::Loot(LootFull {
            partial: LootPartial {
                position: l.position.to_array(),
            },
            def_id: l.def_id,
            count: l.count,
        }),
        ObjectKind::Building(b) => FullData::Building(BuildingFull {
            partial: BuildingPartial { dead: b.dead },
            def_id: b.def_id,
            position: b.position.to_array(),
            orientation: b.orientation,
        }),
        ObjectKind::Decal(d) => FullData::Decal(DecalFull {
            def_id: d.def_id,
            position: d.position.to_array(),
            rotation: d.rotation,
        }),
    };
    FullRecord { id: obj.id.0, data }
}

fn partial_record(obj: &GameObject) -> PartialRecord {
    let data = match &obj.kind {
        ObjectKind::Player(p) => PartialData::Player(PlayerPartial {
            position: p.position.to_array(),
            rotation: p.rotation,
        }),
        ObjectKind::Obstacle(o) => PartialData::Obstacle(ObstaclePartial {
            scale: o.scale,
            dead: o.dead,
            door_offset: o.door.map(|d| d.offset),
        }),
        ObjectKind::Loot(l) => PartialData::Loot(LootPartial {
            position: l.position.to_array(),
        }),
        ObjectKind::Building(b) => PartialData::Building(BuildingPartial { dead: b.dead }),
        ObjectKind::Decal(_) => PartialData::Decal,
    };
    PartialRecord { id: obj.id.0, data }
}

/// Build one client's packet for this tick. Mutates the view's last-seen
/// stat cache.
pub fn assemble(
    world: &World,
    frame: &DirtyFrame,
    output: &TickOutput,
    view: &mut ClientView,
) -> UpdatePacket {
    let mut packet = UpdatePacket {
        full_objects: frame
            .full
            .iter()
            .filter_map(|&id| world.get(id).map(full_record))
            .collect(),
        partial_objects: frame
            .partial
            .iter()
            .filter_map(|&id| world.get(id).map(partial_record))
            .collect(),
        deleted: frame.deleted.iter().map(|id| id.0).collect(),
        bullets: output.bullets.clone(),
        explosions: output.explosions.clone(),
        emotes: output.emotes.clone(),
        gas: output.gas,
        gas_percentage: output.gas_percentage,
        ..Default::default()
    };

    if let Some(p) = world.player(view.player) {
        let ranges = StatRanges {
            max_health: p.max_health,
            min_adrenaline: 0.0,
            max_adrenaline: p.max_adrenaline,
        };
        if !view.ranges_sent || ranges != view.ranges {
            packet.stats = Some(ranges);
            view.ranges = ranges;
            view.ranges_sent = true;
        }
        if p.health != view.last_health {
            packet.health = Some(p.health);
            view.last_health = p.health;
        }
        if p.adrenaline != view.last_adrenaline {
            packet.adrenaline = Some(p.adrenaline);
            view.last_adrenaline = p.adrenaline;
        }
        if p.zoom != view.last_zoom {
            packet.zoom = Some(p.zoom);
            view.last_zoom = p.zoom;
        }
    }

    let alive = u8::try_from(world.alive_player_count().min(127)).unwrap_or(127);
    if view.last_alive != Some(alive) {
        packet.alive_count = Some(alive);
        view.last_alive = Some(alive);
    }

    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectKind, PlayerState};
    use glam::Vec2;

    #[test]
    fn first_packet_carries_stats_and_alive_count() {
        let mut world = World::new(512.0, 512.0);
        let id = world.spawn(ObjectKind::Player(PlayerState::new(Vec2::new(10.0, 10.0))));
        let frame = world.drain_dirty();
        let mut view = ClientView::new(id);
        let packet = assemble(&world, &frame, &TickOutput::default(), &mut view);
        assert!(packet.stats.is_some());
        assert!(packet.health.is_some());
        assert_eq!(packet.alive_count, Some(1));
        assert_eq!(packet.full_objects.len(), 1);
        assert_eq!(packet.full_objects[0].id, id.0);
    }

    #[test]
    fn unchanged_stats_are_not_resent() {
        let mut world = World::new(512.0, 512.0);
        let id = world.spawn(ObjectKind::Player(PlayerState::new(Vec2::new(10.0, 10.0))));
        let frame = world.drain_dirty();
        let mut view = ClientView::new(id);
        assemble(&world, &frame, &TickOutput::default(), &mut view);
        let empty = world.drain_dirty();
        let packet = assemble(&world, &empty, &TickOutput::default(), &mut view);
        assert!(packet.stats.is_none());
        assert!(packet.health.is_none());
        assert!(packet.alive_count.is_none());
        assert!(packet.full_objects.is_empty());
    }

    #[test]
    fn health_change_reaches_only_the_stat_section() {
        let mut world = World::new(512.0, 512.0);
        let id = world.spawn(ObjectKind::Player(PlayerState::new(Vec2::new(10.0, 10.0))));
        let mut view = ClientView::new(id);
        let frame = world.drain_dirty();
        assemble(&world, &frame, &TickOutput::default(), &mut view);
        world.damage_player(id, 25.0);
        let frame = world.drain_dirty();
        let packet = assemble(&world, &frame, &TickOutput::default(), &mut view);
        assert_eq!(packet.health, Some(75.0));
        assert!(packet.stats.is_none());
        // the damaged player position delta still replicates
        assert_eq!(packet.partial_objects.len(), 1);
    }
}
