//! World object model: a common identity plus per-kind state.

use geom_core::Hitbox;
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

pub const PLAYER_RADIUS: f32 = 2.25;
pub const LOOT_RADIUS: f32 = 2.5;
pub const DEFAULT_MAX_HEALTH: f32 = 100.0;
pub const DEFAULT_MAX_ADRENALINE: f32 = 100.0;

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub position: Vec2,
    pub rotation: f32,
    pub layer: i32,
    pub health: f32,
    pub max_health: f32,
    pub adrenaline: f32,
    pub max_adrenaline: f32,
    pub zoom: u8,
    pub dead: bool,
    pub team: Option<u32>,
    pub gun: Option<u16>,
    pub melee: u16,
    /// Held-attack state; auto melee re-arms while this is set.
    pub attacking: bool,
    /// Tick a started swing lands on, if one is in flight.
    pub swing_lands_tick: Option<u64>,
    /// First tick a new swing may start.
    pub next_swing_tick: u64,
}

impl PlayerState {
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            layer: 0,
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            adrenaline: 0.0,
            max_adrenaline: DEFAULT_MAX_ADRENALINE,
            zoom: 48,
            dead: false,
            team: None,
            gun: None,
            melee: 0,
            attacking: false,
            swing_lands_tick: None,
            next_swing_tick: 0,
        }
    }

    #[must_use]
    pub fn hitbox(&self) -> Hitbox {
        Hitbox::circle(PLAYER_RADIUS, self.position)
    }
}

/// Live door state. The authoritative open/closed hitbox swap happens in
/// `obstacle::interact`.
#[derive(Debug, Clone, Copy)]
pub struct DoorState {
    pub open: bool,
    /// Wire offset: 0 closed, 1 open, 3 open on the far side of the hinge.
    pub offset: u8,
}

#[derive(Debug, Clone)]
pub struct ObstacleState {
    pub def_id: u16,
    pub position: Vec2,
    pub orientation: u8,
    pub layer: i32,
    pub health: f32,
    pub max_health: f32,
    pub scale: f32,
    pub max_scale: f32,
    /// Sprite variant rolled at spawn.
    pub variation: u8,
    /// World-space hitbox, kept in sync with position, scale, orientation.
    pub hitbox: Hitbox,
    pub dead: bool,
    pub collidable: bool,
    pub door: Option<DoorState>,
    pub parent_building: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct LootState {
    pub def_id: u16,
    pub count: u8,
    pub position: Vec2,
    pub layer: i32,
}

impl LootState {
    #[must_use]
    pub fn hitbox(&self) -> Hitbox {
        Hitbox::circle(LOOT_RADIUS, self.position)
    }
}

#[derive(Debug, Clone)]
pub struct BuildingState {
    pub def_id: u16,
    pub position: Vec2,
    pub orientation: u8,
    pub layer: i32,
    /// Walls left before the ceiling comes down.
    pub walls_to_destroy: u32,
    pub dead: bool,
}

#[derive(Debug, Clone)]
pub struct DecalState {
    pub def_id: u16,
    pub position: Vec2,
    pub rotation: f32,
    pub layer: i32,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Player(PlayerState),
    Obstacle(ObstacleState),
    Loot(LootState),
    Building(BuildingState),
    Decal(DecalState),
}

#[derive(Debug, Clone)]
pub struct GameObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
}

impl GameObject {
    /// Axis-aligned bounds for the broad phase. Buildings and decals are
    /// point-registered; their extent lives in their child obstacles.
    #[must_use]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        match &self.kind {
            ObjectKind::Player(p) => p.hitbox().bounds(),
            ObjectKind::Obstacle(o) => o.hitbox.bounds(),
            ObjectKind::Loot(l) => l.hitbox().bounds(),
            ObjectKind::Building(b) => (b.position, b.position),
            ObjectKind::Decal(d) => (d.position, d.position),
        }
    }

    #[must_use]
    pub fn layer(&self) -> i32 {
        match &self.kind {
            ObjectKind::Player(p) => p.layer,
            ObjectKind::Obstacle(o) => o.layer,
            ObjectKind::Loot(l) => l.layer,
            ObjectKind::Building(b) => b.layer,
            ObjectKind::Decal(d) => d.layer,
        }
    }

    #[must_use]
    pub fn as_player(&self) -> Option<&PlayerState> {
        match &self.kind {
            ObjectKind::Player(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_obstacle(&self) -> Option<&ObstacleState> {
        match &self.kind {
            ObjectKind::Obstacle(o) => Some(o),
            _ => None,
        }
    }
}
