//! Obstacle definitions: destructibility, roles, door behavior, drops.

use crate::hitbox_spec::HitboxSpec;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Structural role. Roles other than `None` get extra behavior in the server:
/// doors open and close, walls cascade damage into their building, windows
/// stay collidable after breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleRole {
    #[default]
    None,
    Door,
    Wall,
    Window,
}

/// How spawn orientation is chosen and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Any of the four cardinal orientations.
    #[default]
    Limited,
    /// Free angle, stored as orientation 0 plus a rotation on the hitbox.
    Full,
    /// Either of two opposing orientations.
    Binary,
    /// Always orientation 0.
    None,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScaleRange {
    pub spawn_min: f32,
    pub spawn_max: f32,
    /// Scale the hitbox shrinks toward as health drops; also the death scale.
    pub destroy: f32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            spawn_min: 1.0,
            spawn_max: 1.0,
            destroy: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorStyle {
    /// Rotates 90 degrees about a hinge point.
    #[default]
    Swivel,
    /// Translates along its long axis.
    Slide,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoorDef {
    #[serde(default)]
    pub style: DoorStyle,
    /// Hinge point in door-local coordinates (swivel only).
    #[serde(default)]
    pub hinge_offset: [f32; 2],
    /// Fraction of the door's width it slides by when open (slide only).
    #[serde(default = "default_slide_factor")]
    pub slide_factor: f32,
    /// Once opened, the door can never close again.
    #[serde(default)]
    pub open_once: bool,
}

fn default_slide_factor() -> f32 {
    0.9
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObstacleDef {
    pub name: String,
    pub material: String,
    pub health: f32,
    #[serde(default)]
    pub indestructible: bool,
    /// Bullets never pass through, regardless of their penetration flags.
    #[serde(default)]
    pub impenetrable: bool,
    /// Bullets ricochet off instead of stopping.
    #[serde(default)]
    pub reflect_bullets: bool,
    /// Never blocks movement or bullets; still damageable (e.g. floor loot
    /// containers are modeled elsewhere, this covers bushes).
    #[serde(default)]
    pub no_collisions: bool,
    /// Excluded from melee target selection.
    #[serde(default)]
    pub no_melee_collision: bool,
    #[serde(default)]
    pub role: ObstacleRole,
    #[serde(default)]
    pub rotation_mode: RotationMode,
    #[serde(default)]
    pub scale: ScaleRange,
    pub hitbox: HitboxSpec,
    /// Hitbox while a door is open; falls back to the closed hitbox.
    pub open_hitbox: Option<HitboxSpec>,
    /// Hitbox while a swivel door is open on the far side of its hinge.
    pub open_alt_hitbox: Option<HitboxSpec>,
    pub door: Option<DoorDef>,
    /// Distinct sprite variants; one is rolled at spawn.
    #[serde(default = "default_variations")]
    pub variations: u8,
    pub loot_table: Option<String>,
    /// Local-space point loot drops at; defaults to a random point in the
    /// hitbox when the table rolls more than one item.
    pub loot_spawn_offset: Option<[f32; 2]>,
    pub explosion: Option<String>,
}

fn default_variations() -> u8 {
    1
}

/// Registry of obstacle definitions with dense ids.
#[derive(Debug, Clone, Default)]
pub struct ObstacleDefs {
    defs: Vec<ObstacleDef>,
    by_name: HashMap<String, u16>,
}

#[derive(Debug, Clone, Deserialize)]
struct ObstacleFile {
    obstacle: Vec<ObstacleDef>,
}

impl ObstacleDefs {
    pub fn from_defs(defs: Vec<ObstacleDef>) -> Result<Self> {
        let mut by_name = HashMap::new();
        for (i, def) in defs.iter().enumerate() {
            let id = u16::try_from(i).context("more than 65536 obstacle defs")?;
            if by_name.insert(def.name.clone(), id).is_some() {
                anyhow::bail!("duplicate obstacle def name: {}", def.name);
            }
        }
        Ok(Self { defs, by_name })
    }

    pub fn load_default() -> Result<Self> {
        let path = crate::data_root().join("defs/obstacles.toml");
        if path.is_file() {
            let txt = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let file: ObstacleFile = toml::from_str(&txt).context("parse obstacles TOML")?;
            Self::from_defs(file.obstacle)
        } else {
            Self::from_defs(builtin_defs())
        }
    }

    #[must_use]
    pub fn get(&self, id: u16) -> Option<&ObstacleDef> {
        self.defs.get(id as usize)
    }

    #[must_use]
    pub fn id_for(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ObstacleDef> {
        self.id_for(name).and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObstacleDef> {
        self.defs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

fn builtin_defs() -> Vec<ObstacleDef> {
    vec![
        ObstacleDef {
            name: "oak_tree".into(),
            material: "tree".into(),
            health: 180.0,
            indestructible: false,
            impenetrable: false,
            reflect_bullets: false,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::None,
            rotation_mode: RotationMode::Full,
            scale: ScaleRange {
                spawn_min: 0.9,
                spawn_max: 1.1,
                destroy: 0.75,
            },
            hitbox: HitboxSpec::circle(5.5),
            open_hitbox: None,
            open_alt_hitbox: None,
            door: None,
            variations: 3,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: None,
        },
        ObstacleDef {
            name: "rock".into(),
            material: "stone".into(),
            health: 200.0,
            indestructible: false,
            impenetrable: false,
            reflect_bullets: false,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::None,
            rotation_mode: RotationMode::Full,
            scale: ScaleRange {
                spawn_min: 0.85,
                spawn_max: 1.0,
                destroy: 0.5,
            },
            hitbox: HitboxSpec::circle(4.0),
            open_hitbox: None,
            open_alt_hitbox: None,
            door: None,
            variations: 7,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: None,
        },
        ObstacleDef {
            name: "barrel".into(),
            material: "metal".into(),
            health: 160.0,
            indestructible: false,
            impenetrable: false,
            reflect_bullets: true,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::None,
            rotation_mode: RotationMode::Full,
            scale: ScaleRange::default(),
            hitbox: HitboxSpec::circle(3.65),
            open_hitbox: None,
            open_alt_hitbox: None,
            door: None,
            variations: 1,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: Some("barrel_explosion".into()),
        },
        ObstacleDef {
            name: "crate".into(),
            material: "crate".into(),
            health: 80.0,
            indestructible: false,
            impenetrable: false,
            reflect_bullets: false,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::None,
            rotation_mode: RotationMode::None,
            scale: ScaleRange {
                spawn_min: 1.0,
                spawn_max: 1.0,
                destroy: 0.5,
            },
            hitbox: HitboxSpec::rect([-4.6, -4.6], [4.6, 4.6]),
            open_hitbox: None,
            open_alt_hitbox: None,
            door: None,
            variations: 1,
            loot_table: Some("ground_loot".into()),
            loot_spawn_offset: None,
            explosion: None,
        },
        ObstacleDef {
            name: "house_wall".into(),
            material: "wood".into(),
            health: 170.0,
            indestructible: false,
            impenetrable: true,
            reflect_bullets: false,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::Wall,
            rotation_mode: RotationMode::Limited,
            scale: ScaleRange {
                spawn_min: 1.0,
                spawn_max: 1.0,
                destroy: 0.95,
            },
            hitbox: HitboxSpec::rect([-4.55, -1.0], [4.55, 1.0]),
            open_hitbox: None,
            open_alt_hitbox: None,
            door: None,
            variations: 1,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: None,
        },
        ObstacleDef {
            name: "house_door".into(),
            material: "wood".into(),
            health: 120.0,
            indestructible: false,
            impenetrable: true,
            reflect_bullets: false,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::Door,
            rotation_mode: RotationMode::Limited,
            scale: ScaleRange {
                spawn_min: 1.0,
                spawn_max: 1.0,
                destroy: 1.0,
            },
            hitbox: HitboxSpec::rect([-5.0, -0.9], [0.4, 0.9]),
            open_hitbox: Some(HitboxSpec::rect([-0.9, -5.8], [0.9, -0.4])),
            open_alt_hitbox: Some(HitboxSpec::rect([-0.9, 0.4], [0.9, 5.8])),
            door: Some(DoorDef {
                style: DoorStyle::Swivel,
                hinge_offset: [-5.5, 0.0],
                slide_factor: default_slide_factor(),
                open_once: false,
            }),
            variations: 1,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: None,
        },
        ObstacleDef {
            name: "vault_door".into(),
            material: "metal".into(),
            health: 1.0,
            indestructible: true,
            impenetrable: true,
            reflect_bullets: true,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::Door,
            rotation_mode: RotationMode::Limited,
            scale: ScaleRange {
                spawn_min: 1.0,
                spawn_max: 1.0,
                destroy: 1.0,
            },
            hitbox: HitboxSpec::rect([-6.1, -1.0], [6.1, 1.0]),
            open_hitbox: Some(HitboxSpec::rect([-6.1, -1.0], [6.1, 1.0])),
            open_alt_hitbox: None,
            door: Some(DoorDef {
                style: DoorStyle::Slide,
                hinge_offset: [0.0, 0.0],
                slide_factor: 0.9,
                open_once: false,
            }),
            variations: 1,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: None,
        },
        ObstacleDef {
            name: "window".into(),
            material: "glass".into(),
            health: 20.0,
            indestructible: false,
            impenetrable: false,
            reflect_bullets: false,
            no_collisions: false,
            no_melee_collision: false,
            role: ObstacleRole::Window,
            rotation_mode: RotationMode::Limited,
            scale: ScaleRange {
                spawn_min: 1.0,
                spawn_max: 1.0,
                destroy: 0.95,
            },
            hitbox: HitboxSpec::rect([-0.9, -2.4], [0.9, 2.4]),
            open_hitbox: None,
            open_alt_hitbox: None,
            door: None,
            variations: 1,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: None,
        },
        ObstacleDef {
            name: "bush".into(),
            material: "bush".into(),
            health: 80.0,
            indestructible: false,
            impenetrable: false,
            reflect_bullets: false,
            no_collisions: true,
            no_melee_collision: false,
            role: ObstacleRole::None,
            rotation_mode: RotationMode::Full,
            scale: ScaleRange {
                spawn_min: 0.9,
                spawn_max: 1.1,
                destroy: 0.8,
            },
            hitbox: HitboxSpec::circle(4.2),
            open_hitbox: None,
            open_alt_hitbox: None,
            door: None,
            variations: 2,
            loot_table: None,
            loot_spawn_offset: None,
            explosion: None,
        },
    ]
}
