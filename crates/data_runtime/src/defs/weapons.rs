//! Gun and melee weapon definitions.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// What a bullet keeps traveling through after a hit.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Penetration {
    #[serde(default)]
    pub players: bool,
    #[serde(default)]
    pub obstacles: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GunDef {
    pub name: String,
    pub ammo: String,
    /// Ammo dropped alongside the gun itself.
    #[serde(default = "default_ammo_spawn")]
    pub ammo_spawn_count: u8,
    pub damage: f32,
    /// Bullet damage is scaled by this against obstacles, before reflection
    /// falloff.
    #[serde(default = "default_multiplier")]
    pub obstacle_multiplier: f32,
    /// Bullet travel speed, world units per second.
    pub speed: f32,
    /// Maximum travel distance before the bullet despawns.
    pub range: f32,
    /// Bullets per trigger pull.
    #[serde(default = "default_bullet_count")]
    pub bullet_count: u32,
    /// Half-angle of the aim cone, degrees.
    #[serde(default)]
    pub spread_deg: f32,
    pub fire_delay_ms: u32,
    #[serde(default)]
    pub penetration: Penetration,
}

fn default_multiplier() -> f32 {
    1.0
}
fn default_bullet_count() -> u32 {
    1
}
fn default_ammo_spawn() -> u8 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeleeDef {
    pub name: String,
    pub damage: f32,
    #[serde(default = "default_multiplier")]
    pub obstacle_multiplier: f32,
    /// Overrides `obstacle_multiplier` against impenetrable obstacles; when
    /// absent, impenetrable obstacles shrug the hit off entirely.
    pub piercing_multiplier: Option<f32>,
    /// Radius of the swing probe.
    pub radius: f32,
    /// Probe center offset from the attacker, rotated by facing.
    pub offset: [f32; 2],
    /// Delay between starting a swing and applying damage.
    pub swing_delay_ms: u32,
    /// Minimum time between swings.
    pub cooldown_ms: u32,
    #[serde(default = "default_max_targets")]
    pub max_targets: u32,
    /// Whether holding attack keeps swinging.
    #[serde(default)]
    pub auto: bool,
}

fn default_max_targets() -> u32 {
    1
}

#[derive(Debug, Clone, Default)]
pub struct WeaponDefs {
    guns: Vec<GunDef>,
    melees: Vec<MeleeDef>,
    gun_ids: HashMap<String, u16>,
    melee_ids: HashMap<String, u16>,
}

#[derive(Debug, Clone, Deserialize)]
struct WeaponFile {
    #[serde(default)]
    gun: Vec<GunDef>,
    #[serde(default)]
    melee: Vec<MeleeDef>,
}

impl WeaponDefs {
    pub fn from_defs(guns: Vec<GunDef>, melees: Vec<MeleeDef>) -> Result<Self> {
        let mut gun_ids = HashMap::new();
        for (i, def) in guns.iter().enumerate() {
            let id = u16::try_from(i).context("more than 65536 gun defs")?;
            if gun_ids.insert(def.name.clone(), id).is_some() {
                anyhow::bail!("duplicate gun def name: {}", def.name);
            }
        }
        let mut melee_ids = HashMap::new();
        for (i, def) in melees.iter().enumerate() {
            let id = u16::try_from(i).context("more than 65536 melee defs")?;
            if melee_ids.insert(def.name.clone(), id).is_some() {
                anyhow::bail!("duplicate melee def name: {}", def.name);
            }
        }
        Ok(Self {
            guns,
            melees,
            gun_ids,
            melee_ids,
        })
    }

    pub fn load_default() -> Result<Self> {
        let path = crate::data_root().join("defs/weapons.toml");
        if path.is_file() {
            let txt = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let file: WeaponFile = toml::from_str(&txt).context("parse weapons TOML")?;
            Self::from_defs(file.gun, file.melee)
        } else {
            Self::from_defs(builtin_guns(), builtin_melees())
        }
    }

    #[must_use]
    pub fn gun(&self, id: u16) -> Option<&GunDef> {
        self.guns.get(id as usize)
    }

    #[must_use]
    pub fn melee(&self, id: u16) -> Option<&MeleeDef> {
        self.melees.get(id as usize)
    }

    pub fn guns(&self) -> impl Iterator<Item = &GunDef> {
        self.guns.iter()
    }

    pub fn melees(&self) -> impl Iterator<Item = &MeleeDef> {
        self.melees.iter()
    }

    #[must_use]
    pub fn gun_id(&self, name: &str) -> Option<u16> {
        self.gun_ids.get(name).copied()
    }

    #[must_use]
    pub fn melee_id(&self, name: &str) -> Option<u16> {
        self.melee_ids.get(name).copied()
    }
}

fn builtin_guns() -> Vec<GunDef> {
    vec![
        GunDef {
            name: "m9".into(),
            ammo: "9mm".into(),
            ammo_spawn_count: 45,
            damage: 13.0,
            obstacle_multiplier: 1.0,
            speed: 140.0,
            range: 120.0,
            bullet_count: 1,
            spread_deg: 8.0,
            fire_delay_ms: 110,
            penetration: Penetration::default(),
        },
        GunDef {
            name: "ak47".into(),
            ammo: "762mm".into(),
            ammo_spawn_count: 60,
            damage: 14.0,
            obstacle_multiplier: 1.5,
            speed: 160.0,
            range: 160.0,
            bullet_count: 1,
            spread_deg: 4.0,
            fire_delay_ms: 100,
            penetration: Penetration::default(),
        },
        GunDef {
            name: "m870".into(),
            ammo: "12g".into(),
            ammo_spawn_count: 15,
            damage: 10.0,
            obstacle_multiplier: 1.0,
            speed: 110.0,
            range: 80.0,
            bullet_count: 10,
            spread_deg: 10.0,
            fire_delay_ms: 925,
            penetration: Penetration::default(),
        },
        GunDef {
            name: "flues".into(),
            ammo: "12g".into(),
            ammo_spawn_count: 15,
            damage: 10.0,
            obstacle_multiplier: 1.0,
            speed: 110.0,
            range: 70.0,
            bullet_count: 9,
            spread_deg: 12.0,
            fire_delay_ms: 250,
            penetration: Penetration {
                players: true,
                obstacles: false,
            },
        },
        GunDef {
            name: "barrett".into(),
            ammo: "127mm".into(),
            ammo_spawn_count: 10,
            damage: 120.0,
            obstacle_multiplier: 2.0,
            speed: 220.0,
            range: 300.0,
            bullet_count: 1,
            spread_deg: 0.5,
            fire_delay_ms: 1400,
            penetration: Penetration {
                players: true,
                obstacles: true,
            },
        },
    ]
}

fn builtin_melees() -> Vec<MeleeDef> {
    vec![
        MeleeDef {
            name: "fists".into(),
            damage: 20.0,
            obstacle_multiplier: 1.0,
            piercing_multiplier: None,
            radius: 1.5,
            offset: [2.5, 0.0],
            swing_delay_ms: 125,
            cooldown_ms: 250,
            max_targets: 1,
            auto: true,
        },
        MeleeDef {
            name: "baseball_bat".into(),
            damage: 34.0,
            obstacle_multiplier: 1.5,
            piercing_multiplier: None,
            radius: 3.8,
            offset: [3.8, 2.2],
            swing_delay_ms: 340,
            cooldown_ms: 450,
            max_targets: 1,
            auto: true,
        },
        MeleeDef {
            name: "fire_axe".into(),
            damage: 50.0,
            obstacle_multiplier: 2.0,
            piercing_multiplier: Some(1.0),
            radius: 2.5,
            offset: [5.4, -0.5],
            swing_delay_ms: 350,
            cooldown_ms: 700,
            max_targets: 1,
            auto: false,
        },
        MeleeDef {
            name: "seax".into(),
            damage: 45.0,
            obstacle_multiplier: 1.5,
            piercing_multiplier: None,
            radius: 2.7,
            offset: [5.4, -0.5],
            swing_delay_ms: 200,
            cooldown_ms: 410,
            max_targets: 3,
            auto: true,
        },
    ]
}
