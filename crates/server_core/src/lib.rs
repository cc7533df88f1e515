//! Authoritative arena simulation: world state, spatial index, combat
//! resolution, and per-tick delta snapshots.
//!
//! The whole simulation is single threaded. Systems run in a fixed order
//! inside [`tick::Simulation::run_tick`] and mutate [`world::World`]
//! directly; the snapshot assembler drains the world's dirty sets at the end
//! of the tick.
#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::float_cmp,
    clippy::must_use_candidate,
    clippy::similar_names,
    clippy::too_many_lines
)]

pub mod bullet;
pub mod gas;
pub mod grid;
pub mod melee;
pub mod object;
pub mod obstacle;
pub mod snapshot;
pub mod tick;
pub mod world;

use data_runtime::defs::obstacles::ObstacleDefs;
use data_runtime::defs::weapons::WeaponDefs;
use data_runtime::loot::{ItemRegistry, LootTables};

/// Every definition registry the simulation reads, loaded once at startup.
pub struct Defs {
    pub obstacles: ObstacleDefs,
    pub weapons: WeaponDefs,
    pub loot: LootTables,
    pub items: ItemRegistry,
    /// Explosion names in dense id order, collected from the obstacle defs.
    pub explosions: Vec<String>,
}

impl Defs {
    pub fn load_default() -> anyhow::Result<Self> {
        let obstacles = ObstacleDefs::load_default()?;
        let weapons = WeaponDefs::load_default()?;
        let loot = LootTables::load_default()?;
        let items = ItemRegistry::build(&loot, &weapons)?;
        let explosions: Vec<String> = obstacles
            .iter()
            .filter_map(|d| d.explosion.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        log::info!(
            "defs loaded: {} obstacles, {} loot tables, {} items",
            obstacles.len(),
            loot.tables.len(),
            items.len()
        );
        Ok(Self {
            obstacles,
            weapons,
            loot,
            items,
            explosions,
        })
    }

    /// Wire id of an explosion def, if it is known.
    #[must_use]
    pub fn explosion_id(&self, name: &str) -> Option<u8> {
        self.explosions
            .iter()
            .position(|n| n == name)
            .and_then(|i| u8::try_from(i).ok())
    }
}

/// Damage staged by the combat systems and applied in one pass after both
/// melee and bullets have resolved, so within-tick ordering cannot leak into
/// outcomes.
#[derive(Debug, Clone, Copy)]
pub struct DamageRecord {
    pub target: object::ObjectId,
    pub amount: f32,
    /// Where the hit landed, for loot pushes and door side selection.
    pub position: glam::Vec2,
    pub source: obstacle::DamageSource,
}

/// Side length of a broad-phase grid cell, world units.
pub const GRID_CELL_SIZE: f32 = 16.0;

/// Fixed simulation rate.
pub const TICKS_PER_SECOND: u32 = 30;

/// Seconds advanced per tick.
#[must_use]
pub fn tick_dt() -> f32 {
    1.0 / TICKS_PER_SECOND as f32
}
