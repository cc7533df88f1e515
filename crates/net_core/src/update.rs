//! The per-tick update packet.
//!
//! Layout (order fixed): a block of presence booleans, then each section
//! conditionally. Decoders must tolerate any optional section being absent;
//! the presence bits gate all parsing. Player stat quantization ranges come
//! from the client's last-seen max/min stat block, which may arrive in the
//! same packet, in which case the new ranges apply to that packet too.

use crate::bits::{BitReader, BitWriter};
use crate::object::{FullRecord, PartialRecord};
use anyhow::{bail, Result};

pub const HEALTH_BITS: u32 = 12;
pub const ADRENALINE_BITS: u32 = 10;
pub const GAS_RADIUS_MAX: f32 = 2048.0;
pub const GAS_RADIUS_BITS: u32 = 16;
pub const GAS_DURATION_BITS: u32 = 7;
pub const GAS_PERCENT_BITS: u32 = 16;
pub const COUNT_BITS: u32 = 16;
pub const SPAWN_COUNT_BITS: u32 = 8;
pub const EMOTE_COUNT_BITS: u32 = 7;
pub const ALIVE_COUNT_BITS: u32 = 7;

/// Quantization ranges the client tracks between packets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatRanges {
    pub max_health: f32,
    pub min_adrenaline: f32,
    pub max_adrenaline: f32,
}

impl Default for StatRanges {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            min_adrenaline: 0.0,
            max_adrenaline: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasState {
    Inactive,
    Waiting,
    Advancing,
}

impl GasState {
    #[must_use]
    pub fn to_bits(self) -> u32 {
        match self {
            Self::Inactive => 0,
            Self::Waiting => 1,
            Self::Advancing => 2,
        }
    }

    pub fn from_bits(bits: u32) -> Result<Self> {
        Ok(match bits {
            0 => Self::Inactive,
            1 => Self::Waiting,
            2 => Self::Advancing,
            other => bail!("unknown gas state {other}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasRep {
    pub state: GasState,
    pub initial_duration_s: u8,
    pub old_position: [f32; 2],
    pub new_position: [f32; 2],
    pub old_radius: f32,
    pub new_radius: f32,
    pub percentage: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletSpawnRep {
    pub weapon_id: u16,
    pub position: [f32; 2],
    pub rotation: f32,
    pub variance: f32,
    pub reflection_count: u8,
    pub shooter_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosionRep {
    pub def_id: u8,
    pub position: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmoteRep {
    pub emote_id: u8,
    pub player_id: u32,
}

/// One outbound packet per connected client per tick. Every section is
/// optional; empty sections are omitted entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePacket {
    pub stats: Option<StatRanges>,
    pub health: Option<f32>,
    pub adrenaline: Option<f32>,
    pub zoom: Option<u8>,
    pub full_objects: Vec<FullRecord>,
    pub partial_objects: Vec<PartialRecord>,
    pub deleted: Vec<u32>,
    pub bullets: Vec<BulletSpawnRep>,
    pub explosions: Vec<ExplosionRep>,
    pub emotes: Vec<EmoteRep>,
    pub gas: Option<GasRep>,
    pub gas_percentage: Option<f32>,
    pub alive_count: Option<u8>,
}

impl UpdatePacket {
    /// Encode into `w`. `ranges` is the client's last-known stat
    /// quantization; a stat block inside this packet supersedes it for the
    /// sections that follow.
    pub fn encode(&self, w: &mut BitWriter, ranges: &StatRanges) {
        let ranges = self.stats.as_ref().unwrap_or(ranges);

        w.write_bool(self.stats.is_some());
        w.write_bool(self.health.is_some());
        w.write_bool(self.adrenaline.is_some());
        w.write_bool(self.zoom.is_some());
        w.write_bool(!self.full_objects.is_empty());
        w.write_bool(!self.partial_objects.is_empty());
        w.write_bool(!self.deleted.is_empty());
        w.write_bool(!self.bullets.is_empty());
        w.write_bool(!self.explosions.is_empty());
        w.write_bool(!self.emotes.is_empty());
        w.write_bool(self.gas.is_some());
        w.write_bool(self.gas_percentage.is_some());
        w.write_bool(self.alive_count.is_some());

        if let Some(stats) = &self.stats {
            w.write_f32(stats.max_health);
            w.write_f32(stats.min_adrenaline);
            w.write_f32(stats.max_adrenaline);
        }
        if let Some(health) = self.health {
            w.write_float(health, 0.0, ranges.max_health, HEALTH_BITS);
        }
        if let Some(adrenaline) = self.adrenaline {
            w.write_float(
                adrenaline,
                ranges.min_adrenaline,
                ranges.max_adrenaline,
                ADRENALINE_BITS,
            );
        }
        if let Some(zoom) = self.zoom {
            w.write_bits(u32::from(zoom), 8);
        }
        if !self.full_objects.is_empty() {
            w.write_bits(self.full_objects.len() as u32, COUNT_BITS);
            for rec in &self.full_objects {
                rec.encode(w);
            }
        }
        if !self.partial_objects.is_empty() {
            w.write_bits(self.partial_objects.len() as u32, COUNT_BITS);
            for rec in &self.partial_objects {
                rec.encode(w);
            }
        }
        if !self.deleted.is_empty() {
            w.write_bits(self.deleted.len() as u32, COUNT_BITS);
            for id in &self.deleted {
                w.write_object_id(*id);
            }
        }
        if !self.bullets.is_empty() {
            w.write_bits(self.bullets.len() as u32, SPAWN_COUNT_BITS);
            for b in &self.bullets {
                w.write_bits(u32::from(b.weapon_id), 16);
                w.write_position(b.position);
                w.write_rotation(b.rotation, 16);
                w.write_variance(b.variance);
                w.write_bits(u32::from(b.reflection_count), 2);
                w.write_object_id(b.shooter_id);
            }
        }
        if !self.explosions.is_empty() {
            w.write_bits(self.explosions.len() as u32, SPAWN_COUNT_BITS);
            for e in &self.explosions {
                w.write_bits(u32::from(e.def_id), 8);
                w.write_position(e.position);
            }
        }
        if !self.emotes.is_empty() {
            w.write_bits(self.emotes.len() as u32, EMOTE_COUNT_BITS);
            for e in &self.emotes {
                w.write_bits(u32::from(e.emote_id), 8);
                w.write_object_id(e.player_id);
            }
        }
        if let Some(gas) = &self.gas {
            w.write_bits(gas.state.to_bits(), 2);
            w.write_bits(u32::from(gas.initial_duration_s), GAS_DURATION_BITS);
            w.write_position(gas.old_position);
            w.write_position(gas.new_position);
            w.write_float(gas.old_radius, 0.0, GAS_RADIUS_MAX, GAS_RADIUS_BITS);
            w.write_float(gas.new_radius, 0.0, GAS_RADIUS_MAX, GAS_RADIUS_BITS);
            w.write_bool(gas.percentage.is_some());
            if let Some(p) = gas.percentage {
                w.write_float(p, 0.0, 1.0, GAS_PERCENT_BITS);
            }
        }
        if let Some(p) = self.gas_percentage {
            w.write_float(p, 0.0, 1.0, GAS_PERCENT_BITS);
        }
        if let Some(alive) = self.alive_count {
            w.write_bits(u32::from(alive), ALIVE_COUNT_BITS);
        }
    }

    #[allow(clippy::too_many_lines)]
    pub fn decode(r: &mut BitReader, ranges: &StatRanges) -> Result<Self> {
        let stats_dirty = r.read_bool()?;
        let health_dirty = r.read_bool()?;
        let adrenaline_dirty = r.read_bool()?;
        let zoom_dirty = r.read_bool()?;
        let full_dirty = r.read_bool()?;
        let partial_dirty = r.read_bool()?;
        let deleted_dirty = r.read_bool()?;
        let bullets_dirty = r.read_bool()?;
        let explosions_dirty = r.read_bool()?;
        let emotes_dirty = r.read_bool()?;
        let gas_dirty = r.read_bool()?;
        let gas_percentage_dirty = r.read_bool()?;
        let alive_dirty = r.read_bool()?;

        let mut packet = Self::default();
        let mut ranges = *ranges;

        if stats_dirty {
            let stats = StatRanges {
                max_health: r.read_f32()?,
                min_adrenaline: r.read_f32()?,
                max_adrenaline: r.read_f32()?,
            };
            ranges = stats;
            packet.stats = Some(stats);
        }
        if health_dirty {
            packet.health = Some(r.read_float(0.0, ranges.max_health, HEALTH_BITS)?);
        }
        if adrenaline_dirty {
            packet.adrenaline = Some(r.read_float(
                ranges.min_adrenaline,
                ranges.max_adrenaline,
                ADRENALINE_BITS,
            )?);
        }
        if zoom_dirty {
            packet.zoom = Some(r.read_bits(8)? as u8);
        }
        if full_dirty {
            let count = r.read_bits(COUNT_BITS)?;
            for _ in 0..count {
                packet.full_objects.push(FullRecord::decode(r)?);
            }
        }
        if partial_dirty {
            let count = r.read_bits(COUNT_BITS)?;
            for _ in 0..count {
                packet.partial_objects.push(PartialRecord::decode(r)?);
            }
        }
        if deleted_dirty {
            let count = r.read_bits(COUNT_BITS)?;
            for _ in 0..count {
                packet.deleted.push(r.read_object_id()?);
            }
        }
        if bullets_dirty {
            let count = r.read_bits(SPAWN_COUNT_BITS)?;
            for _ in 0..count {
                packet.bullets.push(BulletSpawnRep {
                    weapon_id: r.read_bits(16)? as u16,
                    position: r.read_position()?,
                    rotation: r.read_rotation(16)?,
                    variance: r.read_variance()?,
                    reflection_count: r.read_bits(2)? as u8,
                    shooter_id: r.read_object_id()?,
                });
            }
        }
        if explosions_dirty {
            let count = r.read_bits(SPAWN_COUNT_BITS)?;
            for _ in 0..count {
                packet.explosions.push(ExplosionRep {
                    def_id: r.read_bits(8)? as u8,
                    position: r.read_position()?,
                });
            }
        }
        if emotes_dirty {
            let count = r.read_bits(EMOTE_COUNT_BITS)?;
            for _ in 0..count {
                packet.emotes.push(EmoteRep {
                    emote_id: r.read_bits(8)? as u8,
                    player_id: r.read_object_id()?,
                });
            }
        }
        if gas_dirty {
            let state = GasState::from_bits(r.read_bits(2)?)?;
            let initial_duration_s = r.read_bits(GAS_DURATION_BITS)? as u8;
            let old_position = r.read_position()?;
            let new_position = r.read_position()?;
            let old_radius = r.read_float(0.0, GAS_RADIUS_MAX, GAS_RADIUS_BITS)?;
            let new_radius = r.read_float(0.0, GAS_RADIUS_MAX, GAS_RADIUS_BITS)?;
            let percentage = if r.read_bool()? {
                Some(r.read_float(0.0, 1.0, GAS_PERCENT_BITS)?)
            } else {
                None
            };
            packet.gas = Some(GasRep {
                state,
                initial_duration_s,
                old_position,
                new_position,
                old_radius,
                new_radius,
                percentage,
            });
        }
        if gas_percentage_dirty {
            packet.gas_percentage = Some(r.read_float(0.0, 1.0, GAS_PERCENT_BITS)?);
        }
        if alive_dirty {
            packet.alive_count = Some(r.read_bits(ALIVE_COUNT_BITS)? as u8);
        }
        Ok(packet)
    }
}
