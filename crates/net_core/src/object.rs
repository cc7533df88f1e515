//! Per-object delta payloads.
//!
//! A record on the wire is `[category][id][payload]`; the payload shape is
//! selected purely by the category tag and by whether the record sits in the
//! full or partial section of the packet. Full payloads re-encode every
//! field; partial payloads carry only the mutable ones.

use crate::bits::{BitReader, BitWriter};
use anyhow::{bail, Result};

/// Closed category tag, 3 bits on the wire. Matched exhaustively at every
/// consumption site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectCategory {
    Player,
    Obstacle,
    Loot,
    Building,
    Decal,
}

impl ObjectCategory {
    #[must_use]
    pub fn to_bits(self) -> u32 {
        match self {
            Self::Player => 0,
            Self::Obstacle => 1,
            Self::Loot => 2,
            Self::Building => 3,
            Self::Decal => 4,
        }
    }

    pub fn from_bits(bits: u32) -> Result<Self> {
        Ok(match bits {
            0 => Self::Player,
            1 => Self::Obstacle,
            2 => Self::Loot,
            3 => Self::Building,
            4 => Self::Decal,
            other => bail!("unknown object category tag {other}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPartial {
    pub position: [f32; 2],
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerFull {
    pub partial: PlayerPartial,
    pub layer: i32,
    pub dead: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstaclePartial {
    pub scale: f32,
    pub dead: bool,
    /// Door replication offset: 0 closed, 1 open, 3 open toward the far
    /// side. Present only for door-role obstacles.
    pub door_offset: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleFull {
    pub partial: ObstaclePartial,
    pub def_id: u16,
    pub position: [f32; 2],
    pub orientation: u8,
    /// Sprite variant rolled at spawn.
    pub variation: u8,
    pub layer: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootPartial {
    pub position: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootFull {
    pub partial: LootPartial,
    pub def_id: u16,
    pub count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingPartial {
    /// Set once every load-bearing wall is down (ceiling collapse).
    pub dead: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingFull {
    pub partial: BuildingPartial,
    pub def_id: u16,
    pub position: [f32; 2],
    pub orientation: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalFull {
    pub def_id: u16,
    pub position: [f32; 2],
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FullData {
    Player(PlayerFull),
    Obstacle(ObstacleFull),
    Loot(LootFull),
    Building(BuildingFull),
    Decal(DecalFull),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PartialData {
    Player(PlayerPartial),
    Obstacle(ObstaclePartial),
    Loot(LootPartial),
    Building(BuildingPartial),
    /// Decals never mutate after spawn; a partial record is an empty marker.
    Decal,
}

impl FullData {
    #[must_use]
    pub fn category(&self) -> ObjectCategory {
        match self {
            Self::Player(_) => ObjectCategory::Player,
            Self::Obstacle(_) => ObjectCategory::Obstacle,
            Self::Loot(_) => ObjectCategory::Loot,
            Self::Building(_) => ObjectCategory::Building,
            Self::Decal(_) => ObjectCategory::Decal,
        }
    }
}

impl PartialData {
    #[must_use]
    pub fn category(&self) -> ObjectCategory {
        match self {
            Self::Player(_) => ObjectCategory::Player,
            Self::Obstacle(_) => ObjectCategory::Obstacle,
            Self::Loot(_) => ObjectCategory::Loot,
            Self::Building(_) => ObjectCategory::Building,
            Self::Decal => ObjectCategory::Decal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullRecord {
    pub id: u32,
    pub data: FullData,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialRecord {
    pub id: u32,
    pub data: PartialData,
}

const ROTATION_BITS: u32 = 16;
const ORIENTATION_BITS: u32 = 2;
const VARIATION_BITS: u32 = 3;
const DOOR_OFFSET_BITS: u32 = 2;
const DEF_ID_BITS: u32 = 16;

fn write_player_partial(w: &mut BitWriter, p: &PlayerPartial) {
    w.write_position(p.position);
    w.write_rotation(p.rotation, ROTATION_BITS);
}

fn read_player_partial(r: &mut BitReader) -> Result<PlayerPartial> {
    Ok(PlayerPartial {
        position: r.read_position()?,
        rotation: r.read_rotation(ROTATION_BITS)?,
    })
}

fn write_obstacle_partial(w: &mut BitWriter, o: &ObstaclePartial) {
    w.write_scale(o.scale);
    w.write_bool(o.dead);
    w.write_bool(o.door_offset.is_some());
    if let Some(offset) = o.door_offset {
        w.write_bits(u32::from(offset), DOOR_OFFSET_BITS);
    }
}

fn read_obstacle_partial(r: &mut BitReader) -> Result<ObstaclePartial> {
    let scale = r.read_scale()?;
    let dead = r.read_bool()?;
    let door_offset = if r.read_bool()? {
        Some(r.read_bits(DOOR_OFFSET_BITS)? as u8)
    } else {
        None
    };
    Ok(ObstaclePartial {
        scale,
        dead,
        door_offset,
    })
}

impl FullRecord {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.data.category().to_bits(), crate::OBJECT_CATEGORY_BITS);
        w.write_object_id(self.id);
        match &self.data {
            FullData::Player(p) => {
                write_player_partial(w, &p.partial);
                w.write_layer(p.layer);
                w.write_bool(p.dead);
            }
            FullData::Obstacle(o) => {
                write_obstacle_partial(w, &o.partial);
                w.write_bits(u32::from(o.def_id), DEF_ID_BITS);
                w.write_position(o.position);
                w.write_bits(u32::from(o.orientation), ORIENTATION_BITS);
                w.write_bits(u32::from(o.variation), VARIATION_BITS);
                w.write_layer(o.layer);
            }
            FullData::Loot(l) => {
                w.write_position(l.partial.position);
                w.write_bits(u32::from(l.def_id), DEF_ID_BITS);
                w.write_bits(u32::from(l.count), 8);
            }
            FullData::Building(b) => {
                w.write_bool(b.partial.dead);
                w.write_bits(u32::from(b.def_id), DEF_ID_BITS);
                w.write_position(b.position);
                w.write_bits(u32::from(b.orientation), ORIENTATION_BITS);
            }
            FullData::Decal(d) => {
                w.write_bits(u32::from(d.def_id), DEF_ID_BITS);
                w.write_position(d.position);
                w.write_rotation(d.rotation, ROTATION_BITS);
            }
        }
    }

    pub fn decode(r: &mut BitReader) -> Result<Self> {
        let category = ObjectCategory::from_bits(r.read_bits(crate::OBJECT_CATEGORY_BITS)?)?;
        let id = r.read_object_id()?;
        let data = match category {
            ObjectCategory::Player => FullData::Player(PlayerFull {
                partial: read_player_partial(r)?,
                layer: r.read_layer()?,
                dead: r.read_bool()?,
            }),
            ObjectCategory::Obstacle => {
                let partial = read_obstacle_partial(r)?;
                FullData::Obstacle(ObstacleFull {
                    partial,
                    def_id: r.read_bits(DEF_ID_BITS)? as u16,
                    position: r.read_position()?,
                    orientation: r.read_bits(ORIENTATION_BITS)? as u8,
                    variation: r.read_bits(VARIATION_BITS)? as u8,
                    layer: r.read_layer()?,
                })
            }
            ObjectCategory::Loot => {
                let position = r.read_position()?;
                FullData::Loot(LootFull {
                    partial: LootPartial { position },
                    def_id: r.read_bits(DEF_ID_BITS)? as u16,
                    count: r.read_bits(8)? as u8,
                })
            }
            ObjectCategory::Building => {
                let dead = r.read_bool()?;
                FullData::Building(BuildingFull {
                    partial: BuildingPartial { dead },
                    def_id: r.read_bits(DEF_ID_BITS)? as u16,
                    position: r.read_position()?,
                    orientation: r.read_bits(ORIENTATION_BITS)? as u8,
                })
            }
            ObjectCategory::Decal => FullData::Decal(DecalFull {
                def_id: r.read_bits(DEF_ID_BITS)? as u16,
                position: r.read_position()?,
                rotation: r.read_rotation(ROTATION_BITS)?,
            }),
        };
        Ok(Self { id, data })
    }
}

impl PartialRecord {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.data.category().to_bits(), crate::OBJECT_CATEGORY_BITS);
        w.write_object_id(self.id);
        match &self.data {
            PartialData::Player(p) => write_player_partial(w, p),
            PartialData::Obstacle(o) => write_obstacle_partial(w, o),
            PartialData::Loot(l) => w.write_position(l.position),
            PartialData::Building(b) => w.write_bool(b.dead),
            PartialData::Decal => {}
        }
    }

    pub fn decode(r: &mut BitReader) -> Result<Self> {
        let category = ObjectCategory::from_bits(r.read_bits(crate::OBJECT_CATEGORY_BITS)?)?;
        let id = r.read_object_id()?;
        let data = match category {
            ObjectCategory::Player => PartialData::Player(read_player_partial(r)?),
            ObjectCategory::Obstacle => PartialData::Obstacle(read_obstacle_partial(r)?),
            ObjectCategory::Loot => PartialData::Loot(LootPartial {
                position: r.read_position()?,
            }),
            ObjectCategory::Building => PartialData::Building(BuildingPartial {
                dead: r.read_bool()?,
            }),
            ObjectCategory::Decal => PartialData::Decal,
        };
        Ok(Self { id, data })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn category_tags_roundtrip() {
        for cat in [
            ObjectCategory::Player,
            ObjectCategory::Obstacle,
            ObjectCategory::Loot,
            ObjectCategory::Building,
            ObjectCategory::Decal,
        ] {
            assert_eq!(ObjectCategory::from_bits(cat.to_bits()).unwrap(), cat);
        }
        assert!(ObjectCategory::from_bits(7).is_err());
    }

    #[test]
    fn obstacle_door_offset_presence_is_self_describing() {
        let with_door = ObstaclePartial {
            scale: 1.0,
            dead: false,
            door_offset: Some(3),
        };
        let without = ObstaclePartial {
            scale: 0.5,
            dead: true,
            door_offset: None,
        };
        for o in [with_door, without] {
            let mut w = BitWriter::with_capacity(16);
            write_obstacle_partial(&mut w, &o);
            let bytes = w.finish();
            let got = read_obstacle_partial(&mut BitReader::new(&bytes)).unwrap();
            assert_eq!(got.dead, o.dead);
            assert_eq!(got.door_offset, o.door_offset);
        }
    }
}
