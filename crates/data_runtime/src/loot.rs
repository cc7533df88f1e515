//! Weighted loot tables with tier indirection.
//!
//! A table rolls between `min_rolls` and `max_rolls` entries. Each entry is
//! either a concrete item or a reference into a shared tier, which is itself
//! a weighted item list. Rolling a gun also yields its companion ammo drop.

use crate::defs::weapons::WeaponDefs;
use anyhow::{bail, Context, Result};
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LootRef {
    Item { item: String },
    Tier { tier: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LootEntry {
    pub weight: f32,
    #[serde(flatten)]
    pub target: LootRef,
    #[serde(default = "default_count")]
    pub count: u8,
}

fn default_count() -> u8 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct LootTable {
    #[serde(default = "default_rolls")]
    pub min_rolls: u32,
    #[serde(default = "default_rolls")]
    pub max_rolls: u32,
    pub entries: Vec<LootEntry>,
}

fn default_rolls() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierEntry {
    pub weight: f32,
    pub item: String,
    #[serde(default = "default_count")]
    pub count: u8,
}

/// A rolled drop, ready to spawn as a loot object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootItem {
    pub name: String,
    pub count: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LootTables {
    #[serde(default)]
    pub tables: HashMap<String, LootTable>,
    #[serde(default)]
    pub tiers: HashMap<String, Vec<TierEntry>>,
}

impl LootTables {
    pub fn load_default() -> Result<Self> {
        let path = crate::data_root().join("defs/loot.toml");
        if path.is_file() {
            let txt = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let tables: Self = toml::from_str(&txt).context("parse loot TOML")?;
            Ok(tables)
        } else {
            Ok(builtin_tables())
        }
    }

    /// Roll `table` into concrete items. Guns pull their ammo drop from
    /// `weapons`.
    pub fn roll<R: Rng>(
        &self,
        table: &str,
        weapons: &WeaponDefs,
        rng: &mut R,
    ) -> Result<Vec<LootItem>> {
        let table = self
            .tables
            .get(table)
            .with_context(|| format!("unknown loot table: {table}"))?;
        if table.min_rolls > table.max_rolls || table.entries.is_empty() {
            bail!("malformed loot table");
        }
        let rolls = rng.gen_range(table.min_rolls..=table.max_rolls);
        let mut items = Vec::new();
        for _ in 0..rolls {
            let entry = weighted_pick(&table.entries, |e| e.weight, rng)?;
            let (name, count) = match &entry.target {
                LootRef::Item { item } => (item.clone(), entry.count),
                LootRef::Tier { tier } => {
                    let pool = self
                        .tiers
                        .get(tier)
                        .with_context(|| format!("unknown loot tier: {tier}"))?;
                    let picked = weighted_pick(pool, |e| e.weight, rng)?;
                    (picked.item.clone(), picked.count)
                }
            };
            if let Some(gun_id) = weapons.gun_id(&name) {
                // companion ammo drops with every gun
                let gun = weapons.gun(gun_id).context("gun def for rolled id")?;
                items.push(LootItem {
                    name: gun.ammo.clone(),
                    count: gun.ammo_spawn_count,
                });
            }
            items.push(LootItem { name, count });
        }
        Ok(items)
    }
}

/// Dense item ids for the wire. Built once at startup from every name the
/// loot system can produce; ids are alphabetical, so both ends derive the
/// same mapping from the same defs.
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    names: Vec<String>,
    by_name: HashMap<String, u16>,
}

impl ItemRegistry {
    pub fn build(tables: &LootTables, weapons: &WeaponDefs) -> Result<Self> {
        let mut set = std::collections::BTreeSet::new();
        for gun in weapons.guns() {
            set.insert(gun.name.clone());
            set.insert(gun.ammo.clone());
        }
        for melee in weapons.melees() {
            set.insert(melee.name.clone());
        }
        for table in tables.tables.values() {
            for entry in &table.entries {
                if let LootRef::Item { item } = &entry.target {
                    set.insert(item.clone());
                }
            }
        }
        for pool in tables.tiers.values() {
            for entry in pool {
                set.insert(entry.item.clone());
            }
        }
        let names: Vec<String> = set.into_iter().collect();
        let mut by_name = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            let id = u16::try_from(i).context("more than 65536 items")?;
            by_name.insert(name.clone(), id);
        }
        Ok(Self { names, by_name })
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, id: u16) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn weighted_pick<'a, T, R: Rng>(
    entries: &'a [T],
    weight: impl Fn(&T) -> f32,
    rng: &mut R,
) -> Result<&'a T> {
    let total: f32 = entries.iter().map(&weight).sum();
    if total <= 0.0 || !total.is_finite() {
        bail!("loot pool has no positive weight");
    }
    let mut roll = rng.gen_range(0.0..total);
    for entry in entries {
        roll -= weight(entry);
        if roll < 0.0 {
            return Ok(entry);
        }
    }
    // float accumulation can leave roll at exactly the end
    entries.last().context("empty loot pool")
}

fn builtin_tables() -> LootTables {
    let mut tables = HashMap::new();
    tables.insert(
        "ground_loot".to_string(),
        LootTable {
            min_rolls: 1,
            max_rolls: 2,
            entries: vec![
                LootEntry {
                    weight: 1.0,
                    target: LootRef::Tier {
                        tier: "guns".into(),
                    },
                    count: 1,
                },
                LootEntry {
                    weight: 1.0,
                    target: LootRef::Tier {
                        tier: "healing".into(),
                    },
                    count: 1,
                },
                LootEntry {
                    weight: 0.5,
                    target: LootRef::Item {
                        item: "9mm".into(),
                    },
                    count: 30,
                },
            ],
        },
    );
    let mut tiers = HashMap::new();
    tiers.insert(
        "guns".to_string(),
        vec![
            TierEntry {
                weight: 2.0,
                item: "m9".into(),
                count: 1,
            },
            TierEntry {
                weight: 1.0,
                item: "m870".into(),
                count: 1,
            },
            TierEntry {
                weight: 0.25,
                item: "ak47".into(),
                count: 1,
            },
        ],
    );
    tiers.insert(
        "healing".to_string(),
        vec![
            TierEntry {
                weight: 2.0,
                item: "gauze".into(),
                count: 5,
            },
            TierEntry {
                weight: 1.0,
                item: "medikit".into(),
                count: 1,
            },
        ],
    );
    LootTables { tables, tiers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn rolls_stay_within_bounds() {
        let tables = LootTables::load_default().expect("load");
        let weapons = WeaponDefs::load_default().expect("load");
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..64 {
            let items = tables.roll("ground_loot", &weapons, &mut rng).expect("roll");
            assert!(!items.is_empty());
            // 2 rolls max, each possibly a gun plus its ammo
            assert!(items.len() <= 4);
        }
    }

    #[test]
    fn gun_rolls_bring_ammo() {
        let tables = builtin_tables();
        let weapons = WeaponDefs::load_default().expect("load");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut saw_gun = false;
        for _ in 0..256 {
            let items = tables.roll("ground_loot", &weapons, &mut rng).expect("roll");
            for (i, item) in items.iter().enumerate() {
                if weapons.gun_id(&item.name).is_some() {
                    saw_gun = true;
                    assert!(i > 0, "ammo precedes its gun");
                    let ammo = &items[i - 1];
                    let gun = weapons
                        .gun(weapons.gun_id(&item.name).expect("id"))
                        .expect("def");
                    assert_eq!(ammo.name, gun.ammo);
                    assert_eq!(ammo.count, gun.ammo_spawn_count);
                }
            }
        }
        assert!(saw_gun);
    }

    #[test]
    fn item_registry_covers_every_rollable_name() {
        let tables = builtin_tables();
        let weapons = WeaponDefs::load_default().expect("load");
        let items = ItemRegistry::build(&tables, &weapons).expect("build");
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..128 {
            for item in tables.roll("ground_loot", &weapons, &mut rng).expect("roll") {
                assert!(items.id(&item.name).is_some(), "no id for {}", item.name);
            }
        }
        // ids are dense and invertible
        for i in 0..items.len() {
            let id = u16::try_from(i).expect("fits");
            let name = items.name(id).expect("name");
            assert_eq!(items.id(name), Some(id));
        }
    }

    #[test]
    fn unknown_table_is_an_error() {
        let tables = builtin_tables();
        let weapons = WeaponDefs::load_default().expect("load");
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(tables.roll("nope", &weapons, &mut rng).is_err());
    }
}
