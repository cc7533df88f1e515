//! Object registry, dirty tracking, and the broad-phase index.
//!
//! Dirty-set invariants, enforced here and nowhere else:
//! - an id is never in both the full and partial set; full wins
//! - a deleted id is in neither set, only in the deletion list
//! - ids are monotonic and never reused within a match

use crate::grid::SpatialGrid;
use crate::object::{GameObject, LootState, ObjectId, ObjectKind, ObstacleState, PlayerState};
use glam::Vec2;
use std::collections::{BTreeSet, HashMap};

/// One tick's replication work, drained by the snapshot assembler.
#[derive(Debug, Default, Clone)]
pub struct DirtyFrame {
    pub full: Vec<ObjectId>,
    pub partial: Vec<ObjectId>,
    pub deleted: Vec<ObjectId>,
}

pub struct World {
    pub width: f32,
    pub height: f32,
    pub grid: SpatialGrid,
    objects: Vec<GameObject>,
    index: HashMap<ObjectId, usize>,
    next_id: u32,
    full_dirty: BTreeSet<ObjectId>,
    partial_dirty: BTreeSet<ObjectId>,
    /// Ids spawned since the last drain; these were never announced.
    spawned: BTreeSet<ObjectId>,
    deleted: Vec<ObjectId>,
}

impl World {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            grid: SpatialGrid::new(width, height),
            objects: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            full_dirty: BTreeSet::new(),
            partial_dirty: BTreeSet::new(),
            spawned: BTreeSet::new(),
            deleted: Vec::new(),
        }
    }

    /// Register a new object. It enters the grid immediately and is fully
    /// dirty for the next snapshot.
    pub fn spawn(&mut self, kind: ObjectKind) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        let obj = GameObject { id, kind };
        let (min, max) = obj.bounds();
        self.grid.update(id, min, max);
        self.index.insert(id, self.objects.len());
        self.objects.push(obj);
        self.full_dirty.insert(id);
        self.spawned.insert(id);
        metrics::counter!("world.spawn").increment(1);
        id
    }

    /// Remove an object. Its id joins this tick's deletion list and leaves
    /// both dirty sets; clients that saw a delta for it this tick get the
    /// deletion instead.
    pub fn despawn(&mut self, id: ObjectId) {
        let Some(slot) = self.index.remove(&id) else {
            return;
        };
        self.grid.remove(id);
        self.objects.swap_remove(slot);
        if let Some(moved) = self.objects.get(slot) {
            self.index.insert(moved.id, slot);
        }
        self.full_dirty.remove(&id);
        self.partial_dirty.remove(&id);
        // objects that spawned and died within one tick were never announced
        if !self.spawned.remove(&id) {
            self.deleted.push(id);
        }
        metrics::counter!("world.despawn").increment(1);
    }

    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        let slot = *self.index.get(&id)?;
        self.objects.get(slot)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        let slot = *self.index.get(&id)?;
        self.objects.get_mut(slot)
    }

    #[must_use]
    pub fn player(&self, id: ObjectId) -> Option<&PlayerState> {
        match &self.get(id)?.kind {
            ObjectKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn player_mut(&mut self, id: ObjectId) -> Option<&mut PlayerState> {
        match &mut self.get_mut(id)?.kind {
            ObjectKind::Player(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn obstacle(&self, id: ObjectId) -> Option<&ObstacleState> {
        match &self.get(id)?.kind {
            ObjectKind::Obstacle(o) => Some(o),
            _ => None,
        }
    }

    pub fn obstacle_mut(&mut self, id: ObjectId) -> Option<&mut ObstacleState> {
        match &mut self.get_mut(id)?.kind {
            ObjectKind::Obstacle(o) => Some(o),
            _ => None,
        }
    }

    pub fn loot_mut(&mut self, id: ObjectId) -> Option<&mut LootState> {
        match &mut self.get_mut(id)?.kind {
            ObjectKind::Loot(l) => Some(l),
            _ => None,
        }
    }

    pub fn objects(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.iter()
    }

    pub fn player_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|o| matches!(o.kind, ObjectKind::Player(_)))
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn alive_player_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.as_player().is_some_and(|p| !p.dead))
            .count()
    }

    /// Re-index an object after its bounds changed.
    pub fn sync_grid(&mut self, id: ObjectId) {
        if let Some(obj) = self.get(id) {
            let (min, max) = obj.bounds();
            self.grid.update(id, min, max);
        }
    }

    pub fn mark_full_dirty(&mut self, id: ObjectId) {
        if !self.index.contains_key(&id) {
            return;
        }
        self.partial_dirty.remove(&id);
        self.full_dirty.insert(id);
    }

    pub fn mark_partial_dirty(&mut self, id: ObjectId) {
        if !self.index.contains_key(&id) || self.full_dirty.contains(&id) {
            return;
        }
        self.partial_dirty.insert(id);
    }

    /// Take this tick's replication work and reset for the next tick.
    pub fn drain_dirty(&mut self) -> DirtyFrame {
        self.spawned.clear();
        DirtyFrame {
            full: std::mem::take(&mut self.full_dirty).into_iter().collect(),
            partial: std::mem::take(&mut self.partial_dirty).into_iter().collect(),
            deleted: std::mem::take(&mut self.deleted),
        }
    }

    /// Clamp `p` into the playable area.
    #[must_use]
    pub fn clamp_position(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }

    #[must_use]
    pub fn in_bounds(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width && p.y <= self.height
    }

    /// Move a player, clamping into bounds. Position changes are partial
    /// deltas.
    pub fn move_player(&mut self, id: ObjectId, position: Vec2, rotation: f32) {
        let clamped = self.clamp_position(position);
        let Some(p) = self.player_mut(id) else {
            return;
        };
        p.position = clamped;
        p.rotation = geom_core::math::normalize_angle(rotation);
        self.sync_grid(id);
        self.mark_partial_dirty(id);
    }

    /// Apply damage to a player, clamping into `[0, max_health]`. Death is
    /// handled by the caller once all of the tick's damage is in.
    pub fn damage_player(&mut self, id: ObjectId, amount: f32) {
        let Some(p) = self.player_mut(id) else {
            return;
        };
        if p.dead {
            return;
        }
        p.health = (p.health - amount).clamp(0.0, p.max_health);
        self.mark_partial_dirty(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PlayerState;

    fn world_with_player() -> (World, ObjectId) {
        let mut w = World::new(512.0, 512.0);
        let id = w.spawn(ObjectKind::Player(PlayerState::new(Vec2::new(50.0, 50.0))));
        (w, id)
    }

    #[test]
    fn spawn_is_fully_dirty_once() {
        let (mut w, id) = world_with_player();
        let frame = w.drain_dirty();
        assert_eq!(frame.full, vec![id]);
        assert!(frame.partial.is_empty());
        let frame = w.drain_dirty();
        assert!(frame.full.is_empty());
    }

    #[test]
    fn full_dirty_wins_over_partial() {
        let (mut w, id) = world_with_player();
        w.drain_dirty();
        w.mark_partial_dirty(id);
        w.mark_full_dirty(id);
        w.mark_partial_dirty(id);
        let frame = w.drain_dirty();
        assert_eq!(frame.full, vec![id]);
        assert!(frame.partial.is_empty());
    }

    #[test]
    fn despawn_same_tick_as_spawn_is_silent() {
        let mut w = World::new(512.0, 512.0);
        let id = w.spawn(ObjectKind::Player(PlayerState::new(Vec2::new(1.0, 1.0))));
        w.despawn(id);
        let frame = w.drain_dirty();
        assert!(frame.full.is_empty());
        assert!(frame.partial.is_empty());
        assert!(frame.deleted.is_empty());
    }

    #[test]
    fn despawn_after_announce_is_deleted_only() {
        let (mut w, id) = world_with_player();
        w.drain_dirty();
        w.mark_partial_dirty(id);
        w.despawn(id);
        let frame = w.drain_dirty();
        assert!(frame.full.is_empty());
        assert!(frame.partial.is_empty());
        assert_eq!(frame.deleted, vec![id]);
        assert!(w.get(id).is_none());
        assert!(!w.grid.contains(id));
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let (mut w, a) = world_with_player();
        w.despawn(a);
        let b = w.spawn(ObjectKind::Player(PlayerState::new(Vec2::new(2.0, 2.0))));
        assert!(b > a);
    }

    #[test]
    fn move_clamps_and_marks_partial() {
        let (mut w, id) = world_with_player();
        w.drain_dirty();
        w.move_player(id, Vec2::new(-10.0, 9999.0), 0.3);
        let p = w.player(id).expect("player");
        assert_eq!(p.position, Vec2::new(0.0, 512.0));
        let frame = w.drain_dirty();
        assert_eq!(frame.partial, vec![id]);
    }

    #[test]
    fn damage_clamps_at_zero() {
        let (mut w, id) = world_with_player();
        w.damage_player(id, 10_000.0);
        assert_eq!(w.player(id).expect("player").health, 0.0);
    }
}
