//! Uniform-grid broad phase.
//!
//! Objects occupy every cell their axis-aligned bounds touch. Queries return
//! candidate ids only; callers narrow-phase against real hitboxes.

use crate::object::ObjectId;
use crate::GRID_CELL_SIZE;
use geom_core::Hitbox;
use glam::Vec2;
use std::collections::HashMap;

#[derive(Debug)]
pub struct SpatialGrid {
    max_cell: (i32, i32),
    cells: HashMap<(i32, i32), Vec<ObjectId>>,
    /// Cell range each registered object currently occupies.
    spans: HashMap<ObjectId, ((i32, i32), (i32, i32))>,
}

impl SpatialGrid {
    #[must_use]
    pub fn new(world_width: f32, world_height: f32) -> Self {
        Self {
            max_cell: (
                (world_width / GRID_CELL_SIZE).floor() as i32,
                (world_height / GRID_CELL_SIZE).floor() as i32,
            ),
            cells: HashMap::new(),
            spans: HashMap::new(),
        }
    }

    fn cell_of(&self, p: Vec2) -> (i32, i32) {
        (
            ((p.x / GRID_CELL_SIZE).floor() as i32).clamp(0, self.max_cell.0),
            ((p.y / GRID_CELL_SIZE).floor() as i32).clamp(0, self.max_cell.1),
        )
    }

    /// Register or move `id` to the cells covering `[min, max]`.
    pub fn update(&mut self, id: ObjectId, min: Vec2, max: Vec2) {
        let span = (self.cell_of(min), self.cell_of(max));
        if let Some(&old) = self.spans.get(&id) {
            if old == span {
                return;
            }
            self.clear_span(id, old);
        }
        let ((x0, y0), (x1, y1)) = span;
        for x in x0..=x1 {
            for y in y0..=y1 {
                self.cells.entry((x, y)).or_default().push(id);
            }
        }
        self.spans.insert(id, span);
    }

    pub fn remove(&mut self, id: ObjectId) {
        if let Some(span) = self.spans.remove(&id) {
            self.clear_span(id, span);
        }
    }

    fn clear_span(&mut self, id: ObjectId, ((x0, y0), (x1, y1)): ((i32, i32), (i32, i32))) {
        for x in x0..=x1 {
            for y in y0..=y1 {
                if let Some(bucket) = self.cells.get_mut(&(x, y)) {
                    bucket.retain(|&o| o != id);
                    if bucket.is_empty() {
                        self.cells.remove(&(x, y));
                    }
                }
            }
        }
    }

    /// Ids whose cells overlap `[min, max]`. Each id appears once; order is
    /// ascending so downstream iteration is deterministic.
    #[must_use]
    pub fn query_rect(&self, min: Vec2, max: Vec2) -> Vec<ObjectId> {
        // zero-area regions select nothing
        if min.x >= max.x || min.y >= max.y {
            return Vec::new();
        }
        let (x0, y0) = self.cell_of(min);
        let (x1, y1) = self.cell_of(max);
        let mut out = Vec::new();
        for x in x0..=x1 {
            for y in y0..=y1 {
                if let Some(bucket) = self.cells.get(&(x, y)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Candidates overlapping a hitbox's bounds.
    #[must_use]
    pub fn query_hitbox(&self, hitbox: &Hitbox) -> Vec<ObjectId> {
        let (min, max) = hitbox.bounds();
        self.query_rect(min, max)
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.spans.contains_key(&id)
    }

    /// Total id entries across all cells, counting multiplicity.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ObjectId {
        ObjectId(n)
    }

    #[test]
    fn spanning_object_reported_once() {
        let mut grid = SpatialGrid::new(512.0, 512.0);
        // covers a 3x3 block of cells
        grid.update(id(1), Vec2::new(10.0, 10.0), Vec2::new(40.0, 40.0));
        let hits = grid.query_rect(Vec2::ZERO, Vec2::new(64.0, 64.0));
        assert_eq!(hits, vec![id(1)]);
    }

    #[test]
    fn update_moves_between_cells() {
        let mut grid = SpatialGrid::new(512.0, 512.0);
        grid.update(id(1), Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0));
        grid.update(id(1), Vec2::new(100.0, 100.0), Vec2::new(101.0, 101.0));
        assert!(grid
            .query_rect(Vec2::ZERO, Vec2::new(16.0, 16.0))
            .is_empty());
        assert_eq!(
            grid.query_rect(Vec2::new(96.0, 96.0), Vec2::new(112.0, 112.0)),
            vec![id(1)]
        );
    }

    #[test]
    fn remove_clears_every_cell() {
        let mut grid = SpatialGrid::new(512.0, 512.0);
        grid.update(id(3), Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0));
        grid.remove(id(3));
        assert_eq!(grid.occupancy(), 0);
        assert!(!grid.contains(id(3)));
    }

    #[test]
    fn out_of_bounds_coordinates_clamp_to_edge_cells() {
        let mut grid = SpatialGrid::new(64.0, 64.0);
        grid.update(id(9), Vec2::new(-50.0, -50.0), Vec2::new(-40.0, -40.0));
        let hits = grid.query_rect(Vec2::new(-1000.0, -1000.0), Vec2::ZERO);
        assert_eq!(hits, vec![id(9)]);
    }

    #[test]
    fn degenerate_query_region_is_empty() {
        let mut grid = SpatialGrid::new(512.0, 512.0);
        grid.update(id(1), Vec2::new(8.0, 8.0), Vec2::new(12.0, 12.0));
        let p = Vec2::new(10.0, 10.0);
        assert!(grid.query_rect(p, p).is_empty());
        assert!(grid
            .query_rect(Vec2::new(10.0, 8.0), Vec2::new(10.0, 12.0))
            .is_empty());
    }

    #[test]
    fn hitbox_query_uses_bounds() {
        let mut grid = SpatialGrid::new(512.0, 512.0);
        grid.update(id(4), Vec2::new(30.0, 30.0), Vec2::new(34.0, 34.0));
        let probe = Hitbox::circle(4.0, Vec2::new(28.0, 28.0));
        assert_eq!(grid.query_hitbox(&probe), vec![id(4)]);
        let far = Hitbox::circle(1.0, Vec2::new(200.0, 200.0));
        assert!(grid.query_hitbox(&far).is_empty());
    }

    #[test]
    fn query_is_sorted_ascending() {
        let mut grid = SpatialGrid::new(512.0, 512.0);
        for n in [5u32, 2, 9, 1] {
            grid.update(
                id(n),
                Vec2::new(8.0, 8.0),
                Vec2::new(8.0 + n as f32, 8.0 + n as f32),
            );
        }
        let hits = grid.query_rect(Vec2::ZERO, Vec2::new(32.0, 32.0));
        assert_eq!(hits, vec![id(1), id(2), id(5), id(9)]);
    }
}
