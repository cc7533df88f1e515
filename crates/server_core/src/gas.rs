//! Gas circle state, driven by a fixed stage table.

use glam::Vec2;
use net_core::update::{GasRep, GasState};
use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct GasStage {
    pub state: GasState,
    pub duration_s: f32,
    /// Target radius once this stage completes.
    pub radius: f32,
    pub dps: f32,
}

/// Default stage table for a 512-unit map: alternating waits and advances
/// down to a closed circle.
#[must_use]
pub fn default_stages(world_size: f32) -> Vec<GasStage> {
    let r = world_size * 0.75;
    vec![
        GasStage {
            state: GasState::Inactive,
            duration_s: 0.0,
            radius: r,
            dps: 0.0,
        },
        GasStage {
            state: GasState::Waiting,
            duration_s: 80.0,
            radius: r * 0.6,
            dps: 1.0,
        },
        GasStage {
            state: GasState::Advancing,
            duration_s: 30.0,
            radius: r * 0.6,
            dps: 2.0,
        },
        GasStage {
            state: GasState::Waiting,
            duration_s: 50.0,
            radius: r * 0.25,
            dps: 3.5,
        },
        GasStage {
            state: GasState::Advancing,
            duration_s: 20.0,
            radius: r * 0.25,
            dps: 5.0,
        },
        GasStage {
            state: GasState::Waiting,
            duration_s: 30.0,
            radius: 0.0,
            dps: 7.0,
        },
        GasStage {
            state: GasState::Advancing,
            duration_s: 15.0,
            radius: 0.0,
            dps: 9.0,
        },
    ]
}

#[derive(Debug)]
pub struct Gas {
    stages: Vec<GasStage>,
    stage: usize,
    time_in_stage_s: f32,
    pub old_position: Vec2,
    pub new_position: Vec2,
    pub old_radius: f32,
    pub new_radius: f32,
    pub position: Vec2,
    pub radius: f32,
    pub percentage: f32,
    /// Stage changed this tick; the full gas record goes out.
    pub dirty: bool,
    /// Percentage moved this tick; only the scalar goes out.
    pub percentage_dirty: bool,
}

impl Gas {
    #[must_use]
    pub fn new(world_width: f32, world_height: f32) -> Self {
        let center = Vec2::new(world_width, world_height) * 0.5;
        let stages = default_stages(world_width.max(world_height));
        let radius = stages[0].radius;
        Self {
            stages,
            stage: 0,
            time_in_stage_s: 0.0,
            old_position: center,
            new_position: center,
            old_radius: radius,
            new_radius: radius,
            position: center,
            radius,
            percentage: 0.0,
            dirty: true,
            percentage_dirty: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> GasState {
        self.stages[self.stage].state
    }

    #[must_use]
    pub fn dps(&self) -> f32 {
        self.stages[self.stage].dps
    }

    #[must_use]
    pub fn contains(&self, p: Vec2) -> bool {
        p.distance_squared(self.position) <= self.radius * self.radius
    }

    /// Advance time. On stage transitions the next target circle is rolled
    /// inside the current one.
    pub fn advance<R: Rng>(&mut self, dt: f32, rng: &mut R) {
        if self.stage + 1 >= self.stages.len() && self.state() != GasState::Advancing {
            return;
        }
        self.time_in_stage_s += dt;
        let duration = self.stages[self.stage].duration_s;

        if self.state() == GasState::Advancing && duration > 0.0 {
            let pct = (self.time_in_stage_s / duration).min(1.0);
            if pct > self.percentage {
                self.percentage = pct;
                self.position = self.old_position.lerp(self.new_position, pct);
                self.radius = self.old_radius + (self.new_radius - self.old_radius) * pct;
                self.percentage_dirty = true;
            }
        }

        if self.time_in_stage_s >= duration && self.stage + 1 < self.stages.len() {
            self.stage += 1;
            self.time_in_stage_s = 0.0;
            self.percentage = 0.0;
            let entering = self.stages[self.stage];
            if entering.state == GasState::Waiting {
                // a wait announces the next circle; the move happens in the
                // advancing stage that follows
                self.old_position = self.position;
                self.old_radius = self.radius;
                self.new_radius = entering.radius;
                self.new_position = if entering.radius < self.old_radius {
                    // keep the next circle inside the current one
                    let slack = self.old_radius - entering.radius;
                    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                    let dist = rng.gen_range(0.0..=slack);
                    self.old_position + Vec2::new(angle.cos(), angle.sin()) * dist
                } else {
                    self.old_position
                };
            }
            self.dirty = true;
            log::info!(
                "gas stage {} ({:?}), radius {} -> {}",
                self.stage,
                entering.state,
                self.old_radius,
                self.new_radius
            );
        }
    }

    /// Wire record for the full gas section.
    #[must_use]
    pub fn rep(&self) -> GasRep {
        GasRep {
            state: self.state(),
            initial_duration_s: self.stages[self.stage].duration_s.min(127.0) as u8,
            old_position: self.old_position.to_array(),
            new_position: self.new_position.to_array(),
            old_radius: self.old_radius,
            new_radius: self.new_radius,
            percentage: Some(self.percentage),
        }
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
        self.percentage_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn waiting_stage_then_advance_shrinks_radius() {
        let mut gas = Gas::new(512.0, 512.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let start_radius = gas.radius;
        // run through the first wait
        for _ in 0..(81 * 30) {
            gas.advance(1.0 / 30.0, &mut rng);
        }
        assert_eq!(gas.state(), GasState::Advancing);
        // run the advance to completion
        for _ in 0..(31 * 30) {
            gas.advance(1.0 / 30.0, &mut rng);
        }
        assert!(gas.radius < start_radius);
    }

    #[test]
    fn next_circle_stays_inside_current() {
        let mut gas = Gas::new(512.0, 512.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..(81 * 30) {
            gas.advance(1.0 / 30.0, &mut rng);
        }
        let dist = gas.new_position.distance(gas.old_position);
        assert!(dist + gas.new_radius <= gas.old_radius + 1e-3);
    }

    #[test]
    fn stage_change_sets_dirty_percentage_only_otherwise() {
        let mut gas = Gas::new(512.0, 512.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        // the zero-length inactive stage rolls straight into the first wait
        gas.clear_dirty();
        gas.advance(1.0 / 30.0, &mut rng);
        assert!(gas.dirty);
        assert_eq!(gas.state(), GasState::Waiting);
        // mid-wait ticks replicate nothing
        gas.clear_dirty();
        gas.advance(1.0 / 30.0, &mut rng);
        assert!(!gas.dirty);
        assert!(!gas.percentage_dirty);
        // run to the advancing stage; movement is percentage-only
        for _ in 0..(81 * 30) {
            gas.advance(1.0 / 30.0, &mut rng);
        }
        assert_eq!(gas.state(), GasState::Advancing);
        gas.clear_dirty();
        gas.advance(1.0 / 30.0, &mut rng);
        assert!(gas.percentage_dirty);
        assert!(!gas.dirty);
    }
}
