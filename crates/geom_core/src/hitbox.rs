//! Polymorphic hitboxes over the primitive kernels in [`crate::collision`].
//!
//! A hitbox is a closed set of shape variants matched exhaustively wherever
//! it is consumed (grid membership, bullet sweeps, serialization). Transforms
//! preserve topology: a `Rect` only rotates through the cardinal
//! orientations; arbitrary rotation is expressed with `Polygon`.

use crate::collision::{self, SegmentIntersection};
use crate::math::Orientation;
use glam::Vec2;
use rand::Rng;

/// Result of a distance query: separation distance plus the closest point on
/// this hitbox's surface (used for loot pushes and melee ordering).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    pub distance: f32,
    pub point: Vec2,
}

/// Segment/hitbox intersection re-exported under the name callers use.
pub type SegmentHit = SegmentIntersection;

#[derive(Debug, Clone, PartialEq)]
pub enum Hitbox {
    Circle { center: Vec2, radius: f32 },
    Rect { min: Vec2, max: Vec2 },
    Polygon { points: Vec<Vec2> },
    Group { children: Vec<Hitbox> },
}

impl Hitbox {
    #[must_use]
    pub fn circle(radius: f32, center: Vec2) -> Self {
        Self::Circle { center, radius }
    }

    /// Rect from width/height centered on `center`.
    #[must_use]
    pub fn rect(width: f32, height: f32, center: Vec2) -> Self {
        let half = Vec2::new(width * 0.5, height * 0.5);
        Self::Rect {
            min: center - half,
            max: center + half,
        }
    }

    /// Swept bounding rect of a travel segment; componentwise min/max of the
    /// endpoints. Used as the bullet broad-phase region.
    #[must_use]
    pub fn from_line(a: Vec2, b: Vec2) -> Self {
        Self::Rect {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Axis-aligned bounding rect as `(min, max)`.
    #[must_use]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        match self {
            Self::Circle { center, radius } => {
                let r = Vec2::splat(*radius);
                (*center - r, *center + r)
            }
            Self::Rect { min, max } => (*min, *max),
            Self::Polygon { points } => {
                let mut lo = Vec2::splat(f32::INFINITY);
                let mut hi = Vec2::splat(f32::NEG_INFINITY);
                for p in points {
                    lo = lo.min(*p);
                    hi = hi.max(*p);
                }
                (lo, hi)
            }
            Self::Group { children } => {
                let mut lo = Vec2::splat(f32::INFINITY);
                let mut hi = Vec2::splat(f32::NEG_INFINITY);
                for c in children {
                    let (clo, chi) = c.bounds();
                    lo = lo.min(clo);
                    hi = hi.max(chi);
                }
                (lo, hi)
            }
        }
    }

    #[must_use]
    pub fn collides_with(&self, other: &Hitbox) -> bool {
        match (self, other) {
            (Self::Circle { center: ac, radius: ar }, Self::Circle { center: bc, radius: br }) => {
                collision::circle_circle(*ac, *ar, *bc, *br)
            }
            (Self::Circle { center, radius }, Self::Rect { min, max })
            | (Self::Rect { min, max }, Self::Circle { center, radius }) => {
                collision::circle_rect(*center, *radius, *min, *max)
            }
            (Self::Rect { min: am, max: ax }, Self::Rect { min: bm, max: bx }) => {
                collision::rect_rect(*am, *ax, *bm, *bx)
            }
            (Self::Polygon { points }, Self::Circle { center, radius })
            | (Self::Circle { center, radius }, Self::Polygon { points }) => {
                collision::polygon_circle(points, *center, *radius)
            }
            (Self::Polygon { points }, Self::Rect { min, max })
            | (Self::Rect { min, max }, Self::Polygon { points }) => {
                let corners = rect_corners(*min, *max);
                collision::polygon_polygon(points, &corners)
            }
            (Self::Polygon { points: a }, Self::Polygon { points: b }) => {
                collision::polygon_polygon(a, b)
            }
            (Self::Group { children }, other) | (other, Self::Group { children }) => {
                children.iter().any(|c| c.collides_with(other))
            }
        }
    }

    /// Separation distance to another hitbox (0 when overlapping) and the
    /// closest point on `self`'s surface toward `other`.
    #[must_use]
    pub fn distance_to(&self, other: &Hitbox) -> Distance {
        match (self, other) {
            (Self::Circle { center: ac, radius: ar }, Self::Circle { center: bc, radius: br }) => {
                let gap = ((*bc - *ac).length() - ar - br).max(0.0);
                let dir = (*bc - *ac).normalize_or_zero();
                Distance {
                    distance: gap,
                    point: *ac + dir * *ar,
                }
            }
            (Self::Circle { center, radius }, Self::Rect { min, max }) => {
                let closest = center.clamp(*min, *max);
                let gap = ((closest - *center).length() - radius).max(0.0);
                Distance {
                    distance: gap,
                    point: *center + (closest - *center).normalize_or_zero() * *radius,
                }
            }
            (Self::Rect { min, max }, Self::Circle { center, radius }) => {
                let closest = center.clamp(*min, *max);
                let gap = ((closest - *center).length() - radius).max(0.0);
                Distance {
                    distance: gap,
                    point: closest,
                }
            }
            (Self::Rect { min: am, max: ax }, Self::Rect { min: bm, max: bx }) => {
                let d = collision::rect_rect_distance(*am, *ax, *bm, *bx);
                let other_center = (*bm + *bx) * 0.5;
                Distance {
                    distance: d,
                    point: other_center.clamp(*am, *ax),
                }
            }
            (Self::Polygon { points }, other) => {
                let p = other.center();
                Distance {
                    distance: collision::point_polygon_distance(p, points),
                    point: nearest_boundary_point(points, p),
                }
            }
            (this, Self::Polygon { points }) => {
                let p = this.center();
                Distance {
                    distance: collision::point_polygon_distance(p, points),
                    point: p,
                }
            }
            (Self::Group { children }, other) => {
                let mut best = Distance {
                    distance: f32::INFINITY,
                    point: self.center(),
                };
                for c in children {
                    let d = c.distance_to(other);
                    if d.distance < best.distance {
                        best = d;
                    }
                }
                best
            }
            (this, Self::Group { children }) => {
                let mut best = Distance {
                    distance: f32::INFINITY,
                    point: this.center(),
                };
                for c in children {
                    let d = this.distance_to(c);
                    if d.distance < best.distance {
                        best = d;
                    }
                }
                best
            }
        }
    }

    /// Geometric center (circle center, rect center, vertex mean).
    #[must_use]
    pub fn center(&self) -> Vec2 {
        match self {
            Self::Circle { center, .. } => *center,
            Self::Rect { min, max } => (*min + *max) * 0.5,
            Self::Polygon { points } => {
                if points.is_empty() {
                    Vec2::ZERO
                } else {
                    points.iter().copied().sum::<Vec2>() / points.len() as f32
                }
            }
            Self::Group { .. } => {
                let (lo, hi) = self.bounds();
                (lo + hi) * 0.5
            }
        }
    }

    /// Place this local-space hitbox into the world: scale about the local
    /// origin, rotate by a cardinal orientation, then translate.
    #[must_use]
    pub fn transform(&self, position: Vec2, scale: f32, orientation: Orientation) -> Hitbox {
        match self {
            Self::Circle { center, radius } => Self::Circle {
                center: position + orientation.rotate(*center * scale),
                radius: radius * scale,
            },
            Self::Rect { min, max } => {
                let a = position + orientation.rotate(*min * scale);
                let b = position + orientation.rotate(*max * scale);
                Self::Rect {
                    min: a.min(b),
                    max: a.max(b),
                }
            }
            Self::Polygon { points } => Self::Polygon {
                points: points
                    .iter()
                    .map(|p| position + orientation.rotate(*p * scale))
                    .collect(),
            },
            Self::Group { children } => Self::Group {
                children: children
                    .iter()
                    .map(|c| c.transform(position, scale, orientation))
                    .collect(),
            },
        }
    }

    /// Rescale in place about the shape's own center. Obstacles shrink this
    /// way as damage accrues.
    pub fn scale_about_center(&mut self, factor: f32) {
        match self {
            Self::Circle { radius, .. } => *radius *= factor,
            Self::Rect { min, max } => {
                let center = (*min + *max) * 0.5;
                *min = center + (*min - center) * factor;
                *max = center + (*max - center) * factor;
            }
            Self::Polygon { points } => {
                let center = if points.is_empty() {
                    Vec2::ZERO
                } else {
                    points.iter().copied().sum::<Vec2>() / points.len() as f32
                };
                for p in points.iter_mut() {
                    *p = center + (*p - center) * factor;
                }
            }
            Self::Group { children } => {
                for c in children.iter_mut() {
                    c.scale_about_center(factor);
                }
            }
        }
    }

    /// Rotate by an arbitrary angle about a pivot. Only polygons support
    /// this; call sites needing free rotation must model with `Polygon`.
    #[must_use]
    pub fn rotated(&self, angle: f32, pivot: Vec2) -> Option<Hitbox> {
        match self {
            Self::Polygon { points } => {
                let (s, c) = angle.sin_cos();
                Some(Self::Polygon {
                    points: points
                        .iter()
                        .map(|p| {
                            let d = *p - pivot;
                            pivot + Vec2::new(d.x * c - d.y * s, d.x * s + d.y * c)
                        })
                        .collect(),
                })
            }
            _ => None,
        }
    }

    /// Uniform-ish random interior point; loot scatters from here when an
    /// obstacle with multiple drops is destroyed.
    pub fn random_point<R: Rng>(&self, rng: &mut R) -> Vec2 {
        match self {
            Self::Circle { center, radius } => {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let r = radius * rng.gen_range(0.0f32..1.0).sqrt();
                *center + Vec2::new(angle.cos(), angle.sin()) * r
            }
            Self::Rect { min, max } => Vec2::new(
                if max.x > min.x { rng.gen_range(min.x..=max.x) } else { min.x },
                if max.y > min.y { rng.gen_range(min.y..=max.y) } else { min.y },
            ),
            Self::Polygon { points } => {
                // Rejection sample the bounding rect; fall back to the
                // centroid if the polygon is thin enough to keep missing.
                let (lo, hi) = self.bounds();
                for _ in 0..16 {
                    let p = Vec2::new(rng.gen_range(lo.x..=hi.x), rng.gen_range(lo.y..=hi.y));
                    if collision::point_in_polygon(p, points) {
                        return p;
                    }
                }
                self.center()
            }
            Self::Group { children } => {
                if children.is_empty() {
                    Vec2::ZERO
                } else {
                    let i = rng.gen_range(0..children.len());
                    children[i].random_point(rng)
                }
            }
        }
    }

    /// Earliest intersection of the travel segment `[a, b]` with this
    /// hitbox's surface. `None` for misses and degenerate segments.
    #[must_use]
    pub fn intersect_segment(&self, a: Vec2, b: Vec2) -> Option<SegmentHit> {
        match self {
            Self::Circle { center, radius } => collision::segment_circle(a, b, *center, *radius),
            Self::Rect { min, max } => collision::segment_rect(a, b, *min, *max),
            Self::Polygon { points } => collision::segment_polygon(a, b, points),
            Self::Group { children } => {
                let mut best: Option<SegmentHit> = None;
                for c in children {
                    if let Some(hit) = c.intersect_segment(a, b) {
                        if best.map_or(true, |h| hit.t < h.t) {
                            best = Some(hit);
                        }
                    }
                }
                best
            }
        }
    }
}

#[inline]
fn rect_corners(min: Vec2, max: Vec2) -> [Vec2; 4] {
    [
        min,
        Vec2::new(max.x, min.y),
        max,
        Vec2::new(min.x, max.y),
    ]
}

fn nearest_boundary_point(points: &[Vec2], p: Vec2) -> Vec2 {
    let n = points.len();
    if n < 2 {
        return p;
    }
    let mut best = points[0];
    let mut best_d2 = f32::INFINITY;
    for i in 0..n {
        let q = collision::closest_point_on_segment(p, points[i], points[(i + 1) % n]);
        let d2 = (q - p).length_squared();
        if d2 < best_d2 {
            best_d2 = d2;
            best = q;
        }
    }
    best
}
