//! Primitive intersection, distance, and segment tests.
//!
//! These are the exact narrow-phase kernels; the broad phase only ever
//! produces candidates for them. Degenerate inputs (zero-length segments,
//! zero-area rects) report "no contact" rather than erroring.

use glam::Vec2;

pub const EPSILON: f32 = 1e-6;

/// A segment/shape intersection: entry point, surface normal at entry, and
/// the parametric position along the segment (0 at `a`, 1 at `b`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentIntersection {
    pub point: Vec2,
    pub normal: Vec2,
    pub t: f32,
}

#[inline]
#[must_use]
pub fn circle_circle(a_center: Vec2, a_radius: f32, b_center: Vec2, b_radius: f32) -> bool {
    let r = a_radius + b_radius;
    (a_center - b_center).length_squared() < r * r
}

#[inline]
#[must_use]
pub fn rect_rect(a_min: Vec2, a_max: Vec2, b_min: Vec2, b_max: Vec2) -> bool {
    a_min.x < b_max.x && a_max.x > b_min.x && a_min.y < b_max.y && a_max.y > b_min.y
}

#[inline]
#[must_use]
pub fn circle_rect(center: Vec2, radius: f32, min: Vec2, max: Vec2) -> bool {
    let closest = center.clamp(min, max);
    (closest - center).length_squared() < radius * radius
}

#[inline]
#[must_use]
pub fn point_in_rect(p: Vec2, min: Vec2, max: Vec2) -> bool {
    p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
}

/// Closest point on segment `[a, b]` to `p`.
#[inline]
#[must_use]
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

#[inline]
#[must_use]
pub fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    // Even-odd ray cast.
    let mut inside = false;
    let n = points.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (pi, pj) = (points[i], points[j]);
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Do segments `[a, b]` and `[c, d]` intersect? Returns the intersection
/// point and the parameter along `[a, b]` if so.
#[must_use]
pub fn segment_segment(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Option<(Vec2, f32)> {
    let r = b - a;
    let s = d - c;
    let denom = r.perp_dot(s);
    if denom.abs() <= EPSILON {
        return None; // parallel or degenerate
    }
    let t = (c - a).perp_dot(s) / denom;
    let u = (c - a).perp_dot(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((a + r * t, t))
    } else {
        None
    }
}

/// Earliest intersection of segment `[a, b]` with a circle.
#[must_use]
pub fn segment_circle(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> Option<SegmentIntersection> {
    let d = b - a;
    let len2 = d.length_squared();
    if len2 <= EPSILON {
        return None;
    }
    let m = a - center;
    // Starting inside counts as an immediate hit at the start point.
    if m.length_squared() < radius * radius {
        let normal = if m.length_squared() > EPSILON {
            m.normalize()
        } else {
            -d.normalize()
        };
        return Some(SegmentIntersection {
            point: a,
            normal,
            t: 0.0,
        });
    }
    let b_coef = m.dot(d);
    let c_coef = m.length_squared() - radius * radius;
    let disc = b_coef * b_coef - len2 * c_coef;
    if disc < 0.0 {
        return None;
    }
    let t = (-b_coef - disc.sqrt()) / len2;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let point = a + d * t;
    Some(SegmentIntersection {
        point,
        normal: (point - center).normalize(),
        t,
    })
}

/// Earliest intersection of segment `[a, b]` with an axis-aligned rect,
/// via the slab method; the normal is the face the segment enters through.
#[must_use]
pub fn segment_rect(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> Option<SegmentIntersection> {
    let d = b - a;
    if d.length_squared() <= EPSILON || min.x >= max.x || min.y >= max.y {
        return None;
    }
    let mut tmin = 0.0f32;
    let mut tmax = 1.0f32;
    let mut normal = Vec2::ZERO;
    for axis in 0..2 {
        let (s, dir, lo, hi) = if axis == 0 {
            (a.x, d.x, min.x, max.x)
        } else {
            (a.y, d.y, min.y, max.y)
        };
        if dir.abs() < EPSILON {
            if s < lo || s > hi {
                return None;
            }
        } else {
            let inv = 1.0 / dir;
            let mut t0 = (lo - s) * inv;
            let mut t1 = (hi - s) * inv;
            let mut face = if axis == 0 { Vec2::NEG_X } else { Vec2::NEG_Y };
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                face = -face;
            }
            if t0 > tmin {
                tmin = t0;
                normal = face;
            }
            tmax = tmax.min(t1);
            if tmin > tmax {
                return None;
            }
        }
    }
    if normal == Vec2::ZERO {
        // Started inside the rect: hit at the start, normal opposing travel.
        return Some(SegmentIntersection {
            point: a,
            normal: -d.normalize(),
            t: 0.0,
        });
    }
    Some(SegmentIntersection {
        point: a + d * tmin,
        normal,
        t: tmin,
    })
}

/// Earliest intersection of segment `[a, b]` with a polygon boundary. The
/// edge normal is oriented against the direction of travel.
#[must_use]
pub fn segment_polygon(a: Vec2, b: Vec2, points: &[Vec2]) -> Option<SegmentIntersection> {
    if points.len() < 3 {
        return None;
    }
    let d = b - a;
    if d.length_squared() <= EPSILON {
        return None;
    }
    if point_in_polygon(a, points) {
        return Some(SegmentIntersection {
            point: a,
            normal: -d.normalize(),
            t: 0.0,
        });
    }
    let mut best: Option<SegmentIntersection> = None;
    let n = points.len();
    for i in 0..n {
        let c = points[i];
        let e = points[(i + 1) % n];
        if let Some((point, t)) = segment_segment(a, b, c, e) {
            if best.map_or(true, |h| t < h.t) {
                let edge = e - c;
                let mut normal = Vec2::new(-edge.y, edge.x).normalize_or_zero();
                if normal.dot(d) > 0.0 {
                    normal = -normal;
                }
                best = Some(SegmentIntersection { point, normal, t });
            }
        }
    }
    best
}

/// Distance from a point to a rect surface (0 inside).
#[inline]
#[must_use]
pub fn point_rect_distance(p: Vec2, min: Vec2, max: Vec2) -> f32 {
    let closest = p.clamp(min, max);
    (closest - p).length()
}

/// Distance between two rect surfaces (0 when overlapping).
#[inline]
#[must_use]
pub fn rect_rect_distance(a_min: Vec2, a_max: Vec2, b_min: Vec2, b_max: Vec2) -> f32 {
    let dx = (b_min.x - a_max.x).max(a_min.x - b_max.x).max(0.0);
    let dy = (b_min.y - a_max.y).max(a_min.y - b_max.y).max(0.0);
    Vec2::new(dx, dy).length()
}

/// Convex polygon vs polygon overlap via separating axes.
#[must_use]
pub fn polygon_polygon(a: &[Vec2], b: &[Vec2]) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    for (first, second) in [(a, b), (b, a)] {
        let n = first.len();
        for i in 0..n {
            let edge = first[(i + 1) % n] - first[i];
            let axis = Vec2::new(-edge.y, edge.x);
            let (min_a, max_a) = project(first, axis);
            let (min_b, max_b) = project(second, axis);
            if max_a < min_b || max_b < min_a {
                return false;
            }
        }
    }
    true
}

#[inline]
fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for p in points {
        let d = p.dot(axis);
        lo = lo.min(d);
        hi = hi.max(d);
    }
    (lo, hi)
}

/// Convex polygon vs circle overlap.
#[must_use]
pub fn polygon_circle(points: &[Vec2], center: Vec2, radius: f32) -> bool {
    if points.len() < 3 {
        return false;
    }
    if point_in_polygon(center, points) {
        return true;
    }
    let n = points.len();
    for i in 0..n {
        let closest = closest_point_on_segment(center, points[i], points[(i + 1) % n]);
        if (closest - center).length_squared() < radius * radius {
            return true;
        }
    }
    false
}

/// Minimum distance from a point to a polygon boundary (0 inside).
#[must_use]
pub fn point_polygon_distance(p: Vec2, points: &[Vec2]) -> f32 {
    if points.len() < 3 {
        return f32::INFINITY;
    }
    if point_in_polygon(p, points) {
        return 0.0;
    }
    let n = points.len();
    let mut best = f32::INFINITY;
    for i in 0..n {
        let closest = closest_point_on_segment(p, points[i], points[(i + 1) % n]);
        best = best.min((closest - p).length());
    }
    best
}
