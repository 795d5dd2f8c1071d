use bevy::math::{Vec2, Vec3};
use itertools::Itertools;
use crate::core::curve::FollowCurve;

// Largest parameter an open curve reports; keeps parameters inside [0, 1).
pub const MAX_OPEN_PARAM: f32 = 1.0 - f32::EPSILON;

pub const INTERIOR_RAY_LENGTH: f32 = 10_000.0;

const DEGENERATE_LENGTH_SQUARED: f32 = 1e-12;

// Only good for cheap rejection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl CurveBounds {
    pub fn from_point(point: Vec3) -> Self {
        CurveBounds { min: point, max: point }
    }

    pub fn encapsulate(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn expanded(&self, margin: f32) -> Self {
        CurveBounds {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

pub fn wrap_param(t: f32) -> f32 {
    let wrapped = t.rem_euclid(1.0);
    // rem_euclid rounds tiny negative inputs up to exactly 1.0
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

// Signed shortest way around a closed curve.
pub fn shortest_arc_delta(from: f32, to: f32) -> f32 {
    let delta = to - from;
    if delta > 0.5 {
        delta - 1.0
    } else if delta < -0.5 {
        delta + 1.0
    } else {
        delta
    }
}

// Closed curves wrap, open curves clamp below 1.
fn normalize_param(curve: &dyn FollowCurve, t: f32) -> f32 {
    if curve.is_closed() {
        wrap_param(t)
    } else {
        t.clamp(0.0, MAX_OPEN_PARAM)
    }
}

// Grid sample only, sample_count + 1 points; no refinement.
pub fn find_closest_param(curve: &dyn FollowCurve, point: Vec3, sample_count: usize) -> f32 {
    let samples = sample_count.max(1);
    let mut best_param = 0.0;
    let mut best_distance = f32::INFINITY;

    for i in 0..=samples {
        let t = i as f32 / samples as f32;
        let distance = curve.position_at(t).distance_squared(point);
        if distance < best_distance {
            best_distance = distance;
            best_param = t;
        }
    }

    normalize_param(curve, best_param)
}

// Stops at the first sample within early_out, so the result is only exact when it is larger than
// early_out. Callers that need the true minimum pass 0.0.
pub fn distance_to_curve(curve: &dyn FollowCurve, point: Vec3, sample_count: usize, early_out: f32) -> f32 {
    let samples = sample_count.max(1);
    let mut best = f32::INFINITY;

    for i in 0..=samples {
        let t = i as f32 / samples as f32;
        best = best.min(curve.position_at(t).distance(point));
        if best <= early_out {
            break;
        }
    }

    best
}

pub fn approximate_bounds(curve: &dyn FollowCurve, bounds_sample_count: usize) -> CurveBounds {
    let samples = bounds_sample_count.max(1);
    let mut bounds = CurveBounds::from_point(curve.position_at(0.0));
    for i in 1..=samples {
        bounds.encapsulate(curve.position_at(i as f32 / samples as f32));
    }
    bounds
}

// count positions at parameters i / count; the closing edge back to the first point is implied.
pub fn sample_polygon(curve: &dyn FollowCurve, count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|i| curve.position_at(i as f32 / count as f32))
        .collect()
}

// Signed area of a polygon projected onto the XZ plane.
pub fn polygon_area_xz(points: &[Vec3]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: f32 = points
        .iter()
        .circular_tuple_windows()
        .map(|(a, b)| a.x * b.z - b.x * a.z)
        .sum();
    twice_area * 0.5
}

// Half-open rule on z so a shared vertex crosses once.
pub fn point_in_polygon_xz(polygon: &[Vec3], point: Vec3) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let origin = Vec2::new(point.x, point.z);
    let reach = origin.x + INTERIOR_RAY_LENGTH;

    let crossings = polygon
        .iter()
        .map(|p| Vec2::new(p.x, p.z))
        .circular_tuple_windows()
        .filter(|(a, b)| {
            if (a.y > origin.y) == (b.y > origin.y) {
                return false;
            }
            let x = a.x + (origin.y - a.y) * (b.x - a.x) / (b.y - a.y);
            x > origin.x && x <= reach
        })
        .count();

    crossings % 2 == 1
}

pub fn is_inside_closed(curve: &dyn FollowCurve, point: Vec3, polygon_sample_count: usize) -> bool {
    if !curve.is_closed() {
        return false;
    }
    point_in_polygon_xz(&sample_polygon(curve, polygon_sample_count), point)
}

pub fn is_degenerate_tangent(tangent: Vec3) -> bool {
    tangent.length_squared() < DEGENERATE_LENGTH_SQUARED
}

// A vanishing tangent falls back to +Z, and a vertical tangent to a +X right axis.
pub fn apply_offset(position: Vec3, tangent: Vec3, offset: Vec3) -> Vec3 {
    if offset == Vec3::ZERO {
        return position;
    }

    let forward = if is_degenerate_tangent(tangent) { Vec3::Z } else { tangent.normalize() };
    let right = Vec3::Y.cross(forward).try_normalize().unwrap_or(Vec3::X);
    let up = forward.cross(right).normalize();

    position + right * offset.x + up * offset.y + forward * offset.z
}
