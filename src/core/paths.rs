use std::f32::consts::TAU;
use bevy::prelude::*;
use bevy_math::cubic_splines::{CubicCardinalSpline, CubicCurve, CubicGenerator, CyclicCubicGenerator};
use serde::{Serialize, Deserialize};
use crate::core::curve::FollowCurve;
use crate::core::follower_error::FollowerError;
use crate::sampling::curve_sampler::{wrap_param, MAX_OPEN_PARAM};

// A cubic spline remapped from its segment domain onto [0, 1).
#[derive(Clone, Debug)]
pub struct SplinePath {
    curve: CubicCurve<Vec3>,
    segment_count: f32,
    closed: bool,
}

impl SplinePath {
    pub fn cardinal(tension: f32, points: Vec<Vec3>, closed: bool) -> Result<Self, FollowerError> {
        let spline = CubicCardinalSpline::new(tension, points);
        let curve = if closed {
            spline.to_curve_cyclic()
        } else {
            spline.to_curve()
        }
        .map_err(|e| FollowerError::DegenerateGeometry(format!("cannot build spline: {:?}", e)))?;

        Ok(Self::from_curve(curve, closed))
    }

    pub fn from_curve(curve: CubicCurve<Vec3>, closed: bool) -> Self {
        let segment_count = curve.segments().len() as f32;
        SplinePath { curve, segment_count, closed }
    }

    fn segment_time(&self, t: f32) -> f32 {
        let t = if self.closed { wrap_param(t) } else { t.clamp(0.0, 1.0) };
        t * self.segment_count
    }
}

impl FollowCurve for SplinePath {
    fn position_at(&self, t: f32) -> Vec3 {
        self.curve.position(self.segment_time(t))
    }

    fn tangent_at(&self, t: f32) -> Vec3 {
        self.curve.velocity(self.segment_time(t))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// World-space polyline with uniform parameter spacing per segment.
#[derive(Clone, Debug, Default, Reflect, Serialize, Deserialize)]
pub struct PathPolyline {
    pub points: Vec<Vec3>,
    pub closed: bool,
}

impl PathPolyline {
    pub fn open(points: Vec<Vec3>) -> Self {
        PathPolyline { points, closed: false }
    }

    pub fn closed(points: Vec<Vec3>) -> Self {
        PathPolyline { points, closed: true }
    }

    // A closed ring in the horizontal plane, starting on +X and winding towards +Z.
    pub fn circle(center: Vec3, radius: f32, segments: usize) -> Self {
        let points = (0..segments)
            .map(|i| {
                let angle = TAU * i as f32 / segments as f32;
                center + Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
            })
            .collect();
        PathPolyline::closed(points)
    }

    fn segment_count(&self) -> usize {
        match self.points.len() {
            0 | 1 => 0,
            n if self.closed => n,
            n => n - 1,
        }
    }

    fn locate(&self, t: f32) -> (usize, f32) {
        let segments = self.segment_count();
        let t = if self.closed { wrap_param(t) } else { t.clamp(0.0, MAX_OPEN_PARAM) };
        let scaled = t * segments as f32;
        let index = (scaled.floor() as usize).min(segments - 1);
        (index, scaled - index as f32)
    }

    fn segment(&self, index: usize) -> (Vec3, Vec3) {
        let next = (index + 1) % self.points.len();
        (self.points[index], self.points[next])
    }
}

impl FollowCurve for PathPolyline {
    fn position_at(&self, t: f32) -> Vec3 {
        if self.segment_count() == 0 {
            return self.points.first().copied().unwrap_or(Vec3::ZERO);
        }
        let (index, local) = self.locate(t);
        let (a, b) = self.segment(index);
        a.lerp(b, local)
    }

    fn tangent_at(&self, t: f32) -> Vec3 {
        if self.segment_count() == 0 {
            return Vec3::ZERO;
        }
        let (index, _) = self.locate(t);
        let (a, b) = self.segment(index);
        (b - a) * self.segment_count() as f32
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
