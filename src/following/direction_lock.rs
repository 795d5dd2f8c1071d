use bevy::log::debug;
use bevy::math::Vec3;
use crate::core::curve::FollowCurve;
use crate::core::follower_settings::FollowerSettings;
use crate::sampling::curve_sampler::{shortest_arc_delta, wrap_param};

// Fraction of the curve searched for competing closest points, centered on the raw one.
const EQUIDISTANT_WINDOW: f32 = 0.4;
const EQUIDISTANT_SAMPLES: usize = 12;
// Samples this close to the raw parameter belong to the same arc.
const MIN_ALTERNATIVE_SEPARATION: f32 = 0.05;
// Parameter movement below this proposes no direction.
const DIRECTION_NOISE_FLOOR: f32 = 0.001;
// Fraction of the closest distance a competing sample may exceed its neighbours by.
const BASIN_SLACK: f32 = 0.005;

// Only samples at a distance minimum of their own count, so points further along the raw
// closest arc never compete with it.
pub fn is_equidistant(
    curve: &dyn FollowCurve,
    target: Vec3,
    raw_param: f32,
    closest_distance: f32,
    threshold: f32,
) -> bool {
    let tolerance = closest_distance * threshold;
    let slack = closest_distance * BASIN_SLACK;
    let half_window = EQUIDISTANT_WINDOW * 0.5;
    let step = EQUIDISTANT_WINDOW / (EQUIDISTANT_SAMPLES - 1) as f32;
    let distance_at = |offset: f32| curve.position_at(wrap_param(raw_param + offset)).distance(target);

    (0..EQUIDISTANT_SAMPLES).any(|i| {
        let offset = -half_window + step * i as f32;
        let t = wrap_param(raw_param + offset);
        if shortest_arc_delta(raw_param, t).abs() < MIN_ALTERNATIVE_SEPARATION {
            return false;
        }
        let distance = distance_at(offset);
        if (distance - closest_distance).abs() > tolerance {
            return false;
        }
        distance <= distance_at(offset - step) + slack && distance <= distance_at(offset + step) + slack
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingReversal {
    sign: f32,
    since: f32,
}

// A reversal has to be observed for direction_change_delay seconds before it is committed.
#[derive(Clone, Debug)]
pub struct DirectionLock {
    last_param: Option<f32>,
    direction_sign: f32,
    pending: Option<PendingReversal>,
}

impl Default for DirectionLock {
    fn default() -> Self {
        DirectionLock {
            last_param: None,
            direction_sign: 1.0,
            pending: None,
        }
    }
}

impl DirectionLock {
    pub fn direction_sign(&self) -> f32 {
        self.direction_sign
    }

    pub fn last_param(&self) -> Option<f32> {
        self.last_param
    }

    // Drops all travel history; param becomes the new reference point.
    pub fn reset(&mut self, param: Option<f32>) {
        *self = DirectionLock { last_param: param, ..Default::default() };
    }

    pub fn resolve(
        &mut self,
        raw_param: f32,
        ambiguous: bool,
        delta_time: f32,
        now: f32,
        settings: &FollowerSettings,
    ) -> f32 {
        let last = match self.last_param {
            Some(last) if ambiguous => last,
            _ => {
                self.pending = None;
                self.last_param = Some(raw_param);
                return raw_param;
            }
        };

        let delta = shortest_arc_delta(last, raw_param);
        if delta.abs() > DIRECTION_NOISE_FLOOR {
            self.observe(delta.signum(), now, settings.direction_change_delay);
        }

        let advanced = wrap_param(last + self.direction_sign * settings.direction_bias * delta_time);
        self.last_param = Some(advanced);
        advanced
    }

    fn observe(&mut self, candidate: f32, now: f32, delay: f32) {
        if candidate == self.direction_sign {
            self.pending = None;
            return;
        }

        match self.pending {
            Some(pending) if pending.sign == candidate => {
                if now - pending.since >= delay {
                    debug!("[CurveFollow] direction reversed to {}", candidate);
                    self.direction_sign = candidate;
                    self.pending = None;
                }
            }
            _ => self.pending = Some(PendingReversal { sign: candidate, since: now }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bevy::utils::default;
    use crate::core::paths::PathPolyline;
    use crate::sampling::curve_sampler::{distance_to_curve, find_closest_param};

    fn settings() -> FollowerSettings {
        FollowerSettings {
            direction_bias: 0.1,
            direction_change_delay: 0.5,
            ..default()
        }
    }

    #[test]
    fn ring_center_is_equidistant() {
        let ring = PathPolyline::circle(Vec3::ZERO, 10.0, 64);
        let target = Vec3::new(0.01, 0.0, 0.0);
        let raw = find_closest_param(&ring, target, 100);
        let closest = distance_to_curve(&ring, target, 100, 0.0);

        assert!(is_equidistant(&ring, target, raw, closest, 0.1));
    }

    #[test]
    fn target_beside_the_ring_is_not_equidistant() {
        let ring = PathPolyline::circle(Vec3::ZERO, 10.0, 64);
        let target = Vec3::new(13.0, 0.0, 0.0);
        let raw = find_closest_param(&ring, target, 100);
        let closest = distance_to_curve(&ring, target, 100, 0.0);

        assert!(!is_equidistant(&ring, target, raw, closest, 0.1));
    }

    #[test]
    fn same_arc_neighbours_do_not_compete() {
        let ring = PathPolyline::circle(Vec3::ZERO, 10.0, 64);
        let target = Vec3::new(25.0, 0.0, 0.0);
        let raw = find_closest_param(&ring, target, 100);
        let closest = distance_to_curve(&ring, target, 100, 0.0);

        // Samples a little way along the arc are within tolerance but keep getting further away.
        assert!(!is_equidistant(&ring, target, raw, closest, 0.1));
        assert!(!is_equidistant(&ring, target, raw, closest, 0.3));
    }

    #[test]
    fn unambiguous_points_pass_through() {
        let mut lock = DirectionLock::default();

        assert_eq!(lock.resolve(0.3, false, 0.1, 0.0, &settings()), 0.3);
        assert_eq!(lock.resolve(0.2, false, 0.1, 0.1, &settings()), 0.2);
        assert_eq!(lock.last_param(), Some(0.2));
        assert_eq!(lock.direction_sign(), 1.0);
    }

    #[test]
    fn ambiguous_points_advance_along_the_committed_direction() {
        let mut lock = DirectionLock::default();
        lock.reset(Some(0.5));

        // Raw point jumps to the far arc, output keeps drifting forward.
        let out = lock.resolve(0.1, true, 0.1, 0.0, &settings());

        assert_relative_eq!(out, 0.51, epsilon = 1e-6);
        assert_eq!(lock.direction_sign(), 1.0);
    }

    #[test]
    fn output_wraps_across_the_seam() {
        let mut lock = DirectionLock::default();
        lock.reset(Some(0.995));

        let out = lock.resolve(0.999, true, 0.1, 0.0, &settings());

        assert_relative_eq!(out, 0.005, epsilon = 1e-5);
    }

    #[test]
    fn sustained_reversal_commits_after_the_delay() {
        let mut lock = DirectionLock::default();
        lock.reset(Some(0.5));
        let dt = 0.05;
        let mut now = 0.0;
        let mut reversed_at = None;

        for _ in 0..40 {
            now += dt;
            let behind = lock.last_param().unwrap() - 0.02;
            lock.resolve(behind, true, dt, now, &settings());
            if lock.direction_sign() < 0.0 && reversed_at.is_none() {
                reversed_at = Some(now);
            }
        }

        let reversed_at = reversed_at.expect("direction never reversed");
        assert!(reversed_at >= 0.5 + dt - 1e-4, "reversed too early at {}", reversed_at);
        assert!(reversed_at <= 0.6 + 1e-4, "reversed too late at {}", reversed_at);
    }

    #[test]
    fn flickering_candidates_never_commit() {
        let mut lock = DirectionLock::default();
        lock.reset(Some(0.5));
        let dt = 0.02;

        for step in 0..200 {
            let now = step as f32 * dt;
            let last = lock.last_param().unwrap();
            let raw = if step % 2 == 0 { last - 0.1 } else { last + 0.1 };
            lock.resolve(raw, true, dt, now, &settings());
        }

        assert_eq!(lock.direction_sign(), 1.0);
    }

    #[test]
    fn oscillating_target_on_an_equidistant_line_reverses_at_most_once_per_window() {
        let ring = PathPolyline::circle(Vec3::ZERO, 10.0, 64);
        let settings = settings();
        let mut lock = DirectionLock::default();
        let dt = 1.0 / 60.0;
        let mut reversals = Vec::new();
        let mut previous_sign = lock.direction_sign();

        for step in 0..600 {
            let now = step as f32 * dt;
            // Sweeps back and forth along the Z axis through the ring's center.
            let target = Vec3::new(0.0, 0.0, (now * 7.0).sin() * 0.5);
            let raw = find_closest_param(&ring, target, 100);
            let closest = distance_to_curve(&ring, target, 100, 0.0);
            let ambiguous = is_equidistant(&ring, target, raw, closest, settings.equidistant_threshold);
            lock.resolve(raw, ambiguous, dt, now, &settings);

            if lock.direction_sign() != previous_sign {
                reversals.push(now);
                previous_sign = lock.direction_sign();
            }
        }

        for pair in reversals.windows(2) {
            assert!(pair[1] - pair[0] > 0.5, "reversals at {} and {}", pair[0], pair[1]);
        }
    }
}
