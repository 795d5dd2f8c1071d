use bevy::log::debug;
use bevy::math::Vec3;
use crate::core::curve::FollowCurve;
use crate::core::follower_settings::FollowerSettings;
use crate::sampling::curve_sampler::{approximate_bounds, distance_to_curve};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SleepDecision {
    // Full work runs this tick. distance is exact only above the proximity threshold.
    Awake { distance: f32 },
    Asleep,
}

// Skips follower work while the target is far from the curve.
#[derive(Clone, Debug, Default)]
pub struct SleepController {
    sleeping: bool,
    next_check_time: f32,
}

impl SleepController {
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn next_check_time(&self) -> f32 {
        self.next_check_time
    }

    pub fn reset(&mut self) {
        self.sleeping = false;
        self.next_check_time = 0.0;
    }

    pub fn evaluate(
        &mut self,
        curve: &dyn FollowCurve,
        target: Vec3,
        now: f32,
        settings: &FollowerSettings,
    ) -> SleepDecision {
        if self.sleeping {
            return self.recheck(curve, target, now, settings);
        }

        let distance = distance_to_curve(curve, target, settings.distance_samples, settings.proximity_threshold);
        if distance > settings.sleep_threshold {
            self.sleeping = true;
            self.next_check_time = now + settings.sleep_check_interval;
            debug!("[CurveFollow] sleeping, target {:.2} from curve", distance);
            return SleepDecision::Asleep;
        }

        SleepDecision::Awake { distance }
    }

    fn recheck(
        &mut self,
        curve: &dyn FollowCurve,
        target: Vec3,
        now: f32,
        settings: &FollowerSettings,
    ) -> SleepDecision {
        if now < self.next_check_time {
            return SleepDecision::Asleep;
        }
        self.next_check_time = now + settings.sleep_check_interval;

        let reach = approximate_bounds(curve, settings.bounds_samples).expanded(settings.sleep_threshold);
        if !reach.contains(target) {
            return SleepDecision::Asleep;
        }

        let distance = distance_to_curve(curve, target, settings.distance_samples, settings.proximity_threshold);
        if distance > settings.sleep_threshold {
            return SleepDecision::Asleep;
        }

        self.sleeping = false;
        debug!("[CurveFollow] waking, target {:.2} from curve", distance);
        SleepDecision::Awake { distance }
    }
}
