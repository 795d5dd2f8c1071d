use bevy::prelude::*;
use bevy_inspector_egui::prelude::*;
use serde::{Serialize, Deserialize};
use crate::core::follower_error::FollowerError;

#[derive(Reflect, Component, InspectorOptions, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[reflect(Component, InspectorOptions)]
#[serde(default)]
pub struct FollowerSettings {
    // Open curves stop tracking beyond this distance.
    #[inspector(min = 0.0)]
    pub proximity_threshold: f32,
    #[inspector(min = 0.0)]
    pub movement_speed: f32,
    #[inspector(min = 0.0, max = 0.95)]
    pub smoothing: f32,
    // Must exceed proximity_threshold.
    #[inspector(min = 0.0)]
    pub sleep_threshold: f32,
    #[inspector(min = 0.0)]
    pub sleep_check_interval: f32,
    // Curve parameter per second applied while the closest point is ambiguous.
    #[inspector(min = 0.0)]
    pub direction_bias: f32,
    // Fraction of the closest distance within which another point counts as equidistant.
    #[inspector(min = 0.0, max = 1.0)]
    pub equidistant_threshold: f32,
    #[inspector(min = 0.0)]
    pub direction_change_delay: f32,
    // x = right, y = up, z = forward relative to the curve tangent.
    pub position_offset: Vec3,
    #[inspector(min = 0.0)]
    pub offset_transition_speed: f32,
    // 0 = every tick.
    #[inspector(min = 0.0)]
    pub target_updates_per_second: f32,
    #[inspector(min = 0.0)]
    pub transition_duration: f32,
    #[inspector(min = 0.01)]
    pub exit_transition_speed_multiplier: f32,
    pub only_track_inside_closed: bool,
    pub direct_follow_inside_closed: bool,
    #[inspector(min = 1)]
    pub closest_point_samples: usize,
    #[inspector(min = 1)]
    pub distance_samples: usize,
    #[inspector(min = 3)]
    pub interior_samples: usize,
    #[inspector(min = 1)]
    pub bounds_samples: usize,
}

impl Default for FollowerSettings {
    fn default() -> Self {
        FollowerSettings {
            proximity_threshold: 10.0,
            movement_speed: 5.0,
            smoothing: 0.5,
            sleep_threshold: 50.0,
            sleep_check_interval: 0.5,
            direction_bias: 0.1,
            equidistant_threshold: 0.1,
            direction_change_delay: 0.5,
            position_offset: Vec3::ZERO,
            offset_transition_speed: 2.0,
            target_updates_per_second: 0.0,
            transition_duration: 1.0,
            exit_transition_speed_multiplier: 2.0,
            only_track_inside_closed: false,
            direct_follow_inside_closed: false,
            closest_point_samples: 100,
            distance_samples: 50,
            interior_samples: 64,
            bounds_samples: 8,
        }
    }
}

impl FollowerSettings {
    pub fn validate(&self) -> Result<(), FollowerError> {
        let non_negative = [
            ("proximity_threshold", self.proximity_threshold),
            ("movement_speed", self.movement_speed),
            ("sleep_check_interval", self.sleep_check_interval),
            ("direction_bias", self.direction_bias),
            ("equidistant_threshold", self.equidistant_threshold),
            ("direction_change_delay", self.direction_change_delay),
            ("offset_transition_speed", self.offset_transition_speed),
            ("target_updates_per_second", self.target_updates_per_second),
            ("transition_duration", self.transition_duration),
        ];
        if let Some((name, value)) = non_negative.iter().find(|(_, value)| !(*value >= 0.0) || !value.is_finite()) {
            return Err(FollowerError::InvalidConfiguration(
                format!("{} must be a finite non-negative number, got {}", name, value),
            ));
        }

        if !(self.sleep_threshold > self.proximity_threshold) {
            return Err(FollowerError::InvalidConfiguration(format!(
                "sleep_threshold ({}) must be greater than proximity_threshold ({})",
                self.sleep_threshold, self.proximity_threshold
            )));
        }
        if !(0.0..=0.95).contains(&self.smoothing) {
            return Err(FollowerError::InvalidConfiguration(
                format!("smoothing must lie in [0, 0.95], got {}", self.smoothing),
            ));
        }
        if !(self.exit_transition_speed_multiplier > 0.0) {
            return Err("exit_transition_speed_multiplier must be positive".into());
        }
        if !self.position_offset.is_finite() {
            return Err("position_offset must be finite".into());
        }

        if self.closest_point_samples == 0 || self.distance_samples == 0 || self.bounds_samples == 0 {
            return Err("sample counts must be at least 1".into());
        }
        if self.interior_samples < 3 {
            return Err(FollowerError::InvalidConfiguration(
                format!("interior_samples must be at least 3, got {}", self.interior_samples),
            ));
        }

        Ok(())
    }

    // Seconds between processed ticks, or None when updates are uncapped.
    pub fn update_interval(&self) -> Option<f32> {
        if self.target_updates_per_second > 0.0 {
            Some(1.0 / self.target_updates_per_second)
        } else {
            None
        }
    }
}
