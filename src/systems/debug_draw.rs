use bevy::prelude::*;
use crate::core::components::CurveFollower;
use crate::following::state_machine::FollowMode;

#[derive(Resource, Debug, Clone)]
pub struct FollowerDebugDraw {
    pub enabled: bool,
    pub curve_samples: usize,
    pub marker_radius: f32,
}

impl Default for FollowerDebugDraw {
    fn default() -> Self {
        FollowerDebugDraw {
            enabled: true,
            curve_samples: 64,
            marker_radius: 0.25,
        }
    }
}

fn mode_color(mode: FollowMode, sleeping: bool) -> Color {
    if sleeping {
        return Color::srgb(0.4, 0.4, 0.4);
    }
    match mode {
        FollowMode::Normal => Color::srgb(0.2, 0.9, 0.3),
        FollowMode::InsideClosed => Color::srgb(0.2, 0.5, 1.0),
        FollowMode::Transitioning => Color::srgb(1.0, 0.85, 0.2),
        FollowMode::OutOfRange => Color::srgb(0.9, 0.2, 0.2),
    }
}

// Draws each follower's curve, its position and a line to its target
pub fn draw_follower_debug(
    debug_draw: Res<FollowerDebugDraw>,
    followers: Query<&CurveFollower>,
    mut gizmos: Gizmos,
) {
    if !debug_draw.enabled {
        return;
    }

    for curve_follower in followers.iter() {
        let snapshot = curve_follower.follower().snapshot(debug_draw.curve_samples);
        let color = mode_color(snapshot.mode, snapshot.sleeping);

        gizmos.linestrip(snapshot.curve_points.iter().copied(), Color::srgb(0.8, 0.8, 0.8));
        gizmos.sphere(Isometry3d::from_translation(snapshot.world_position), debug_draw.marker_radius, color);
        if let Some(target) = snapshot.target_position {
            gizmos.line(snapshot.world_position, target, color);
        }
    }
}
