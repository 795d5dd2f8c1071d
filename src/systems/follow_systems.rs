use bevy::prelude::*;
use crate::core::components::{CurveFollower, FollowTarget};
use crate::core::follower_settings::FollowerSettings;
use crate::following::position_follower::TickOutcome;
use crate::following::state_machine::FollowMode;

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CurveFollowSet {
    // Settings and requests are applied before followers move.
    Configure,
    Tick,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub enum FollowerEvent {
    ModeChanged {
        entity: Entity,
        from: FollowMode,
        to: FollowMode,
    },
    SleepChanged {
        entity: Entity,
        sleeping: bool,
    },
}

#[derive(Event, Debug, Clone, PartialEq)]
pub enum FollowerRequest {
    // Snap back onto the curve without smoothing on the entity's next tick.
    Restart {
        entity: Entity,
    },
    SetOffset {
        entity: Entity,
        offset: Vec3,
    },
}

// Pushes edited FollowerSettings components into their followers
pub fn apply_follower_settings(
    mut followers: Query<(Entity, &FollowerSettings, &mut CurveFollower), Changed<FollowerSettings>>,
) {
    for (entity, settings, mut curve_follower) in followers.iter_mut() {
        if let Err(error) = settings.validate() {
            warn!("[CurveFollow] {:?} received invalid settings: {}", entity, error);
        }
        curve_follower.follower_mut().set_settings(settings.clone());
    }
}

pub fn follower_request_listener(
    mut request_reader: EventReader<FollowerRequest>,
    mut followers: Query<&mut CurveFollower>,
) {
    for request in request_reader.read() {
        match request {
            FollowerRequest::Restart { entity } => {
                match followers.get_mut(*entity) {
                    Ok(mut curve_follower) => curve_follower.follower_mut().request_restart(),
                    Err(_) => warn!("[CurveFollow] restart requested for {:?}, which has no CurveFollower", entity),
                }
            },
            FollowerRequest::SetOffset { entity, offset } => {
                match followers.get_mut(*entity) {
                    Ok(mut curve_follower) => curve_follower.follower_mut().set_position_offset(*offset),
                    Err(_) => warn!("[CurveFollow] offset requested for {:?}, which has no CurveFollower", entity),
                }
            }
        }
    }
}

// Publishes target positions, steps every follower and writes the result into its Transform
pub fn tick_curve_followers(
    time: Res<Time>,
    mut followers: Query<(Entity, &mut CurveFollower, &mut Transform, Option<&FollowTarget>)>,
    targets: Query<&GlobalTransform>,
    mut event_writer: EventWriter<FollowerEvent>,
) {
    let delta_time = time.delta_secs();

    for (entity, mut curve_follower, mut transform, follow_target) in followers.iter_mut() {
        match follow_target.map(|target| (target.0, targets.get(target.0))) {
            Some((target, Ok(global))) => curve_follower.track(target, global.translation()),
            Some((target, Err(_))) => {
                if curve_follower.bound_target() == Some(target) {
                    debug!("[CurveFollow] {:?} lost its target {:?}", entity, target);
                }
                curve_follower.untrack();
            },
            None => curve_follower.untrack(),
        }

        let mode_before = curve_follower.follower().current_mode();
        let sleeping_before = curve_follower.follower().is_sleeping();

        if curve_follower.follower_mut().tick(delta_time) == TickOutcome::Moved {
            transform.translation = curve_follower.follower().world_position();
        }

        let mode_after = curve_follower.follower().current_mode();
        if mode_after != mode_before {
            event_writer.send(FollowerEvent::ModeChanged { entity, from: mode_before, to: mode_after });
        }
        let sleeping_after = curve_follower.follower().is_sleeping();
        if sleeping_after != sleeping_before {
            event_writer.send(FollowerEvent::SleepChanged { entity, sleeping: sleeping_after });
        }
    }
}
