use bevy::prelude::*;
use bevy_kira_audio::prelude::AudioReceiver;
use crate::core::components::FollowTarget;

// Followers carrying this track whichever entity holds the AudioReceiver.
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct FollowAudioReceiver;

pub fn bind_audio_receiver_targets(
    mut commands: Commands,
    followers: Query<(Entity, Option<&FollowTarget>), With<FollowAudioReceiver>>,
    receivers: Query<Entity, With<AudioReceiver>>,
) {
    let Ok(receiver) = receivers.get_single() else {
        return;
    };

    for (entity, follow_target) in followers.iter() {
        if follow_target.map(|target| target.0) != Some(receiver) {
            info!("[CurveFollow] {:?} now follows audio receiver {:?}", entity, receiver);
            commands.entity(entity).insert(FollowTarget(receiver));
        }
    }
}
