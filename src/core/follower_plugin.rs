use bevy::prelude::*;
use bevy::transform::TransformSystem;
use crate::core::components::FollowTarget;
use crate::core::follower_settings::FollowerSettings;
use crate::core::paths::PathPolyline;
use crate::following::state_machine::FollowMode;
use crate::systems::follow_systems::*;

pub struct CurveFollowPlugin;

impl Plugin for CurveFollowPlugin {
    fn build(&self, app: &mut App) {
        app
            .register_type::<FollowerSettings>()
            .register_type::<FollowTarget>()
            .register_type::<FollowMode>()
            .register_type::<PathPolyline>();

        app.add_event::<FollowerEvent>()
            .add_event::<FollowerRequest>();

        // Followers read targets' propagated GlobalTransforms, so they run after propagation
        app.configure_sets(PostUpdate, (
            CurveFollowSet::Configure,
            CurveFollowSet::Tick,
        ).chain().after(TransformSystem::TransformPropagate));

        app.add_systems(PostUpdate, (
            apply_follower_settings,
            follower_request_listener,
        ).in_set(CurveFollowSet::Configure));
        app.add_systems(PostUpdate, tick_curve_followers.in_set(CurveFollowSet::Tick));

        #[cfg(feature = "debug")]
        {
            app.init_resource::<crate::systems::debug_draw::FollowerDebugDraw>();
            app.add_systems(PostUpdate, crate::systems::debug_draw::draw_follower_debug.after(CurveFollowSet::Tick));
        }

        #[cfg(feature = "spatial_audio")]
        {
            app.register_type::<crate::systems::audio_binding::FollowAudioReceiver>();
            app.add_systems(PostUpdate, crate::systems::audio_binding::bind_audio_receiver_targets
                .before(CurveFollowSet::Configure));
        }
    }
}
