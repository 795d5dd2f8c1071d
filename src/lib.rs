pub mod core {
    pub mod components;
    pub mod curve;
    pub mod follower_error;
    pub mod follower_plugin;
    pub mod follower_settings;
    pub mod paths;
}

pub mod sampling {
    pub mod curve_sampler;
}

pub mod following;

pub mod systems {
    pub mod follow_systems;
    #[cfg(feature = "debug")]
    pub mod debug_draw;
    #[cfg(feature = "spatial_audio")]
    pub mod audio_binding;
}

pub mod serialization {
    pub mod settings_io;
}

pub mod prelude {
    pub use crate::core::components::{CurveFollower, FollowTarget};
    pub use crate::core::curve::{FollowCurve, TargetCell, TrackedTarget};
    pub use crate::core::follower_error::FollowerError;
    pub use crate::core::follower_plugin::CurveFollowPlugin;
    pub use crate::core::follower_settings::FollowerSettings;
    pub use crate::core::paths::{PathPolyline, SplinePath};
    pub use crate::following::position_follower::{FollowerSnapshot, PositionFollower, TickOutcome};
    pub use crate::following::state_machine::FollowMode;
    pub use crate::systems::follow_systems::{CurveFollowSet, FollowerEvent, FollowerRequest};
}
