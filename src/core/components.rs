use std::sync::Arc;
use bevy::prelude::*;
use crate::core::curve::{FollowCurve, TargetCell};
use crate::core::follower_settings::FollowerSettings;
use crate::following::position_follower::PositionFollower;

// Entity whose world position a CurveFollower on the same entity tracks.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct FollowTarget(pub Entity);

// Root entities only; the translation is written in world space.
#[derive(Component)]
pub struct CurveFollower {
    follower: PositionFollower,
    target_cell: Arc<TargetCell>,
    bound_target: Option<Entity>,
}

impl CurveFollower {
    pub fn new(curve: Arc<dyn FollowCurve>, settings: FollowerSettings) -> Self {
        CurveFollower {
            follower: PositionFollower::with_curve(curve, settings),
            target_cell: Arc::new(TargetCell::new(Vec3::ZERO)),
            bound_target: None,
        }
    }

    pub fn from_curve(curve: impl FollowCurve + 'static, settings: FollowerSettings) -> Self {
        CurveFollower::new(Arc::new(curve), settings)
    }

    pub fn follower(&self) -> &PositionFollower {
        &self.follower
    }

    pub fn follower_mut(&mut self) -> &mut PositionFollower {
        &mut self.follower
    }

    pub fn bound_target(&self) -> Option<Entity> {
        self.bound_target
    }

    // Publishes the target's position, rebinding when the entity changed.
    pub(crate) fn track(&mut self, entity: Entity, position: Vec3) {
        self.target_cell.store(position);
        if self.bound_target != Some(entity) {
            self.bound_target = Some(entity);
            self.follower.set_target(self.target_cell.clone());
        }
    }

    pub(crate) fn untrack(&mut self) {
        if self.bound_target.take().is_some() {
            self.follower.clear_target();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::PathPolyline;

    fn follower() -> CurveFollower {
        let line = PathPolyline::open(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]);
        CurveFollower::from_curve(line, FollowerSettings::default())
    }

    #[test]
    fn tracking_a_new_entity_snaps_once() {
        let mut follower = follower();
        let target = Entity::from_raw(7);

        follower.track(target, Vec3::new(3.0, 0.0, 1.0));
        assert_eq!(follower.bound_target(), Some(target));
        assert!(follower.follower().world_position().distance(Vec3::new(3.0, 0.0, 0.0)) < 1e-5);
        let snapped = follower.follower().world_position();

        // Same entity moving only updates the published position.
        follower.track(target, Vec3::new(8.0, 0.0, 1.0));
        assert_eq!(follower.follower().world_position(), snapped);
        assert_eq!(follower.follower().snapshot(1).target_position, Some(Vec3::new(8.0, 0.0, 1.0)));
    }

    #[test]
    fn untracking_leaves_the_follower_without_a_target() {
        let mut follower = follower();
        follower.track(Entity::from_raw(1), Vec3::ONE);

        follower.untrack();

        assert!(!follower.follower().has_target());
        assert_eq!(follower.bound_target(), None);
    }
}
