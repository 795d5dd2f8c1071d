use std::sync::RwLock;
use bevy::math::Vec3;

// A read-only parametric path over the normalized parameter range [0, 1).
pub trait FollowCurve: Send + Sync {
    fn position_at(&self, t: f32) -> Vec3;

    // Derivative of the position; only the direction is relied upon.
    fn tangent_at(&self, t: f32) -> Vec3;

    fn is_closed(&self) -> bool;
}

pub trait TrackedTarget: Send + Sync {
    fn current_position(&self) -> Vec3;
}

// A fixed point in space.
impl TrackedTarget for Vec3 {
    fn current_position(&self) -> Vec3 {
        *self
    }
}

// Written by the host, read by any number of followers.
#[derive(Debug, Default)]
pub struct TargetCell(RwLock<Vec3>);

impl TargetCell {
    pub fn new(position: Vec3) -> Self {
        TargetCell(RwLock::new(position))
    }

    pub fn store(&self, position: Vec3) {
        let mut guard = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = position;
    }
}

impl TrackedTarget for TargetCell {
    fn current_position(&self) -> Vec3 {
        *self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn target_cell_is_shared_between_readers() {
        let cell = Arc::new(TargetCell::new(Vec3::ZERO));
        let reader: Arc<dyn TrackedTarget> = cell.clone();

        cell.store(Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(reader.current_position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn fixed_point_target() {
        let target = Vec3::new(-4.0, 0.0, 9.0);
        assert_eq!(target.current_position(), Vec3::new(-4.0, 0.0, 9.0));
    }
}
