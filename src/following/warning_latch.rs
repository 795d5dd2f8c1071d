use bevy::log::warn;
use bevy::utils::HashSet;
use crate::core::follower_error::FollowerError;

// Reports each kind of follower problem once until it is cleared.
#[derive(Debug, Default)]
pub struct WarningLatch {
    reported: HashSet<&'static str>,
}

impl WarningLatch {
    pub fn warn_once(&mut self, error: &FollowerError) -> bool {
        if !self.reported.insert(error.kind()) {
            return false;
        }
        warn!("[CurveFollow] {}", error);
        true
    }

    pub fn clear(&mut self, error: &FollowerError) {
        self.reported.remove(error.kind());
    }

    pub fn clear_all(&mut self) {
        self.reported.clear();
    }
}
