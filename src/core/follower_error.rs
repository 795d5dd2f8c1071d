use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FollowerError {
    MissingCurve,
    MissingTarget,
    DegenerateGeometry(String),
    InvalidConfiguration(String),
    SettingsLoad(String),
}

impl FollowerError {
    // Used to deduplicate warnings; payloads do not distinguish kinds.
    pub fn kind(&self) -> &'static str {
        match self {
            FollowerError::MissingCurve => "missing_curve",
            FollowerError::MissingTarget => "missing_target",
            FollowerError::DegenerateGeometry(_) => "degenerate_geometry",
            FollowerError::InvalidConfiguration(_) => "invalid_configuration",
            FollowerError::SettingsLoad(_) => "settings_load",
        }
    }
}

impl fmt::Display for FollowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowerError::MissingCurve => write!(f, "no curve is bound to the follower"),
            FollowerError::MissingTarget => write!(f, "no target is bound to the follower"),
            FollowerError::DegenerateGeometry(detail) => write!(f, "degenerate curve geometry: {}", detail),
            FollowerError::InvalidConfiguration(detail) => write!(f, "invalid follower settings: {}", detail),
            FollowerError::SettingsLoad(detail) => write!(f, "failed to load follower settings: {}", detail),
        }
    }
}

impl std::error::Error for FollowerError {}

impl From<&str> for FollowerError {
    fn from(error: &str) -> Self {
        FollowerError::InvalidConfiguration(error.to_string())
    }
}

impl From<ron::error::SpannedError> for FollowerError {
    fn from(error: ron::error::SpannedError) -> Self {
        FollowerError::SettingsLoad(error.to_string())
    }
}

impl From<ron::Error> for FollowerError {
    fn from(error: ron::Error) -> Self {
        FollowerError::SettingsLoad(error.to_string())
    }
}

impl From<std::io::Error> for FollowerError {
    fn from(error: std::io::Error) -> Self {
        FollowerError::SettingsLoad(error.to_string())
    }
}
