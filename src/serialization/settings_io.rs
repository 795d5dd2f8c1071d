use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use bevy::log::info;
use lazy_static::lazy_static;
use ron::de::from_reader;
use ron::ser::PrettyConfig;
use crate::core::follower_error::FollowerError;
use crate::core::follower_settings::FollowerSettings;

lazy_static! {
    static ref SETTINGS_CACHE: Mutex<HashMap<String, FollowerSettings>> = Mutex::new(HashMap::new());
}

pub fn parse_follower_settings(source: &str) -> Result<FollowerSettings, FollowerError> {
    let settings: FollowerSettings = ron::from_str(source)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_follower_settings(path: impl AsRef<Path>) -> Result<FollowerSettings, FollowerError> {
    let file = File::open(path.as_ref())?;
    let settings: FollowerSettings = from_reader(file)?;
    settings.validate()?;
    Ok(settings)
}

// Loads assets/followers/{name}.ron once and serves later requests from memory
pub fn import_follower_settings(settings_name: &str) -> Result<FollowerSettings, FollowerError> {
    let mut cache = SETTINGS_CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(cached_settings) = cache.get(settings_name) {
        return Ok(cached_settings.clone());
    }

    let file_path = format!("assets/followers/{}.ron", settings_name);
    let settings = load_follower_settings(&file_path)?;
    info!("[CurveFollow] loaded follower settings '{}'", settings_name);
    cache.insert(settings_name.to_string(), settings.clone());
    Ok(settings)
}

pub fn export_follower_settings(settings: &FollowerSettings, path: impl AsRef<Path>) -> Result<(), FollowerError> {
    let serialized = ron::ser::to_string_pretty(settings, PrettyConfig::default())?;
    File::create(path.as_ref())?.write_all(serialized.as_bytes())?;
    Ok(())
}
