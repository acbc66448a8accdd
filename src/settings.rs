use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        // PreStartup so the resource exists before Startup systems spawn
        // anything that reads it.
        app.add_systems(PreStartup, load_settings);
    }
}

/// Externally tunable knobs, loaded from a RON file.
///
/// #[derive(Serialize, Deserialize)] generates the conversion code at compile
/// time; we just pick RON as the format. Every field carries #[serde(default)]
/// so a settings file that only overrides one knob still parses — missing
/// fields get their default instead of a deserialization error.
#[derive(Resource, Serialize, Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "defaults::starting_health")]
    pub starting_health: i32,
    #[serde(default = "defaults::max_health")]
    pub max_health: i32,
    #[serde(default = "defaults::hit_text")]
    pub hit_text: String,
    #[serde(default = "defaults::kill_text")]
    pub kill_text: String,
    #[serde(default = "defaults::popup_duration_seconds")]
    pub popup_duration_seconds: f32,
}

mod defaults {
    pub fn starting_health() -> i32 {
        100
    }
    pub fn max_health() -> i32 {
        100
    }
    pub fn hit_text() -> String {
        "Hit!".to_string()
    }
    pub fn kill_text() -> String {
        "KILL".to_string()
    }
    pub fn popup_duration_seconds() -> f32 {
        1.0
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            starting_health: defaults::starting_health(),
            max_health: defaults::max_health(),
            hit_text: defaults::hit_text(),
            kill_text: defaults::kill_text(),
            popup_duration_seconds: defaults::popup_duration_seconds(),
        }
    }
}

/// Where we look for a settings file, in order: a `settings.ron` next to the
/// executable's working directory (easy to edit while hacking on the demo),
/// then the per-user config directory via the `dirs` crate.
fn settings_paths() -> Vec<std::path::PathBuf> {
    let mut paths = vec![std::path::PathBuf::from("settings.ron")];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("patterns-sandbox").join("settings.ron"));
    }
    paths
}

fn read_settings() -> Option<Settings> {
    for path in settings_paths() {
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match ron::from_str::<Settings>(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}: {:?}", path, settings);
                    return Some(settings);
                }
                Err(e) => {
                    // File exists but is corrupted or has an outdated format.
                    // Log the error and fall back rather than crashing.
                    error!("Failed to parse settings file {:?}: {}. Using defaults.", path, e);
                }
            },
            Err(e) => {
                error!("Failed to read settings file {:?}: {}. Using defaults.", path, e);
            }
        }
    }
    None
}

/// Startup system: loads the settings file, or falls back to defaults.
fn load_settings(mut commands: Commands) {
    let settings = read_settings().unwrap_or_else(|| {
        info!("No settings file found. Using defaults.");
        Settings::default()
    });
    commands.insert_resource(settings);
}
