use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SettingsError;

pub const SETTINGS_FILE: &str = "setting.json";
pub const SUPPORTED_FPS: [u32; 4] = [30, 60, 90, 120];

/// User settings persisted as `setting.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub fps: u32,
    pub lang: String,
    pub skip_start_scene: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: 60,
            lang: "auto".to_owned(),
            skip_start_scene: false,
        }
    }
}

impl Settings {
    /// Builds settings from arbitrary JSON, resetting every missing or
    /// out-of-range value to its default.
    pub fn sanitize(value: &Value) -> Self {
        let defaults = Self::default();
        let fps = value
            .get("fps")
            .and_then(Value::as_u64)
            .and_then(|f| u32::try_from(f).ok())
            .filter(|f| SUPPORTED_FPS.contains(f));
        let lang = value
            .get("lang")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty());
        let skip = value.get("skip_start_scene").and_then(Value::as_bool);

        if fps.is_none() || lang.is_none() || skip.is_none() {
            warn!(settings = %value, "Resetting invalid or missing settings to defaults");
        }
        Self {
            fps: fps.unwrap_or(defaults.fps),
            lang: lang.map(str::to_owned).unwrap_or(defaults.lang),
            skip_start_scene: skip.unwrap_or(defaults.skip_start_scene),
        }
    }

    /// Reads `dir/setting.json`; creates it with defaults when absent.
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            let settings = Self::default();
            settings.save(dir)?;
            info!(path = %path.display(), "Created default settings");
            return Ok(settings);
        }
        let value: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        Ok(Self::sanitize(&value))
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf, SettingsError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(SETTINGS_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Seconds between fixed ticks.
    pub fn tick_interval(&self) -> f32 {
        1.0 / self.fps as f32
    }
}
