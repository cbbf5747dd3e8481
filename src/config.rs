use crate::catalog::{Catalog, DEFAULT_CLIPS};
use crate::error::{Error, Result};
use crate::scheduler::Settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const CONFIG_DIR: &str = "soundscape";
const CONFIG_FILE: &str = "config.json";
/// Upper bound for any duration field: one day.
const MAX_DURATION_SECS: f32 = 86_400.0;

/// User-facing settings, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the clips are loaded from.
    pub audio_dir: PathBuf,
    /// Clip file names in catalog order. Empty = every audio file in `audio_dir`.
    pub files: Vec<String>,
    pub fade_in_secs: f32,
    pub fade_out_secs: f32,
    pub max_volume: f32,
    pub rotation_interval_secs: f32,
    /// Tracks audible at once between rotations.
    pub voices: usize,
    /// How often the volume readout is refreshed.
    pub sync_interval_ms: u64,
    /// How often fades are advanced.
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            audio_dir: PathBuf::from("audio"),
            files: DEFAULT_CLIPS.iter().map(|s| s.to_string()).collect(),
            fade_in_secs: 10.0,
            fade_out_secs: 5.0,
            max_volume: 0.8,
            rotation_interval_secs: 22.0,
            voices: 2,
            sync_interval_ms: 100,
            tick_ms: 50,
        }
    }
}

impl Config {
    /// `<config_dir>/soundscape/config.json`, or `./config.json` when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config, or fall back to defaults if missing or unusable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unusable config file, using defaults.");
                Config::default()
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_volume > 0.0 && self.max_volume <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "max_volume must be in (0, 1], got {}",
                self.max_volume
            )));
        }
        for (name, value) in [
            ("fade_in_secs", self.fade_in_secs),
            ("fade_out_secs", self.fade_out_secs),
        ] {
            if !(0.0..=MAX_DURATION_SECS).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be between 0 and {} seconds, got {}",
                    name, MAX_DURATION_SECS, value
                )));
            }
        }
        if !(self.rotation_interval_secs > 0.0 && self.rotation_interval_secs <= MAX_DURATION_SECS)
        {
            return Err(Error::InvalidConfig(format!(
                "rotation_interval_secs must be positive and at most {}, got {}",
                MAX_DURATION_SECS, self.rotation_interval_secs
            )));
        }
        if self.voices == 0 {
            return Err(Error::InvalidConfig("voices must be at least 1".into()));
        }
        if self.sync_interval_ms == 0 || self.tick_ms == 0 {
            return Err(Error::InvalidConfig(
                "sync_interval_ms and tick_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Scheduler parameters derived from this config. Durations that are
    /// out of range fall back to their defaults.
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            fade_in: seconds(self.fade_in_secs, defaults.fade_in),
            fade_out: seconds(self.fade_out_secs, defaults.fade_out),
            max_volume: self.max_volume,
            rotation_interval: seconds(self.rotation_interval_secs, defaults.rotation_interval),
            voices: self.voices,
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// The catalog this config describes. Scans `audio_dir` when no files
    /// are listed.
    pub fn catalog(&self) -> Result<Catalog> {
        if self.files.is_empty() {
            Catalog::scan(&self.audio_dir)
        } else {
            Ok(Catalog::new(self.audio_dir.clone(), self.files.clone()))
        }
    }
}

fn seconds(value: f32, fallback: Duration) -> Duration {
    if value > MAX_DURATION_SECS {
        return fallback;
    }
    Duration::try_from_secs_f32(value).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scheduler_defaults() {
        let config = Config::default();
        assert_eq!(config.settings(), Settings::default());
        assert_eq!(config.sync_interval(), Duration::from_millis(100));
        assert_eq!(config.files.len(), 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn survives_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.rotation_interval_secs = 30.0;
        config.voices = 3;
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"fade_in_secs": 4.0}"#).unwrap();
        assert_eq!(config.fade_in_secs, 4.0);
        assert_eq!(config.fade_out_secs, 5.0);
        assert_eq!(config.voices, 2);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.max_volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rotation_interval_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fade_out_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.voices = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fade_in_secs = 1e20;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rotation_interval_secs = 1e19;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fade_out_secs = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_durations_fall_back_to_defaults() {
        let mut config = Config::default();
        config.fade_in_secs = 1e20;
        config.fade_out_secs = -3.0;
        config.rotation_interval_secs = 1e19;
        let settings = config.settings();
        assert_eq!(settings.fade_in, Settings::default().fade_in);
        assert_eq!(settings.fade_out, Settings::default().fade_out);
        assert_eq!(settings.rotation_interval, Settings::default().rotation_interval);
    }

    #[test]
    fn huge_rotation_interval_does_not_crash_start() {
        let mut config = Config::default();
        config.rotation_interval_secs = 1e19;
        let catalog = config.catalog().unwrap();
        let sounds = crate::sound::SilentSound::many(catalog.len());
        let mut scheduler =
            crate::scheduler::PlaylistScheduler::new(&catalog, sounds, config.settings()).unwrap();
        assert_eq!(scheduler.start(std::time::Instant::now()).len(), 2);
        assert!(scheduler.is_running());
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"max_volume": 2.0}"#).unwrap();
        assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn load_or_default_falls_back_on_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_or_default(&path), Config::default());
        assert_eq!(
            Config::load_or_default(&dir.path().join("absent.json")),
            Config::default()
        );
    }

    #[test]
    fn empty_file_list_scans_audio_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rain.ogg"), b"").unwrap();
        fs::write(dir.path().join("wind.mp3"), b"").unwrap();
        let config = Config {
            audio_dir: dir.path().to_path_buf(),
            files: Vec::new(),
            ..Config::default()
        };
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.files, vec!["rain.ogg".to_string(), "wind.mp3".to_string()]);
    }
}
