//! Loading and saving config.toml
//!
//! Loading never fails: a missing file means defaults, an unreadable or
//! unparseable one is logged and replaced by defaults in memory. Saving is
//! atomic (temp file + rename) so a crash mid-write cannot truncate an
//! existing config.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use mwarden_core::{Error, Result};

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";

/// Standard configuration directory: `<data_local_dir>/mirror-warden`.
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("mirror-warden"))
        .ok_or_else(|| Error::config("could not determine the local data directory"))
}

/// Load settings from `config.toml` in `config_dir`, falling back to defaults.
///
/// Timing intervals are clamped to their minimums on the way in.
pub fn load_settings(config_dir: &Path) -> Settings {
    let config_path = config_dir.join(CONFIG_FILENAME);

    let mut settings = if !config_path.exists() {
        debug!("No config file at {config_path:?}, using defaults");
        Settings::default()
    } else {
        match fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str::<Settings>(&content) {
                Ok(parsed) => {
                    debug!("Loaded settings from {config_path:?}");
                    parsed
                }
                Err(e) => {
                    warn!("Failed to parse {config_path:?}: {e}. Using defaults.");
                    Settings::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {config_path:?}: {e}. Using defaults.");
                Settings::default()
            }
        }
    };

    settings.panel.clamp_to_minimums();
    settings
}

/// Persist settings to `config.toml` in `config_dir`.
pub fn save_settings(config_dir: &Path, settings: &Settings) -> Result<()> {
    fs::create_dir_all(config_dir)
        .map_err(|e| Error::config(format!("failed to create {config_dir:?}: {e}")))?;

    let body = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("failed to serialize settings: {e}")))?;
    let content = format!(
        "# Mirror Warden configuration\n\
         # [mirror] holds session defaults, [panel] the supervisor timing knobs.\n\n\
         {body}"
    );

    let config_path = config_dir.join(CONFIG_FILENAME);
    let temp_path = config_dir.join(format!(".{CONFIG_FILENAME}.tmp"));
    fs::write(&temp_path, content)
        .map_err(|e| Error::config(format!("failed to write {temp_path:?}: {e}")))?;
    fs::rename(&temp_path, &config_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::config(format!("failed to replace {config_path:?}: {e}"))
    })?;

    info!("Saved settings to {config_path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::types::{MIN_PERSIST_DEBOUNCE_MS, MIN_RECONCILE_INTERVAL_MS};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_load_invalid_toml_gives_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "not [valid toml").unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.mirror.max_size = 2560;
        settings.mirror.turn_screen_off = true;
        settings.panel.reconcile_interval_ms = 4000;

        save_settings(dir.path(), &settings).unwrap();
        assert_eq!(load_settings(dir.path()), settings);
    }

    #[test]
    fn test_load_clamps_timing_intervals() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "[panel]\nreconcile_interval_ms = 1\npersist_debounce_ms = 0\n",
        )
        .unwrap();

        let settings = load_settings(dir.path());
        assert_eq!(settings.panel.reconcile_interval_ms, MIN_RECONCILE_INTERVAL_MS);
        assert_eq!(settings.panel.persist_debounce_ms, MIN_PERSIST_DEBOUNCE_MS);
    }

    #[test]
    fn test_save_writes_header_and_no_temp_file() {
        let dir = TempDir::new().unwrap();
        save_settings(dir.path(), &Settings::default()).unwrap();

        let raw = fs::read_to_string(dir.path().join(CONFIG_FILENAME)).unwrap();
        assert!(raw.starts_with("# Mirror Warden configuration"));
        assert!(raw.contains("[mirror]"));
        assert!(raw.contains("[panel]"));
        assert!(!dir.path().join(format!(".{CONFIG_FILENAME}.tmp")).exists());
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("config");
        save_settings(&nested, &Settings::default()).unwrap();
        assert!(nested.join(CONFIG_FILENAME).exists());
    }
}
