//! Panel configuration (config.toml)

mod settings;
mod types;

pub use settings::{default_config_dir, load_settings, save_settings};
pub use types::{
    MirrorSettings, PanelSettings, Settings, MIN_PERSIST_DEBOUNCE_MS,
    MIN_RECONCILE_INTERVAL_MS, MIN_SESSION_POLL_INTERVAL_MS,
};
