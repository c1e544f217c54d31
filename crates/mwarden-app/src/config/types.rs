//! Configuration types for config.toml
//!
//! Two tables: `[mirror]` holds the flags applied to new mirroring sessions,
//! `[panel]` holds the supervisor's timing knobs. Every field has a default so
//! partial files deserialize cleanly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use mwarden_bridge::MirrorOptions;

/// Floor for the device scan cadence.
pub const MIN_RECONCILE_INTERVAL_MS: u64 = 500;
/// Floor for the per-session liveness poll cadence.
pub const MIN_SESSION_POLL_INTERVAL_MS: u64 = 1000;
/// Floor for the persistence debounce window.
pub const MIN_PERSIST_DEBOUNCE_MS: u64 = 100;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mirror: MirrorSettings,
    #[serde(default)]
    pub panel: PanelSettings,
}

/// Defaults applied to new mirroring sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSettings {
    /// Longest display dimension in pixels. `0` removes the cap.
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    /// Video bit rate in bits per second. `0` lets the backend decide.
    #[serde(default = "default_bit_rate")]
    pub bit_rate: u32,
    /// Frame rate ceiling. `0` removes it.
    #[serde(default = "default_max_fps")]
    pub max_fps: u32,
    #[serde(default)]
    pub always_on_top: bool,
    #[serde(default = "default_stay_awake")]
    pub stay_awake: bool,
    #[serde(default)]
    pub turn_screen_off: bool,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            bit_rate: default_bit_rate(),
            max_fps: default_max_fps(),
            always_on_top: false,
            stay_awake: default_stay_awake(),
            turn_screen_off: false,
        }
    }
}

impl MirrorSettings {
    /// Translate into backend options. Zeroed numeric fields become `None`
    /// ("let the backend decide").
    pub fn to_options(&self) -> MirrorOptions {
        MirrorOptions {
            max_size: nonzero(self.max_size),
            bit_rate: nonzero(self.bit_rate),
            max_fps: nonzero(self.max_fps),
            always_on_top: self.always_on_top,
            stay_awake: self.stay_awake,
            turn_screen_off: self.turn_screen_off,
        }
    }
}

fn nonzero(value: u32) -> Option<u32> {
    (value != 0).then_some(value)
}

/// Timing knobs for the supervisor loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Cadence of full device reconciliation passes.
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
    /// Cadence of per-session liveness polls.
    #[serde(default = "default_session_poll_interval_ms")]
    pub session_poll_interval_ms: u64,
    /// Quiet window before queued record changes are written out.
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            reconcile_interval_ms: default_reconcile_interval_ms(),
            session_poll_interval_ms: default_session_poll_interval_ms(),
            persist_debounce_ms: default_persist_debounce_ms(),
        }
    }
}

impl PanelSettings {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn session_poll_interval(&self) -> Duration {
        Duration::from_millis(self.session_poll_interval_ms)
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    /// Raise any interval below its floor. A zero interval would spin the
    /// event loop.
    pub fn clamp_to_minimums(&mut self) {
        if self.reconcile_interval_ms < MIN_RECONCILE_INTERVAL_MS {
            warn!(
                "reconcile_interval_ms {} below minimum, using {}",
                self.reconcile_interval_ms, MIN_RECONCILE_INTERVAL_MS
            );
            self.reconcile_interval_ms = MIN_RECONCILE_INTERVAL_MS;
        }
        if self.session_poll_interval_ms < MIN_SESSION_POLL_INTERVAL_MS {
            warn!(
                "session_poll_interval_ms {} below minimum, using {}",
                self.session_poll_interval_ms, MIN_SESSION_POLL_INTERVAL_MS
            );
            self.session_poll_interval_ms = MIN_SESSION_POLL_INTERVAL_MS;
        }
        if self.persist_debounce_ms < MIN_PERSIST_DEBOUNCE_MS {
            warn!(
                "persist_debounce_ms {} below minimum, using {}",
                self.persist_debounce_ms, MIN_PERSIST_DEBOUNCE_MS
            );
            self.persist_debounce_ms = MIN_PERSIST_DEBOUNCE_MS;
        }
    }
}

fn default_max_size() -> u32 {
    1920
}

fn default_bit_rate() -> u32 {
    8_000_000
}

fn default_max_fps() -> u32 {
    60
}

fn default_stay_awake() -> bool {
    true
}

fn default_reconcile_interval_ms() -> u64 {
    2000
}

fn default_session_poll_interval_ms() -> u64 {
    3000
}

fn default_persist_debounce_ms() -> u64 {
    500
}
