//! Messages driving the engine's update loop
//!
//! Everything that happens to the panel arrives here: timer ticks, command
//! requests, and the completions of background work dispatched through
//! actions. Update handlers consume these synchronously, one at a time.

use mwarden_core::{DeviceRecord, SessionStatus};

use crate::config::MirrorSettings;

/// All messages processed by the update loop.
#[derive(Debug, Clone)]
pub enum Message {
    /// Stop the engine after the current message drains.
    Quit,

    // ─────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────
    /// Periodic trigger for a device reconciliation pass.
    ReconcileTick,

    /// Live and saved snapshots for one pass arrived together.
    SnapshotsArrived {
        live: Vec<DeviceRecord>,
        saved: Vec<DeviceRecord>,
    },

    /// Snapshot fetch failed; the pass is abandoned and retried next tick.
    SnapshotsFailed { error: String },

    /// Startup seed: the saved device list, shown offline until scanned.
    SavedDevicesLoaded { devices: Vec<DeviceRecord> },

    /// Startup seed failed to load.
    SavedDevicesLoadFailed { error: String },

    // ─────────────────────────────────────────────────────────────
    // Device commands
    // ─────────────────────────────────────────────────────────────
    /// Rename a device. Applied optimistically, then persisted.
    RenameDevice {
        device_id: String,
        new_name: String,
    },

    /// Forget a device: drop it from the list and from storage.
    RemoveDevice { device_id: String },

    /// Storage confirmed a device deletion.
    DeviceRemoved { device_id: String },

    /// Storage failed to delete a device.
    DeviceRemoveFailed { device_id: String, error: String },

    // ─────────────────────────────────────────────────────────────
    // Wireless
    // ─────────────────────────────────────────────────────────────
    /// Connect to a device over TCP/IP. `None` port means the default.
    ConnectWireless {
        address: String,
        port: Option<u16>,
    },

    /// The bridge accepted the wireless connection.
    WirelessConnected { address: String },

    /// The bridge rejected or could not reach the address.
    WirelessConnectFailed { address: String, error: String },

    /// Switch a USB device to TCP/IP mode and resolve its WLAN address.
    EnableWirelessMode { device_id: String },

    /// TCP/IP mode is up; `address` is ready to connect to.
    WirelessModeEnabled {
        device_id: String,
        address: String,
    },

    /// The wireless-mode switch failed.
    WirelessModeFailed { device_id: String, error: String },

    /// Drop a wireless connection.
    DisconnectWireless { address: String },

    /// The bridge dropped the connection.
    WirelessDisconnected { address: String },

    /// The disconnect failed.
    WirelessDisconnectFailed { address: String, error: String },

    // ─────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────
    /// Start mirroring a device using the current mirror settings.
    StartMirroring { device_id: String },

    /// The backend spawned a session.
    SessionStarted {
        device_id: String,
        session_id: String,
    },

    /// The backend could not start a session.
    SessionStartFailed { device_id: String, error: String },

    /// Stop a running session.
    StopMirroring { session_id: String },

    /// The backend confirmed the stop.
    SessionStopped { session_id: String },

    /// The stop command failed; the session stays tracked.
    SessionStopFailed { session_id: String, error: String },

    /// Periodic trigger to poll one session's liveness.
    SessionPollTick { session_id: String },

    /// A liveness poll completed. `generation` pairs it with its dispatch;
    /// stale results are discarded.
    SessionPollResult {
        session_id: String,
        generation: u64,
        status: Result<SessionStatus, String>,
    },

    // ─────────────────────────────────────────────────────────────
    // Persistence and settings
    // ─────────────────────────────────────────────────────────────
    /// A debounce timer expired for the given queue generation.
    FlushDue { generation: u64 },

    /// A flush batch finished. `failures` lists `(device_id, error)` pairs.
    FlushCompleted { failures: Vec<(String, String)> },

    /// Replace the mirror settings and persist the change.
    UpdateMirrorSettings { mirror: MirrorSettings },

    /// Settings hit disk.
    SettingsSaved,

    /// Settings could not be written; the in-memory values stay active.
    SettingsSaveFailed { error: String },
}
