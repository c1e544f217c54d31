//! Update layer: messages in, state transitions and actions out
//!
//! [`update`] is the single entry point. It is a pure function over
//! [`PanelState`](crate::state::PanelState): no IO, no awaiting, no channels.
//! Side effects are described as [`UpdateAction`]s and executed by the action
//! layer, whose completions come back as new messages.
//!
//! Submodules by domain:
//! - `devices`: reconciliation, rename/remove, wireless commands
//! - `sessions`: session lifecycle and liveness polling
//! - `persistence`: flush bookkeeping and settings saves

mod devices;
mod persistence;
mod sessions;
mod update;


pub use update::update;

use mwarden_bridge::MirrorOptions;
use mwarden_core::DeviceRecord;

use crate::config::Settings;
use crate::message::Message;

/// Side effect requested by an update, executed off the engine task.
#[derive(Debug, Clone)]
pub enum UpdateAction {
    /// Load the saved device list once at startup.
    LoadSavedDevices,
    /// Fetch live and saved snapshots for one reconciliation pass.
    FetchSnapshots,
    /// Spawn a mirroring session for a device.
    StartSession {
        device_id: String,
        options: MirrorOptions,
    },
    /// Terminate a mirroring session.
    StopSession { session_id: String },
    /// Begin periodic liveness polling for a session.
    SpawnSessionPoll { session_id: String },
    /// Stop the liveness ticker for a session.
    CancelSessionPoll { session_id: String },
    /// Query the backend for one session's status.
    PollSession {
        session_id: String,
        generation: u64,
    },
    /// Open a wireless connection through the bridge.
    ConnectWireless { address: String, port: u16 },
    /// Switch a USB device to TCP/IP mode and resolve its WLAN address.
    EnableWirelessMode { device_id: String },
    /// Drop a wireless connection.
    DisconnectWireless { address: String },
    /// Delete one record from durable storage.
    DeleteDevice { device_id: String },
    /// Arm the debounce timer for the given queue generation.
    ScheduleFlush { generation: u64 },
    /// Write a drained batch of records, one by one.
    PersistBatch { records: Vec<DeviceRecord> },
    /// Persist the full settings to config.toml.
    SaveSettings { settings: Settings },
}

/// Result of processing one message: an optional follow-up message processed
/// immediately, and an optional action dispatched to the background.
#[derive(Debug, Default)]
pub struct UpdateResult {
    pub message: Option<Message>,
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self {
            message: None,
            action: None,
        }
    }

    pub fn message(message: Message) -> Self {
        Self {
            message: Some(message),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }
}
