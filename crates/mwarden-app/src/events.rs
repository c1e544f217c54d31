//! Events emitted by the engine
//!
//! [`EngineEvent`] is the outward-facing stream: every state change a UI or
//! log follower cares about, serializable as tagged JSON. Events are emitted
//! on a broadcast channel; crashes additionally flow through the dedicated
//! crash channel handed out at engine construction.

use serde::Serialize;

use mwarden_core::{DeviceRecord, MirrorSession};

/// One externally visible state change.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────
    /// The canonical device list changed. Carries the full new list.
    DevicesChanged { devices: Vec<DeviceRecord> },

    /// The set of tracked mirroring sessions changed.
    SessionsChanged { sessions: Vec<MirrorSession> },

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────
    /// A session died without a stop request. At most one per session.
    SessionCrashed {
        session_id: String,
        device_id: String,
    },

    /// A device switched to TCP/IP mode and reported its WLAN address.
    WirelessModeEnabled {
        device_id: String,
        address: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Failures
    // ─────────────────────────────────────────────────────────────
    /// A user-initiated command failed. `context` names the command.
    CommandFailed { context: String, error: String },

    /// A debounced write failed for one record. The change stays in memory.
    PersistFailed { device_id: String, error: String },

    // ─────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────
    /// The engine is shutting down; no further events will follow.
    Shutdown,
}

impl EngineEvent {
    /// Stable label for logging and metrics.
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::DevicesChanged { .. } => "devices_changed",
            EngineEvent::SessionsChanged { .. } => "sessions_changed",
            EngineEvent::SessionCrashed { .. } => "session_crashed",
            EngineEvent::WirelessModeEnabled { .. } => "wireless_mode_enabled",
            EngineEvent::CommandFailed { .. } => "command_failed",
            EngineEvent::PersistFailed { .. } => "persist_failed",
            EngineEvent::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_labels() {
        let event = EngineEvent::DevicesChanged { devices: vec![] };
        assert_eq!(event.event_type(), "devices_changed");
        assert_eq!(EngineEvent::Shutdown.event_type(), "shutdown");
    }

    #[test]
    fn test_events_serialize_tagged_camel_case() {
        let event = EngineEvent::SessionCrashed {
            session_id: "session_42".to_string(),
            device_id: "A".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"sessionCrashed\""));
        assert!(json.contains("\"sessionId\":\"session_42\""));
        assert!(json.contains("\"deviceId\":\"A\""));

        let json = serde_json::to_string(&EngineEvent::Shutdown).unwrap();
        assert_eq!(json, "{\"event\":\"shutdown\"}");
    }

    #[test]
    fn test_devices_changed_carries_records() {
        let event = EngineEvent::DevicesChanged {
            devices: vec![DeviceRecord::usb("A", "Pixel")],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"devices\":["));
        assert!(json.contains("\"connectionKind\":\"usb\""));
    }
}
