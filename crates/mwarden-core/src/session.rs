//! Mirroring session types
//!
//! A [`MirrorSession`] ties a backend process to the device it mirrors. The
//! session monitor polls backend status and translates transitions into
//! lifecycle events, including [`CrashEvent`] for sessions that die without a
//! stop request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-reported state of a mirroring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Stopped,
    /// The backend answered but flagged the session as failed. Treated as
    /// stopped for lifecycle purposes.
    Error,
}

impl SessionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionStatus::Running)
    }
}

/// An active (or recently active) mirroring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorSession {
    /// Backend-assigned identifier, `session_<pid>` for process backends.
    pub session_id: String,
    /// Id of the [`crate::device::DeviceRecord`] being mirrored.
    pub device_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
}

impl MirrorSession {
    /// New session that just started running.
    pub fn started(session_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            device_id: device_id.into(),
            status: SessionStatus::Running,
            started_at: Utc::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }
}

/// Emitted exactly once per session that stopped without a stop request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashEvent {
    pub session_id: String,
    pub device_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_session_is_running() {
        let session = MirrorSession::started("session_4242", "R5CN30XXXX");
        assert!(session.is_running());
        assert_eq!(session.session_id, "session_4242");
        assert_eq!(session.device_id, "R5CN30XXXX");
    }

    #[test]
    fn test_error_status_not_running() {
        assert!(!SessionStatus::Error.is_running());
        assert!(!SessionStatus::Stopped.is_running());
        assert!(SessionStatus::Running.is_running());
    }

    #[test]
    fn test_session_serde_round_trip() {
        let session = MirrorSession::started("session_99", "192.168.1.42:5555");
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"sessionId\":\"session_99\""));
        assert!(json.contains("\"deviceId\":\"192.168.1.42:5555\""));
        assert!(json.contains("\"status\":\"running\""));

        let parsed: MirrorSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }
}
