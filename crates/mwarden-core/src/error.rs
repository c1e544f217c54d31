//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Device Bridge Errors
    // ─────────────────────────────────────────────────────────────
    #[error("adb executable not found. Ensure 'adb' is in your PATH.")]
    AdbNotFound,

    #[error("Device bridge unavailable: {message}")]
    BridgeUnavailable { message: String },

    #[error("Device bridge error: {message}")]
    Bridge { message: String },

    // ─────────────────────────────────────────────────────────────
    // Mirroring Backend Errors
    // ─────────────────────────────────────────────────────────────
    #[error("scrcpy executable not found. Ensure 'scrcpy' is in your PATH.")]
    ScrcpyNotFound,

    #[error("Session backend error: {message}")]
    SessionBackend { message: String },

    #[error("No session with id: {session_id}")]
    UnknownSession { session_id: String },

    #[error("Failed to spawn mirror process: {reason}")]
    ProcessSpawn { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Storage error: {message}")]
    Storage { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn bridge_unavailable(message: impl Into<String>) -> Self {
        Self::BridgeUnavailable {
            message: message.into(),
        }
    }

    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge {
            message: message.into(),
        }
    }

    pub fn session_backend(message: impl Into<String>) -> Self {
        Self::SessionBackend {
            message: message.into(),
        }
    }

    pub fn unknown_session(session_id: impl Into<String>) -> Self {
        Self::UnknownSession {
            session_id: session_id.into(),
        }
    }

    pub fn process_spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors are surfaced and retried on the next poll cycle;
    /// they never tear down the panel.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::BridgeUnavailable { .. }
                | Error::Bridge { .. }
                | Error::SessionBackend { .. }
                | Error::UnknownSession { .. }
                | Error::ProcessSpawn { .. }
                | Error::Storage { .. }
                | Error::ChannelSend { .. }
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AdbNotFound | Error::ScrcpyNotFound)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions (for use with color-eyre)
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
