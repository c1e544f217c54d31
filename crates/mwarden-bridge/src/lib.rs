//! # mwarden-bridge - adb and scrcpy Process Management
//!
//! Out-of-process plumbing for Mirror Warden: short-lived `adb` invocations
//! for device enumeration and wireless pairing, and long-lived `scrcpy`
//! children for mirroring sessions.
//!
//! Depends on [`mwarden_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Device Bridge (`adb`)
//! - [`DeviceBridge`] / [`LocalDeviceBridge`] - Bridge contract (enumerate, connect, disconnect, wireless mode)
//! - [`AdbBridge`] - adb-backed implementation
//!
//! ### Mirroring Backend (`scrcpy`)
//! - [`MirrorBackend`] / [`LocalMirrorBackend`] - Session contract (start, stop, status, active list)
//! - [`ScrcpyBackend`] - scrcpy-backed implementation over live child processes
//! - [`ScrcpySession`] - One scrcpy child with exit tracking
//! - [`MirrorOptions`] - Flags applied to new sessions
//!
//! ### Tooling (`tools`)
//! - [`ToolPaths`] - Resolve adb/scrcpy locations from overrides or PATH
//! - [`log_tool_versions()`] - Startup version banners

pub mod adb;
pub mod scrcpy;
pub mod tools;

// Public API re-exports
pub use adb::{AdbBridge, DeviceBridge, LocalDeviceBridge, DEFAULT_WIRELESS_PORT};
pub use scrcpy::{
    LocalMirrorBackend, MirrorBackend, MirrorOptions, ScrcpyBackend, ScrcpySession,
};
pub use tools::{log_tool_versions, ToolPaths};
