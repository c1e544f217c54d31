//! Mirror Warden
//!
//! Supervisor for Android screen mirroring: adb-backed device discovery and
//! persistence, scrcpy session management, and crash monitoring.

// Re-export the member crates under stable names
pub use mwarden_app as app;
pub use mwarden_bridge as bridge;
pub use mwarden_core as core;

// Commonly used entry points
pub use mwarden_app::{Deps, Engine, EngineEvent, Message, Settings};
pub use mwarden_bridge::{AdbBridge, MirrorOptions, ScrcpyBackend, ToolPaths};
pub use mwarden_core::{DeviceRecord, MirrorSession};
