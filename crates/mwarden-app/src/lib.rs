//! # mwarden-app - Engine, Reconciliation, and Sessions
//!
//! The supervisor layer of Mirror Warden: a single-threaded update loop over
//! [`PanelState`], fed by one message channel, with all IO pushed into
//! background tasks that report back as messages.
//!
//! Depends on [`mwarden_core`] for domain types and [`mwarden_bridge`] for
//! the adb and scrcpy contracts.
//!
//! ## Architecture
//!
//! ```text
//!   Message ──> handler::update ──> (state mutation, UpdateResult)
//!                                      │
//!                  ┌───────────────────┴──────────────┐
//!                  ▼                                  ▼
//!          follow-up Message                   UpdateAction
//!          (processed inline)            (spawned, replies with
//!                                           a new Message)
//! ```
//!
//! ## Public API
//!
//! ### Engine (`engine`)
//! - [`Engine`] - Owns the loop, timers, event broadcast, and teardown
//!
//! ### Update layer (`handler`, `message`, `state`, `events`)
//! - [`Message`] - Everything the loop reacts to
//! - [`UpdateAction`] / [`UpdateResult`] - Side effects requested by handlers
//! - [`PanelState`] - Store, monitor, queue, settings, and transient flags
//! - [`EngineEvent`] - Outward-facing event stream
//!
//! ### Domain pieces (`store`, `reconciler`, `monitor`, `persist`)
//! - [`DeviceStore`] - Canonical in-memory device list
//! - [`reconcile`] - Live/saved snapshot merge
//! - [`SessionMonitor`] - Liveness tracking and crash detection
//! - [`DeviceStorage`] / [`FileDeviceStorage`] - Durable record storage
//! - [`PersistQueue`] - Debounced write-back queue
//!
//! ### Configuration (`config`)
//! - [`Settings`] - `[mirror]` session defaults and `[panel]` timing knobs

pub mod actions;
pub mod config;
pub mod engine;
pub mod events;
pub mod handler;
pub mod message;
pub mod monitor;
pub mod persist;
pub mod process;
pub mod reconciler;
pub mod state;
pub mod store;

// Public API re-exports
pub use actions::{Deps, PollTaskMap};
pub use config::{MirrorSettings, PanelSettings, Settings};
pub use engine::Engine;
pub use events::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use monitor::{PollOutcome, SessionMonitor};
pub use persist::{DeviceStorage, FileDeviceStorage, LocalDeviceStorage, PersistQueue};
pub use reconciler::{reconcile, ReconcileOutcome};
pub use state::PanelState;
pub use store::DeviceStore;
