//! # mwarden-core - Core Domain Types
//!
//! Foundation crate for Mirror Warden. Provides the device and session domain
//! types shared by the bridge and supervisor crates, plus error handling and
//! logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Devices (`device`)
//! - [`DeviceRecord`] - One Android device known to the panel, live or remembered
//! - [`DeviceStatus`] - Connectivity state (Connected, Disconnected, Unauthorized, Offline)
//! - [`ConnectionKind`] - USB vs wireless attachment
//!
//! ### Sessions (`session`)
//! - [`MirrorSession`] - An active mirroring session bound to a device
//! - [`SessionStatus`] - Backend-reported state (Running, Stopped, Error)
//! - [`CrashEvent`] - Emitted once per session that dies without a stop request
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use mwarden_core::prelude::*;
//! ```

pub mod device;
pub mod error;
pub mod logging;
pub mod session;

/// Prelude for common imports used throughout all Mirror Warden crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use device::{ConnectionKind, DeviceRecord, DeviceStatus};
pub use error::{Error, Result, ResultExt};
pub use session::{CrashEvent, MirrorSession, SessionStatus};
