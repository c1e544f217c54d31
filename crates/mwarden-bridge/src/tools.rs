//! External tool resolution and startup diagnostics
//!
//! The panel drives two executables it does not ship: `adb` and `scrcpy`.
//! Paths can be given explicitly (CLI flags) or discovered on PATH.

use std::path::PathBuf;

use mwarden_core::prelude::*;

use crate::adb::AdbBridge;
use crate::scrcpy::ScrcpyBackend;

/// Resolved locations of the external tools.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub adb: PathBuf,
    pub scrcpy: PathBuf,
}

impl ToolPaths {
    /// Resolve tool locations: explicit overrides win, otherwise PATH lookup.
    pub fn resolve(adb: Option<PathBuf>, scrcpy: Option<PathBuf>) -> Result<Self> {
        let adb = match adb {
            Some(path) => path,
            None => which::which("adb").map_err(|_| Error::AdbNotFound)?,
        };
        let scrcpy = match scrcpy {
            Some(path) => path,
            None => which::which("scrcpy").map_err(|_| Error::ScrcpyNotFound)?,
        };

        debug!("adb resolved to {}", adb.display());
        debug!("scrcpy resolved to {}", scrcpy.display());

        Ok(Self { adb, scrcpy })
    }
}

/// Log tool version banners at startup.
///
/// A probe failure is worth a warning but not fatal: adb may recover once its
/// server starts, and scrcpy is only needed when a session launches.
pub async fn log_tool_versions(bridge: &AdbBridge, backend: &ScrcpyBackend) {
    match bridge.version().await {
        Ok(version) => info!("{}", version),
        Err(e) => warn!("adb version probe failed: {}", e),
    }
    match backend.version().await {
        Ok(version) => info!("{}", version),
        Err(e) => warn!("scrcpy version probe failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_win() {
        let paths = ToolPaths::resolve(
            Some(PathBuf::from("/opt/android/adb")),
            Some(PathBuf::from("/opt/scrcpy/scrcpy")),
        )
        .unwrap();

        assert_eq!(paths.adb, PathBuf::from("/opt/android/adb"));
        assert_eq!(paths.scrcpy, PathBuf::from("/opt/scrcpy/scrcpy"));
    }

    #[tokio::test]
    async fn test_version_probe_failure_is_logged_not_fatal() {
        let bridge = AdbBridge::new("/nonexistent/adb");
        let backend = ScrcpyBackend::new("/nonexistent/scrcpy");
        // Must not panic or error.
        log_tool_versions(&bridge, &backend).await;
    }
}
