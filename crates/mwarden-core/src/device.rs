//! Device records: the canonical unit of the panel's device list
//!
//! A [`DeviceRecord`] describes one Android device, whether it is currently
//! attached (live) or only remembered from an earlier run (saved). Records are
//! keyed by [`DeviceRecord::id`]: the USB serial, or `ip:port` for wireless
//! connections.

use serde::{Deserialize, Serialize};

/// How a device is attached to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Usb,
    Wireless,
}

/// Connectivity state of a device as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Attached and authorized; mirroring can start.
    Connected,
    /// Reported by the bridge but not usable (e.g. `offline` transport state).
    Disconnected,
    /// Attached but the device has not authorized this host.
    Unauthorized,
    /// Synthetic state: saved device absent from the latest live scan.
    Offline,
}

impl DeviceStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, DeviceStatus::Connected)
    }
}

/// One device known to the panel, live or remembered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Stable identity: USB serial, or `ip:port` for wireless. Unique key.
    pub id: String,
    /// User-visible label. A user rename survives reconciliation merges.
    pub name: String,
    /// Hardware model string, informational. Updated from live data.
    #[serde(default)]
    pub model: String,
    pub connection_kind: ConnectionKind,
    pub status: DeviceStatus,
    /// Network address, present only for wireless records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl DeviceRecord {
    /// Record for a USB-attached device.
    pub fn usb(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: String::new(),
            connection_kind: ConnectionKind::Usb,
            status: DeviceStatus::Connected,
            address: None,
        }
    }

    /// Record for a wireless device reachable at `address` (the id carries the port).
    pub fn wireless(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: String::new(),
            connection_kind: ConnectionKind::Wireless,
            status: DeviceStatus::Connected,
            address: Some(address.into()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn is_wireless(&self) -> bool {
        self.connection_kind == ConnectionKind::Wireless
    }

    /// Copy of this record demoted to [`DeviceStatus::Offline`].
    ///
    /// Reconciliation seeds saved devices this way: presumed absent until a
    /// live scan proves otherwise.
    pub fn as_offline(&self) -> Self {
        let mut record = self.clone();
        record.status = DeviceStatus::Offline;
        record
    }
}
