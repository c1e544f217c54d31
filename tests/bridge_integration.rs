//! Integration tests for the adb bridge against a fake adb executable
//!
//! Each test writes a shell script standing in for `adb`, points an
//! [`AdbBridge`] at it by explicit path, and drives the bridge through its
//! public trait surface. The script keeps pairing state in a marker file, so
//! rescans reflect earlier connect/disconnect calls the way a real adb
//! server would. No device or adb install is involved.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use mwarden_bridge::{AdbBridge, DeviceBridge, DEFAULT_WIRELESS_PORT};
use mwarden_core::{ConnectionKind, DeviceStatus, Error};

/// Helper to install a fake `adb` executable answering from a canned script.
///
/// `body` is the script after the shebang line, typically a `case "$*"`
/// dispatch over the argument strings the bridge is expected to send.
fn fake_adb(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("adb");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Fake adb covering the whole pairing workflow. `connect` drops a marker
/// file next to the script and `disconnect` removes it; `devices -l` lists
/// the wireless entry only while the marker exists.
fn fake_adb_full(dir: &Path) -> PathBuf {
    fake_adb(
        dir,
        r#"state="$(dirname "$0")/wireless-connected"
case "$*" in
  "devices -l")
    echo "List of devices attached"
    echo "* daemon started successfully"
    echo "R5CN300XYZ             device usb:1-4 product:p3q model:SM_G998B device:p3q transport_id:5"
    if [ -f "$state" ]; then
      echo "192.168.1.23:5555      device product:p3q model:SM_G998B device:p3q transport_id:8"
    fi
    echo "emulator-5554          unauthorized transport_id:9"
    ;;
  "-s R5CN300XYZ tcpip 5555")
    echo "restarting in TCP mode port: 5555"
    ;;
  "-s R5CN300XYZ shell ip route")
    echo "192.168.1.0/24 dev wlan0 proto kernel scope link src 192.168.1.23"
    ;;
  "connect 192.168.1.23:5555")
    touch "$state"
    echo "connected to 192.168.1.23:5555"
    ;;
  "disconnect 192.168.1.23:5555")
    rm -f "$state"
    echo "disconnected 192.168.1.23:5555"
    ;;
  "-s ETH0ONLY tcpip 5555")
    echo "restarting in TCP mode port: 5555"
    ;;
  "-s ETH0ONLY shell ip route")
    echo "127.0.0.0/8 dev lo proto kernel scope link src 127.0.0.1"
    ;;
  *)
    echo "fake adb: unexpected invocation: $*" >&2
    exit 1
    ;;
esac"#,
    )
}

// ═══════════════════════════════════════════════════════════════
// Device Scan
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_scan_reports_usb_and_unauthorized_devices() {
    let temp = TempDir::new().unwrap();
    let bridge = AdbBridge::new(fake_adb_full(temp.path()));

    let devices = bridge.list_live_devices().await.unwrap();

    assert_eq!(devices.len(), 2);

    // USB device: model doubles as the initial name, no address.
    assert_eq!(devices[0].id, "R5CN300XYZ");
    assert_eq!(devices[0].connection_kind, ConnectionKind::Usb);
    assert_eq!(devices[0].status, DeviceStatus::Connected);
    assert_eq!(devices[0].model, "SM_G998B");
    assert_eq!(devices[0].name, "SM_G998B");
    assert!(devices[0].address.is_none());

    // Unauthorized device: no model reported, serial stands in as the name.
    assert_eq!(devices[1].id, "emulator-5554");
    assert_eq!(devices[1].status, DeviceStatus::Unauthorized);
    assert_eq!(devices[1].name, "emulator-5554");
}

#[tokio::test]
async fn test_scan_failure_is_bridge_unavailable() {
    let temp = TempDir::new().unwrap();
    let bridge = AdbBridge::new(fake_adb(
        temp.path(),
        r#"echo "adb: cannot connect to daemon" >&2
exit 1"#,
    ));

    let err = bridge.list_live_devices().await.unwrap_err();

    assert!(matches!(err, Error::BridgeUnavailable { .. }));
    assert!(err.is_recoverable());
}

// ═══════════════════════════════════════════════════════════════
// Wireless Pairing Workflow
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_wireless_pairing_flow() {
    let temp = TempDir::new().unwrap();
    let bridge = AdbBridge::new(fake_adb_full(temp.path()));

    // Before pairing the device is USB only.
    let devices = bridge.list_live_devices().await.unwrap();
    assert!(devices
        .iter()
        .all(|record| record.connection_kind != ConnectionKind::Wireless));

    // Switch to TCP mode and resolve the WLAN address.
    let address = bridge.enable_wireless_mode("R5CN300XYZ").await.unwrap();
    assert_eq!(address, "192.168.1.23");

    // Pair; the next scan carries the wireless entry alongside USB.
    bridge
        .connect_wireless(&address, DEFAULT_WIRELESS_PORT)
        .await
        .unwrap();
    let devices = bridge.list_live_devices().await.unwrap();
    let wireless = devices
        .iter()
        .find(|record| record.connection_kind == ConnectionKind::Wireless)
        .expect("paired device missing from the scan");
    assert_eq!(wireless.id, "192.168.1.23:5555");
    assert_eq!(wireless.address.as_deref(), Some("192.168.1.23"));
    assert_eq!(wireless.model, "SM_G998B");

    // Unpair; the wireless entry disappears again.
    bridge.disconnect("192.168.1.23:5555").await.unwrap();
    let devices = bridge.list_live_devices().await.unwrap();
    assert!(devices
        .iter()
        .all(|record| record.connection_kind != ConnectionKind::Wireless));
}

#[tokio::test]
async fn test_enable_wireless_mode_without_wifi_fails() {
    let temp = TempDir::new().unwrap();
    let bridge = AdbBridge::new(fake_adb_full(temp.path()));

    // tcpip succeeds but ip route only shows loopback: no usable address.
    let err = bridge.enable_wireless_mode("ETH0ONLY").await.unwrap_err();

    assert!(matches!(err, Error::Bridge { .. }));
    assert!(err.to_string().contains("WLAN"));
}

#[tokio::test]
async fn test_enable_wireless_mode_tcpip_rejection_fails() {
    let temp = TempDir::new().unwrap();
    let bridge = AdbBridge::new(fake_adb(
        temp.path(),
        r#"echo "error: device 'GONE' not found" >&2
exit 1"#,
    ));

    let err = bridge.enable_wireless_mode("GONE").await.unwrap_err();

    assert!(matches!(err, Error::Bridge { .. }));
}
