//! Device enumeration and wireless pairing via adb
//!
//! Every operation is a short-lived `adb` invocation with a bounded timeout.
//! adb's exit codes are unreliable for some subcommands (`connect` exits 0 on
//! failure), so success is judged from stdout where it has to be.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use mwarden_core::prelude::*;
use mwarden_core::{ConnectionKind, DeviceRecord, DeviceStatus};

/// Default timeout for adb invocations. Shell round-trips to a sluggish
/// device can take a few seconds; anything past this is a hung server.
const ADB_TIMEOUT: Duration = Duration::from_secs(10);

/// Port adb listens on after `adb tcpip`.
pub const DEFAULT_WIRELESS_PORT: u16 = 5555;

/// Device bridge operations used by reconciliation and the command layer.
///
/// Implemented by [`AdbBridge`] for real hardware and by in-memory fakes in
/// tests.
#[trait_variant::make(DeviceBridge: Send)]
pub trait LocalDeviceBridge {
    /// Enumerate devices currently visible to the bridge.
    async fn list_live_devices(&self) -> Result<Vec<DeviceRecord>>;

    /// Establish a wireless connection to `address:port`.
    async fn connect_wireless(&self, address: &str, port: u16) -> Result<()>;

    /// Drop the wireless connection identified by `address` (`ip` or `ip:port`).
    async fn disconnect(&self, address: &str) -> Result<()>;

    /// Switch a USB device to TCP/IP mode and resolve its WLAN address.
    ///
    /// Returns the bare address; callers complete pairing via
    /// [`LocalDeviceBridge::connect_wireless`].
    async fn enable_wireless_mode(&self, device_id: &str) -> Result<String>;
}

/// adb wrapper holding the resolved executable path.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    adb_path: PathBuf,
}

impl AdbBridge {
    /// Wrap an explicit adb executable path.
    pub fn new(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    /// Locate adb on PATH.
    pub fn discover() -> Result<Self> {
        let adb_path = which::which("adb").map_err(|_| Error::AdbNotFound)?;
        Ok(Self::new(adb_path))
    }

    pub fn path(&self) -> &Path {
        &self.adb_path
    }

    /// Run adb with the given arguments and capture its output.
    async fn run(&self, args: &[&str]) -> Result<AdbOutput> {
        debug!("adb {}", args.join(" "));

        let result = Command::new(&self.adb_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = timeout(ADB_TIMEOUT, result)
            .await
            .map_err(|_| {
                Error::bridge_unavailable(format!(
                    "adb {} timed out after {:?}",
                    args.join(" "),
                    ADB_TIMEOUT
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::AdbNotFound
                } else {
                    Error::bridge_unavailable(format!("failed to run adb: {}", e))
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        trace!("adb stdout: {}", stdout);
        if !stderr.is_empty() {
            trace!("adb stderr: {}", stderr);
        }

        Ok(AdbOutput {
            stdout,
            stderr,
            success: output.status.success(),
        })
    }

    /// adb version banner (first line), for startup diagnostics.
    pub async fn version(&self) -> Result<String> {
        let out = self.run(&["version"]).await?;
        if !out.success {
            return Err(Error::bridge_unavailable(format!(
                "adb version failed: {}",
                out.stderr.trim()
            )));
        }
        Ok(out.stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// List attached devices via `adb devices -l`.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        let out = self.run(&["devices", "-l"]).await?;
        if !out.success {
            // A dead server is transient: the next invocation restarts it.
            return Err(Error::bridge_unavailable(format!(
                "adb devices failed: {}",
                out.stderr.trim()
            )));
        }
        Ok(parse_device_list(&out.stdout))
    }

    /// Switch a device to TCP/IP listening mode.
    pub async fn tcpip(&self, serial: &str, port: u16) -> Result<()> {
        let port_str = port.to_string();
        let out = self.run(&["-s", serial, "tcpip", &port_str]).await?;
        let reply = out.stdout.trim();
        if out.success && reply.contains("restarting") {
            info!("adb tcpip {} on {}: {}", port, serial, reply);
            Ok(())
        } else {
            Err(Error::bridge(format!(
                "adb tcpip {} failed for {}: {}",
                port,
                serial,
                pick_message(reply, &out.stderr)
            )))
        }
    }

    /// WLAN address of a device, from `adb shell ip route`.
    ///
    /// `Ok(None)` means the device answered but no usable address was found
    /// (typically WiFi is off).
    pub async fn device_ip(&self, serial: &str) -> Result<Option<String>> {
        let out = self.run(&["-s", serial, "shell", "ip", "route"]).await?;
        if !out.success {
            return Err(Error::bridge(format!(
                "adb shell ip route failed for {}: {}",
                serial,
                out.stderr.trim()
            )));
        }
        Ok(parse_ip_route(&out.stdout))
    }

    /// Hardware model via `getprop ro.product.model`.
    pub async fn model(&self, serial: &str) -> Result<String> {
        let out = self
            .run(&["-s", serial, "shell", "getprop", "ro.product.model"])
            .await?;
        if !out.success {
            return Err(Error::bridge(format!(
                "adb getprop failed for {}: {}",
                serial,
                out.stderr.trim()
            )));
        }
        Ok(out.stdout.trim().to_string())
    }
}

impl DeviceBridge for AdbBridge {
    async fn list_live_devices(&self) -> Result<Vec<DeviceRecord>> {
        self.list_devices().await
    }

    async fn connect_wireless(&self, address: &str, port: u16) -> Result<()> {
        let target = format!("{}:{}", address, port);
        let out = self.run(&["connect", &target]).await?;

        // adb connect exits 0 even when the connection fails; the verdict is
        // in stdout ("connected to ..." / "already connected to ..." vs
        // "failed to connect ..." / "unable to connect ...").
        let reply = out.stdout.trim();
        if out.success && reply.contains("connected") {
            info!("adb connect {}: {}", target, reply);
            Ok(())
        } else {
            Err(Error::bridge(format!(
                "adb connect {} failed: {}",
                target,
                pick_message(reply, &out.stderr)
            )))
        }
    }

    async fn disconnect(&self, address: &str) -> Result<()> {
        let out = self.run(&["disconnect", address]).await?;
        if out.success {
            info!("adb disconnect {}", address);
            return Ok(());
        }

        // Disconnecting an already-gone device is not a failure.
        let combined = format!("{} {}", out.stdout, out.stderr);
        if combined.contains("no such device") {
            debug!("adb disconnect {}: already disconnected", address);
            Ok(())
        } else {
            Err(Error::bridge(format!(
                "adb disconnect {} failed: {}",
                address,
                pick_message(out.stdout.trim(), &out.stderr)
            )))
        }
    }

    async fn enable_wireless_mode(&self, device_id: &str) -> Result<String> {
        self.tcpip(device_id, DEFAULT_WIRELESS_PORT).await?;
        match self.device_ip(device_id).await? {
            Some(address) => {
                info!("device {} reachable at {}", device_id, address);
                Ok(address)
            }
            None => Err(Error::bridge(format!(
                "could not determine the WLAN address of {}; make sure it is connected to WiFi",
                device_id
            ))),
        }
    }
}

struct AdbOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

/// Prefer stdout for error messages, fall back to stderr.
fn pick_message(stdout: &str, stderr: &str) -> String {
    if stdout.is_empty() {
        stderr.trim().to_string()
    } else {
        stdout.to_string()
    }
}

/// Parse the output of `adb devices -l` into device records.
///
/// Each data line is `<serial> <state> [key:value ...]`. The banner line and
/// `* daemon ...` noise are skipped. Serials of the form `ip:port` are
/// wireless connections.
pub(crate) fn parse_device_list(output: &str) -> Vec<DeviceRecord> {
    output.lines().filter_map(parse_device_line).collect()
}

fn parse_device_line(line: &str) -> Option<DeviceRecord> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('*') || line.starts_with("List of devices") {
        return None;
    }

    let mut parts = line.split_whitespace();
    let serial = parts.next()?;
    let state = parts.next()?;

    let status = match state {
        "device" => DeviceStatus::Connected,
        "unauthorized" => DeviceStatus::Unauthorized,
        // "offline" and anything exotic (recovery, sideload, ...)
        _ => DeviceStatus::Disconnected,
    };

    let mut model = None;
    for part in parts {
        if let Some((key, value)) = part.split_once(':') {
            if key == "model" {
                model = Some(value.to_string());
            }
        }
    }

    // ip:port serials come from `adb connect`; everything else is USB.
    let (connection_kind, address) = if serial.contains(':') {
        let ip = serial.split(':').next().unwrap_or(serial);
        (ConnectionKind::Wireless, Some(ip.to_string()))
    } else {
        (ConnectionKind::Usb, None)
    };

    let name = model.clone().unwrap_or_else(|| serial.to_string());

    Some(DeviceRecord {
        id: serial.to_string(),
        name,
        model: model.unwrap_or_default(),
        connection_kind,
        status,
        address,
    })
}

/// Find the device's own address in `ip route` output.
///
/// Lines look like `192.168.1.0/24 dev wlan0 proto kernel scope link src
/// 192.168.1.100`. WiFi interfaces are preferred (wlan0/wlan1/wifi0 depending
/// on vendor); failing that, any `src` address that is not loopback or
/// link-local.
pub(crate) fn parse_ip_route(output: &str) -> Option<String> {
    for line in output.lines() {
        let lower = line.to_lowercase();
        if lower.contains("wlan") || lower.contains("wifi") {
            if let Some(ip) = extract_src_ip(line) {
                return Some(ip.to_string());
            }
        }
    }

    for line in output.lines() {
        if let Some(ip) = extract_src_ip(line) {
            if !ip.starts_with("127.") && !ip.starts_with("169.254.") {
                return Some(ip.to_string());
            }
        }
    }

    None
}

fn extract_src_ip(line: &str) -> Option<&str> {
    let rest = &line[line.find("src ")? + 4..];
    match rest.find(' ') {
        Some(end) => Some(rest[..end].trim()),
        None => Some(rest.trim()),
    }
}
