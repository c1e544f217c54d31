//! Top-level message dispatch

use crate::message::Message;
use crate::state::PanelState;

use super::{devices, persistence, sessions, UpdateResult};

/// Process one message against the state.
pub fn update(state: &mut PanelState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.request_quit();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Reconciliation
        // ─────────────────────────────────────────────────────────
        Message::ReconcileTick => devices::handle_reconcile_tick(state),
        Message::SnapshotsArrived { live, saved } => {
            devices::handle_snapshots_arrived(state, live, saved)
        }
        Message::SnapshotsFailed { error } => devices::handle_snapshots_failed(state, error),
        Message::SavedDevicesLoaded { devices } => {
            devices::handle_saved_devices_loaded(state, devices)
        }
        Message::SavedDevicesLoadFailed { error } => {
            devices::handle_saved_devices_load_failed(state, error)
        }

        // ─────────────────────────────────────────────────────────
        // Device commands
        // ─────────────────────────────────────────────────────────
        Message::RenameDevice {
            device_id,
            new_name,
        } => devices::handle_rename_device(state, device_id, new_name),
        Message::RemoveDevice { device_id } => devices::handle_remove_device(state, device_id),
        Message::DeviceRemoved { device_id } => devices::handle_device_removed(state, device_id),
        Message::DeviceRemoveFailed { device_id, error } => {
            devices::handle_device_remove_failed(state, device_id, error)
        }

        // ─────────────────────────────────────────────────────────
        // Wireless
        // ─────────────────────────────────────────────────────────
        Message::ConnectWireless { address, port } => {
            devices::handle_connect_wireless(state, address, port)
        }
        Message::WirelessConnected { address } => {
            devices::handle_wireless_connected(state, address)
        }
        Message::WirelessConnectFailed { address, error } => {
            devices::handle_wireless_connect_failed(state, address, error)
        }
        Message::EnableWirelessMode { device_id } => {
            devices::handle_enable_wireless_mode(state, device_id)
        }
        Message::WirelessModeEnabled { device_id, address } => {
            devices::handle_wireless_mode_enabled(state, device_id, address)
        }
        Message::WirelessModeFailed { device_id, error } => {
            devices::handle_wireless_mode_failed(state, device_id, error)
        }
        Message::DisconnectWireless { address } => {
            devices::handle_disconnect_wireless(state, address)
        }
        Message::WirelessDisconnected { address } => {
            devices::handle_wireless_disconnected(state, address)
        }
        Message::WirelessDisconnectFailed { address, error } => {
            devices::handle_wireless_disconnect_failed(state, address, error)
        }

        // ─────────────────────────────────────────────────────────
        // Sessions
        // ─────────────────────────────────────────────────────────
        Message::StartMirroring { device_id } => {
            sessions::handle_start_mirroring(state, device_id)
        }
        Message::SessionStarted {
            device_id,
            session_id,
        } => sessions::handle_session_started(state, device_id, session_id),
        Message::SessionStartFailed { device_id, error } => {
            sessions::handle_session_start_failed(state, device_id, error)
        }
        Message::StopMirroring { session_id } => {
            sessions::handle_stop_mirroring(state, session_id)
        }
        Message::SessionStopped { session_id } => {
            sessions::handle_session_stopped(state, session_id)
        }
        Message::SessionStopFailed { session_id, error } => {
            sessions::handle_session_stop_failed(state, session_id, error)
        }
        Message::SessionPollTick { session_id } => {
            sessions::handle_session_poll_tick(state, session_id)
        }
        Message::SessionPollResult {
            session_id,
            generation,
            status,
        } => sessions::handle_session_poll_result(state, session_id, generation, status),

        // ─────────────────────────────────────────────────────────
        // Persistence and settings
        // ─────────────────────────────────────────────────────────
        Message::FlushDue { generation } => persistence::handle_flush_due(state, generation),
        Message::FlushCompleted { failures } => {
            persistence::handle_flush_completed(state, failures)
        }
        Message::UpdateMirrorSettings { mirror } => {
            persistence::handle_update_mirror_settings(state, mirror)
        }
        Message::SettingsSaved => persistence::handle_settings_saved(state),
        Message::SettingsSaveFailed { error } => {
            persistence::handle_settings_save_failed(state, error)
        }
    }
}
