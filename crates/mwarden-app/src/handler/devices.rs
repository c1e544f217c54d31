//! Reconciliation and device command handlers

use tracing::{debug, info, warn};

use mwarden_bridge::DEFAULT_WIRELESS_PORT;
use mwarden_core::DeviceRecord;

use crate::events::EngineEvent;
use crate::message::Message;
use crate::reconciler::reconcile;
use crate::state::PanelState;

use super::{UpdateAction, UpdateResult};

// ─────────────────────────────────────────────────────────────────
// Reconciliation
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_reconcile_tick(state: &mut PanelState) -> UpdateResult {
    if state.reconcile_inflight {
        debug!("Reconcile tick skipped, previous pass still in flight");
        return UpdateResult::none();
    }
    state.reconcile_inflight = true;
    UpdateResult::action(UpdateAction::FetchSnapshots)
}

pub(super) fn handle_snapshots_arrived(
    state: &mut PanelState,
    live: Vec<DeviceRecord>,
    saved: Vec<DeviceRecord>,
) -> UpdateResult {
    state.reconcile_inflight = false;

    let saved = merge_basis(state, saved);
    let outcome = reconcile(&live, &saved);

    // A tombstoned id showing up in the scan again is a fresh adoption.
    for record in &outcome.to_persist {
        state.removed_pending.remove(&record.id);
    }

    if state.store.records() != outcome.records.as_slice() {
        state.store.replace_all(outcome.records);
        state.push_event(EngineEvent::DevicesChanged {
            devices: state.store.snapshot(),
        });
    }

    let mut generation = None;
    for record in outcome.to_persist {
        debug!("Queueing durable update for device {}", record.id);
        generation = Some(state.queue.enqueue(record));
    }
    match generation {
        Some(generation) => UpdateResult::action(UpdateAction::ScheduleFlush { generation }),
        None => UpdateResult::none(),
    }
}

pub(super) fn handle_snapshots_failed(state: &mut PanelState, error: String) -> UpdateResult {
    state.reconcile_inflight = false;
    // Keep the last good list; the next tick retries.
    warn!("Reconciliation pass failed: {error}");
    UpdateResult::none()
}

pub(super) fn handle_saved_devices_loaded(
    state: &mut PanelState,
    devices: Vec<DeviceRecord>,
) -> UpdateResult {
    let mut inserted = false;
    for record in devices {
        if state.store.contains(&record.id) || state.removed_pending.contains(&record.id) {
            continue;
        }
        state.store.upsert(record.as_offline());
        inserted = true;
    }
    if inserted {
        info!("Seeded {} saved device(s)", state.store.len());
        state.push_event(EngineEvent::DevicesChanged {
            devices: state.store.snapshot(),
        });
    }
    UpdateResult::none()
}

pub(super) fn handle_saved_devices_load_failed(
    state: &mut PanelState,
    error: String,
) -> UpdateResult {
    warn!("Failed to load saved devices: {error}");
    state.push_event(EngineEvent::CommandFailed {
        context: "load saved devices".to_string(),
        error,
    });
    UpdateResult::none()
}

/// Saved snapshot adjusted for state that moved after the fetch was
/// dispatched: pending removals are filtered out, and names come from the
/// store's current records so a rename issued mid-pass is not clobbered by
/// stale data.
fn merge_basis(state: &mut PanelState, mut saved: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    state
        .removed_pending
        .retain(|id| saved.iter().any(|record| &record.id == id));
    saved.retain(|record| !state.removed_pending.contains(&record.id));
    for record in &mut saved {
        if let Some(current) = state.store.get(&record.id) {
            record.name = current.name.clone();
        }
    }
    saved
}

// ─────────────────────────────────────────────────────────────────
// Rename and remove
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_rename_device(
    state: &mut PanelState,
    device_id: String,
    new_name: String,
) -> UpdateResult {
    match state.store.rename(&device_id, &new_name) {
        Some(updated) => {
            info!("Renamed device {device_id} to {new_name:?}");
            state.push_event(EngineEvent::DevicesChanged {
                devices: state.store.snapshot(),
            });
            let generation = state.queue.enqueue(updated);
            UpdateResult::action(UpdateAction::ScheduleFlush { generation })
        }
        None => {
            warn!("Rename requested for unknown device {device_id}");
            state.push_event(EngineEvent::CommandFailed {
                context: format!("rename device {device_id}"),
                error: "unknown device".to_string(),
            });
            UpdateResult::none()
        }
    }
}

pub(super) fn handle_remove_device(state: &mut PanelState, device_id: String) -> UpdateResult {
    match state.store.remove(&device_id) {
        Some(_) => {
            info!("Removing device {device_id}");
            state.queue.remove_pending(&device_id);
            state.removed_pending.insert(device_id.clone());
            state.push_event(EngineEvent::DevicesChanged {
                devices: state.store.snapshot(),
            });
            UpdateResult::action(UpdateAction::DeleteDevice { device_id })
        }
        None => {
            warn!("Remove requested for unknown device {device_id}");
            state.push_event(EngineEvent::CommandFailed {
                context: format!("remove device {device_id}"),
                error: "unknown device".to_string(),
            });
            UpdateResult::none()
        }
    }
}

pub(super) fn handle_device_removed(_state: &mut PanelState, device_id: String) -> UpdateResult {
    // The tombstone clears itself once a saved snapshot confirms the delete.
    debug!("Storage confirmed removal of device {device_id}");
    UpdateResult::none()
}

pub(super) fn handle_device_remove_failed(
    state: &mut PanelState,
    device_id: String,
    error: String,
) -> UpdateResult {
    warn!("Failed to delete device {device_id} from storage: {error}");
    // Without the tombstone the record comes back on the next pass, which
    // matches what storage still holds.
    state.removed_pending.remove(&device_id);
    state.push_event(EngineEvent::CommandFailed {
        context: format!("remove device {device_id}"),
        error,
    });
    UpdateResult::none()
}

// ─────────────────────────────────────────────────────────────────
// Wireless
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_connect_wireless(
    _state: &mut PanelState,
    address: String,
    port: Option<u16>,
) -> UpdateResult {
    let port = port.unwrap_or(DEFAULT_WIRELESS_PORT);
    info!("Connecting wirelessly to {address}:{port}");
    UpdateResult::action(UpdateAction::ConnectWireless { address, port })
}

pub(super) fn handle_wireless_connected(_state: &mut PanelState, address: String) -> UpdateResult {
    info!("Wireless connection to {address} established");
    // The device enters the list through the next reconciliation pass.
    UpdateResult::message(Message::ReconcileTick)
}

pub(super) fn handle_wireless_connect_failed(
    state: &mut PanelState,
    address: String,
    error: String,
) -> UpdateResult {
    warn!("Wireless connect to {address} failed: {error}");
    state.push_event(EngineEvent::CommandFailed {
        context: format!("connect to {address}"),
        error,
    });
    UpdateResult::none()
}

pub(super) fn handle_enable_wireless_mode(
    state: &mut PanelState,
    device_id: String,
) -> UpdateResult {
    if !state.store.contains(&device_id) {
        warn!("Wireless mode requested for unknown device {device_id}");
        state.push_event(EngineEvent::CommandFailed {
            context: format!("enable wireless mode for {device_id}"),
            error: "unknown device".to_string(),
        });
        return UpdateResult::none();
    }
    info!("Enabling wireless mode for {device_id}");
    UpdateResult::action(UpdateAction::EnableWirelessMode { device_id })
}

pub(super) fn handle_wireless_mode_enabled(
    state: &mut PanelState,
    device_id: String,
    address: String,
) -> UpdateResult {
    info!("Device {device_id} reachable wirelessly at {address}");
    state.push_event(EngineEvent::WirelessModeEnabled {
        device_id,
        address: address.clone(),
    });
    // Complete the pairing right away.
    UpdateResult::message(Message::ConnectWireless {
        address,
        port: None,
    })
}

pub(super) fn handle_wireless_mode_failed(
    state: &mut PanelState,
    device_id: String,
    error: String,
) -> UpdateResult {
    warn!("Failed to enable wireless mode for {device_id}: {error}");
    state.push_event(EngineEvent::CommandFailed {
        context: format!("enable wireless mode for {device_id}"),
        error,
    });
    UpdateResult::none()
}

pub(super) fn handle_disconnect_wireless(
    _state: &mut PanelState,
    address: String,
) -> UpdateResult {
    info!("Disconnecting wireless device at {address}");
    UpdateResult::action(UpdateAction::DisconnectWireless { address })
}

pub(super) fn handle_wireless_disconnected(
    _state: &mut PanelState,
    address: String,
) -> UpdateResult {
    info!("Wireless connection to {address} dropped");
    UpdateResult::message(Message::ReconcileTick)
}

pub(super) fn handle_wireless_disconnect_failed(
    state: &mut PanelState,
    address: String,
    error: String,
) -> UpdateResult {
    warn!("Wireless disconnect from {address} failed: {error}");
    state.push_event(EngineEvent::CommandFailed {
        context: format!("disconnect {address}"),
        error,
    });
    UpdateResult::none()
}
