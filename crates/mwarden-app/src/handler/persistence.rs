//! Flush bookkeeping and settings handlers

use tracing::{debug, warn};

use crate::config::MirrorSettings;
use crate::events::EngineEvent;
use crate::state::PanelState;

use super::{UpdateAction, UpdateResult};

// ─────────────────────────────────────────────────────────────────
// Debounced flush
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_flush_due(state: &mut PanelState, generation: u64) -> UpdateResult {
    if !state.queue.is_current(generation) {
        debug!("Flush timer for generation {generation} superseded");
        return UpdateResult::none();
    }
    if state.queue.is_flushing() {
        // The running flush reports back through FlushCompleted, which
        // reschedules anything still pending.
        debug!("Flush already in progress, deferring");
        return UpdateResult::none();
    }
    if !state.queue.has_pending() {
        return UpdateResult::none();
    }

    let records = state.queue.begin_flush();
    debug!("Flushing {} device record(s)", records.len());
    UpdateResult::action(UpdateAction::PersistBatch { records })
}

pub(super) fn handle_flush_completed(
    state: &mut PanelState,
    failures: Vec<(String, String)>,
) -> UpdateResult {
    for (device_id, error) in failures {
        warn!("Failed to persist device {device_id}: {error}");
        state.push_event(EngineEvent::PersistFailed { device_id, error });
    }

    if state.queue.finish_flush() {
        // Changes landed while the batch was writing; arm a fresh timer.
        return UpdateResult::action(UpdateAction::ScheduleFlush {
            generation: state.queue.generation(),
        });
    }
    UpdateResult::none()
}

// ─────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_update_mirror_settings(
    state: &mut PanelState,
    mirror: MirrorSettings,
) -> UpdateResult {
    if state.settings.mirror == mirror {
        debug!("Mirror settings unchanged");
        return UpdateResult::none();
    }
    state.settings.mirror = mirror;
    UpdateResult::action(UpdateAction::SaveSettings {
        settings: state.settings.clone(),
    })
}

pub(super) fn handle_settings_saved(_state: &mut PanelState) -> UpdateResult {
    debug!("Settings saved");
    UpdateResult::none()
}

pub(super) fn handle_settings_save_failed(state: &mut PanelState, error: String) -> UpdateResult {
    // The new values stay active in memory; only the write failed.
    warn!("Failed to save settings: {error}");
    state.push_event(EngineEvent::CommandFailed {
        context: "save settings".to_string(),
        error,
    });
    UpdateResult::none()
}
