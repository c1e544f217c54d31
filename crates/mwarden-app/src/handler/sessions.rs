//! Session lifecycle and liveness poll handlers

use tracing::{debug, info, warn};

use mwarden_core::{MirrorSession, SessionStatus};

use crate::events::EngineEvent;
use crate::monitor::PollOutcome;
use crate::state::PanelState;

use super::{UpdateAction, UpdateResult};

// ─────────────────────────────────────────────────────────────────
// Start
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_start_mirroring(state: &mut PanelState, device_id: String) -> UpdateResult {
    let status = state.store.get(&device_id).map(|record| record.status);
    match status {
        None => {
            warn!("Start mirroring requested for unknown device {device_id}");
            state.push_event(EngineEvent::CommandFailed {
                context: format!("start mirroring {device_id}"),
                error: "unknown device".to_string(),
            });
            return UpdateResult::none();
        }
        Some(status) if !status.is_connected() => {
            warn!("Device {device_id} is not connected (status {status:?})");
            state.push_event(EngineEvent::CommandFailed {
                context: format!("start mirroring {device_id}"),
                error: format!("device is not connected (status {status:?})"),
            });
            return UpdateResult::none();
        }
        Some(_) => {}
    }

    if state.monitor.running_session_for_device(&device_id).is_some() {
        debug!("Device {device_id} is already mirroring");
        return UpdateResult::none();
    }
    if !state.starting.insert(device_id.clone()) {
        debug!("Session start already in flight for {device_id}");
        return UpdateResult::none();
    }

    let options = state.settings.mirror.to_options();
    UpdateResult::action(UpdateAction::StartSession { device_id, options })
}

pub(super) fn handle_session_started(
    state: &mut PanelState,
    device_id: String,
    session_id: String,
) -> UpdateResult {
    state.starting.remove(&device_id);
    info!("Session {session_id} started for device {device_id}");
    state
        .monitor
        .track(MirrorSession::started(session_id.clone(), device_id));
    state.push_event(EngineEvent::SessionsChanged {
        sessions: state.monitor.snapshot(),
    });
    UpdateResult::action(UpdateAction::SpawnSessionPoll { session_id })
}

pub(super) fn handle_session_start_failed(
    state: &mut PanelState,
    device_id: String,
    error: String,
) -> UpdateResult {
    state.starting.remove(&device_id);
    warn!("Failed to start mirroring {device_id}: {error}");
    state.push_event(EngineEvent::CommandFailed {
        context: format!("start mirroring {device_id}"),
        error,
    });
    UpdateResult::none()
}

// ─────────────────────────────────────────────────────────────────
// Stop
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_stop_mirroring(state: &mut PanelState, session_id: String) -> UpdateResult {
    // Mark before dispatching so a poll racing the stop cannot read the death
    // as a crash.
    if !state.monitor.mark_stop_requested(&session_id) {
        debug!("Stop requested for untracked session {session_id}");
        return UpdateResult::none();
    }
    info!("Stopping session {session_id}");
    UpdateResult::action(UpdateAction::StopSession { session_id })
}

pub(super) fn handle_session_stopped(state: &mut PanelState, session_id: String) -> UpdateResult {
    info!("Session {session_id} stopped");
    if state.monitor.clear(&session_id).is_some() {
        state.push_event(EngineEvent::SessionsChanged {
            sessions: state.monitor.snapshot(),
        });
    }
    UpdateResult::action(UpdateAction::CancelSessionPoll { session_id })
}

pub(super) fn handle_session_stop_failed(
    state: &mut PanelState,
    session_id: String,
    error: String,
) -> UpdateResult {
    // Keep tracking: the stop request stays marked, so when the session does
    // die the monitor files it as a clean stop.
    warn!("Failed to stop session {session_id}: {error}");
    state.push_event(EngineEvent::CommandFailed {
        context: format!("stop session {session_id}"),
        error,
    });
    UpdateResult::none()
}

// ─────────────────────────────────────────────────────────────────
// Liveness polling
// ─────────────────────────────────────────────────────────────────

pub(super) fn handle_session_poll_tick(
    state: &mut PanelState,
    session_id: String,
) -> UpdateResult {
    match state.monitor.next_generation(&session_id) {
        Some(generation) => UpdateResult::action(UpdateAction::PollSession {
            session_id,
            generation,
        }),
        None => {
            // Ticker outlived its session; shut it down.
            debug!("Poll tick for untracked session {session_id}");
            UpdateResult::action(UpdateAction::CancelSessionPoll { session_id })
        }
    }
}

pub(super) fn handle_session_poll_result(
    state: &mut PanelState,
    session_id: String,
    generation: u64,
    status: Result<SessionStatus, String>,
) -> UpdateResult {
    let observed = match status {
        Ok(status) => Some(status),
        Err(error) => {
            debug!("Status poll for {session_id} failed: {error}");
            None
        }
    };

    match state.monitor.apply_poll(&session_id, generation, observed) {
        PollOutcome::Ignored | PollOutcome::NoChange => UpdateResult::none(),
        PollOutcome::Crashed(event) => {
            warn!(
                "Session {} for device {} died without a stop request",
                event.session_id, event.device_id
            );
            state.monitor.clear(&session_id);
            state.push_event(EngineEvent::SessionCrashed {
                session_id: event.session_id,
                device_id: event.device_id,
            });
            state.push_event(EngineEvent::SessionsChanged {
                sessions: state.monitor.snapshot(),
            });
            UpdateResult::action(UpdateAction::CancelSessionPoll { session_id })
        }
        PollOutcome::StoppedClean => {
            info!("Session {session_id} stopped cleanly");
            state.monitor.clear(&session_id);
            state.push_event(EngineEvent::SessionsChanged {
                sessions: state.monitor.snapshot(),
            });
            UpdateResult::action(UpdateAction::CancelSessionPoll { session_id })
        }
    }
}
