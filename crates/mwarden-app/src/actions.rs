//! Action execution: background tasks for everything the handlers request
//!
//! Each [`UpdateAction`] spawns a short tokio task that performs the IO and
//! reports back by sending a [`Message`] into the engine channel. Send
//! failures are ignored; they only occur during teardown when nobody is
//! listening.
//!
//! Session poll tickers are the one long-lived task kind here. They are
//! tracked in a [`PollTaskMap`] so a stop (or engine shutdown) can abort them,
//! and they watch the shutdown channel so teardown never waits on a ticker.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use mwarden_bridge::{DeviceBridge, MirrorBackend};

use crate::config;
use crate::handler::UpdateAction;
use crate::message::Message;
use crate::persist::DeviceStorage;

/// Collaborator handles shared with every spawned task.
pub struct Deps<B, S, M> {
    pub bridge: Arc<B>,
    pub storage: Arc<S>,
    pub mirror: Arc<M>,
    /// Directory for config.toml writes. `None` keeps settings in memory only.
    pub config_dir: Option<PathBuf>,
}

impl<B, S, M> Clone for Deps<B, S, M> {
    fn clone(&self) -> Self {
        Self {
            bridge: self.bridge.clone(),
            storage: self.storage.clone(),
            mirror: self.mirror.clone(),
            config_dir: self.config_dir.clone(),
        }
    }
}

/// Live per-session poll tickers, keyed by session id.
pub type PollTaskMap = Arc<std::sync::Mutex<HashMap<String, JoinHandle<()>>>>;

/// Execute one action. Never blocks the caller.
#[allow(clippy::too_many_arguments)]
pub fn handle_action<B, S, M>(
    action: UpdateAction,
    deps: &Deps<B, S, M>,
    msg_tx: mpsc::Sender<Message>,
    poll_tasks: &PollTaskMap,
    shutdown_rx: &watch::Receiver<bool>,
    poll_interval: Duration,
    debounce: Duration,
) where
    B: DeviceBridge + Send + Sync + 'static,
    S: DeviceStorage + Send + Sync + 'static,
    M: MirrorBackend + Send + Sync + 'static,
{
    match action {
        // ─────────────────────────────────────────────────────────
        // Snapshots
        // ─────────────────────────────────────────────────────────
        UpdateAction::LoadSavedDevices => {
            let storage = deps.storage.clone();
            tokio::spawn(async move {
                let msg = match storage.load_devices().await {
                    Ok(devices) => Message::SavedDevicesLoaded { devices },
                    Err(e) => Message::SavedDevicesLoadFailed {
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::FetchSnapshots => {
            let bridge = deps.bridge.clone();
            let storage = deps.storage.clone();
            tokio::spawn(async move {
                // Both snapshots belong to the same instant; if either side
                // fails the whole pass is abandoned.
                let (live, saved) =
                    tokio::join!(bridge.list_live_devices(), storage.load_devices());
                let msg = match (live, saved) {
                    (Ok(live), Ok(saved)) => Message::SnapshotsArrived { live, saved },
                    (Err(e), _) | (_, Err(e)) => Message::SnapshotsFailed {
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        // ─────────────────────────────────────────────────────────
        // Sessions
        // ─────────────────────────────────────────────────────────
        UpdateAction::StartSession { device_id, options } => {
            let mirror = deps.mirror.clone();
            tokio::spawn(async move {
                let msg = match mirror.start_session(&device_id, &options).await {
                    Ok(session_id) => Message::SessionStarted {
                        device_id,
                        session_id,
                    },
                    Err(e) => Message::SessionStartFailed {
                        device_id,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::StopSession { session_id } => {
            let mirror = deps.mirror.clone();
            tokio::spawn(async move {
                let msg = match mirror.stop_session(&session_id).await {
                    Ok(()) => Message::SessionStopped { session_id },
                    Err(e) => Message::SessionStopFailed {
                        session_id,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::SpawnSessionPoll { session_id } => {
            let key = session_id.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(poll_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // The immediate first tick confirms the session promptly.
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let msg = Message::SessionPollTick {
                                session_id: session_id.clone(),
                            };
                            if msg_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
            });
            let mut tasks = poll_tasks.lock().unwrap();
            if let Some(old) = tasks.insert(key, handle) {
                old.abort();
            }
        }

        UpdateAction::CancelSessionPoll { session_id } => {
            let handle = poll_tasks.lock().unwrap().remove(&session_id);
            if let Some(handle) = handle {
                debug!("Cancelling poll ticker for {session_id}");
                handle.abort();
            }
        }

        UpdateAction::PollSession {
            session_id,
            generation,
        } => {
            let mirror = deps.mirror.clone();
            tokio::spawn(async move {
                let status = mirror
                    .session_status(&session_id)
                    .await
                    .map_err(|e| e.to_string());
                let _ = msg_tx
                    .send(Message::SessionPollResult {
                        session_id,
                        generation,
                        status,
                    })
                    .await;
            });
        }

        // ─────────────────────────────────────────────────────────
        // Wireless
        // ─────────────────────────────────────────────────────────
        UpdateAction::ConnectWireless { address, port } => {
            let bridge = deps.bridge.clone();
            tokio::spawn(async move {
                let msg = match bridge.connect_wireless(&address, port).await {
                    Ok(()) => Message::WirelessConnected { address },
                    Err(e) => Message::WirelessConnectFailed {
                        address,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::EnableWirelessMode { device_id } => {
            let bridge = deps.bridge.clone();
            tokio::spawn(async move {
                let msg = match bridge.enable_wireless_mode(&device_id).await {
                    Ok(address) => Message::WirelessModeEnabled { device_id, address },
                    Err(e) => Message::WirelessModeFailed {
                        device_id,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::DisconnectWireless { address } => {
            let bridge = deps.bridge.clone();
            tokio::spawn(async move {
                let msg = match bridge.disconnect(&address).await {
                    Ok(()) => Message::WirelessDisconnected { address },
                    Err(e) => Message::WirelessDisconnectFailed {
                        address,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        // ─────────────────────────────────────────────────────────
        // Persistence
        // ─────────────────────────────────────────────────────────
        UpdateAction::DeleteDevice { device_id } => {
            let storage = deps.storage.clone();
            tokio::spawn(async move {
                let msg = match storage.delete_device(&device_id).await {
                    Ok(()) => Message::DeviceRemoved { device_id },
                    Err(e) => Message::DeviceRemoveFailed {
                        device_id,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::ScheduleFlush { generation } => {
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(debounce) => {
                        let _ = msg_tx.send(Message::FlushDue { generation }).await;
                    }
                    // Teardown flushes directly; the timer just stops.
                    _ = shutdown_rx.changed() => {}
                }
            });
        }

        UpdateAction::PersistBatch { records } => {
            let storage = deps.storage.clone();
            tokio::spawn(async move {
                let mut failures = Vec::new();
                for record in &records {
                    if let Err(e) = storage.save_device(record).await {
                        failures.push((record.id.clone(), e.to_string()));
                    }
                }
                let _ = msg_tx.send(Message::FlushCompleted { failures }).await;
            });
        }

        UpdateAction::SaveSettings { settings } => {
            let config_dir = deps.config_dir.clone();
            tokio::spawn(async move {
                let msg = match config_dir {
                    Some(dir) => match config::save_settings(&dir, &settings) {
                        Ok(()) => Message::SettingsSaved,
                        Err(e) => Message::SettingsSaveFailed {
                            error: e.to_string(),
                        },
                    },
                    None => {
                        debug!("No config directory, settings not persisted");
                        Message::SettingsSaved
                    }
                };
                let _ = msg_tx.send(msg).await;
            });
        }
    }
}
