//! Engine: owns the state, the message channel, timers, and teardown
//!
//! One engine instance runs the whole panel. Messages funnel through a single
//! mpsc channel and are processed one at a time against [`PanelState`], so
//! handlers never race each other. Completed work re-enters as messages;
//! consumers observe the engine through a broadcast of [`EngineEvent`]s and
//! the dedicated crash channel handed out by [`Engine::new`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use mwarden_bridge::{DeviceBridge, MirrorBackend};
use mwarden_core::{CrashEvent, DeviceRecord, MirrorSession};

use crate::actions::{handle_action, Deps, PollTaskMap};
use crate::config::Settings;
use crate::events::EngineEvent;
use crate::handler::UpdateAction;
use crate::message::Message;
use crate::persist::DeviceStorage;
use crate::process;
use crate::state::PanelState;

const MESSAGE_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 256;
const CRASH_CHANNEL_CAPACITY: usize = 64;

pub struct Engine<B, S, M> {
    pub state: PanelState,
    deps: Deps<B, S, M>,
    msg_tx: mpsc::Sender<Message>,
    msg_rx: mpsc::Receiver<Message>,
    poll_tasks: PollTaskMap,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    event_tx: broadcast::Sender<EngineEvent>,
    crash_tx: mpsc::Sender<CrashEvent>,
}

impl<B, S, M> Engine<B, S, M>
where
    B: DeviceBridge + Send + Sync + 'static,
    S: DeviceStorage + Send + Sync + 'static,
    M: MirrorBackend + Send + Sync + 'static,
{
    /// Build an engine. Returns it together with the crash event receiver;
    /// crashes are delivered there exactly once per session, independent of
    /// broadcast subscribers.
    pub fn new(deps: Deps<B, S, M>, settings: Settings) -> (Self, mpsc::Receiver<CrashEvent>) {
        // 1. Message channel: everything the engine reacts to.
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);

        // 2. Shutdown signal watched by poll tickers and debounce timers.
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // 3. Outward event stream. Subscribers may come and go.
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        // 4. Dedicated crash stream for the caller.
        let (crash_tx, crash_rx) = mpsc::channel(CRASH_CHANNEL_CAPACITY);

        let engine = Self {
            state: PanelState::new(settings),
            deps,
            msg_tx,
            msg_rx,
            poll_tasks: Arc::new(Mutex::new(HashMap::new())),
            shutdown_tx,
            shutdown_rx,
            event_tx,
            crash_tx,
        };
        (engine, crash_rx)
    }

    /// Subscribe to the engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Sender for feeding commands into the engine.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.state.devices()
    }

    pub fn sessions(&self) -> Vec<MirrorSession> {
        self.state.sessions()
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Process one message synchronously and emit whatever events it queued.
    pub fn process_message(&mut self, message: Message) {
        process::process_message(
            &mut self.state,
            message,
            &self.deps,
            &self.msg_tx,
            &self.poll_tasks,
            &self.shutdown_rx,
        );
        self.emit_pending();
    }

    fn emit_pending(&mut self) {
        for event in self.state.take_events() {
            if let EngineEvent::SessionCrashed {
                session_id,
                device_id,
            } = &event
            {
                let crash = CrashEvent {
                    session_id: session_id.clone(),
                    device_id: device_id.clone(),
                };
                if let Err(e) = self.crash_tx.try_send(crash) {
                    warn!("Crash event for {session_id} not delivered: {e}");
                }
            }
            debug!("Emitting event: {}", event.event_type());
            // No subscribers is fine; events are advisory.
            let _ = self.event_tx.send(event);
        }
    }

    /// Run until a quit request, then tear down.
    pub async fn run(&mut self) {
        info!("Engine starting");

        // Seed the list from storage before the first scan, so saved devices
        // show up (offline) even while the bridge is unreachable.
        self.dispatch(UpdateAction::LoadSavedDevices);

        let mut reconcile = tokio::time::interval(self.state.settings.panel.reconcile_interval());
        reconcile.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe = self.msg_rx.recv() => {
                    match maybe {
                        Some(message) => {
                            self.process_message(message);
                            if self.state.should_quit() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = reconcile.tick() => {
                    self.process_message(Message::ReconcileTick);
                }
            }
        }

        self.shutdown().await;
    }

    /// Stop timers and tickers, flush pending writes, emit the final event.
    ///
    /// Backend commands already dispatched keep running to completion; their
    /// completion messages simply have no one left to process them.
    pub async fn shutdown(&mut self) {
        info!("Engine shutting down");
        let _ = self.shutdown_tx.send(true);

        let handles: Vec<_> = {
            let mut tasks = self.poll_tasks.lock().unwrap();
            tasks.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.abort();
        }

        // Debounce timers died with the watch signal; write what they owed.
        let pending = self.state.queue.drain_pending();
        if !pending.is_empty() {
            info!("Flushing {} pending device record(s)", pending.len());
            for record in &pending {
                if let Err(e) = self.deps.storage.save_device(record).await {
                    warn!("Failed to persist device {} during shutdown: {e}", record.id);
                }
            }
        }

        self.state.push_event(EngineEvent::Shutdown);
        self.emit_pending();
    }

    fn dispatch(&self, action: UpdateAction) {
        handle_action(
            action,
            &self.deps,
            self.msg_tx.clone(),
            &self.poll_tasks,
            &self.shutdown_rx,
            self.state.settings.panel.session_poll_interval(),
            self.state.settings.panel.persist_debounce(),
        );
    }
}
