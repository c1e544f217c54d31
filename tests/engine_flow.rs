//! End-to-end tests for the panel engine over in-memory backends
//!
//! Each test launches the full engine loop in a background task, drives it
//! through the command channel, and observes the broadcast events plus the
//! dedicated crash channel. Time is paused, so reconcile ticks, session
//! polls, and debounce timers all fire through tokio's auto-advance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use mwarden_app::{Deps, DeviceStorage, Engine, EngineEvent, Message, Settings};
use mwarden_bridge::{DeviceBridge, MirrorBackend, MirrorOptions};
use mwarden_core::{
    CrashEvent, DeviceRecord, DeviceStatus, MirrorSession, Result, SessionStatus,
};

// ═══════════════════════════════════════════════════════════════
// In-memory Backends
// ═══════════════════════════════════════════════════════════════

/// Bridge fake answering every scan with a fixed device list.
struct ScriptedBridge {
    live: Mutex<Vec<DeviceRecord>>,
}

impl ScriptedBridge {
    fn new(live: Vec<DeviceRecord>) -> Self {
        Self {
            live: Mutex::new(live),
        }
    }
}

impl DeviceBridge for ScriptedBridge {
    async fn list_live_devices(&self) -> Result<Vec<DeviceRecord>> {
        Ok(self.live.lock().unwrap().clone())
    }

    async fn connect_wireless(&self, _address: &str, _port: u16) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self, _address: &str) -> Result<()> {
        Ok(())
    }

    async fn enable_wireless_mode(&self, _device_id: &str) -> Result<String> {
        Ok("192.168.1.90".to_string())
    }
}

/// Storage fake over a map the test body can inspect after the fact.
#[derive(Default)]
struct MemoryStore {
    map: Mutex<HashMap<String, DeviceRecord>>,
}

impl MemoryStore {
    fn with(records: Vec<DeviceRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            map: Mutex::new(map),
        }
    }

    fn name_of(&self, device_id: &str) -> Option<String> {
        self.map
            .lock()
            .unwrap()
            .get(device_id)
            .map(|record| record.name.clone())
    }
}

impl DeviceStorage for MemoryStore {
    async fn load_devices(&self) -> Result<Vec<DeviceRecord>> {
        let mut records: Vec<_> = self.map.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn save_device(&self, record: &DeviceRecord) -> Result<()> {
        self.map
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_device(&self, device_id: &str) -> Result<()> {
        self.map.lock().unwrap().remove(device_id);
        Ok(())
    }
}

/// Mirroring fake whose session statuses the test can flip at will.
#[derive(Default)]
struct ScriptedMirror {
    statuses: Mutex<HashMap<String, SessionStatus>>,
    counter: AtomicU64,
}

impl ScriptedMirror {
    /// Simulate the mirror process dying with a non-zero exit.
    fn crash(&self, session_id: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(session_id.to_string(), SessionStatus::Error);
    }
}

impl MirrorBackend for ScriptedMirror {
    async fn start_session(&self, _device_id: &str, _options: &MirrorOptions) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("session_{n}");
        self.statuses
            .lock()
            .unwrap()
            .insert(session_id.clone(), SessionStatus::Running);
        Ok(session_id)
    }

    async fn stop_session(&self, session_id: &str) -> Result<()> {
        self.statuses
            .lock()
            .unwrap()
            .insert(session_id.to_string(), SessionStatus::Stopped);
        Ok(())
    }

    async fn session_status(&self, session_id: &str) -> Result<SessionStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(session_id)
            .copied()
            .unwrap_or(SessionStatus::Stopped))
    }

    async fn list_active_sessions(&self) -> Result<Vec<MirrorSession>> {
        Ok(Vec::new())
    }
}

// ═══════════════════════════════════════════════════════════════
// Harness
// ═══════════════════════════════════════════════════════════════

struct Harness {
    commands: mpsc::Sender<Message>,
    events: broadcast::Receiver<EngineEvent>,
    crashes: mpsc::Receiver<CrashEvent>,
    storage: Arc<MemoryStore>,
    mirror: Arc<ScriptedMirror>,
    task: JoinHandle<()>,
}

/// Spawn the engine loop with the given storage contents and scan results.
fn launch(storage: MemoryStore, live: Vec<DeviceRecord>) -> Harness {
    let bridge = Arc::new(ScriptedBridge::new(live));
    let storage = Arc::new(storage);
    let mirror = Arc::new(ScriptedMirror::default());
    let deps = Deps {
        bridge,
        storage: storage.clone(),
        mirror: mirror.clone(),
        config_dir: None,
    };

    let (mut engine, crashes) = Engine::new(deps, Settings::default());
    let events = engine.subscribe();
    let commands = engine.msg_sender();
    let task = tokio::spawn(async move { engine.run().await });

    Harness {
        commands,
        events,
        crashes,
        storage,
        mirror,
        task,
    }
}

impl Harness {
    async fn send(&self, message: Message) {
        self.commands
            .send(message)
            .await
            .expect("engine stopped receiving commands");
    }

    /// Ask the engine to quit and wait for the loop to wind down.
    async fn quit(&mut self) {
        self.send(Message::Quit).await;
        timeout(Duration::from_secs(60), &mut self.task)
            .await
            .expect("engine did not stop after quit")
            .expect("engine task panicked");
    }
}

/// Next event of the wanted kind; other kinds are discarded.
async fn next_event(events: &mut broadcast::Receiver<EngineEvent>, wanted: &str) -> EngineEvent {
    loop {
        let event = timeout(Duration::from_secs(60), events.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed");
        if event.event_type() == wanted {
            return event;
        }
    }
}

/// Device lists are re-broadcast as they evolve; wait for one that satisfies
/// the predicate.
async fn wait_for_devices(
    events: &mut broadcast::Receiver<EngineEvent>,
    pred: impl Fn(&[DeviceRecord]) -> bool,
) -> Vec<DeviceRecord> {
    for _ in 0..16 {
        if let EngineEvent::DevicesChanged { devices } = next_event(events, "devices_changed").await
        {
            if pred(&devices) {
                return devices;
            }
        }
    }
    panic!("device list never reached the expected shape");
}

async fn wait_for_sessions(
    events: &mut broadcast::Receiver<EngineEvent>,
    pred: impl Fn(&[MirrorSession]) -> bool,
) -> Vec<MirrorSession> {
    for _ in 0..16 {
        if let EngineEvent::SessionsChanged { sessions } =
            next_event(events, "sessions_changed").await
        {
            if pred(&sessions) {
                return sessions;
            }
        }
    }
    panic!("session list never reached the expected shape");
}

/// Collect the remaining events until the engine drops its sender.
async fn drain_events(events: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut seen = Vec::new();
    loop {
        match timeout(Duration::from_secs(60), events.recv()).await {
            Ok(Ok(event)) => seen.push(event),
            Ok(Err(RecvError::Lagged(_))) => continue,
            Ok(Err(RecvError::Closed)) => return seen,
            Err(_) => panic!("engine never closed the event channel"),
        }
    }
}

fn device<'a>(devices: &'a [DeviceRecord], id: &str) -> &'a DeviceRecord {
    devices
        .iter()
        .find(|record| record.id == id)
        .unwrap_or_else(|| panic!("device {id} missing from the list"))
}

/// A connected USB phone, named after its model the way a scan reports it.
fn live_usb(id: &str, model: &str) -> DeviceRecord {
    DeviceRecord::usb(id, model).with_model(model)
}

/// A saved record carrying a user-chosen name, offline until scanned.
fn saved_named(id: &str, name: &str, model: &str) -> DeviceRecord {
    DeviceRecord::usb(id, name).with_model(model).as_offline()
}

// ═══════════════════════════════════════════════════════════════
// Reconciliation Flow
// ═══════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_startup_merges_saved_and_live_devices() {
    let storage = MemoryStore::with(vec![
        saved_named("R5CN300XYZ", "Desk Pixel", "SM_G998B"),
        saved_named("OLDPHONE", "Drawer Phone", "SM_A515F"),
    ]);
    let mut harness = launch(storage, vec![live_usb("R5CN300XYZ", "SM_G998B")]);

    let devices = wait_for_devices(&mut harness.events, |devices| {
        device_is(devices, "R5CN300XYZ", DeviceStatus::Connected)
    })
    .await;

    // The scanned device keeps its saved name; the unplugged one stays
    // listed offline.
    assert_eq!(devices.len(), 2);
    let pixel = device(&devices, "R5CN300XYZ");
    assert_eq!(pixel.name, "Desk Pixel");
    assert_eq!(pixel.model, "SM_G998B");
    let drawer = device(&devices, "OLDPHONE");
    assert_eq!(drawer.status, DeviceStatus::Offline);
    assert_eq!(drawer.name, "Drawer Phone");

    harness.quit().await;

    let remaining = drain_events(&mut harness.events).await;
    assert!(matches!(remaining.last(), Some(EngineEvent::Shutdown)));
}

fn device_is(devices: &[DeviceRecord], id: &str, status: DeviceStatus) -> bool {
    devices
        .iter()
        .any(|record| record.id == id && record.status == status)
}

// ═══════════════════════════════════════════════════════════════
// Session Lifecycle
// ═══════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_session_crash_reaches_the_crash_channel() {
    let mut harness = launch(
        MemoryStore::default(),
        vec![live_usb("R5CN300XYZ", "SM_G998B")],
    );
    wait_for_devices(&mut harness.events, |devices| !devices.is_empty()).await;

    harness
        .send(Message::StartMirroring {
            device_id: "R5CN300XYZ".to_string(),
        })
        .await;
    let sessions = wait_for_sessions(&mut harness.events, |sessions| !sessions.is_empty()).await;
    let session_id = sessions[0].session_id.clone();
    assert_eq!(sessions[0].device_id, "R5CN300XYZ");

    // The next status poll sees the dead process and raises the crash.
    harness.mirror.crash(&session_id);

    let crash = timeout(Duration::from_secs(60), harness.crashes.recv())
        .await
        .expect("timed out waiting for the crash")
        .expect("crash channel closed");
    assert_eq!(crash.session_id, session_id);
    assert_eq!(crash.device_id, "R5CN300XYZ");

    // The session leaves the list, and no duplicate crash follows.
    wait_for_sessions(&mut harness.events, |sessions| sessions.is_empty()).await;
    harness.quit().await;
    assert!(harness.crashes.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_requested_stop_is_not_reported_as_a_crash() {
    let mut harness = launch(
        MemoryStore::default(),
        vec![live_usb("R5CN300XYZ", "SM_G998B")],
    );
    wait_for_devices(&mut harness.events, |devices| !devices.is_empty()).await;

    harness
        .send(Message::StartMirroring {
            device_id: "R5CN300XYZ".to_string(),
        })
        .await;
    let sessions = wait_for_sessions(&mut harness.events, |sessions| !sessions.is_empty()).await;

    harness
        .send(Message::StopMirroring {
            session_id: sessions[0].session_id.clone(),
        })
        .await;
    wait_for_sessions(&mut harness.events, |sessions| sessions.is_empty()).await;

    harness.quit().await;
    assert!(harness.crashes.try_recv().is_err());
}

// ═══════════════════════════════════════════════════════════════
// Persistence Flow
// ═══════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_rename_persists_after_the_debounce_window() {
    let storage = MemoryStore::with(vec![saved_named("R5CN300XYZ", "SM_G998B", "SM_G998B")]);
    let mut harness = launch(storage, Vec::new());
    wait_for_devices(&mut harness.events, |devices| !devices.is_empty()).await;

    harness
        .send(Message::RenameDevice {
            device_id: "R5CN300XYZ".to_string(),
            new_name: "Window Seat".to_string(),
        })
        .await;

    // The write lands once the debounce window has elapsed, without any
    // further prompting.
    let mut persisted = harness.storage.name_of("R5CN300XYZ");
    for _ in 0..100 {
        if persisted.as_deref() == Some("Window Seat") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        persisted = harness.storage.name_of("R5CN300XYZ");
    }
    assert_eq!(persisted.as_deref(), Some("Window Seat"));

    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn test_quit_flushes_writes_still_inside_the_debounce_window() {
    let storage = MemoryStore::with(vec![saved_named("R5CN300XYZ", "SM_G998B", "SM_G998B")]);
    let mut harness = launch(storage, Vec::new());
    wait_for_devices(&mut harness.events, |devices| !devices.is_empty()).await;

    // Rename and quit back to back: the debounce timer never gets a chance
    // to fire, so the shutdown path owns the write.
    harness
        .send(Message::RenameDevice {
            device_id: "R5CN300XYZ".to_string(),
            new_name: "Window Seat".to_string(),
        })
        .await;
    harness.quit().await;

    assert_eq!(
        harness.storage.name_of("R5CN300XYZ").as_deref(),
        Some("Window Seat")
    );
    let remaining = drain_events(&mut harness.events).await;
    assert!(matches!(remaining.last(), Some(EngineEvent::Shutdown)));
}
