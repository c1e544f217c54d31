//! Mirror Warden - device and session supervisor for scrcpy mirroring
//!
//! This is the binary entry point. All logic lives in the member crates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;

use mwarden_app::{config, Deps, Engine, FileDeviceStorage, Message};
use mwarden_bridge::{log_tool_versions, AdbBridge, DeviceBridge, ScrcpyBackend, ToolPaths};

/// Mirror Warden - supervise Android devices and scrcpy mirroring sessions
#[derive(Parser, Debug)]
#[command(name = "mwarden")]
#[command(about = "Supervise Android devices and scrcpy mirroring sessions", long_about = None)]
struct Args {
    /// Path to the adb executable (default: search PATH)
    #[arg(long, value_name = "PATH")]
    adb: Option<PathBuf>,

    /// Path to the scrcpy executable (default: search PATH)
    #[arg(long, value_name = "PATH")]
    scrcpy: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan once and print the live device list as JSON
    List,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    mwarden_core::logging::init()?;

    match args.command {
        Some(Command::List) => list_devices(args.adb).await,
        None => run_panel(args.adb, args.scrcpy).await,
    }
}

/// One-shot device scan. Only needs adb.
async fn list_devices(adb: Option<PathBuf>) -> color_eyre::Result<()> {
    let bridge = match adb {
        Some(path) => AdbBridge::new(path),
        None => AdbBridge::discover()?,
    };
    let devices = bridge.list_live_devices().await?;
    println!("{}", serde_json::to_string_pretty(&devices)?);
    Ok(())
}

/// Watch mode: run the engine until Ctrl-C, printing events as JSON lines.
async fn run_panel(adb: Option<PathBuf>, scrcpy: Option<PathBuf>) -> color_eyre::Result<()> {
    let tools = ToolPaths::resolve(adb, scrcpy)?;
    let bridge = AdbBridge::new(tools.adb.clone());
    let backend = ScrcpyBackend::new(tools.scrcpy.clone());
    log_tool_versions(&bridge, &backend).await;

    let config_dir = match config::default_config_dir() {
        Ok(dir) => Some(dir),
        Err(e) => {
            warn!("Settings will not be persisted: {e}");
            None
        }
    };
    let settings = config_dir
        .as_deref()
        .map(config::load_settings)
        .unwrap_or_default();

    let storage = FileDeviceStorage::new(FileDeviceStorage::default_path()?);
    let deps = Deps {
        bridge: Arc::new(bridge),
        storage: Arc::new(storage),
        mirror: Arc::new(backend),
        config_dir,
    };
    let (mut engine, mut crash_rx) = Engine::new(deps, settings);

    // Events go to stdout as one JSON object per line.
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Ok(line) = serde_json::to_string(&event) {
                        println!("{line}");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event printer lagged, skipped {skipped} event(s)");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Crashes additionally land on the dedicated channel.
    tokio::spawn(async move {
        while let Some(crash) = crash_rx.recv().await {
            warn!(
                "Session {} for device {} crashed",
                crash.session_id, crash.device_id
            );
        }
    });

    // Ctrl-C asks the engine to quit; teardown flushes pending writes.
    let quit_tx = engine.msg_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = quit_tx.send(Message::Quit).await;
        }
    });

    engine.run().await;
    Ok(())
}
