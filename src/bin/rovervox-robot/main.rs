//! Robot controller entrypoint: owns the motors and IR sensors, drives
//! autonomously, and takes remote commands as POSIX signals.
//!
//! # Architecture
//!
//! - Sensor worker: polls the IR pair into the shared control state
//! - Movement worker: turns new readings into maneuvers
//! - Signal dispatcher: applies actions raised by the voice process
//! - Key reader: local manual control in raw terminal mode

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, RecvTimeoutError};
use rovervox::config::RobotConfig;
use rovervox::control::{install_shutdown_handler, shutdown_requested, SignalReceiver};
use rovervox::logging::{init_logging, install_panic_hook};
use rovervox::mood::DisplayFeedback;
use rovervox::robot::{
    spawn_key_reader, spawn_movement_worker, spawn_sensor_worker, spawn_signal_dispatcher,
    ClearPathSensors, FileSensors, LocalCommand, LoggingMotors, ObstacleSensors, RobotControl,
    KEY_HELP,
};
use rovervox::runtime::RunFlag;
use rovervox::terminal_restore::TerminalRestoreGuard;
use std::sync::Arc;

/// Max pending local key commands.
const LOCAL_CHANNEL_CAPACITY: usize = 32;

fn main() -> Result<()> {
    let config = RobotConfig::parse_args()?;
    init_logging("robot", &config.log);
    install_panic_hook();

    let receiver = SignalReceiver::install().context("failed to install control signal handlers")?;
    install_shutdown_handler().context("failed to install shutdown handlers")?;

    let sensors: Box<dyn ObstacleSensors> = match &config.sensor_file {
        Some(path) => Box::new(
            FileSensors::open(path)
                .with_context(|| format!("failed to open IR sensors at {}", path.display()))?,
        ),
        None => Box::new(ClearPathSensors),
    };
    let display = DisplayFeedback::from_mood_file(config.mood_file.as_deref());
    let control = Arc::new(RobotControl::new(
        Arc::new(LoggingMotors::new()),
        display,
        config.motion_tuning(),
    ));
    let timings = config.robot_timings();
    let run = RunFlag::new();

    println!("rovervox robot pid {}", std::process::id());
    if !config.no_keyboard {
        println!("{KEY_HELP}");
    }
    tracing::info!(
        pid = std::process::id(),
        sensors = %sensors.describe(),
        "robot starting"
    );

    control.start();
    let mut workers = vec![
        spawn_sensor_worker(sensors, Arc::clone(&control), run.clone(), timings.sensor_poll),
        spawn_movement_worker(Arc::clone(&control), run.clone(), timings.movement_poll),
        spawn_signal_dispatcher(receiver, Arc::clone(&control), run.clone(), timings.dispatch_poll),
    ];

    let (local_tx, local_rx) = bounded(LOCAL_CHANNEL_CAPACITY);
    let terminal_guard = TerminalRestoreGuard::new();
    if !config.no_keyboard {
        match terminal_guard.enable_raw_mode() {
            Ok(()) => workers.push(spawn_key_reader(
                local_tx.clone(),
                run.clone(),
                timings.key_repeat,
            )),
            Err(err) => {
                tracing::warn!(%err, "raw terminal mode unavailable; local control disabled")
            }
        }
    }

    while !shutdown_requested() {
        match local_rx.recv_timeout(timings.dispatch_poll) {
            Ok(LocalCommand::Control(action)) => control.apply(action),
            Ok(LocalCommand::TogglePause) => control.toggle_pause(),
            Ok(LocalCommand::Quit) => {
                tracing::info!("quit requested from keyboard");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    drop(local_tx);

    tracing::info!("robot shutting down");
    run.stop();
    for worker in workers {
        if worker.join().is_err() {
            tracing::warn!("robot worker panicked");
        }
    }
    control.shutdown();
    terminal_guard.restore();
    tracing::info!("robot stopped");
    Ok(())
}
