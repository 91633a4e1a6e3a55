//! # RC Transmitter
//!
//! Turn a joystick into a radio-control transmitter.
//!
//! Reads sticks and buttons from an evdev joystick, mixes them into channel
//! values, and sends a 38-byte control packet through a USB radio bridge
//! every control tick.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use rc_transmitter::config::{Config, LoggingConfig};
use rc_transmitter::controller::joystick::JoystickSampler;
use rc_transmitter::controller::mapper::ControlMap;
use rc_transmitter::link::SerialRadioLink;
use rc_transmitter::settings::{JsonFileStore, Settings};
use rc_transmitter::telemetry::EvdevMotionSource;
use rc_transmitter::transmitter::Transmitter;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for daily log files
const LOG_FILE_PREFIX: &str = "rc-transmitter.log";

/// Main entry point for the RC transmitter
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging to stdout and, optionally, a daily log file
///    - Open the joystick, the radio bridge, and the motion sensor
///    - Restore saved settings and point the radio at the current receiver
///
/// 2. **Main Loop**
///    - Control tick: sample, mix, encode, transmit
///    - UI tick: menu buttons and periodic status
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded
/// - No joystick or radio bridge is found
/// - The radio refuses the configured RF channel
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO rc_transmitter: RC Transmitter v0.1.0 starting...
/// INFO rc_transmitter::link: Opened radio bridge at /dev/ttyACM0 (115200 baud)
/// INFO rc_transmitter::transmitter: Transmitting to receiver 0 (RX1) at E7E7E7E7E0
/// INFO rc_transmitter::transmitter: RX1 (slot 0) | UNI MAN | T0 P0 R0 Y0 | trim 0/0/0 | sent 250 failed 0 skipped 0
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging)?;

    info!("RC Transmitter v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let input = JoystickSampler::open(config.input.device(), ControlMap::default())
        .context("Failed to open joystick")?;
    if let Some(name) = input.name() {
        info!("Joystick: {}", name);
    }

    let mut link = SerialRadioLink::open_with_paths(
        config.link.ports.as_slice(),
        config.link.baud_rate,
        config.link.reply_timeout(),
    )?;
    link.set_rf_channel(config.link.rf_channel)
        .await
        .context("Failed to tune radio")?;

    let motion = if config.input.motion_enabled {
        match EvdevMotionSource::open(config.input.motion_device()) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!("No motion sensor ({}), gyro-assist will send zero motion", e);
                None
            }
        }
    } else {
        None
    };

    let store = JsonFileStore::open(&config.settings.path)
        .with_context(|| format!("Failed to open settings at {}", config.settings.path))?;
    let settings = Settings::restore(&store, &Settings::from_config(&config));

    let mut transmitter = Transmitter::new(&config, settings, input, link, motion, store);
    transmitter.start().await;

    info!("Press Ctrl+C to exit");
    let stats = transmitter
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        "Total packets sent: {} (failed {}, skipped ticks {})",
        stats.sent, stats.failed, stats.skipped
    );
    Ok(())
}

/// Set up tracing to stdout, plus a daily rolling file when a log directory
/// is configured.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the program.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level {}", config.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let (file_layer, guard) = match config.dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
