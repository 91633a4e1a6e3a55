//! # Transmitter
//!
//! Ties the pipeline together and owns every piece of mutable state.
//!
//! ## Control tick
//!
//! ```text
//! sample -> trim buttons -> calibration capture -> mix -> motion -> encode -> transmit
//! ```
//!
//! A failed sample skips the tick. A failed transmit is counted and the next
//! tick sends fresh data; nothing is retried.
//!
//! ## UI tick
//!
//! Menu button edges drive the [`Menu`] state machine, whose commands are
//! carried out here. A status line is logged every status interval.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::calibration::{CalibrationSession, CalibrationSet};
use crate::controller::mixer::{ChannelFrame, ChannelMixer, ThrottleMode};
use crate::controller::sample::{InputSampler, RawSample};
use crate::controller::trim::TrimController;
use crate::error::{Result, TransmitterError};
use crate::link::{LinkAddressTable, RadioLink};
use crate::menu::{ButtonEdges, Menu, MenuCommand, MenuContext};
use crate::packet::{encode, ControlMode};
use crate::scheduler::TransmitScheduler;
use crate::settings::{Settings, SettingsStore};
use crate::telemetry::{MotionSource, MotionTelemetry};

/// Consecutive transmit failures before the link is reported lost
pub const LINK_LOST_THRESHOLD: u32 = 25;

/// Transmit counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub consecutive_failures: u32,
}

/// Result of one control tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Packet accepted by the link
    Sent,
    /// Packet built but the link rejected it
    TransmitFailed,
    /// No sample, nothing sent
    Skipped,
}

/// Everything the transmitter mutates
#[derive(Debug, Clone)]
pub struct TransmitterState {
    pub trim: TrimController,
    pub calibration: CalibrationSet,
    pub throttle_mode: ThrottleMode,
    pub control_mode: ControlMode,
    pub receivers: LinkAddressTable,
    /// Last frame handed to the encoder
    pub last_frame: ChannelFrame,
    /// Last successful sample
    pub last_sample: Option<RawSample>,
    /// Last good motion telemetry
    pub telemetry: MotionTelemetry,
    pub stats: LinkStats,
    pub menu: Menu,
    pub calibration_session: Option<CalibrationSession>,
}

impl TransmitterState {
    /// State restored from settings, with trim limits from `trim`.
    pub fn from_settings(settings: Settings, mut trim: TrimController) -> Self {
        trim.set(settings.trim);
        Self {
            trim,
            calibration: settings.calibration,
            throttle_mode: settings.throttle_mode,
            control_mode: settings.control_mode,
            receivers: settings.receivers,
            last_frame: ChannelFrame::default(),
            last_sample: None,
            telemetry: MotionTelemetry::default(),
            stats: LinkStats::default(),
            menu: Menu::default(),
            calibration_session: None,
        }
    }

    /// Snapshot of everything that persists.
    pub fn settings(&self) -> Settings {
        Settings {
            throttle_mode: self.throttle_mode,
            control_mode: self.control_mode,
            trim: *self.trim.state(),
            calibration: self.calibration,
            receivers: self.receivers.clone(),
        }
    }

    fn menu_context(&self) -> MenuContext {
        MenuContext {
            receiver_count: self.receivers.len(),
            current_receiver: self.receivers.current_slot(),
        }
    }
}

/// The transmitter and its collaborators
pub struct Transmitter<I, L, M, S> {
    state: TransmitterState,
    input: I,
    link: L,
    motion: Option<M>,
    store: S,
    mixer: ChannelMixer,
    buttons: ButtonEdges,
    scheduler: TransmitScheduler,
    status_interval: Duration,
    last_status: Option<Instant>,
}

impl<I, L, M, S> Transmitter<I, L, M, S>
where
    I: InputSampler,
    L: RadioLink,
    M: MotionSource,
    S: SettingsStore,
{
    /// Create a transmitter
    ///
    /// # Arguments
    ///
    /// * `config` - Loop timing, trim limits, and deadband
    /// * `settings` - Restored operator settings
    /// * `input` - Control sampler
    /// * `link` - Radio link
    /// * `motion` - IMU, if present
    /// * `store` - Where settings are saved
    pub fn new(
        config: &Config,
        settings: Settings,
        input: I,
        link: L,
        motion: Option<M>,
        store: S,
    ) -> Self {
        let trim = TrimController::new(
            config.trim.step,
            config.trim.max,
            config.trim.repeat_interval(),
        );

        Self {
            state: TransmitterState::from_settings(settings, trim),
            input,
            link,
            motion,
            store,
            mixer: ChannelMixer::new(config.mixer.deadband),
            buttons: ButtonEdges::new(config.scheduler.button_debounce()),
            scheduler: TransmitScheduler::new(
                config.scheduler.control_period(),
                config.scheduler.ui_period(),
            ),
            status_interval: config.scheduler.status_interval(),
            last_status: None,
        }
    }

    /// Current state
    pub fn state(&self) -> &TransmitterState {
        &self.state
    }

    /// Point the link at the current receiver.
    ///
    /// A failure is logged; the loop can still run and a later receiver
    /// switch retries the address.
    pub async fn start(&mut self) {
        let current = self.state.receivers.current().clone();
        match self.link.set_outbound_address(&current.address).await {
            Ok(()) => info!(
                "Transmitting to receiver {} ({}) at {}",
                self.state.receivers.current_slot(),
                current.name,
                current.address
            ),
            Err(e) => warn!("Failed to set initial receiver address: {}", e),
        }
    }

    /// Run one control tick.
    pub async fn control_tick(&mut self, now: Instant) -> TickOutcome {
        let sample = match self.input.sample(now) {
            Ok(sample) => sample,
            Err(e) => {
                self.state.stats.skipped += 1;
                debug!("Skipping control tick: {}", e);
                return TickOutcome::Skipped;
            }
        };

        self.state.trim.apply_lines(&sample.discrete.trim, now);

        if let Some(session) = self.state.calibration_session.as_mut() {
            session.observe(&sample);
        }

        let frame = self.mixer.mix(
            &sample,
            &self.state.calibration,
            self.state.trim.state(),
            self.state.throttle_mode,
        );
        self.state.last_frame = frame;
        self.state.last_sample = Some(sample);
        self.state.telemetry = self.read_telemetry();

        let packet = encode(
            &frame,
            self.state.trim.state(),
            &self.state.telemetry,
            self.state.control_mode,
        );

        let stats = &mut self.state.stats;
        match self.link.transmit(&packet).await {
            Ok(()) => {
                if stats.consecutive_failures >= LINK_LOST_THRESHOLD {
                    info!(
                        "Link recovered after {} failed packets",
                        stats.consecutive_failures
                    );
                }
                stats.sent += 1;
                stats.consecutive_failures = 0;
                TickOutcome::Sent
            }
            Err(e) => {
                stats.failed += 1;
                stats.consecutive_failures += 1;
                debug!("Transmit failed: {}", e);
                if stats.consecutive_failures == LINK_LOST_THRESHOLD {
                    warn!(
                        "Link lost: {} consecutive packets failed",
                        LINK_LOST_THRESHOLD
                    );
                }
                TickOutcome::TransmitFailed
            }
        }
    }

    fn read_telemetry(&mut self) -> MotionTelemetry {
        if self.state.control_mode != ControlMode::GyroAssist {
            return MotionTelemetry::default();
        }

        match self.motion.as_mut() {
            Some(motion) => match motion.read() {
                Ok(reading) => MotionTelemetry::from_reading(&reading),
                Err(e) => {
                    debug!("Motion read failed, keeping last telemetry: {}", e);
                    self.state.telemetry
                }
            },
            None => MotionTelemetry::default(),
        }
    }

    /// Run one UI tick.
    pub async fn ui_tick(&mut self, now: Instant) {
        if let Some(sample) = self.state.last_sample {
            for button in self.buttons.update(sample.discrete.menu, now) {
                let (next, command) = self.state.menu.handle(button, &self.state.menu_context());
                if next != self.state.menu {
                    debug!("Menu: {}", next.title());
                }
                self.state.menu = next;
                if let Some(command) = command {
                    self.execute(command).await;
                }
            }
        }

        let status_due = self
            .last_status
            .map_or(true, |last| now.saturating_duration_since(last) >= self.status_interval);
        if status_due {
            self.log_status();
            self.last_status = Some(now);
        }
    }

    fn log_status(&self) {
        let state = &self.state;
        let frame = &state.last_frame;
        let trim = state.trim.state();
        info!(
            "{} (slot {}) | {} {} | T{} P{} R{} Y{} | trim {}/{}/{} | sent {} failed {} skipped {}",
            state.receivers.current().name,
            state.receivers.current_slot(),
            state.throttle_mode.label(),
            state.control_mode.label(),
            frame.throttle,
            frame.pitch,
            frame.roll,
            frame.yaw,
            trim.pitch,
            trim.roll,
            trim.yaw,
            state.stats.sent,
            state.stats.failed,
            state.stats.skipped
        );
    }

    async fn execute(&mut self, command: MenuCommand) {
        match command {
            MenuCommand::SelectReceiver(slot) => {
                if let Err(e) = self.switch_receiver(slot).await {
                    warn!("Receiver switch failed: {}", e);
                }
            }
            MenuCommand::ToggleThrottleMode => {
                self.state.throttle_mode = self.state.throttle_mode.toggled();
                info!("Throttle mode: {}", self.state.throttle_mode.label());
            }
            MenuCommand::AdjustTrim(axis, direction) => {
                self.state.trim.adjust(axis, direction);
            }
            MenuCommand::CaptureCenter => match self.state.last_sample {
                Some(sample) => {
                    let mut session = CalibrationSession::begin(&self.state.calibration);
                    session.capture_center(&sample);
                    self.state.calibration_session = Some(session);
                    info!("Calibration: centers captured, sweep every axis to its limits");
                }
                None => warn!("Calibration: no sample yet, cannot capture centers"),
            },
            MenuCommand::CommitCalibration => match self.state.calibration_session.take() {
                Some(session) => {
                    self.state.calibration = session.finish();
                    info!("Calibration applied (save to keep it)");
                }
                None => warn!("Calibration: nothing captured"),
            },
            MenuCommand::CancelCalibration => {
                if let Some(session) = self.state.calibration_session.take() {
                    self.state.calibration = session.cancel();
                    info!("Calibration cancelled");
                }
            }
            MenuCommand::SaveSettings => {
                if let Err(e) = self.save_settings() {
                    warn!("Failed to save settings: {}", e);
                }
            }
        }
    }

    /// Switch the outbound link to another receiver slot.
    ///
    /// The table is consulted first, then the link is reconfigured, and only
    /// then does the slot become current.
    ///
    /// # Errors
    ///
    /// - `InvalidSlot` if the slot is out of range or inactive; the link is
    ///   not touched
    /// - `LinkReconfigure` if the link rejects the address; the previous
    ///   receiver stays current
    pub async fn switch_receiver(&mut self, slot: usize) -> Result<()> {
        let selection = self.state.receivers.select(slot)?;

        self.link
            .set_outbound_address(&selection.address)
            .await
            .map_err(|e| match e {
                TransmitterError::LinkReconfigure(_) => e,
                other => TransmitterError::LinkReconfigure(other.to_string()),
            })?;

        self.state.receivers.commit(&selection);
        info!(
            "Switched to receiver {} ({}) at {}",
            selection.slot, selection.name, selection.address
        );
        Ok(())
    }

    /// Persist the current settings.
    ///
    /// # Errors
    ///
    /// Whatever the store reports
    pub fn save_settings(&mut self) -> Result<()> {
        self.state.settings().save_to(&mut self.store)?;
        info!("Settings saved");
        Ok(())
    }

    /// Poll the scheduler until `shutdown` completes.
    ///
    /// # Returns
    ///
    /// Final link statistics
    pub async fn run_until<F>(&mut self, shutdown: F) -> LinkStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Control loop running (control {:?}, ui {:?})",
            self.scheduler.control_period(),
            self.scheduler.ui_period()
        );

        loop {
            let deadline = self.scheduler.next_deadline(Instant::now());
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {}
            }

            let now = Instant::now();
            let ticks = self.scheduler.poll(now);
            if ticks.control {
                self.control_tick(now).await;
            }
            if ticks.ui {
                self.ui_tick(now).await;
            }
        }

        self.state.stats
    }
}
