//! # Transmit Scheduler
//!
//! Two independent periodic ticks polled from one loop: the control tick that
//! samples, mixes and transmits, and the slower UI tick.
//!
//! Each poll fires a tick at most once. A tick that is late fires on the next
//! poll and the period restarts from that moment, so a stall never produces a
//! burst of catch-up ticks.

use std::time::{Duration, Instant};

/// Default control tick period
pub const DEFAULT_CONTROL_PERIOD: Duration = Duration::from_millis(20);

/// Default UI tick period
pub const DEFAULT_UI_PERIOD: Duration = Duration::from_millis(100);

/// Ticks due on one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSet {
    pub control: bool,
    pub ui: bool,
}

impl TickSet {
    /// True if either tick is due
    pub fn any(&self) -> bool {
        self.control || self.ui
    }
}

#[derive(Debug, Clone)]
struct Periodic {
    period: Duration,
    last: Option<Instant>,
}

impl Periodic {
    fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    fn due_at(&self) -> Option<Instant> {
        self.last.map(|last| last + self.period)
    }

    fn poll(&mut self, now: Instant) -> bool {
        let due = match self.due_at() {
            None => true,
            Some(at) => now >= at,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

/// Two-rate tick source
#[derive(Debug, Clone)]
pub struct TransmitScheduler {
    control: Periodic,
    ui: Periodic,
}

impl Default for TransmitScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_PERIOD, DEFAULT_UI_PERIOD)
    }
}

impl TransmitScheduler {
    /// Creates a scheduler with both ticks due on the first poll
    pub fn new(control_period: Duration, ui_period: Duration) -> Self {
        Self {
            control: Periodic::new(control_period),
            ui: Periodic::new(ui_period),
        }
    }

    /// Checks both ticks against `now`.
    ///
    /// Both fire on the first poll.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_transmitter::scheduler::TransmitScheduler;
    /// use std::time::{Duration, Instant};
    ///
    /// let mut scheduler = TransmitScheduler::default();
    /// let t0 = Instant::now();
    /// assert!(scheduler.poll(t0).control);
    /// assert!(!scheduler.poll(t0 + Duration::from_millis(5)).control);
    /// assert!(scheduler.poll(t0 + Duration::from_millis(20)).control);
    /// ```
    pub fn poll(&mut self, now: Instant) -> TickSet {
        TickSet {
            control: self.control.poll(now),
            ui: self.ui.poll(now),
        }
    }

    /// Earliest moment either tick becomes due.
    pub fn next_deadline(&self, now: Instant) -> Instant {
        match (self.control.due_at(), self.ui.due_at()) {
            (Some(control), Some(ui)) => control.min(ui),
            _ => now,
        }
    }

    /// Interval between control ticks
    pub fn control_period(&self) -> Duration {
        self.control.period
    }

    /// Interval between UI ticks
    pub fn ui_period(&self) -> Duration {
        self.ui.period
    }
}
