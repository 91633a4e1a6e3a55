//! # Trim Module
//!
//! Operator-adjustable offsets for pitch, roll, and yaw.
//!
//! Trim moves in fixed steps, never leaves `[-max, max]`, and a held button
//! repeats no faster than once per repeat interval. Every pressed line is
//! applied in the same update, so holding two trims moves both.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::sample::TrimLines;

/// Trim change per button press.
pub const TRIM_STEP: i16 = 4;

/// Trim magnitude limit.
pub const TRIM_MAX: i16 = 100;

/// Minimum time between two trim updates while a button is held.
pub const TRIM_REPEAT_INTERVAL: Duration = Duration::from_millis(200);

/// A trimmable axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimAxis {
    Pitch,
    Roll,
    Yaw,
}

impl TrimAxis {
    /// Number of trimmable axes.
    pub const COUNT: usize = 3;

    /// All axes, in packet order.
    pub const ALL: [TrimAxis; Self::COUNT] = [TrimAxis::Pitch, TrimAxis::Roll, TrimAxis::Yaw];

    /// Position in [`ALL`](Self::ALL) and in per-axis arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            TrimAxis::Pitch => 0,
            TrimAxis::Roll => 1,
            TrimAxis::Yaw => 2,
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TrimAxis::Pitch => "Pitch",
            TrimAxis::Roll => "Roll",
            TrimAxis::Yaw => "Yaw",
        }
    }

    /// The axis after this one, or `None` after yaw.
    #[must_use]
    pub fn next(self) -> Option<TrimAxis> {
        match self {
            TrimAxis::Pitch => Some(TrimAxis::Roll),
            TrimAxis::Roll => Some(TrimAxis::Yaw),
            TrimAxis::Yaw => None,
        }
    }
}

/// Direction of a single trim step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimDirection {
    Up,
    Down,
}

/// Current trim offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrimState {
    pub pitch: i16,
    pub roll: i16,
    pub yaw: i16,
}

impl TrimState {
    /// Offset for one axis.
    #[must_use]
    pub fn get(&self, axis: TrimAxis) -> i16 {
        match axis {
            TrimAxis::Pitch => self.pitch,
            TrimAxis::Roll => self.roll,
            TrimAxis::Yaw => self.yaw,
        }
    }

    fn get_mut(&mut self, axis: TrimAxis) -> &mut i16 {
        match axis {
            TrimAxis::Pitch => &mut self.pitch,
            TrimAxis::Roll => &mut self.roll,
            TrimAxis::Yaw => &mut self.yaw,
        }
    }
}

/// Owns the trim state and enforces step, bound, and repeat rate.
#[derive(Debug, Clone)]
pub struct TrimController {
    state: TrimState,
    step: i16,
    max: i16,
    repeat_interval: Duration,
    last_update: Option<Instant>,
}

impl Default for TrimController {
    fn default() -> Self {
        Self::new(TRIM_STEP, TRIM_MAX, TRIM_REPEAT_INTERVAL)
    }
}

impl TrimController {
    /// Creates a controller with all trims at zero.
    ///
    /// # Arguments
    ///
    /// * `step` - Change per press (forced to at least 1)
    /// * `max` - Magnitude limit
    /// * `repeat_interval` - Minimum time between button-driven updates
    #[must_use]
    pub fn new(step: i16, max: i16, repeat_interval: Duration) -> Self {
        Self {
            state: TrimState::default(),
            step: step.max(1),
            max: max.saturating_abs(),
            repeat_interval,
            last_update: None,
        }
    }

    /// Current offsets.
    #[must_use]
    pub fn state(&self) -> &TrimState {
        &self.state
    }

    /// Replaces all offsets, clamping each into range.
    pub fn set(&mut self, state: TrimState) {
        for axis in TrimAxis::ALL {
            *self.state.get_mut(axis) = state.get(axis).clamp(-self.max, self.max);
        }
    }

    /// Zeroes every axis.
    pub fn reset(&mut self) {
        self.state = TrimState::default();
    }

    /// Moves one axis one step up. Returns true if the value changed.
    pub fn increment(&mut self, axis: TrimAxis) -> bool {
        self.adjust(axis, TrimDirection::Up)
    }

    /// Moves one axis one step down. Returns true if the value changed.
    pub fn decrement(&mut self, axis: TrimAxis) -> bool {
        self.adjust(axis, TrimDirection::Down)
    }

    /// Moves one axis one step, saturating at the bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_transmitter::controller::trim::{TrimAxis, TrimController, TrimDirection};
    ///
    /// let mut trim = TrimController::default();
    /// assert!(trim.adjust(TrimAxis::Roll, TrimDirection::Down));
    /// assert_eq!(trim.state().roll, -4);
    /// ```
    pub fn adjust(&mut self, axis: TrimAxis, direction: TrimDirection) -> bool {
        let max = self.max;
        let delta = match direction {
            TrimDirection::Up => self.step,
            TrimDirection::Down => -self.step,
        };
        let value = self.state.get_mut(axis);
        let updated = value.saturating_add(delta).clamp(-max, max);
        if updated == *value {
            return false;
        }
        *value = updated;
        debug!("Trim {} -> {}", axis.label(), updated);
        true
    }

    /// Applies held trim buttons, rate-limited to one update per repeat
    /// interval.
    ///
    /// # Arguments
    ///
    /// * `lines` - Trim button lines indexed by [`TrimAxis::index`]
    /// * `now` - Current time
    ///
    /// # Returns
    ///
    /// True if any trim value changed.
    pub fn apply_lines(&mut self, lines: &[TrimLines; TrimAxis::COUNT], now: Instant) -> bool {
        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < self.repeat_interval {
                return false;
            }
        }

        let mut pressed = false;
        let mut changed = false;
        for axis in TrimAxis::ALL {
            let pair = lines[axis.index()];
            if pair.up.is_asserted() {
                pressed = true;
                changed |= self.increment(axis);
            }
            if pair.down.is_asserted() {
                pressed = true;
                changed |= self.decrement(axis);
            }
        }

        if pressed {
            self.last_update = Some(now);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::sample::Level;

    fn press(axis: TrimAxis, direction: TrimDirection) -> [TrimLines; TrimAxis::COUNT] {
        let mut lines = [TrimLines::default(); TrimAxis::COUNT];
        match direction {
            TrimDirection::Up => lines[axis.index()].up = Level::Low,
            TrimDirection::Down => lines[axis.index()].down = Level::Low,
        }
        lines
    }

    #[test]
    fn test_trim_axis_order() {
        for (i, axis) in TrimAxis::ALL.iter().enumerate() {
            assert_eq!(axis.index(), i);
        }
        assert_eq!(TrimAxis::Pitch.next(), Some(TrimAxis::Roll));
        assert_eq!(TrimAxis::Yaw.next(), None);
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut trim = TrimController::default();
        assert!(trim.increment(TrimAxis::Pitch));
        assert!(trim.increment(TrimAxis::Pitch));
        assert!(trim.decrement(TrimAxis::Yaw));
        assert_eq!(
            *trim.state(),
            TrimState {
                pitch: 8,
                roll: 0,
                yaw: -4
            }
        );
    }

    #[test]
    fn test_increment_saturates_at_max() {
        let mut trim = TrimController::default();
        for _ in 0..25 {
            trim.increment(TrimAxis::Roll);
        }
        assert_eq!(trim.state().roll, 100);

        // One more is a no-op
        assert!(!trim.increment(TrimAxis::Roll));
        assert_eq!(trim.state().roll, 100);
    }

    #[test]
    fn test_thirty_pitch_increments_stop_at_max() {
        let mut trim = TrimController::default();
        for _ in 0..30 {
            trim.increment(TrimAxis::Pitch);
        }
        assert_eq!(trim.state().pitch, 100);
        assert_eq!(trim.state().roll, 0);
        assert_eq!(trim.state().yaw, 0);
    }

    #[test]
    fn test_step_not_dividing_max_clamps() {
        let mut trim = TrimController::new(30, 100, TRIM_REPEAT_INTERVAL);
        for _ in 0..4 {
            trim.decrement(TrimAxis::Yaw);
        }
        assert_eq!(trim.state().yaw, -100);
    }

    #[test]
    fn test_set_clamps() {
        let mut trim = TrimController::default();
        trim.set(TrimState {
            pitch: 500,
            roll: -500,
            yaw: 12,
        });
        assert_eq!(
            *trim.state(),
            TrimState {
                pitch: 100,
                roll: -100,
                yaw: 12
            }
        );

        trim.reset();
        assert_eq!(*trim.state(), TrimState::default());
    }

    #[test]
    fn test_apply_lines_rate_limited() {
        let mut trim = TrimController::default();
        let t0 = Instant::now();
        let lines = press(TrimAxis::Pitch, TrimDirection::Up);

        assert!(trim.apply_lines(&lines, t0));
        // Held, but too soon
        assert!(!trim.apply_lines(&lines, t0 + Duration::from_millis(20)));
        assert!(!trim.apply_lines(&lines, t0 + Duration::from_millis(199)));
        // Exactly one interval later repeats
        assert!(trim.apply_lines(&lines, t0 + Duration::from_millis(200)));
        assert_eq!(trim.state().pitch, 8);
    }

    #[test]
    fn test_apply_lines_held_for_one_second() {
        let mut trim = TrimController::default();
        let t0 = Instant::now();
        let lines = press(TrimAxis::Pitch, TrimDirection::Up);

        // 50 control ticks at 20 ms
        for tick in 0..50 {
            trim.apply_lines(&lines, t0 + Duration::from_millis(tick * 20));
        }
        // Updates at 0, 200, 400, 600, 800
        assert_eq!(trim.state().pitch, 20);
    }

    #[test]
    fn test_apply_lines_nothing_pressed() {
        let mut trim = TrimController::default();
        let t0 = Instant::now();
        let idle = [TrimLines::default(); TrimAxis::COUNT];

        assert!(!trim.apply_lines(&idle, t0));
        // Idle tick does not start the repeat window
        let lines = press(TrimAxis::Roll, TrimDirection::Down);
        assert!(trim.apply_lines(&lines, t0 + Duration::from_millis(10)));
        assert_eq!(trim.state().roll, -4);
    }

    #[test]
    fn test_apply_lines_multiple_axes() {
        let mut trim = TrimController::default();
        let mut lines = press(TrimAxis::Pitch, TrimDirection::Up);
        lines[TrimAxis::Yaw.index()].down = Level::Low;

        assert!(trim.apply_lines(&lines, Instant::now()));
        assert_eq!(trim.state().pitch, 4);
        assert_eq!(trim.state().yaw, -4);
        assert_eq!(trim.state().roll, 0);
    }

    #[test]
    fn test_apply_lines_at_bound_reports_no_change() {
        let mut trim = TrimController::default();
        trim.set(TrimState {
            pitch: 100,
            ..TrimState::default()
        });
        let lines = press(TrimAxis::Pitch, TrimDirection::Up);
        assert!(!trim.apply_lines(&lines, Instant::now()));
        assert_eq!(trim.state().pitch, 100);
    }
}
