//! # Channel Mixer
//!
//! Turns one [`RawSample`] into the [`ChannelFrame`] that goes on the wire.
//!
//! ## Per-Tick Pipeline
//!
//! 1. Normalize every continuous axis through its calibration.
//! 2. Zero pitch, roll, and yaw inside the deadband around center.
//! 3. Add trim to pitch, roll, and yaw, then clamp.
//! 4. Remap throttle to `0..=1023` when it is unidirectional.
//! 5. Resolve the discrete lines into switch and three-way positions.
//!
//! Throttle and the two pots never get deadband or trim.
//!
//! ## Example
//!
//! ```
//! use std::time::Instant;
//! use rc_transmitter::controller::calibration::CalibrationSet;
//! use rc_transmitter::controller::mixer::{ChannelMixer, ThrottleMode};
//! use rc_transmitter::controller::sample::RawSample;
//! use rc_transmitter::controller::trim::TrimState;
//!
//! let mixer = ChannelMixer::default();
//! let frame = mixer.mix(
//!     &RawSample::at_rest(Instant::now()),
//!     &CalibrationSet::default(),
//!     &TrimState::default(),
//!     ThrottleMode::Unidirectional,
//! );
//!
//! assert_eq!(frame.pitch, 0);
//! assert_eq!(frame.throttle, 0);
//! ```

use serde::{Deserialize, Serialize};

use super::calibration::{normalize, remap, AxisCalibration, AxisKind, CalibrationSet};
use super::sample::{Level, RawSample, ThreeWayLines};
use super::trim::TrimState;
use crate::packet::layout::{
    CHANNEL_VALUE_MAX, CHANNEL_VALUE_MIN, NUM_SWITCHES, NUM_THREE_WAY,
    THROTTLE_UNIDIRECTIONAL_MAX,
};

/// Default half-width of the zero zone around stick center.
pub const DEADBAND: i16 = 50;

/// How the throttle channel is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleMode {
    /// Stick bottom is zero; `0..=1023`.
    #[default]
    Unidirectional,
    /// Stick center is zero; `-511..=512` (reversible motors).
    Bidirectional,
}

impl ThrottleMode {
    /// The other mode.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            ThrottleMode::Unidirectional => ThrottleMode::Bidirectional,
            ThrottleMode::Bidirectional => ThrottleMode::Unidirectional,
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ThrottleMode::Unidirectional => "UNI",
            ThrottleMode::Bidirectional => "BI",
        }
    }
}

/// Channel values for one control tick.
///
/// Everything is in `-511..=512` except throttle in unidirectional mode
/// (`0..=1023`). Three-way positions are `-1`, `0`, or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelFrame {
    pub throttle: i16,
    pub pitch: i16,
    pub roll: i16,
    pub yaw: i16,
    pub aux1: i16,
    pub aux2: i16,
    /// AUX3..AUX6, true when closed
    pub switches: [bool; NUM_SWITCHES],
    /// AUX7, AUX8
    pub three_way: [i8; NUM_THREE_WAY],
}

/// Stateless per-tick channel mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMixer {
    deadband: i16,
}

impl Default for ChannelMixer {
    fn default() -> Self {
        Self::new(DEADBAND)
    }
}

impl ChannelMixer {
    /// Creates a mixer with the given deadband half-width.
    #[must_use]
    pub fn new(deadband: i16) -> Self {
        Self {
            deadband: deadband.saturating_abs(),
        }
    }

    /// Configured deadband.
    #[must_use]
    pub fn deadband(&self) -> i16 {
        self.deadband
    }

    /// Mixes one sample into a channel frame.
    ///
    /// Total over every input: a bad calibration yields 0 on that axis and
    /// leaves the rest alone.
    #[must_use]
    pub fn mix(
        &self,
        sample: &RawSample,
        calibration: &CalibrationSet,
        trim: &TrimState,
        throttle_mode: ThrottleMode,
    ) -> ChannelFrame {
        let throttle = normalize(sample.throttle, &calibration.throttle, AxisKind::Direct);

        let discrete = &sample.discrete;
        let mut three_way = [0i8; NUM_THREE_WAY];
        for (position, lines) in three_way.iter_mut().zip(discrete.three_way) {
            *position = resolve_three_way(lines);
        }

        ChannelFrame {
            throttle: apply_throttle_mode(throttle, throttle_mode),
            pitch: self.stick_axis(sample.pitch, &calibration.pitch, trim.pitch),
            roll: self.stick_axis(sample.roll, &calibration.roll, trim.roll),
            yaw: self.stick_axis(sample.yaw, &calibration.yaw, trim.yaw),
            aux1: normalize(sample.aux1, &calibration.aux1, AxisKind::Direct),
            aux2: normalize(sample.aux2, &calibration.aux2, AxisKind::Direct),
            switches: discrete.switches.map(Level::is_asserted),
            three_way,
        }
    }

    fn stick_axis(&self, raw: i32, calib: &AxisCalibration, trim: i16) -> i16 {
        let value = normalize(raw, calib, AxisKind::Centered);
        apply_trim(apply_deadband(value, self.deadband), trim)
    }
}

/// Zeroes values strictly inside the deadband; the boundary itself passes.
#[must_use]
pub fn apply_deadband(value: i16, deadband: i16) -> i16 {
    if value.saturating_abs() < deadband {
        0
    } else {
        value
    }
}

/// Adds a trim offset and clamps to the channel range.
#[must_use]
pub fn apply_trim(value: i16, trim: i16) -> i16 {
    (i32::from(value) + i32::from(trim))
        .clamp(CHANNEL_VALUE_MIN.into(), CHANNEL_VALUE_MAX.into()) as i16
}

/// Scales a normalized throttle for the given mode.
#[must_use]
pub fn apply_throttle_mode(value: i16, mode: ThrottleMode) -> i16 {
    match mode {
        ThrottleMode::Bidirectional => value,
        ThrottleMode::Unidirectional => remap(
            value.into(),
            CHANNEL_VALUE_MIN.into(),
            CHANNEL_VALUE_MAX.into(),
            0,
            THROTTLE_UNIDIRECTIONAL_MAX.into(),
        )
        .clamp(0, THROTTLE_UNIDIRECTIONAL_MAX.into()) as i16,
    }
}

/// Position of a three-way switch: A alone is up, B alone is down, anything
/// else (neither, or a faulty both) is center.
#[must_use]
pub fn resolve_three_way(lines: ThreeWayLines) -> i8 {
    match (lines.a.is_asserted(), lines.b.is_asserted()) {
        (true, false) => 1,
        (false, true) => -1,
        _ => 0,
    }
}
