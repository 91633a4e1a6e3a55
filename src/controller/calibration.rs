//! # Calibration Module
//!
//! Linear mapping from raw ADC counts to the normalized channel range
//! `-511..=512`.
//!
//! ## Axis Kinds
//!
//! - **Direct** axes (throttle, potentiometers) map `[min, max]` straight onto
//!   the output range.
//! - **Centered** axes (spring-return sticks) map `raw - center` against a
//!   symmetric half-range of `(max - min) / 2`.
//!
//! Output is always clamped, so drift or jitter past the calibrated limits
//! lands on the boundary. A degenerate calibration (`min == max`) yields 0
//! instead of dividing by zero.
//!
//! ## Usage
//!
//! ```
//! use rc_transmitter::controller::calibration::{normalize, AxisCalibration, AxisKind};
//!
//! let cal = AxisCalibration::new(0, 4095, 2048);
//!
//! assert_eq!(normalize(0, &cal, AxisKind::Direct), -511);
//! assert_eq!(normalize(4095, &cal, AxisKind::Direct), 512);
//! assert_eq!(normalize(2048, &cal, AxisKind::Centered), 0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sample::RawSample;
use crate::packet::layout::{CHANNEL_VALUE_MAX, CHANNEL_VALUE_MIN};

/// Lowest raw ADC reading (12-bit converter).
pub const ADC_MIN: i32 = 0;
/// Highest raw ADC reading.
pub const ADC_MAX: i32 = 4095;
/// Raw reading of a stick at rest.
pub const ADC_CENTER: i32 = 2048;

/// Smallest min..max span a calibration capture will accept for an axis.
pub const MIN_CAPTURE_SPAN: i32 = 100;

/// How an axis maps onto the output range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    /// Straight `[min, max]` mapping.
    Direct,
    /// `raw - center` against a symmetric half-range.
    Centered,
}

/// Calibrated limits of one axis, in raw ADC counts.
///
/// Expected `min < center < max`, but nothing here panics if that is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisCalibration {
    pub min: i32,
    pub max: i32,
    pub center: i32,
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self {
            min: ADC_MIN,
            max: ADC_MAX,
            center: ADC_CENTER,
        }
    }
}

impl AxisCalibration {
    /// Creates a calibration from explicit limits.
    #[must_use]
    pub fn new(min: i32, max: i32, center: i32) -> Self {
        Self { min, max, center }
    }

    /// True when `min == max`; normalization returns 0 for such an axis.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// True when `min < center < max`.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.min < self.center && self.center < self.max
    }

    /// Half of the calibrated span, used by centered axes.
    #[must_use]
    pub fn half_range(&self) -> i32 {
        (self.max - self.min) / 2
    }
}

/// Calibration for every continuous channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSet {
    pub throttle: AxisCalibration,
    pub pitch: AxisCalibration,
    pub roll: AxisCalibration,
    pub yaw: AxisCalibration,
    pub aux1: AxisCalibration,
    pub aux2: AxisCalibration,
}

impl CalibrationSet {
    /// Every axis with its name, in packet order.
    #[must_use]
    pub fn axes(&self) -> [(&'static str, &AxisCalibration); 6] {
        [
            ("throttle", &self.throttle),
            ("pitch", &self.pitch),
            ("roll", &self.roll),
            ("yaw", &self.yaw),
            ("aux1", &self.aux1),
            ("aux2", &self.aux2),
        ]
    }

    fn axes_mut(&mut self) -> [(&'static str, &mut AxisCalibration); 6] {
        [
            ("throttle", &mut self.throttle),
            ("pitch", &mut self.pitch),
            ("roll", &mut self.roll),
            ("yaw", &mut self.yaw),
            ("aux1", &mut self.aux1),
            ("aux2", &mut self.aux2),
        ]
    }
}

/// Integer linear map with truncation toward zero.
///
/// Caller guarantees `in_min != in_max`.
#[inline]
fn map_range(value: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Remaps a value between two integer ranges, returning `out_min` for an empty
/// input range.
///
/// # Examples
///
/// ```
/// use rc_transmitter::controller::calibration::remap;
///
/// assert_eq!(remap(-511, -511, 512, 0, 1023), 0);
/// assert_eq!(remap(512, -511, 512, 0, 1023), 1023);
/// ```
#[must_use]
pub fn remap(value: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_min == in_max {
        return out_min;
    }
    map_range(
        value.into(),
        in_min.into(),
        in_max.into(),
        out_min.into(),
        out_max.into(),
    ) as i32
}

/// Converts a raw reading to the normalized range `-511..=512`.
///
/// # Arguments
///
/// * `raw` - Raw ADC reading
/// * `calib` - Calibrated limits of this axis
/// * `kind` - Direct or centered mapping
///
/// # Returns
///
/// Normalized value, clamped to `-511..=512`; 0 for a degenerate calibration.
#[must_use]
pub fn normalize(raw: i32, calib: &AxisCalibration, kind: AxisKind) -> i16 {
    let (value, in_min, in_max) = match kind {
        AxisKind::Direct => (raw, calib.min, calib.max),
        AxisKind::Centered => {
            let half = calib.half_range();
            (raw - calib.center, -half, half)
        }
    };

    if in_min == in_max {
        return 0;
    }

    let mapped = map_range(
        value.into(),
        in_min.into(),
        in_max.into(),
        CHANNEL_VALUE_MIN.into(),
        CHANNEL_VALUE_MAX.into(),
    );

    mapped.clamp(CHANNEL_VALUE_MIN.into(), CHANNEL_VALUE_MAX.into()) as i16
}

/// Where the operator is in a calibration capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    /// Sticks released; the next sample becomes the center.
    CaptureCenter,
    /// Operator sweeps every control to its limits.
    SweepExtents,
}

/// Interactive center/min/max capture.
///
/// Nothing is applied until [`finish`](Self::finish); [`cancel`](Self::cancel)
/// hands back the calibration the session started from.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    previous: CalibrationSet,
    working: CalibrationSet,
    step: CalibrationStep,
}

impl CalibrationSession {
    /// Starts a capture from the calibration currently in use.
    #[must_use]
    pub fn begin(current: &CalibrationSet) -> Self {
        Self {
            previous: *current,
            working: *current,
            step: CalibrationStep::CaptureCenter,
        }
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> CalibrationStep {
        self.step
    }

    /// Records the resting position and starts the sweep.
    ///
    /// Every axis restarts its limits at the current reading.
    pub fn capture_center(&mut self, sample: &RawSample) {
        let readings = readings(sample);
        for ((name, axis), raw) in self.working.axes_mut().into_iter().zip(readings) {
            *axis = AxisCalibration::new(raw, raw, raw);
            debug!("Captured {} center at {}", name, raw);
        }
        self.step = CalibrationStep::SweepExtents;
    }

    /// Widens the captured limits with a new reading.
    ///
    /// Ignored until the center has been captured.
    pub fn observe(&mut self, sample: &RawSample) {
        if self.step != CalibrationStep::SweepExtents {
            return;
        }
        let readings = readings(sample);
        for ((_, axis), raw) in self.working.axes_mut().into_iter().zip(readings) {
            axis.min = axis.min.min(raw);
            axis.max = axis.max.max(raw);
        }
    }

    /// Produces the new calibration.
    ///
    /// An axis that was not swept far enough keeps its previous calibration.
    /// Direct axes get their center moved to the middle of the new span.
    #[must_use]
    pub fn finish(self) -> CalibrationSet {
        if self.step != CalibrationStep::SweepExtents {
            warn!("Calibration finished before center capture, keeping previous values");
            return self.previous;
        }

        let mut result = self.working;
        let mut previous = self.previous;
        for ((name, axis), (_, old)) in result.axes_mut().into_iter().zip(previous.axes_mut()) {
            let span = axis.max - axis.min;
            if span < MIN_CAPTURE_SPAN {
                warn!(
                    "Axis {} only swept {} counts (need {}), keeping previous calibration",
                    name, span, MIN_CAPTURE_SPAN
                );
                *axis = *old;
                continue;
            }
            if !axis.is_ordered() {
                axis.center = axis.min + span / 2;
            }
        }

        result
    }

    /// Abandons the capture.
    #[must_use]
    pub fn cancel(self) -> CalibrationSet {
        self.previous
    }
}

fn readings(sample: &RawSample) -> [i32; 6] {
    [
        sample.throttle,
        sample.pitch,
        sample.roll,
        sample.yaw,
        sample.aux1,
        sample.aux2,
    ]
}
