//! # Telemetry Module
//!
//! Motion data carried in the control packet while gyro-assist is active.
//!
//! This module handles:
//! - The fixed-point [`MotionTelemetry`] fields sent on the wire (×100)
//! - The [`MotionSource`] seam for the IMU
//! - An evdev motion-sensor implementation for the host

use evdev::{AbsoluteAxisType, Device, PropType};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, TransmitterError};

/// Standard gravity, m/s² per g.
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Fixed-point scale of every motion field on the wire.
pub const MOTION_SCALE: f32 = 100.0;

/// One IMU reading in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionReading {
    /// Angular rate, rad/s
    pub gyro: [f32; 3],
    /// Acceleration, m/s²
    pub accel: [f32; 3],
}

/// Motion fields as carried in the packet.
///
/// Gyro in rad/s ×100, acceleration in m/s² ×100. All zero in manual mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionTelemetry {
    pub gyro: [i16; 3],
    pub accel: [i16; 3],
}

impl MotionTelemetry {
    /// Converts an SI reading to wire fields, saturating at the `i16` limits.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_transmitter::telemetry::{MotionReading, MotionTelemetry};
    ///
    /// let reading = MotionReading { gyro: [0.5, 0.0, -0.25], accel: [0.0, 0.0, 9.81] };
    /// let telemetry = MotionTelemetry::from_reading(&reading);
    /// assert_eq!(telemetry.gyro, [50, 0, -25]);
    /// assert_eq!(telemetry.accel[2], 981);
    /// ```
    #[must_use]
    pub fn from_reading(reading: &MotionReading) -> Self {
        Self {
            gyro: reading.gyro.map(to_fixed),
            accel: reading.accel.map(to_fixed),
        }
    }
}

fn to_fixed(value: f32) -> i16 {
    // Float-to-int `as` saturates and maps NaN to 0
    (value * MOTION_SCALE).round() as i16
}

/// IMU collaborator.
#[cfg_attr(test, mockall::automock)]
pub trait MotionSource {
    /// Reads the current motion state.
    fn read(&mut self) -> Result<MotionReading>;
}

const ACCEL_AXES: [AbsoluteAxisType; 3] = [
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_Z,
];

const GYRO_AXES: [AbsoluteAxisType; 3] = [
    AbsoluteAxisType::ABS_RX,
    AbsoluteAxisType::ABS_RY,
    AbsoluteAxisType::ABS_RZ,
];

/// Converts a raw accelerometer count to m/s², given counts per g.
#[must_use]
pub fn accel_from_raw(value: i32, resolution: i32) -> f32 {
    if resolution == 0 {
        return 0.0;
    }
    value as f32 / resolution as f32 * STANDARD_GRAVITY
}

/// Converts a raw gyroscope count to rad/s, given counts per degree/s.
#[must_use]
pub fn gyro_from_raw(value: i32, resolution: i32) -> f32 {
    if resolution == 0 {
        return 0.0;
    }
    (value as f32 / resolution as f32).to_radians()
}

/// Motion-sensor input device (kernel `INPUT_PROP_ACCELEROMETER`).
///
/// Accelerometer on ABS_X/Y/Z, gyroscope on ABS_RX/RY/RZ, both scaled by the
/// per-axis resolution the driver reports.
pub struct EvdevMotionSource {
    device: Device,
    device_path: String,
}

impl EvdevMotionSource {
    /// Open a motion sensor, either at `path` or the first one in `/dev/input`
    ///
    /// # Errors
    ///
    /// - `InputDeviceNotFound`: No motion sensor present
    /// - `Input`: The configured device could not be opened
    pub fn open(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            let device = Device::open(path)
                .map_err(|e| TransmitterError::Input(format!("Failed to open {}: {}", path, e)))?;
            info!("Using motion sensor at: {}", path);
            return Ok(Self {
                device,
                device_path: path.to_string(),
            });
        }

        let input_dir = Path::new("/dev/input");
        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| TransmitterError::Input(format!("Failed to read /dev/input: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map_or(false, |name| name.to_string_lossy().starts_with("event"))
            })
            .collect();
        entries.sort();

        for path in entries {
            match Device::open(&path) {
                Ok(device) if device.properties().contains(PropType::ACCELEROMETER) => {
                    let device_path = path.to_string_lossy().to_string();
                    info!("Found motion sensor at: {}", device_path);
                    return Ok(Self {
                        device,
                        device_path,
                    });
                }
                Ok(_) => {}
                Err(e) => debug!("Could not open {}: {}", path.display(), e),
            }
        }

        Err(TransmitterError::InputDeviceNotFound)
    }

    /// The `/dev/input/eventX` path in use.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl MotionSource for EvdevMotionSource {
    fn read(&mut self) -> Result<MotionReading> {
        let abs = self
            .device
            .get_abs_state()
            .map_err(|e| TransmitterError::Input(format!("Failed to read motion axes: {}", e)))?;

        let mut reading = MotionReading::default();
        for (out, axis) in reading.accel.iter_mut().zip(ACCEL_AXES) {
            if let Some(info) = abs.get(axis.0 as usize) {
                *out = accel_from_raw(info.value, info.resolution);
            }
        }
        for (out, axis) in reading.gyro.iter_mut().zip(GYRO_AXES) {
            if let Some(info) = abs.get(axis.0 as usize) {
                *out = gyro_from_raw(info.value, info.resolution);
            }
        }
        Ok(reading)
    }
}
