//! # Joystick Input Module
//!
//! Reads the transmitter's controls from a Linux evdev joystick.
//!
//! ## Device Detection
//!
//! With no configured path, the first `/dev/input/event*` device that reports
//! every axis in the [`ControlMap`] and the menu buttons is used.
//!
//! ## Sampling
//!
//! State is read with `EVIOCGABS`/`EVIOCGKEY` ioctls on every tick, so a
//! sample never blocks and always reflects the latest position regardless of
//! how many events were queued.

use evdev::{AbsoluteAxisType, Device};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use super::mapper::{AxisReading, ControlMap};
use super::sample::{InputSampler, RawSample};
use crate::error::{Result, TransmitterError};

/// Joystick handle
///
/// Represents an open evdev device plus the layout used to read it.
pub struct JoystickSampler {
    device: Device,
    device_path: String,
    map: ControlMap,
}

impl JoystickSampler {
    /// Open a joystick, either at `path` or by scanning `/dev/input`
    ///
    /// # Errors
    ///
    /// - `InputDeviceNotFound`: No suitable device found on the system
    /// - `Input`: The configured device could not be opened or lacks axes
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_transmitter::controller::joystick::JoystickSampler;
    /// use rc_transmitter::controller::mapper::ControlMap;
    ///
    /// let sampler = JoystickSampler::open(None, ControlMap::default())?;
    /// println!("Reading controls from: {}", sampler.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: Option<&str>, map: ControlMap) -> Result<Self> {
        match path {
            Some(path) => Self::open_path(Path::new(path), map),
            None => Self::autodetect(map),
        }
    }

    fn open_path(path: &Path, map: ControlMap) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            TransmitterError::Input(format!("Failed to open {}: {}", path.display(), e))
        })?;

        if !supports(&device, &map) {
            return Err(TransmitterError::Input(format!(
                "{} does not provide the required axes and buttons",
                path.display()
            )));
        }

        let device_path = path.to_string_lossy().to_string();
        info!("Using input device at: {}", device_path);
        Ok(Self {
            device,
            device_path,
            map,
        })
    }

    fn autodetect(map: ControlMap) -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(TransmitterError::Input(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| TransmitterError::Input(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TransmitterError::Input(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic choice when several joysticks are attached
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            match path.file_name() {
                Some(name) if name.to_string_lossy().starts_with("event") => {}
                _ => continue,
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if supports(&device, &map) {
                        let device_path = path.to_string_lossy().to_string();
                        info!("Found joystick at: {}", device_path);
                        return Ok(Self {
                            device,
                            device_path,
                            map,
                        });
                    }
                }
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(TransmitterError::InputDeviceNotFound)
    }

    /// The `/dev/input/eventX` path in use.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Device name reported by the kernel.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

fn supports(device: &Device, map: &ControlMap) -> bool {
    let axes_ok = device.supported_absolute_axes().map_or(false, |axes| {
        [map.throttle, map.pitch, map.roll, map.yaw]
            .iter()
            .all(|binding| axes.contains(binding.axis))
    });
    let keys_ok = device.supported_keys().map_or(false, |keys| {
        [map.menu_up, map.menu_down, map.menu_select]
            .iter()
            .all(|key| keys.contains(*key))
    });
    axes_ok && keys_ok
}

impl InputSampler for JoystickSampler {
    fn sample(&mut self, now: Instant) -> Result<RawSample> {
        let abs = self
            .device
            .get_abs_state()
            .map_err(|e| TransmitterError::Input(format!("Failed to read axes: {}", e)))?;
        let keys = self
            .device
            .get_key_state()
            .map_err(|e| TransmitterError::Input(format!("Failed to read buttons: {}", e)))?;

        let reading = |axis: AbsoluteAxisType| {
            abs.get(axis.0 as usize)
                .map(|info| AxisReading {
                    value: info.value,
                    minimum: info.minimum,
                    maximum: info.maximum,
                })
                .unwrap_or(AxisReading {
                    value: 0,
                    minimum: 0,
                    maximum: 0,
                })
        };

        Ok(self.map.build_sample(&keys, reading, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_path() {
        let result = JoystickSampler::open(
            Some("/nonexistent/input/event99"),
            ControlMap::default(),
        );
        assert!(matches!(result, Err(TransmitterError::Input(_))));
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_sample_with_real_hardware() {
        let mut sampler = JoystickSampler::open(None, ControlMap::default())
            .expect("Joystick not found");
        assert!(sampler.device_path().starts_with("/dev/input/event"));

        let sample = sampler.sample(Instant::now()).expect("Sample failed");
        println!("Sample: {:?}", sample);
    }
}
