//! # Control Map Module
//!
//! Maps an evdev joystick onto the transmitter's controls, producing the same
//! [`RawSample`] the hardware ADC and I/O expander would.
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Control | evdev Code | Notes |
//! |---------|------------|-------|
//! | Throttle | ABS_Y | Left stick Y, inverted (up = full) |
//! | Yaw | ABS_X | Left stick X |
//! | Roll | ABS_Z | Right stick X |
//! | Pitch | ABS_RZ | Right stick Y, inverted |
//! | AUX1 | ABS_RX | Left trigger |
//! | AUX2 | ABS_RY | Right trigger |
//! | AUX7 | ABS_HAT0X | D-pad left/right |
//! | AUX8 | ABS_HAT0Y | D-pad up/down |
//!
//! Every axis is rescaled from the device's own range to `0..=4095`, so the
//! default calibration is usable before the first capture.
//!
//! ## Button Codes (EV_KEY)
//!
//! | Control | evdev Code |
//! |---------|------------|
//! | AUX3..AUX6 | BTN_TL, BTN_TR, BTN_TL2, BTN_TR2 |
//! | Pitch trim up / down | BTN_NORTH / BTN_SOUTH |
//! | Roll trim up / down | BTN_EAST / BTN_WEST |
//! | Yaw trim up / down | BTN_THUMBR / BTN_THUMBL |
//! | Menu up / down / select | BTN_START / BTN_SELECT / BTN_MODE |

use evdev::{AbsoluteAxisType, AttributeSetRef, Key};
use std::time::Instant;

use super::calibration::{remap, ADC_MAX, ADC_MIN};
use super::sample::{port_bits, DiscreteInputSnapshot, Level, MenuLines, RawSample, PORT_IDLE};

/// One reading of an absolute axis together with its reported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisReading {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
}

impl AxisReading {
    /// Rescales the reading to ADC counts.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_transmitter::controller::mapper::AxisReading;
    ///
    /// let reading = AxisReading { value: 255, minimum: 0, maximum: 255 };
    /// assert_eq!(reading.to_adc(false), 4095);
    /// assert_eq!(reading.to_adc(true), 0);
    /// ```
    #[must_use]
    pub fn to_adc(self, inverted: bool) -> i32 {
        let (out_min, out_max) = if inverted {
            (ADC_MAX, ADC_MIN)
        } else {
            (ADC_MIN, ADC_MAX)
        };
        remap(self.value, self.minimum, self.maximum, out_min, out_max)
    }
}

/// Binding of one continuous control to a device axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBinding {
    pub axis: AbsoluteAxisType,
    pub inverted: bool,
}

impl AxisBinding {
    const fn new(axis: AbsoluteAxisType, inverted: bool) -> Self {
        Self { axis, inverted }
    }
}

/// Binding of one expander line to a device button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBinding {
    pub key: Key,
    pub bit: u8,
}

impl LineBinding {
    const fn new(key: Key, bit: u8) -> Self {
        Self { key, bit }
    }
}

/// Binding of a three-way switch to a hat axis.
///
/// Positive hat values drive line A, negative drive line B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HatBinding {
    pub axis: AbsoluteAxisType,
    pub bit_a: u8,
    pub bit_b: u8,
}

/// Full joystick-to-transmitter control layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMap {
    pub throttle: AxisBinding,
    pub pitch: AxisBinding,
    pub roll: AxisBinding,
    pub yaw: AxisBinding,
    pub aux1: AxisBinding,
    pub aux2: AxisBinding,
    pub lines: Vec<LineBinding>,
    pub hats: Vec<HatBinding>,
    pub menu_up: Key,
    pub menu_down: Key,
    pub menu_select: Key,
}

impl Default for ControlMap {
    fn default() -> Self {
        Self {
            throttle: AxisBinding::new(AbsoluteAxisType::ABS_Y, true),
            pitch: AxisBinding::new(AbsoluteAxisType::ABS_RZ, true),
            roll: AxisBinding::new(AbsoluteAxisType::ABS_Z, false),
            yaw: AxisBinding::new(AbsoluteAxisType::ABS_X, false),
            aux1: AxisBinding::new(AbsoluteAxisType::ABS_RX, false),
            aux2: AxisBinding::new(AbsoluteAxisType::ABS_RY, false),
            lines: vec![
                LineBinding::new(Key::BTN_TL, port_bits::AUX3),
                LineBinding::new(Key::BTN_TR, port_bits::AUX3 + 1),
                LineBinding::new(Key::BTN_TL2, port_bits::AUX3 + 2),
                LineBinding::new(Key::BTN_TR2, port_bits::AUX3 + 3),
                LineBinding::new(Key::BTN_NORTH, port_bits::TRIM_PITCH_UP),
                LineBinding::new(Key::BTN_SOUTH, port_bits::TRIM_PITCH_DOWN),
                LineBinding::new(Key::BTN_EAST, port_bits::TRIM_ROLL_UP),
                LineBinding::new(Key::BTN_WEST, port_bits::TRIM_ROLL_DOWN),
                LineBinding::new(Key::BTN_THUMBR, port_bits::TRIM_YAW_UP),
                LineBinding::new(Key::BTN_THUMBL, port_bits::TRIM_YAW_DOWN),
            ],
            hats: vec![
                HatBinding {
                    axis: AbsoluteAxisType::ABS_HAT0X,
                    bit_a: port_bits::AUX7_A,
                    bit_b: port_bits::AUX7_B,
                },
                HatBinding {
                    axis: AbsoluteAxisType::ABS_HAT0Y,
                    bit_a: port_bits::AUX8_A,
                    bit_b: port_bits::AUX8_B,
                },
            ],
            menu_up: Key::BTN_START,
            menu_down: Key::BTN_SELECT,
            menu_select: Key::BTN_MODE,
        }
    }
}

impl ControlMap {
    /// Builds the expander port word for the current button and hat state.
    ///
    /// Pressed buttons pull their line low, like the real pull-up wiring.
    #[must_use]
    pub fn port_word<F>(&self, keys: &AttributeSetRef<Key>, abs: F) -> u16
    where
        F: Fn(AbsoluteAxisType) -> AxisReading,
    {
        let mut port = PORT_IDLE;

        for binding in &self.lines {
            if keys.contains(binding.key) {
                port &= !(1 << binding.bit);
            }
        }

        for hat in &self.hats {
            let value = abs(hat.axis).value;
            if value > 0 {
                port &= !(1 << hat.bit_a);
            } else if value < 0 {
                port &= !(1 << hat.bit_b);
            }
        }

        port
    }

    /// Reads the menu buttons.
    #[must_use]
    pub fn menu_lines(&self, keys: &AttributeSetRef<Key>) -> MenuLines {
        MenuLines {
            up: Level::from_asserted(keys.contains(self.menu_up)),
            down: Level::from_asserted(keys.contains(self.menu_down)),
            select: Level::from_asserted(keys.contains(self.menu_select)),
        }
    }

    /// Builds a complete sample from the device's current state.
    ///
    /// # Arguments
    ///
    /// * `keys` - Currently pressed keys
    /// * `abs` - Looks up the current reading of an absolute axis
    /// * `now` - Sample timestamp
    #[must_use]
    pub fn build_sample<F>(&self, keys: &AttributeSetRef<Key>, abs: F, now: Instant) -> RawSample
    where
        F: Fn(AbsoluteAxisType) -> AxisReading,
    {
        let read = |binding: AxisBinding| abs(binding.axis).to_adc(binding.inverted);

        RawSample {
            throttle: read(self.throttle),
            pitch: read(self.pitch),
            roll: read(self.roll),
            yaw: read(self.yaw),
            aux1: read(self.aux1),
            aux2: read(self.aux2),
            discrete: DiscreteInputSnapshot::from_port_bits(
                self.port_word(keys, &abs),
                self.menu_lines(keys),
            ),
            timestamp: now,
        }
    }
}
