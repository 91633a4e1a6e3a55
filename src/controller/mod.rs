//! # Controller Module
//!
//! Operator input handling, from raw readings to wire-ready channel values.
//!
//! This module handles:
//! - Sampling sticks, pots, switches, and buttons (evdev joystick on the host)
//! - Calibration of raw readings into the normalized channel range
//! - Trim offsets with step, bound, and repeat-rate limits
//! - Mixing everything into one channel frame per control tick

pub mod calibration;
pub mod joystick;
pub mod mapper;
pub mod mixer;
pub mod sample;
pub mod trim;

pub use calibration::{AxisCalibration, CalibrationSession, CalibrationSet};
pub use mixer::{ChannelFrame, ChannelMixer, ThrottleMode};
pub use sample::{InputSampler, RawSample};
pub use trim::{TrimAxis, TrimController, TrimState};
