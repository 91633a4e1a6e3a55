//! # RC Transmitter Library
//!
//! Turn a joystick into a radio-control transmitter.
//!
//! This library samples sticks, switches, and trim buttons, calibrates and
//! mixes them into channel values, frames them into a fixed 38-byte packet
//! with an XOR checksum, and sends the packet to one of several receivers
//! through a USB radio bridge at a fixed rate.

pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod menu;
pub mod packet;
pub mod scheduler;
pub mod settings;
pub mod telemetry;
pub mod transmitter;
