//! # Packet Module
//!
//! Fixed-layout control packet sent to the receiver every control tick.
//!
//! This module handles:
//! - Packet layout constants and the control mode tag
//! - Encoding a channel frame, trim, and motion telemetry into bytes
//! - XOR checksum calculation
//! - Decoding and verification on the receiving side

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod layout;

pub use decoder::{decode, DecodedPacket};
pub use encoder::{encode, WirePacket};
pub use layout::{ControlMode, PACKET_SIZE};
