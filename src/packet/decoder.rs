//! # Packet Decoder
//!
//! Receiver-side counterpart of the encoder. The transmitter itself only uses
//! it for loopback checks and tests; a receiver must discard any packet this
//! rejects rather than trying to salvage fields from it.

use bytes::Buf;

use super::checksum::xor_checksum;
use super::layout::*;
use crate::controller::mixer::ChannelFrame;
use crate::controller::trim::TrimState;
use crate::error::{Result, TransmitterError};
use crate::telemetry::MotionTelemetry;

/// Every field recovered from a valid packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPacket {
    /// Channel values
    pub frame: ChannelFrame,
    /// Trim offsets the transmitter applied
    pub trim: TrimState,
    /// Motion fields
    pub telemetry: MotionTelemetry,
    /// Control mode tag
    pub mode: ControlMode,
}

/// Decode and verify a complete packet
///
/// # Arguments
///
/// * `bytes` - Exactly [`PACKET_SIZE`] bytes as received
///
/// # Returns
///
/// * `Result<DecodedPacket>` - Decoded fields, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Buffer length is not [`PACKET_SIZE`]
/// - Checksum does not match
/// - Control mode byte is unknown
pub fn decode(bytes: &[u8]) -> Result<DecodedPacket> {
    if bytes.len() != PACKET_SIZE {
        return Err(TransmitterError::PacketLength {
            expected: PACKET_SIZE,
            actual: bytes.len(),
        });
    }

    let expected = xor_checksum(&bytes[..CHECKSUM_OFFSET]);
    let actual = bytes[CHECKSUM_OFFSET];
    if expected != actual {
        return Err(TransmitterError::ChecksumMismatch { expected, actual });
    }

    let mut buf = &bytes[..CHECKSUM_OFFSET];

    let mut frame = ChannelFrame {
        throttle: buf.get_i16_le(),
        pitch: buf.get_i16_le(),
        roll: buf.get_i16_le(),
        yaw: buf.get_i16_le(),
        aux1: buf.get_i16_le(),
        aux2: buf.get_i16_le(),
        ..ChannelFrame::default()
    };
    for switch in frame.switches.iter_mut() {
        *switch = buf.get_u8() != 0;
    }
    for position in frame.three_way.iter_mut() {
        *position = buf.get_i8();
    }

    let mut telemetry = MotionTelemetry::default();
    for value in telemetry.gyro.iter_mut().chain(telemetry.accel.iter_mut()) {
        *value = buf.get_i16_le();
    }

    let trim = TrimState {
        pitch: buf.get_i16_le(),
        roll: buf.get_i16_le(),
        yaw: buf.get_i16_le(),
    };

    let mode = ControlMode::try_from(buf.get_u8())?;

    Ok(DecodedPacket {
        frame,
        trim,
        telemetry,
        mode,
    })
}
