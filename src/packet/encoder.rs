//! # Packet Encoder
//!
//! Serializes one tick's channel frame, trim, and motion telemetry into a
//! [`WirePacket`].

use bytes::{BufMut, Bytes, BytesMut};

use super::checksum::xor_checksum;
use super::layout::*;
use crate::controller::mixer::ChannelFrame;
use crate::controller::trim::TrimState;
use crate::telemetry::MotionTelemetry;

/// A complete, checksummed packet ready for the link layer.
///
/// Always exactly [`PACKET_SIZE`] bytes; the only way to build one is
/// [`encode`], so an encoded packet can never carry a bad checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePacket {
    bytes: Bytes,
}

impl WirePacket {
    /// Raw packet bytes, checksum included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The trailing checksum byte.
    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.bytes[CHECKSUM_OFFSET]
    }

    /// Packet length in bytes (always [`PACKET_SIZE`]).
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; present for clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for WirePacket {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encode one tick's state into a complete wire packet
///
/// # Arguments
///
/// * `frame` - Mixed channel values for this tick
/// * `trim` - Current trim offsets (sent alongside for receiver display)
/// * `telemetry` - Motion fields; zeroed in manual mode
/// * `mode` - Control mode tag
///
/// # Returns
///
/// * `WirePacket` - 38-byte packet with the checksum written last
///
/// # Examples
///
/// ```
/// use rc_transmitter::controller::mixer::ChannelFrame;
/// use rc_transmitter::controller::trim::TrimState;
/// use rc_transmitter::packet::encoder::encode;
/// use rc_transmitter::packet::layout::{ControlMode, PACKET_SIZE};
/// use rc_transmitter::telemetry::MotionTelemetry;
///
/// let packet = encode(
///     &ChannelFrame::default(),
///     &TrimState::default(),
///     &MotionTelemetry::default(),
///     ControlMode::Manual,
/// );
/// assert_eq!(packet.len(), PACKET_SIZE);
/// ```
#[must_use]
pub fn encode(
    frame: &ChannelFrame,
    trim: &TrimState,
    telemetry: &MotionTelemetry,
    mode: ControlMode,
) -> WirePacket {
    let mut buf = BytesMut::with_capacity(PACKET_SIZE);

    // Continuous axes
    buf.put_i16_le(frame.throttle);
    buf.put_i16_le(frame.pitch);
    buf.put_i16_le(frame.roll);
    buf.put_i16_le(frame.yaw);
    buf.put_i16_le(frame.aux1);
    buf.put_i16_le(frame.aux2);

    // Discrete aux
    for &on in &frame.switches {
        buf.put_u8(u8::from(on));
    }
    for &position in &frame.three_way {
        buf.put_i8(position);
    }

    // Motion telemetry
    for &value in telemetry.gyro.iter().chain(telemetry.accel.iter()) {
        buf.put_i16_le(value);
    }

    buf.put_i16_le(trim.pitch);
    buf.put_i16_le(trim.roll);
    buf.put_i16_le(trim.yaw);

    buf.put_u8(mode.as_byte());

    let checksum = xor_checksum(&buf);
    buf.put_u8(checksum);

    debug_assert_eq!(buf.len(), PACKET_SIZE);

    WirePacket {
        bytes: buf.freeze(),
    }
}
