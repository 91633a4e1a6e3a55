//! # Radio Bridge Framing
//!
//! Command frames understood by the USB radio bridge.
//!
//! ## Frame Structure
//!
//! ```text
//! [SYNC] [CMD] [LEN] [PAYLOAD...] [XOR]
//!   1      1     1      0-255       1
//! ```
//!
//! - **SYNC**: Always `0xA5`
//! - **CMD**: Command byte (see [`BridgeCommand`])
//! - **LEN**: Payload length
//! - **XOR**: XOR of CMD, LEN and every payload byte
//!
//! The bridge answers every frame with a single byte: [`ACK`] or [`NAK`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TransmitterError};
use crate::packet::checksum::XorDigest;

/// Frame start marker
pub const BRIDGE_SYNC_BYTE: u8 = 0xA5;

/// Positive reply
pub const ACK: u8 = 0x06;

/// Negative reply
pub const NAK: u8 = 0x15;

/// Header plus trailer size
pub const FRAME_OVERHEAD: usize = 4;

/// Highest RF channel the transceiver accepts
pub const MAX_RF_CHANNEL: u8 = 125;

/// Bridge command bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BridgeCommand {
    /// Send the payload to the current outbound address
    Transmit = 0x01,
    /// Reopen the outbound pipe at a new address
    SetAddress = 0x02,
    /// Change the RF channel
    SetChannel = 0x03,
}

impl BridgeCommand {
    /// Short name for logs
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BridgeCommand::Transmit => "transmit",
            BridgeCommand::SetAddress => "set-address",
            BridgeCommand::SetChannel => "set-channel",
        }
    }
}

/// Bridge reply to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeReply {
    Ack,
    Nak,
}

impl TryFrom<u8> for BridgeReply {
    type Error = TransmitterError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            ACK => Ok(BridgeReply::Ack),
            NAK => Ok(BridgeReply::Nak),
            other => Err(TransmitterError::Protocol(format!(
                "Unexpected bridge reply 0x{:02X}",
                other
            ))),
        }
    }
}

/// Build a complete bridge frame
///
/// # Arguments
///
/// * `command` - Command byte
/// * `payload` - Command payload (at most 255 bytes)
///
/// # Errors
///
/// Returns `Protocol` if the payload does not fit the length byte
///
/// # Examples
///
/// ```
/// use rc_transmitter::link::frame::{encode_frame, BridgeCommand};
///
/// let frame = encode_frame(BridgeCommand::SetChannel, &[76])?;
/// assert_eq!(&frame[..], &[0xA5, 0x03, 0x01, 76, 0x03 ^ 0x01 ^ 76]);
/// # Ok::<(), rc_transmitter::error::TransmitterError>(())
/// ```
pub fn encode_frame(command: BridgeCommand, payload: &[u8]) -> Result<Bytes> {
    let len = u8::try_from(payload.len()).map_err(|_| {
        TransmitterError::Protocol(format!(
            "Bridge payload too long: {} bytes",
            payload.len()
        ))
    })?;

    let mut buf = BytesMut::with_capacity(payload.len() + FRAME_OVERHEAD);
    buf.put_u8(BRIDGE_SYNC_BYTE);
    buf.put_u8(command as u8);
    buf.put_u8(len);
    buf.put_slice(payload);

    let mut digest = XorDigest::new();
    digest.update(&buf[1..]);
    buf.put_u8(digest.finalize());

    Ok(buf.freeze())
}
