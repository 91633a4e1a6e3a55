//! # Wire Packet Layout
//!
//! Fixed byte layout shared by the transmitter and every receiver. All
//! multi-byte fields are little-endian and the packet is unpadded, so both
//! ends agree on offsets without any negotiation.
//!
//! | Offset | Field | Type |
//! |--------|-------|------|
//! | 0 | Throttle | i16 |
//! | 2 | Pitch | i16 |
//! | 4 | Roll | i16 |
//! | 6 | Yaw | i16 |
//! | 8 | AUX1 | i16 |
//! | 10 | AUX2 | i16 |
//! | 12 | AUX3..AUX6 | u8 × 4 |
//! | 16 | AUX7, AUX8 | i8 × 2 |
//! | 18 | Gyro X/Y/Z | i16 × 3 |
//! | 24 | Accel X/Y/Z | i16 × 3 |
//! | 30 | Trim pitch/roll/yaw | i16 × 3 |
//! | 36 | Control mode | u8 |
//! | 37 | Checksum | u8 |

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransmitterError};

/// Total packet size in bytes (never varies at runtime)
pub const PACKET_SIZE: usize = 38;

/// Offset of the checksum byte (last byte)
pub const CHECKSUM_OFFSET: usize = PACKET_SIZE - 1;

/// Offset of the control mode byte
pub const CONTROL_MODE_OFFSET: usize = 36;

/// Offset of the first trim field
pub const TRIM_OFFSET: usize = 30;

/// Offset of the first motion telemetry field
pub const MOTION_OFFSET: usize = 18;

/// Number of two-position aux switches (AUX3..AUX6)
pub const NUM_SWITCHES: usize = 4;

/// Number of three-position aux switches (AUX7, AUX8)
pub const NUM_THREE_WAY: usize = 2;

/// Lowest normalized channel value
pub const CHANNEL_VALUE_MIN: i16 = -511;

/// Highest normalized channel value
pub const CHANNEL_VALUE_MAX: i16 = 512;

/// Highest throttle value in unidirectional mode (lowest is 0)
pub const THROTTLE_UNIDIRECTIONAL_MAX: i16 = 1023;

/// What the receiver should do with the motion fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Sticks only, motion fields are zero.
    #[default]
    Manual,
    /// Motion telemetry from the handset IMU is filled in.
    GyroAssist,
}

impl ControlMode {
    /// Wire representation of this mode.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            ControlMode::Manual => 0,
            ControlMode::GyroAssist => 1,
        }
    }

    /// Short label for status output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ControlMode::Manual => "MAN",
            ControlMode::GyroAssist => "GYR",
        }
    }
}

impl TryFrom<u8> for ControlMode {
    type Error = TransmitterError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(ControlMode::Manual),
            1 => Ok(ControlMode::GyroAssist),
            other => Err(TransmitterError::Protocol(format!(
                "Unknown control mode 0x{:02X}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets_are_contiguous() {
        // 6 axes × 2 + 4 switches + 2 three-way
        assert_eq!(MOTION_OFFSET, 6 * 2 + NUM_SWITCHES + NUM_THREE_WAY);
        // 6 motion fields × 2
        assert_eq!(TRIM_OFFSET, MOTION_OFFSET + 12);
        // 3 trims × 2
        assert_eq!(CONTROL_MODE_OFFSET, TRIM_OFFSET + 6);
        assert_eq!(CHECKSUM_OFFSET, CONTROL_MODE_OFFSET + 1);
        assert_eq!(PACKET_SIZE, 38);
    }

    #[test]
    fn test_channel_value_ranges() {
        assert_eq!(CHANNEL_VALUE_MIN, -511);
        assert_eq!(CHANNEL_VALUE_MAX, 512);
        assert_eq!(THROTTLE_UNIDIRECTIONAL_MAX, 1023);
    }

    #[test]
    fn test_control_mode_bytes() {
        assert_eq!(ControlMode::Manual.as_byte(), 0);
        assert_eq!(ControlMode::GyroAssist.as_byte(), 1);
        assert_eq!(ControlMode::try_from(0).unwrap(), ControlMode::Manual);
        assert_eq!(ControlMode::try_from(1).unwrap(), ControlMode::GyroAssist);
    }

    #[test]
    fn test_control_mode_unknown_byte() {
        let result = ControlMode::try_from(7);
        assert!(matches!(result, Err(TransmitterError::Protocol(_))));
    }

    #[test]
    fn test_control_mode_default_is_manual() {
        assert_eq!(ControlMode::default(), ControlMode::Manual);
        assert_eq!(ControlMode::Manual.label(), "MAN");
        assert_eq!(ControlMode::GyroAssist.label(), "GYR");
    }
}
