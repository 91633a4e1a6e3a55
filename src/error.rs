//! # Error Types
//!
//! Custom error types for the RC transmitter using `thiserror`.
//!
//! None of these are fatal to the control loop. The tick functions catch them,
//! log them, and carry on with the last known good state.

use thiserror::Error;

/// Main error type for the RC transmitter
#[derive(Debug, Error)]
pub enum TransmitterError {
    /// Packet checksum did not match its contents
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Packet buffer has the wrong size
    #[error("Invalid packet length: expected {expected} bytes, got {actual}")]
    PacketLength { expected: usize, actual: usize },

    /// Malformed field inside an otherwise intact packet or bridge frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Receiver slot out of range or not active
    #[error("Invalid receiver slot {slot}: {reason}")]
    InvalidSlot { slot: usize, reason: &'static str },

    /// Link layer rejected an outbound address switch
    #[error("Link reconfiguration failed: {0}")]
    LinkReconfigure(String),

    /// Link layer rejected a single packet
    #[error("Transmit failed: {0}")]
    Transmit(String),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No radio bridge found on any candidate port
    #[error("No radio bridge found (tried: {0})")]
    SerialPortNotFound(String),

    /// Input device errors
    #[error("Input error: {0}")]
    Input(String),

    /// No usable input device found
    #[error("No input device found")]
    InputDeviceNotFound,

    /// Settings store errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the RC transmitter
pub type Result<T> = std::result::Result<T, TransmitterError>;
