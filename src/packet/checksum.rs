//! # XOR Checksum
//!
//! One-byte running XOR over every byte that precedes the checksum field.
//!
//! XOR is a per-bit-position parity, so any single flipped bit is always
//! detected. Two flips in the same bit position of different bytes cancel out.

/// Running XOR accumulator for incremental checksum calculation.
#[derive(Debug, Clone, Copy, Default)]
pub struct XorDigest {
    value: u8,
}

impl XorDigest {
    /// Creates a new digest with initial value 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Folds bytes into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.value ^= byte;
        }
    }

    /// Returns the checksum of everything fed so far.
    #[must_use]
    pub fn finalize(self) -> u8 {
        self.value
    }
}

/// Calculate the XOR checksum of a byte slice
///
/// # Arguments
///
/// * `data` - Bytes covered by the checksum (everything except the checksum byte)
///
/// # Returns
///
/// * `u8` - XOR of all bytes, 0 for an empty slice
///
/// # Examples
///
/// ```
/// use rc_transmitter::packet::checksum::xor_checksum;
///
/// assert_eq!(xor_checksum(&[0x0F, 0xF0]), 0xFF);
/// assert_eq!(xor_checksum(&[0xAA, 0xAA]), 0x00);
/// ```
#[must_use]
pub fn xor_checksum(data: &[u8]) -> u8 {
    let mut digest = XorDigest::new();
    digest.update(data);
    digest.finalize()
}
