//! # Receiver Address Table
//!
//! Fixed-capacity table mapping receiver slots to link addresses.
//!
//! Switching receivers is deliberately split in two: [`LinkAddressTable::select`]
//! only looks an entry up, and [`LinkAddressTable::commit`] records the switch
//! once the radio has accepted the new address. A lookup failure and a radio
//! failure therefore surface as different errors, and neither moves the
//! current slot.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransmitterError};

/// Number of receiver slots.
pub const MAX_RECEIVERS: usize = 5;

/// Link address width in bytes.
pub const ADDRESS_WIDTH: usize = 5;

/// Common prefix of every factory-default address.
const DEFAULT_ADDRESS_PREFIX: [u8; 4] = [0xE7, 0xE7, 0xE7, 0xE7];

/// Last byte of slot 0's default address; slot `i` adds `i`.
const DEFAULT_ADDRESS_BASE: u8 = 0xE0;

/// A 5-byte radio pipe address.
///
/// Displayed and serialized as 10 uppercase hex digits.
///
/// # Examples
///
/// ```
/// use rc_transmitter::link::address_table::LinkAddress;
///
/// let address: LinkAddress = "E7E7E7E7E1".parse()?;
/// assert_eq!(address.as_bytes(), &[0xE7, 0xE7, 0xE7, 0xE7, 0xE1]);
/// assert_eq!(address.to_string(), "E7E7E7E7E1");
/// # Ok::<(), rc_transmitter::error::TransmitterError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkAddress([u8; ADDRESS_WIDTH]);

impl LinkAddress {
    /// Wraps raw address bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_WIDTH]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_WIDTH] {
        &self.0
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for LinkAddress {
    type Err = TransmitterError;

    /// Parses 10 hex digits, optionally separated by `:`.
    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s.chars().filter(|c| *c != ':').collect();
        if digits.len() != ADDRESS_WIDTH * 2 || !digits.is_ascii() {
            return Err(TransmitterError::Protocol(format!(
                "Link address must be {} hex digits, got {:?}",
                ADDRESS_WIDTH * 2,
                s
            )));
        }

        let mut bytes = [0u8; ADDRESS_WIDTH];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &digits[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| {
                TransmitterError::Protocol(format!("Invalid hex in link address {:?}", s))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for LinkAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LinkAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// One receiver slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndpoint {
    pub address: LinkAddress,
    pub name: String,
    /// Inactive slots cannot be selected.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Result of a successful slot lookup, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSelection {
    pub slot: usize,
    pub address: LinkAddress,
    pub name: String,
}

/// The receiver table plus the currently selected slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAddressTable {
    endpoints: Vec<LinkEndpoint>,
    current: usize,
}

impl Default for LinkAddressTable {
    fn default() -> Self {
        Self {
            endpoints: (0..MAX_RECEIVERS).map(Self::default_for).collect(),
            current: 0,
        }
    }
}

impl LinkAddressTable {
    /// Factory entry for a slot: `E7E7E7E7(E0+slot)`, named `RX{slot+1}`.
    /// Only slot 0 starts active.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_transmitter::link::address_table::LinkAddressTable;
    ///
    /// let endpoint = LinkAddressTable::default_for(2);
    /// assert_eq!(endpoint.address.to_string(), "E7E7E7E7E2");
    /// assert_eq!(endpoint.name, "RX3");
    /// assert!(!endpoint.active);
    /// ```
    #[must_use]
    pub fn default_for(slot: usize) -> LinkEndpoint {
        let mut bytes = [0u8; ADDRESS_WIDTH];
        bytes[..4].copy_from_slice(&DEFAULT_ADDRESS_PREFIX);
        bytes[4] = DEFAULT_ADDRESS_BASE.wrapping_add(slot as u8);

        LinkEndpoint {
            address: LinkAddress(bytes),
            name: format!("RX{}", slot + 1),
            active: slot == 0,
        }
    }

    /// Builds a table from a full set of slots and a current slot.
    ///
    /// # Errors
    ///
    /// `InvalidSlot` if the slot count is not [`MAX_RECEIVERS`], or `current`
    /// is out of range or inactive.
    pub fn from_endpoints(endpoints: Vec<LinkEndpoint>, current: usize) -> Result<Self> {
        if endpoints.len() != MAX_RECEIVERS {
            return Err(TransmitterError::InvalidSlot {
                slot: endpoints.len(),
                reason: "wrong number of slots",
            });
        }
        let mut table = Self {
            endpoints,
            current: 0,
        };
        table.restore_current(current)?;
        Ok(table)
    }

    /// Looks up a slot without changing the current one.
    ///
    /// # Errors
    ///
    /// `InvalidSlot` if the slot is out of range or inactive.
    pub fn select(&self, slot: usize) -> Result<SlotSelection> {
        let endpoint = self.endpoints.get(slot).ok_or(TransmitterError::InvalidSlot {
            slot,
            reason: "out of range",
        })?;

        if !endpoint.active {
            return Err(TransmitterError::InvalidSlot {
                slot,
                reason: "inactive",
            });
        }

        Ok(SlotSelection {
            slot,
            address: endpoint.address,
            name: endpoint.name.clone(),
        })
    }

    /// Records a selection as current.
    ///
    /// Only call after the radio has accepted the new address.
    pub fn commit(&mut self, selection: &SlotSelection) {
        self.current = selection.slot;
    }

    /// Index of the current slot.
    #[must_use]
    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// The current endpoint.
    #[must_use]
    pub fn current(&self) -> &LinkEndpoint {
        &self.endpoints[self.current]
    }

    /// Endpoint in a slot.
    #[must_use]
    pub fn endpoint(&self, slot: usize) -> Option<&LinkEndpoint> {
        self.endpoints.get(slot)
    }

    /// Replaces a slot's entry.
    ///
    /// The current slot cannot be deactivated.
    ///
    /// # Errors
    ///
    /// `InvalidSlot` if the slot is out of range, or the entry would
    /// deactivate the current slot.
    pub fn set_endpoint(&mut self, slot: usize, endpoint: LinkEndpoint) -> Result<()> {
        if slot == self.current && !endpoint.active {
            return Err(TransmitterError::InvalidSlot {
                slot,
                reason: "current slot cannot be deactivated",
            });
        }
        let entry = self.endpoints.get_mut(slot).ok_or(TransmitterError::InvalidSlot {
            slot,
            reason: "out of range",
        })?;
        *entry = endpoint;
        Ok(())
    }

    /// Moves the current slot without a radio round trip.
    ///
    /// Used when restoring persisted state before the link is configured.
    ///
    /// # Errors
    ///
    /// Same as [`select`](Self::select).
    pub fn restore_current(&mut self, slot: usize) -> Result<()> {
        let selection = self.select(slot)?;
        self.commit(&selection);
        Ok(())
    }

    /// All slots in order.
    pub fn iter(&self) -> impl Iterator<Item = &LinkEndpoint> {
        self.endpoints.iter()
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always false; the table has a fixed number of slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
