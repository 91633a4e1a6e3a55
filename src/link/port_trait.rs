//! Trait abstraction for the radio link to enable testing

use async_trait::async_trait;

use super::address_table::LinkAddress;
use crate::error::Result;
use crate::packet::WirePacket;

/// Outbound radio link
///
/// `transmit` is called once per control tick; `set_outbound_address` only
/// on an explicit receiver switch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RadioLink: Send {
    /// Hand one packet to the radio.
    ///
    /// Fails with `Transmit` when the radio rejects or does not acknowledge it.
    async fn transmit(&mut self, packet: &WirePacket) -> Result<()>;

    /// Reopen the outbound pipe at a new address.
    ///
    /// Fails with `LinkReconfigure`; the previous address stays in effect.
    async fn set_outbound_address(&mut self, address: &LinkAddress) -> Result<()>;
}
