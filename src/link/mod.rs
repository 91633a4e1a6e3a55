//! # Radio Link Module
//!
//! Receiver addressing and the serial radio bridge.
//!
//! This module handles:
//! - The fixed receiver address table and two-step slot switching
//! - Opening the USB radio bridge (tries configured paths in order)
//! - Framing transmit / set-address / set-channel commands
//! - Waiting for the bridge's ACK/NAK with a bounded timeout

pub mod address_table;
pub mod frame;
pub mod port_trait;

pub use address_table::{LinkAddress, LinkAddressTable, LinkEndpoint, SlotSelection};
pub use port_trait::RadioLink;

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{Result, TransmitterError};
use crate::packet::WirePacket;
use frame::{encode_frame, BridgeCommand, BridgeReply, MAX_RF_CHANNEL};

/// Default bridge baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default bridge device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &["/dev/ttyACM0", "/dev/ttyUSB0"];

/// Radio bridge over a serial port
///
/// Generic over the port so tests can script the bridge side.
pub struct SerialRadioLink<P> {
    port: P,
    device_path: String,
    reply_timeout: Duration,
    /// A reply timed out and may still arrive
    reply_owed: bool,
}

impl<P> std::fmt::Debug for SerialRadioLink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialRadioLink")
            .field("device_path", &self.device_path)
            .field("reply_timeout", &self.reply_timeout)
            .finish_non_exhaustive()
    }
}

impl SerialRadioLink<tokio_serial::SerialStream> {
    /// Open the radio bridge, trying each path in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Serial speed
    /// * `reply_timeout` - How long to wait for each ACK/NAK
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried if none opens
    pub fn open_with_paths<S: AsRef<str>>(
        paths: &[S],
        baud_rate: u32,
        reply_timeout: Duration,
    ) -> Result<Self> {
        for path in paths {
            let path = path.as_ref();
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened radio bridge at {} ({} baud)", path, baud_rate);
                    return Ok(Self::new(port, path, reply_timeout));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(TransmitterError::SerialPortNotFound(
            paths
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }

    /// Open a specific serial port at 8N1
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TransmitterError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

impl<P> SerialRadioLink<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open port
    pub fn new(port: P, device_path: impl Into<String>, reply_timeout: Duration) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            reply_timeout,
            reply_owed: false,
        }
    }

    /// The device path in use
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Tune the transceiver to an RF channel
    ///
    /// # Errors
    ///
    /// `LinkReconfigure` if the channel is out of range or the bridge refuses it
    pub async fn set_rf_channel(&mut self, channel: u8) -> Result<()> {
        if channel > MAX_RF_CHANNEL {
            return Err(TransmitterError::LinkReconfigure(format!(
                "RF channel {} out of range (0-{})",
                channel, MAX_RF_CHANNEL
            )));
        }
        self.command(BridgeCommand::SetChannel, &[channel])
            .await
            .map_err(|e| TransmitterError::LinkReconfigure(e.to_string()))?;
        info!("RF channel set to {}", channel);
        Ok(())
    }

    /// Drop input left over from earlier commands so it cannot be read as
    /// the next reply.
    ///
    /// After a reply timed out, first waits up to one reply timeout for the
    /// late reply.
    async fn discard_stale_input(&mut self) {
        let mut buf = [0u8; 64];

        if std::mem::take(&mut self.reply_owed) {
            match tokio::time::timeout(self.reply_timeout, self.port.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => debug!("Discarded {} late reply byte(s)", n),
                _ => debug!("Late reply never arrived"),
            }
        }

        loop {
            match tokio::time::timeout(Duration::ZERO, self.port.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => debug!("Discarded {} stale byte(s)", n),
                _ => break,
            }
        }
    }

    /// Send one command frame and wait for the bridge's reply
    async fn command(&mut self, command: BridgeCommand, payload: &[u8]) -> Result<()> {
        let frame = encode_frame(command, payload)?;
        self.discard_stale_input().await;

        self.port
            .write_all(&frame)
            .await
            .map_err(|e| TransmitterError::Serial(format!("Failed to write frame: {}", e)))?;
        self.port
            .flush()
            .await
            .map_err(|e| TransmitterError::Serial(format!("Failed to flush serial port: {}", e)))?;

        let reply = match tokio::time::timeout(self.reply_timeout, self.port.read_u8()).await {
            Ok(reply) => reply
                .map_err(|e| TransmitterError::Serial(format!("Failed to read reply: {}", e)))?,
            Err(_) => {
                self.reply_owed = true;
                return Err(TransmitterError::Serial(format!(
                    "No {} reply within {:?}",
                    command.name(),
                    self.reply_timeout
                )));
            }
        };

        match BridgeReply::try_from(reply)? {
            BridgeReply::Ack => Ok(()),
            BridgeReply::Nak => Err(TransmitterError::Serial(format!(
                "Bridge rejected {}",
                command.name()
            ))),
        }
    }
}

#[async_trait]
impl<P> RadioLink for SerialRadioLink<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn transmit(&mut self, packet: &WirePacket) -> Result<()> {
        self.command(BridgeCommand::Transmit, packet.as_bytes())
            .await
            .map_err(|e| TransmitterError::Transmit(e.to_string()))
    }

    async fn set_outbound_address(&mut self, address: &LinkAddress) -> Result<()> {
        self.command(BridgeCommand::SetAddress, address.as_bytes())
            .await
            .map_err(|e| TransmitterError::LinkReconfigure(e.to_string()))?;
        info!("Outbound address set to {}", address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::mixer::ChannelFrame;
    use crate::controller::trim::TrimState;
    use crate::packet::{encode, ControlMode};
    use crate::telemetry::MotionTelemetry;
    use frame::{ACK, NAK};
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn packet() -> WirePacket {
        let frame = ChannelFrame {
            throttle: 600,
            pitch: -20,
            ..ChannelFrame::default()
        };
        encode(
            &frame,
            &TrimState::default(),
            &MotionTelemetry::default(),
            ControlMode::Manual,
        )
    }

    fn transmit_frame(packet: &WirePacket) -> Vec<u8> {
        encode_frame(BridgeCommand::Transmit, packet.as_bytes())
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let result = SerialRadioLink::open_with_paths(
            &["/dev/nonexistent0", "/dev/nonexistent1"],
            DEFAULT_BAUD_RATE,
            TIMEOUT,
        );

        match result {
            Err(TransmitterError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty: &[&str] = &[];
        let result = SerialRadioLink::open_with_paths(empty, DEFAULT_BAUD_RATE, TIMEOUT);
        assert!(matches!(result, Err(TransmitterError::SerialPortNotFound(_))));
    }

    #[tokio::test]
    async fn test_transmit_acked() {
        let packet = packet();
        let port = Builder::new()
            .write(&transmit_frame(&packet))
            .read(&[ACK])
            .build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        link.transmit(&packet).await.unwrap();
    }

    #[tokio::test]
    async fn test_transmit_nak_is_transmit_error() {
        let packet = packet();
        let port = Builder::new()
            .write(&transmit_frame(&packet))
            .read(&[NAK])
            .build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        let result = link.transmit(&packet).await;
        assert!(matches!(result, Err(TransmitterError::Transmit(_))));
    }

    #[tokio::test]
    async fn test_transmit_garbage_reply() {
        let packet = packet();
        let port = Builder::new()
            .write(&transmit_frame(&packet))
            .read(&[0x42])
            .build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        let result = link.transmit(&packet).await;
        assert!(matches!(result, Err(TransmitterError::Transmit(_))));
    }

    #[tokio::test]
    async fn test_transmit_no_reply_times_out() {
        let packet = packet();
        let port = Builder::new()
            .write(&transmit_frame(&packet))
            .wait(Duration::from_secs(5))
            .build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        let result = link.transmit(&packet).await;
        match result {
            Err(TransmitterError::Transmit(msg)) => assert!(msg.contains("No transmit reply")),
            other => panic!("Expected Transmit error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_late_reply_is_not_taken_for_next_reply() {
        let packet = packet();
        let address: LinkAddress = "E7E7E7E7E2".parse().unwrap();
        let set_address = encode_frame(BridgeCommand::SetAddress, address.as_bytes()).unwrap();
        let port = Builder::new()
            .write(&transmit_frame(&packet))
            .wait(Duration::from_millis(80))
            .read(&[ACK])
            .write(&set_address)
            .read(&[NAK])
            .build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        assert!(matches!(
            link.transmit(&packet).await,
            Err(TransmitterError::Transmit(_))
        ));
        // The ACK for the transmit arrives late; the NAK is the real answer
        let result = link.set_outbound_address(&address).await;
        assert!(matches!(result, Err(TransmitterError::LinkReconfigure(_))));
    }

    #[tokio::test]
    async fn test_lost_late_reply_does_not_block_next_command() {
        let packet = packet();
        let port = Builder::new()
            .write(&transmit_frame(&packet))
            .wait(Duration::from_millis(120))
            .write(&transmit_frame(&packet))
            .read(&[ACK])
            .build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        assert!(link.transmit(&packet).await.is_err());
        link.transmit(&packet).await.unwrap();
    }

    #[tokio::test]
    async fn test_transmit_port_closed() {
        let packet = packet();
        let port = Builder::new().write(&transmit_frame(&packet)).build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        assert!(link.transmit(&packet).await.is_err());
    }

    #[tokio::test]
    async fn test_set_outbound_address() {
        let address: LinkAddress = "E7E7E7E7E2".parse().unwrap();
        let expected = encode_frame(BridgeCommand::SetAddress, address.as_bytes()).unwrap();
        let port = Builder::new().write(&expected).read(&[ACK]).build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        link.set_outbound_address(&address).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_outbound_address_rejected() {
        let address: LinkAddress = "E7E7E7E7E2".parse().unwrap();
        let expected = encode_frame(BridgeCommand::SetAddress, address.as_bytes()).unwrap();
        let port = Builder::new().write(&expected).read(&[NAK]).build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        let result = link.set_outbound_address(&address).await;
        assert!(matches!(result, Err(TransmitterError::LinkReconfigure(_))));
    }

    #[tokio::test]
    async fn test_set_rf_channel() {
        let port = Builder::new()
            .write(&[0xA5, 0x03, 0x01, 76, 0x03 ^ 0x01 ^ 76])
            .read(&[ACK])
            .build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        link.set_rf_channel(76).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_rf_channel_out_of_range() {
        // Nothing may be written
        let port = Builder::new().build();
        let mut link = SerialRadioLink::new(port, "mock", TIMEOUT);

        let result = link.set_rf_channel(MAX_RF_CHANNEL + 1).await;
        assert!(matches!(result, Err(TransmitterError::LinkReconfigure(_))));
    }

    // Integration test - only runs if bridge hardware is connected
    #[tokio::test]
    #[ignore]
    async fn test_transmit_with_real_hardware() {
        let mut link =
            SerialRadioLink::open_with_paths(DEFAULT_DEVICE_PATHS, DEFAULT_BAUD_RATE, TIMEOUT)
                .expect("Radio bridge not found");
        let result = link.transmit(&packet()).await;
        println!("Transmit result: {:?}", result);
    }
}
