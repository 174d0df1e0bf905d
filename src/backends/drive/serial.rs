// SPDX-License-Identifier: GPL-3.0-only

//! Serial port link to the drive base

use super::DriveLink;
use crate::config::DriveSettings;
use crate::errors::LinkError;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

/// Half-duplex serial link, 8N1, no flow control
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open `path` at `baud_rate`
    ///
    /// `write_timeout` bounds every packet write.
    pub fn open(path: &str, baud_rate: u32, write_timeout: Duration) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(write_timeout)
            .open()?;

        info!(path, baud_rate, "Opened serial port");

        Ok(Self {
            port,
            name: path.to_string(),
        })
    }

    pub fn from_settings(settings: &DriveSettings) -> Result<Self, LinkError> {
        Self::open(
            &settings.serial_port,
            settings.baud_rate,
            Duration::from_millis(settings.write_timeout_ms),
        )
    }
}

impl DriveLink for SerialLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        debug!(port = %self.name, len = packet.len(), "Wrote packet");
        Ok(())
    }
}
