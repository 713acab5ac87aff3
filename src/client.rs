//! Main [`SmartMeter`] client implementation.
//!
//! This module provides the high-level client that combines the transport,
//! the command handler and the commissioned session into one interface.

use crate::commands::{CommandHandler, Timeouts};
use crate::error::{Error, Result};
use crate::join::{Commissioned, Credentials, JoinSequencer};
use crate::protocol::command::DEFAULT_SCAN_DURATION;
use crate::transport::{SerialTransport, Transport, serial::SerialConfig};
use crate::types::{NetworkAddress, Reading};

/// Client for a smart meter reached through a Wi-SUN adapter.
pub struct SmartMeter<T> {
    commands: CommandHandler<T>,
    session: Option<Commissioned>,
    scan_duration: u8,
}

impl SmartMeter<SerialTransport> {
    /// Creates a new client for a serial port.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0")
    ///
    /// # Returns
    ///
    /// A new client (not yet connected).
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self::with_serial_config(SerialConfig::new(port))
    }

    /// Creates a new client with custom serial configuration.
    #[must_use]
    pub fn with_serial_config(config: SerialConfig) -> Self {
        Self::new(SerialTransport::new(config))
    }
}

impl<T: Transport> SmartMeter<T> {
    /// Creates a new client with the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_timeouts(transport, Timeouts::default())
    }

    /// Creates a new client with the given transport and timeouts.
    #[must_use]
    pub fn with_timeouts(transport: T, timeouts: Timeouts) -> Self {
        Self {
            commands: CommandHandler::with_timeouts(transport, timeouts),
            session: None,
            scan_duration: DEFAULT_SCAN_DURATION,
        }
    }

    /// Sets the active scan duration used when commissioning.
    #[must_use]
    pub const fn scan_duration(mut self, duration: u8) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Opens the transport.
    pub async fn connect(&mut self) -> Result<()> {
        self.commands.transport_mut().connect().await
    }

    /// Joins the meter's PAN.
    ///
    /// Any earlier session is discarded first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Commissioning`] naming the step that failed.
    pub async fn commission(&mut self, credentials: &Credentials) -> Result<&Commissioned> {
        self.session = None;
        let commissioned = JoinSequencer::new(&mut self.commands)
            .scan_duration(self.scan_duration)
            .run(credentials)
            .await?;
        Ok(self.session.insert(commissioned))
    }

    /// Returns the commissioned session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Commissioned> {
        self.session.as_ref()
    }

    /// Returns the meter address, if commissioned.
    #[must_use]
    pub fn address(&self) -> Option<&NetworkAddress> {
        self.session.as_ref().map(|session| &session.address)
    }

    /// Requests the meter's instantaneous power.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCommissioned`] before [`commission`](Self::commission)
    /// succeeded. Decode errors and timeouts are routine; retry on the next
    /// cycle.
    pub async fn read_instantaneous_power(&mut self) -> Result<Reading> {
        let session = self.session.as_ref().ok_or(Error::NotCommissioned)?;
        self.commands.request_reading(&session.address).await
    }

    /// Returns the command handler for direct command access.
    pub const fn commands(&mut self) -> &mut CommandHandler<T> {
        &mut self.commands
    }

    /// Returns true if the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.commands.transport().is_connected()
    }

    /// Closes the transport and forgets the session.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session = None;
        self.commands.transport_mut().disconnect().await
    }
}
