//! # broute
//!
//! A Rust driver for reading smart meters over route B ("B-route") through
//! RL7023/BP35A1 class Wi-SUN adapters.
//!
//! The adapter speaks a line oriented `SK` command protocol over USB/Serial.
//! This library commissions the adapter onto the meter's PAN and then polls
//! the meter's instantaneous power with ECHONET Lite requests.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Deadline bounded line reads and command replies
//! - Step by step commissioning with precise failure reporting
//! - ECHONET Lite instantaneous power decoding
//!
//! ## Quick Start
//!
//! ```no_run
//! use broute::{Credentials, SmartMeter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), broute::Error> {
//!     let mut meter = SmartMeter::serial("/dev/ttyUSB0");
//!     meter.connect().await?;
//!
//!     // Join the meter's PAN
//!     let credentials = Credentials::new("00112233445566778899AABBCCDDEEFF", "SECRETPASS12");
//!     let session = meter.commission(&credentials).await?;
//!     println!("Meter address: {}", session.address);
//!
//!     // Read instantaneous power
//!     let reading = meter.read_instantaneous_power().await?;
//!     println!("Power: {}W", reading.watts);
//!
//!     meter.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Line reading, command encoding, reply parsing and ECHONET Lite
//! - [`types`] - Data structures (PAN descriptors, addresses, readings)
//! - [`transport`] - Transport implementations (currently USB/Serial)
//! - [`commands`] - Command handler for adapter operations
//! - [`join`] - Commissioning sequence
//! - [`sink`] - Destinations for readings (Zabbix)
//! - [`client`] - High-level [`SmartMeter`] client

pub mod client;
pub mod commands;
pub mod error;
pub mod join;
pub mod protocol;
pub mod sink;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::SmartMeter;
pub use commands::{CommandHandler, JoinState, Timeouts};
pub use error::{DecodeError, Error, Result};
pub use join::{Commissioned, Credentials, JoinSequencer, JoinStep};
pub use protocol::{Command, DeviceEvent, EventCode, LineReader, Security};
pub use sink::{MetricSink, ZabbixSender};
pub use transport::{SerialTransport, Transport, serial::list_ports};
pub use types::{NetworkAddress, PanDescriptor, PanField, Reading};
