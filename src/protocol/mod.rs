//! Protocol definitions for adapter communication.
//!
//! This module contains the low-level protocol types including:
//! - Line buffering with deadlines
//! - `SK` command encoding
//! - Reply and event line parsing
//! - ECHONET Lite frame building and decoding

pub mod command;
pub mod echonet;
pub mod event;
pub mod line;
pub mod parser;

pub use command::{Command, ECHONET_PORT, SENTINEL, Security};
pub use echonet::{decode_instantaneous_power, instantaneous_power_request};
pub use event::{DeviceEvent, EventCode};
pub use line::LineReader;
pub use parser::{JoinLine, NOTIFICATION_MARKER, ReplyLine, ScanLine};
