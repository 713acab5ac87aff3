//! Data types for smart meter sessions.
//!
//! This module contains the values produced while commissioning and
//! polling:
//! - PAN descriptors from an active scan
//! - Network addresses and power readings

pub mod pan;
pub mod reading;

pub use pan::{PanBuilder, PanDescriptor, PanField};
pub use reading::{NetworkAddress, Reading};
