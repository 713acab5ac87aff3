//! Values produced by a commissioned session.

use std::fmt;

/// IPv6 link-local address of the smart meter, derived by `SKLL64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkAddress(String);

impl NetworkAddress {
    /// Wraps an address string as returned by the adapter.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instantaneous power reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reading {
    /// Power in watts.
    pub watts: u32,
}

impl Reading {
    /// Creates a reading.
    #[must_use]
    pub const fn new(watts: u32) -> Self {
        Self { watts }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.watts)
    }
}
