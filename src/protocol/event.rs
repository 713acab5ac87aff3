//! Asynchronous `EVENT` notifications emitted by the adapter.
//!
//! Event lines have the form `EVENT <code> <sender> [<param>]` where the
//! code is two hex digits.

/// Event codes the driver reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventCode {
    /// Beacon received during an active scan.
    BeaconReceived = 0x20,
    /// UDP transmission finished.
    UdpSendComplete = 0x21,
    /// Active scan finished.
    ActiveScanComplete = 0x22,
    /// PANA authentication failed.
    JoinFailed = 0x24,
    /// PANA authentication succeeded.
    JoinComplete = 0x25,
    /// Peer requested session termination.
    SessionTerminationRequested = 0x26,
    /// Session terminated.
    SessionTerminated = 0x27,
    /// Session lifetime expired and re-authentication started.
    SessionExpired = 0x29,
}

impl EventCode {
    /// Parses an event code from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x20 => Some(Self::BeaconReceived),
            0x21 => Some(Self::UdpSendComplete),
            0x22 => Some(Self::ActiveScanComplete),
            0x24 => Some(Self::JoinFailed),
            0x25 => Some(Self::JoinComplete),
            0x26 => Some(Self::SessionTerminationRequested),
            0x27 => Some(Self::SessionTerminated),
            0x29 => Some(Self::SessionExpired),
            _ => None,
        }
    }
}

impl From<EventCode> for u8 {
    fn from(code: EventCode) -> Self {
        code as Self
    }
}

/// A parsed `EVENT` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    /// Raw event code.
    pub code: u8,
    /// Address of the node that caused the event.
    pub sender: String,
    /// Optional event parameter.
    pub param: Option<String>,
}

impl DeviceEvent {
    /// Marker every event line starts with.
    pub const PREFIX: &'static str = "EVENT ";

    /// Parses an event line. Returns `None` for any other line.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix(Self::PREFIX)?;
        let mut fields = rest.split_whitespace();
        let code = u8::from_str_radix(fields.next()?, 16).ok()?;
        let sender = fields.next().unwrap_or_default().to_owned();
        let param = fields.next().map(str::to_owned);
        Some(Self {
            code,
            sender,
            param,
        })
    }

    /// Returns the known event kind, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<EventCode> {
        EventCode::from_byte(self.code)
    }

    /// Returns true if this event has the given kind.
    #[must_use]
    pub fn is(&self, kind: EventCode) -> bool {
        self.code == u8::from(kind)
    }
}
