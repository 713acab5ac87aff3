//! Commands for the adapter's `SK` command set.
//!
//! Every command is one ASCII line terminated by CRLF. `SKSENDTO` is the
//! only command carrying raw binary data after its textual header.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Line every sentinel-terminated reply ends with.
pub const SENTINEL: &str = "OK";

/// Prefix of a rejected-command reply, followed by the error code.
pub const FAIL_PREFIX: &str = "FAIL ";

/// Line terminator for outgoing commands.
pub const LINE_ENDING: &[u8] = b"\r\n";

/// Largest UDP payload the adapter accepts.
pub const MAX_PAYLOAD: usize = 1232;

/// Default active scan duration exponent.
pub const DEFAULT_SCAN_DURATION: u8 = 6;

/// ECHONET Lite UDP port.
pub const ECHONET_PORT: u16 = 0x0E1A;

/// Virtual register holding the radio channel.
pub const REGISTER_CHANNEL: &str = "S2";

/// Virtual register holding the PAN id.
pub const REGISTER_PAN_ID: &str = "S3";

/// UDP security flag for `SKSENDTO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Security {
    /// Send in plain text.
    Plain = 0,
    /// Encrypt with the PANA session key.
    Encrypted = 1,
}

impl From<Security> for u8 {
    fn from(sec: Security) -> Self {
        sec as Self
    }
}

/// A command sent to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `SKRESET`
    Reset,
    /// `SKVER`
    Version,
    /// `SKSETPWD C <password>`
    SetPassword(&'a str),
    /// `SKSETRBID <id>`
    SetRouteId(&'a str),
    /// `SKSCAN 2 FFFFFFFF <duration>`
    Scan { duration: u8 },
    /// `SKSREG <register> <value>`
    SetRegister { register: &'a str, value: &'a str },
    /// `SKLL64 <mac>`
    LinkLocalAddress(&'a str),
    /// `SKJOIN <address>`
    Join(&'a str),
    /// `SKSENDTO <handle> <address> <port> <sec> <len> <payload>`
    SendTo {
        handle: u8,
        address: &'a str,
        port: u16,
        security: Security,
        payload: &'a [u8],
    },
}

impl Command<'_> {
    /// Returns the command keyword.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reset => "SKRESET",
            Self::Version => "SKVER",
            Self::SetPassword(_) => "SKSETPWD",
            Self::SetRouteId(_) => "SKSETRBID",
            Self::Scan { .. } => "SKSCAN",
            Self::SetRegister { .. } => "SKSREG",
            Self::LinkLocalAddress(_) => "SKLL64",
            Self::Join(_) => "SKJOIN",
            Self::SendTo { .. } => "SKSENDTO",
        }
    }

    /// Renders the textual part of the command, without line ending.
    ///
    /// For `SKSENDTO` this is the header including the space before the
    /// payload.
    fn header(&self, redact: bool) -> String {
        let name = self.name();
        match self {
            Self::Reset | Self::Version => name.to_owned(),
            Self::SetPassword(password) if redact => {
                format!("{name} C {}", "*".repeat(password.len()))
            }
            Self::SetPassword(password) => format!("{name} C {password}"),
            Self::SetRouteId(id) => format!("{name} {id}"),
            Self::Scan { duration } => format!("{name} 2 FFFFFFFF {duration}"),
            Self::SetRegister { register, value } => format!("{name} {register} {value}"),
            Self::LinkLocalAddress(mac) => format!("{name} {mac}"),
            Self::Join(address) => format!("{name} {address}"),
            Self::SendTo {
                handle,
                address,
                port,
                security,
                payload,
            } => format!(
                "{name} {handle} {address} {port:04X} {} {:04X} ",
                u8::from(*security),
                payload.len()
            ),
        }
    }

    /// Encodes the command for the wire.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a `SKSENDTO` payload exceeds [`MAX_PAYLOAD`].
    pub fn encode(&self) -> Result<Bytes> {
        let payload: &[u8] = match self {
            Self::SendTo { payload, .. } => payload,
            _ => &[],
        };
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::protocol(format!(
                "payload of {} bytes exceeds maximum {MAX_PAYLOAD}",
                payload.len()
            )));
        }

        let header = self.header(false);
        let mut buf = BytesMut::with_capacity(header.len() + payload.len() + LINE_ENDING.len());
        buf.put_slice(header.as_bytes());
        buf.put_slice(payload);
        buf.put_slice(LINE_ENDING);
        Ok(buf.freeze())
    }

    /// Returns a printable form of the command with secrets masked and
    /// binary payloads hex encoded.
    #[must_use]
    pub fn log_line(&self) -> String {
        let mut line = self.header(true);
        if let Self::SendTo { payload, .. } = self {
            line.push_str(&hex::encode_upper(payload));
        }
        line
    }
}
