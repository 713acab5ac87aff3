//! Reply line parsers for the adapter's text protocol.
//!
//! Each command family has its own small grammar. These functions classify
//! single lines; the command handler drives them line by line.

use crate::protocol::command::{FAIL_PREFIX, SENTINEL};
use crate::protocol::event::{DeviceEvent, EventCode};
use crate::types::PanField;

/// Prefix of a received UDP datagram notification.
pub const NOTIFICATION_MARKER: &str = "ERXUDP";

/// Prefix of the `SKVER` reply line.
pub const VERSION_PREFIX: &str = "EVER ";

/// Classification of a line in a sentinel-terminated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLine<'a> {
    /// The `OK` sentinel.
    Sentinel,
    /// `FAIL <code>` rejection.
    Fail(&'a str),
    /// Echo, data or event line.
    Other,
}

/// Classifies a line while waiting for the sentinel.
#[must_use]
pub fn parse_reply_line(line: &str) -> ReplyLine<'_> {
    if line == SENTINEL {
        ReplyLine::Sentinel
    } else if let Some(code) = line.strip_prefix(FAIL_PREFIX) {
        ReplyLine::Fail(code.trim())
    } else {
        ReplyLine::Other
    }
}

/// Extracts the firmware version from an `EVER x.y.z` line.
#[must_use]
pub fn parse_version(line: &str) -> Option<&str> {
    line.strip_prefix(VERSION_PREFIX).map(str::trim)
}

/// Classification of a line in an active scan reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanLine<'a> {
    /// A `<label>:<value>` line for one of the PAN fields.
    Field(PanField, &'a str),
    /// `EVENT 22`: the scan has finished.
    Complete,
    /// Anything else.
    Other,
}

/// Classifies a line of `SKSCAN` output.
///
/// The adapter indents the descriptor lines by two spaces, e.g.
/// `  Channel:21`.
#[must_use]
pub fn parse_scan_line(line: &str) -> ScanLine<'_> {
    if let Some(event) = DeviceEvent::parse(line) {
        return if event.is(EventCode::ActiveScanComplete) {
            ScanLine::Complete
        } else {
            ScanLine::Other
        };
    }

    let Some((label, value)) = line.trim().split_once(':') else {
        return ScanLine::Other;
    };
    match PanField::from_label(label.trim()) {
        Some(field) => ScanLine::Field(field, value.trim()),
        None => ScanLine::Other,
    }
}

/// Classification of a line while waiting for the PANA result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinLine {
    /// `EVENT 25`: authentication succeeded.
    Joined,
    /// `EVENT 24`: authentication failed.
    Failed,
    /// Anything else.
    Other,
}

/// Classifies a line of `SKJOIN` output after the sentinel.
#[must_use]
pub fn parse_join_line(line: &str) -> JoinLine {
    match DeviceEvent::parse(line).and_then(|event| event.kind()) {
        Some(EventCode::JoinComplete) => JoinLine::Joined,
        Some(EventCode::JoinFailed) => JoinLine::Failed,
        _ => JoinLine::Other,
    }
}

/// Returns true if the line is a received-datagram notification.
#[must_use]
pub fn is_notification(line: &str) -> bool {
    line.starts_with(NOTIFICATION_MARKER)
}

/// Returns the first notification among collected lines.
#[must_use]
pub fn find_notification(lines: &[String]) -> Option<&str> {
    lines
        .iter()
        .map(String::as_str)
        .find(|line| is_notification(line))
}
