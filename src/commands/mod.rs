//! Command handlers for adapter operations.
//!
//! This module provides the command/response engine: each operation writes
//! one command line and then drives the [`LineReader`] through the reply
//! grammar of that command.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::protocol::command::{DEFAULT_SCAN_DURATION, REGISTER_CHANNEL, REGISTER_PAN_ID};
use crate::protocol::echonet::DEFAULT_TRANSACTION_ID;
use crate::protocol::line::{DEFAULT_LINE_TIMEOUT, DEFAULT_READ_TIMEOUT};
use crate::protocol::parser::{
    JoinLine, ReplyLine, ScanLine, find_notification, parse_join_line, parse_reply_line,
    parse_scan_line, parse_version,
};
use crate::protocol::{
    Command, ECHONET_PORT, LineReader, Security, decode_instantaneous_power,
    instantaneous_power_request,
};
use crate::transport::Transport;
use crate::types::{NetworkAddress, PanBuilder, PanDescriptor, Reading};

/// Default step deadline for sentinel-terminated commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Default step deadline for an active scan.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Default step deadline for the PANA result after `SKJOIN`.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default line timeout for the status line that follows `EVENT 25`.
pub const DEFAULT_JOIN_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Default line timeout while collecting a data request reply.
pub const DEFAULT_NOTIFICATION_LINE_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of lines read after `SKSENDTO`.
pub const NOTIFICATION_READS: usize = 5;

/// Timeouts used by the command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum wait for one physical read.
    pub read: Duration,
    /// Maximum wait for one line.
    pub line: Duration,
    /// Step deadline for sentinel-terminated commands.
    pub command: Duration,
    /// Step deadline for an active scan.
    pub scan: Duration,
    /// Step deadline for the join result.
    pub join: Duration,
    /// Line timeout for the status line after a successful join.
    pub join_drain: Duration,
    /// Line timeout while collecting a data request reply.
    pub notification_line: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: DEFAULT_READ_TIMEOUT,
            line: DEFAULT_LINE_TIMEOUT,
            command: DEFAULT_COMMAND_TIMEOUT,
            scan: DEFAULT_SCAN_TIMEOUT,
            join: DEFAULT_JOIN_TIMEOUT,
            join_drain: DEFAULT_JOIN_DRAIN_TIMEOUT,
            notification_line: DEFAULT_NOTIFICATION_LINE_TIMEOUT,
        }
    }
}

impl Timeouts {
    /// Sets the physical read timeout.
    #[must_use]
    pub const fn read(mut self, timeout: Duration) -> Self {
        self.read = timeout;
        self
    }

    /// Sets the line timeout.
    #[must_use]
    pub const fn line(mut self, timeout: Duration) -> Self {
        self.line = timeout;
        self
    }

    /// Sets the step deadline for sentinel-terminated commands.
    #[must_use]
    pub const fn command(mut self, timeout: Duration) -> Self {
        self.command = timeout;
        self
    }

    /// Sets the scan step deadline.
    #[must_use]
    pub const fn scan(mut self, timeout: Duration) -> Self {
        self.scan = timeout;
        self
    }

    /// Sets the join step deadline.
    #[must_use]
    pub const fn join(mut self, timeout: Duration) -> Self {
        self.join = timeout;
        self
    }

    /// Sets the line timeout for the post-join status line.
    #[must_use]
    pub const fn join_drain(mut self, timeout: Duration) -> Self {
        self.join_drain = timeout;
        self
    }

    /// Sets the line timeout used while collecting a data request reply.
    #[must_use]
    pub const fn notification_line(mut self, timeout: Duration) -> Self {
        self.notification_line = timeout;
        self
    }
}

/// Progress of a `SKJOIN` exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinState {
    /// Waiting for `OK`.
    AwaitingAck,
    /// Waiting for `EVENT 24` or `EVENT 25`.
    AwaitingEvent,
    /// PANA authentication completed.
    Joined,
    /// PANA authentication failed with the given event line.
    Failed(String),
}

impl JoinState {
    /// Returns the state after observing `line`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the adapter rejects the command.
    pub fn advance(&self, line: &str) -> Result<Self> {
        let next = match self {
            Self::AwaitingAck => match parse_reply_line(line) {
                ReplyLine::Sentinel => Self::AwaitingEvent,
                ReplyLine::Fail(code) => {
                    return Err(Error::Device {
                        command: "SKJOIN".into(),
                        code: code.into(),
                    });
                }
                ReplyLine::Other => Self::AwaitingAck,
            },
            Self::AwaitingEvent => match parse_join_line(line) {
                JoinLine::Joined => Self::Joined,
                JoinLine::Failed => Self::Failed(line.to_owned()),
                JoinLine::Other => Self::AwaitingEvent,
            },
            terminal => terminal.clone(),
        };
        Ok(next)
    }

    /// Returns true for `Joined` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Joined | Self::Failed(_))
    }
}

/// Command handler owning the transport for its whole lifetime.
///
/// At most one command is in flight: every operation finishes its read
/// phase, or times out, before returning.
pub struct CommandHandler<T> {
    transport: T,
    reader: LineReader,
    timeouts: Timeouts,
    tid: u16,
}

impl<T: Transport> CommandHandler<T> {
    /// Creates a new command handler with default timeouts.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_timeouts(transport, Timeouts::default())
    }

    /// Creates a new command handler with the given timeouts.
    #[must_use]
    pub fn with_timeouts(transport: T, timeouts: Timeouts) -> Self {
        Self {
            transport,
            reader: LineReader::new(timeouts.read, timeouts.line),
            timeouts,
            tid: DEFAULT_TRANSACTION_ID,
        }
    }

    /// Returns the configured timeouts.
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Replaces the configured timeouts.
    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.reader.set_read_timeout(timeouts.read);
        self.reader.set_line_timeout(timeouts.line);
        self.timeouts = timeouts;
    }

    /// Sets the line timeout used by subsequent commands.
    pub fn set_line_timeout(&mut self, timeout: Duration) {
        self.timeouts.line = timeout;
        self.reader.set_line_timeout(timeout);
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport mutably.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the handler, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Returns the ECHONET Lite transaction id used for data requests.
    #[must_use]
    pub const fn transaction_id(&self) -> u16 {
        self.tid
    }

    /// Sets the ECHONET Lite transaction id used for data requests.
    ///
    /// The adapter echoes `SKSENDTO` with the raw payload, so an id holding
    /// a CR or LF byte would split the echo into extra lines.
    pub fn set_transaction_id(&mut self, tid: u16) -> Result<()> {
        let bytes = tid.to_be_bytes();
        if bytes.contains(&b'\r') || bytes.contains(&b'\n') {
            return Err(Error::protocol(format!(
                "transaction id {tid:04X} contains a line terminator byte"
            )));
        }
        self.tid = tid;
        Ok(())
    }

    /// Writes one command.
    async fn write(&mut self, command: &Command<'_>) -> Result<()> {
        if !self.transport.is_connected() {
            return Err(Error::NotConnected);
        }
        let data = command.encode()?;
        tracing::debug!("> {}", command.log_line());
        self.transport.send(data).await
    }

    /// Reads one line with the current line timeout.
    async fn read_line(&mut self) -> Option<String> {
        let line = self.reader.read_line(&mut self.transport).await;
        if let Some(line) = &line {
            tracing::debug!("< {}", line);
        }
        line
    }

    /// Reads one line with a temporary line timeout.
    async fn read_line_within(&mut self, timeout: Duration) -> Option<String> {
        let previous = self.reader.line_timeout();
        self.reader.set_line_timeout(timeout);
        let line = self.read_line().await;
        self.reader.set_line_timeout(previous);
        line
    }

    /// Reads lines until the `OK` sentinel, returning the lines before it.
    async fn wait_for_sentinel(&mut self, command: &str, budget: Duration) -> Result<Vec<String>> {
        let deadline = Instant::now() + budget;
        let mut lines = Vec::new();

        loop {
            if Instant::now() >= deadline {
                tracing::warn!("{} got no OK within {:?}", command, budget);
                return Err(Error::timeout(budget));
            }
            let Some(line) = self.read_line().await else {
                continue;
            };
            let fail_code = match parse_reply_line(&line) {
                ReplyLine::Sentinel => return Ok(lines),
                ReplyLine::Fail(code) => Some(code.to_owned()),
                ReplyLine::Other => None,
            };
            if let Some(code) = fail_code {
                return Err(Error::Device {
                    command: command.to_owned(),
                    code,
                });
            }
            lines.push(line);
        }
    }

    /// Sends a sentinel-terminated command.
    ///
    /// Returns the lines received before `OK`, including the echo.
    pub async fn execute(&mut self, command: &Command<'_>) -> Result<Vec<String>> {
        self.write(command).await?;
        self.wait_for_sentinel(command.name(), self.timeouts.command)
            .await
    }

    // ==================== Configuration Commands ====================

    /// Resets the adapter's protocol stack.
    pub async fn reset(&mut self) -> Result<()> {
        self.execute(&Command::Reset).await.map(drop)
    }

    /// Queries the firmware version.
    ///
    /// Returns `None` if the reply carried no `EVER` line.
    pub async fn version(&mut self) -> Result<Option<String>> {
        let lines = self.execute(&Command::Version).await?;
        Ok(lines
            .iter()
            .find_map(|line| parse_version(line))
            .map(str::to_owned))
    }

    /// Sets the route B password.
    pub async fn set_password(&mut self, password: &str) -> Result<()> {
        self.execute(&Command::SetPassword(password))
            .await
            .map(drop)
    }

    /// Sets the route B authentication id.
    pub async fn set_route_id(&mut self, id: &str) -> Result<()> {
        self.execute(&Command::SetRouteId(id)).await.map(drop)
    }

    /// Writes a virtual register.
    pub async fn set_register(&mut self, register: &str, value: &str) -> Result<()> {
        self.execute(&Command::SetRegister { register, value })
            .await
            .map(drop)
    }

    /// Sets the radio channel register.
    pub async fn set_channel(&mut self, channel: &str) -> Result<()> {
        self.set_register(REGISTER_CHANNEL, channel).await
    }

    /// Sets the PAN id register.
    pub async fn set_pan_id(&mut self, pan_id: &str) -> Result<()> {
        self.set_register(REGISTER_PAN_ID, pan_id).await
    }

    // ==================== Network Commands ====================

    /// Runs an active scan with the default duration.
    pub async fn scan(&mut self) -> Result<PanDescriptor> {
        self.scan_with_duration(DEFAULT_SCAN_DURATION).await
    }

    /// Runs an active scan and returns the PAN it found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScanIncomplete`] if the scan finished without all
    /// six descriptor fields, or [`Error::Timeout`] if `EVENT 22` never
    /// arrived.
    pub async fn scan_with_duration(&mut self, duration: u8) -> Result<PanDescriptor> {
        let command = Command::Scan { duration };
        self.write(&command).await?;

        let budget = self.timeouts.scan;
        let deadline = Instant::now() + budget;
        let mut builder = PanBuilder::new();

        loop {
            if Instant::now() >= deadline {
                tracing::warn!("scan did not complete within {:?}", budget);
                return Err(Error::timeout(budget));
            }
            let Some(line) = self.read_line().await else {
                continue;
            };
            if let ReplyLine::Fail(code) = parse_reply_line(&line) {
                return Err(Error::Device {
                    command: command.name().into(),
                    code: code.into(),
                });
            }
            match parse_scan_line(&line) {
                ScanLine::Field(field, value) => builder.set(field, value),
                ScanLine::Complete => break,
                ScanLine::Other => {}
            }
        }

        builder
            .build()
            .map_err(|missing| Error::ScanIncomplete { missing })
    }

    /// Converts a 64-bit MAC address into the IPv6 link-local address.
    ///
    /// The reply is exactly two lines: the echo and the address.
    pub async fn link_local_address(&mut self, mac: &str) -> Result<NetworkAddress> {
        self.write(&Command::LinkLocalAddress(mac)).await?;

        let mut lines = Vec::with_capacity(2);
        while lines.len() < 2 {
            let line = self
                .read_line()
                .await
                .ok_or_else(|| Error::timeout(self.reader.line_timeout()))?;
            lines.push(line);
        }
        Ok(NetworkAddress::new(lines[1].trim()))
    }

    /// Performs PANA authentication with the meter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JoinFailed`] carrying the `EVENT 24` line if the
    /// meter rejects the credentials.
    pub async fn join(&mut self, address: &NetworkAddress) -> Result<()> {
        self.write(&Command::Join(address.as_str())).await?;

        let mut state = JoinState::AwaitingAck;
        let mut budget = self.timeouts.command;
        let mut deadline = Instant::now() + budget;

        while !state.is_terminal() {
            if Instant::now() >= deadline {
                tracing::warn!("join stalled in {:?} after {:?}", state, budget);
                return Err(Error::timeout(budget));
            }
            let Some(line) = self.read_line().await else {
                continue;
            };
            let next = state.advance(&line)?;
            if state == JoinState::AwaitingAck && next == JoinState::AwaitingEvent {
                budget = self.timeouts.join;
                deadline = Instant::now() + budget;
            }
            state = next;
        }

        if let JoinState::Failed(event) = state {
            return Err(Error::JoinFailed { event });
        }

        // The meter follows up with an instance list notification
        if let Some(line) = self.read_line_within(self.timeouts.join_drain).await {
            tracing::trace!("drained after join: {}", line);
        }
        Ok(())
    }

    // ==================== Data Commands ====================

    /// Sends a UDP datagram to the meter and returns the `ERXUDP` reply.
    ///
    /// Reads a fixed number of lines with the notification line timeout.
    pub async fn send_to(&mut self, address: &NetworkAddress, payload: &[u8]) -> Result<String> {
        let command = Command::SendTo {
            handle: 1,
            address: address.as_str(),
            port: ECHONET_PORT,
            security: Security::Encrypted,
            payload,
        };
        self.write(&command).await?;

        let mut collected = Vec::with_capacity(NOTIFICATION_READS);
        for _ in 0..NOTIFICATION_READS {
            if let Some(line) = self.read_line_within(self.timeouts.notification_line).await {
                collected.push(line);
            }
        }

        match find_notification(&collected) {
            Some(line) => Ok(line.to_owned()),
            None => Err(Error::NotificationNotFound { collected }),
        }
    }

    /// Requests and decodes the meter's instantaneous power.
    ///
    /// # Errors
    ///
    /// A frame that is not the expected response yields [`Error::Decode`];
    /// callers should simply try again on the next cycle.
    pub async fn request_reading(&mut self, address: &NetworkAddress) -> Result<Reading> {
        let frame = instantaneous_power_request(self.tid);
        let line = self.send_to(address, &frame).await?;
        Ok(decode_instantaneous_power(&line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Step, written_text};
    use crate::types::PanField;

    const MAC: &str = "001D129012345678";
    const ADDRESS: &str = "FE80:0000:0000:0000:021D:1290:1234:5678";
    const PEER: &str = "FE80:0000:0000:0000:021D:1290:0003:C890";

    const SCAN_REPLY: &str = "SKSCAN 2 FFFFFFFF 6\r\nOK\r\n\
        EVENT 20 FE80:0000:0000:0000:021D:1290:1234:5678\r\n\
        EPANDESC\r\n\
        \x20\x20Channel:21\r\n\
        \x20\x20Channel Page:09\r\n\
        \x20\x20Pan ID:8888\r\n\
        \x20\x20Addr:001D129012345678\r\n\
        \x20\x20LQI:E1\r\n\
        \x20\x20PairID:00112233\r\n\
        EVENT 22 FE80:0000:0000:0000:021D:1290:1234:5678\r\n";

    fn handler(reply: &str) -> CommandHandler<MockTransport> {
        CommandHandler::new(MockTransport::replying(reply))
    }

    fn notification(payload: &str) -> String {
        format!("ERXUDP {ADDRESS} {PEER} 0E1A 0E1A {MAC} 1 0012 {payload}")
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_waits_for_sentinel() {
        let mut handler = handler("SKSETRBID 00112233\r\nOK\r\n");
        let written = handler.transport().written();

        let lines = handler
            .execute(&Command::SetRouteId("00112233"))
            .await
            .unwrap();
        assert_eq!(lines, vec!["SKSETRBID 00112233"]);
        assert_eq!(written_text(&written), vec!["SKSETRBID 00112233\r\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_version_reads_ever_line() {
        let mut handler = handler("SKVER\r\nEVER 1.2.10\r\nOK\r\n");
        assert_eq!(handler.version().await.unwrap().as_deref(), Some("1.2.10"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_reply_is_device_error() {
        let mut handler = handler("SKSREG S2 21\r\nFAIL ER06\r\n");
        match handler.set_channel("21").await.unwrap_err() {
            Error::Device { command, code } => {
                assert_eq!(command, "SKSREG");
                assert_eq!(code, "ER06");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_sentinel_hits_step_deadline() {
        let mut handler = handler("SKRESET\r\n");
        let start = Instant::now();
        let err = handler.reset().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() >= DEFAULT_COMMAND_TIMEOUT);
        let bound = DEFAULT_COMMAND_TIMEOUT + DEFAULT_LINE_TIMEOUT;
        assert!(start.elapsed() < bound + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_transport_writes_nothing() {
        let mut handler = CommandHandler::new(MockTransport::new().disconnected());
        let written = handler.transport().written();
        assert!(matches!(handler.reset().await, Err(Error::NotConnected)));
        assert!(written_text(&written).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_returns_descriptor() {
        let mut handler = handler(SCAN_REPLY);
        let written = handler.transport().written();

        let pan = handler.scan().await.unwrap();
        assert_eq!(pan.channel, "21");
        assert_eq!(pan.channel_page, "09");
        assert_eq!(pan.pan_id, "8888");
        assert_eq!(pan.addr, MAC);
        assert_eq!(pan.lqi, "E1");
        assert_eq!(pan.pair_id, "00112233");
        assert_eq!(written_text(&written), vec!["SKSCAN 2 FFFFFFFF 6\r\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_missing_any_field_is_incomplete() {
        for field in PanField::ALL {
            let prefix = format!("{}:", field.label());
            let reply: String = SCAN_REPLY
                .split_inclusive("\r\n")
                .filter(|line| !line.trim_start().starts_with(&prefix))
                .collect();
            let mut handler = handler(&reply);

            match handler.scan().await.unwrap_err() {
                Error::ScanIncomplete { missing } => assert_eq!(missing, vec![field.label()]),
                other => panic!("unexpected error without {}: {other}", field.label()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_without_beacon_is_incomplete() {
        let mut handler = handler("SKSCAN 2 FFFFFFFF 6\r\nOK\r\nEVENT 22 FE80::1\r\n");
        let err = handler.scan().await.unwrap_err();
        assert!(matches!(err, Error::ScanIncomplete { ref missing } if missing.len() == 6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_local_address_takes_second_line() {
        let mut handler = handler(&format!("SKLL64 {MAC}\r\n{ADDRESS}\r\nOK\r\n"));
        let address = handler.link_local_address(MAC).await.unwrap();
        assert_eq!(address.as_str(), ADDRESS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_local_address_short_read() {
        let mut handler = handler(&format!("SKLL64 {MAC}\r\n"));
        let err = handler.link_local_address(MAC).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_success_drains_status_line() {
        let mut handler = handler(&format!(
            "SKJOIN {ADDRESS}\r\nOK\r\nEVENT 21 {ADDRESS} 00\r\nEVENT 02 {ADDRESS}\r\n\
             EVENT 25 {ADDRESS}\r\nERXUDP instance-list\r\nOK\r\n"
        ));
        handler.join(&NetworkAddress::new(ADDRESS)).await.unwrap();

        // Only the instance list was drained
        assert_eq!(handler.read_line().await.as_deref(), Some("OK"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_failure_reports_event() {
        let mut handler = handler(&format!("SKJOIN {ADDRESS}\r\nOK\r\nEVENT 24 reason-text\r\n"));
        let address = NetworkAddress::new(ADDRESS);
        let err = handler.join(&address).await.unwrap_err();
        assert!(matches!(err, Error::JoinFailed { .. }));
        assert!(err.to_string().contains("reason-text"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_without_event_times_out() {
        let mut handler = handler(&format!("SKJOIN {ADDRESS}\r\nOK\r\n"));
        let address = NetworkAddress::new(ADDRESS);
        let start = Instant::now();
        let err = handler.join(&address).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() >= DEFAULT_JOIN_TIMEOUT);
    }

    #[test]
    fn test_join_state_transitions() {
        let state = JoinState::AwaitingAck;
        let state = state.advance("SKJOIN FE80::1").unwrap();
        assert_eq!(state, JoinState::AwaitingAck);
        let state = state.advance("OK").unwrap();
        assert_eq!(state, JoinState::AwaitingEvent);
        // A second OK is not an event
        assert_eq!(state.advance("OK").unwrap(), JoinState::AwaitingEvent);
        let joined = state.advance("EVENT 25 FE80::1").unwrap();
        assert!(joined.is_terminal());
        assert_eq!(
            joined.advance("EVENT 24 FE80::1").unwrap(),
            JoinState::Joined
        );
        assert_eq!(
            state.advance("EVENT 24 FE80::1").unwrap(),
            JoinState::Failed("EVENT 24 FE80::1".into())
        );
        assert!(JoinState::AwaitingAck.advance("FAIL ER10").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_reading_decodes_power() {
        let reply = format!(
            "EVENT 21 {ADDRESS} 00\r\nOK\r\n{}\r\n",
            notification("1081000102880105FF017201E704000004D2")
        );
        let mut handler = handler(&reply);
        let written = handler.transport().written();

        let reading = handler
            .request_reading(&NetworkAddress::new(ADDRESS))
            .await
            .unwrap();
        assert_eq!(reading, Reading::new(1234));

        let written = written.lock().unwrap();
        let header = format!("SKSENDTO 1 {ADDRESS} 0E1A 1 000E ");
        assert!(written[0].starts_with(header.as_bytes()));
        assert_eq!(written[0].len(), header.len() + 14 + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_reading_other_frame_is_decode_error() {
        let line = notification("1081000102880105FF017101E704000004D2");
        let reply = format!("{line}\r\n");
        let mut handler = handler(&reply);
        let err = handler
            .request_reading(&NetworkAddress::new(ADDRESS))
            .await
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_to_without_notification() {
        let mut handler = handler(&format!("EVENT 21 {ADDRESS} 00\r\nOK\r\n"));
        let start = Instant::now();
        let err = handler
            .send_to(&NetworkAddress::new(ADDRESS), &[0x10, 0x81])
            .await
            .unwrap_err();
        match err {
            Error::NotificationNotFound { collected } => {
                assert_eq!(
                    collected,
                    vec![format!("EVENT 21 {ADDRESS} 00"), "OK".to_owned()]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        // Three empty reads at the notification line timeout
        assert!(start.elapsed() >= DEFAULT_NOTIFICATION_LINE_TIMEOUT * 3);
        assert!(start.elapsed() < DEFAULT_LINE_TIMEOUT * 3);
        assert_eq!(handler.reader.line_timeout(), DEFAULT_LINE_TIMEOUT);
    }

    /// Replays the adapter's echo of `SKSENDTO`, raw payload included.
    fn send_to_echo(payload: &[u8]) -> Vec<u8> {
        let header = format!("SKSENDTO 1 {ADDRESS} 0E1A 1 {:04X} ", payload.len());
        let mut echo = header.into_bytes();
        echo.extend_from_slice(payload);
        echo.extend_from_slice(b"\r\n");
        echo
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_survives_raw_echo() {
        let request = instantaneous_power_request(DEFAULT_TRANSACTION_ID);
        let mut transport = MockTransport::new();
        transport.push_step(Step::Data(send_to_echo(&request).into()));
        transport.push(&format!(
            "EVENT 21 {ADDRESS} 00\r\nOK\r\n{}\r\n",
            notification("1081000102880105FF017201E704000004D2")
        ));
        let mut handler = CommandHandler::new(transport);
        let written = handler.transport().written();

        let address = NetworkAddress::new(ADDRESS);
        let reading = handler.request_reading(&address).await.unwrap();
        assert_eq!(reading, Reading::new(1234));

        // The id stays fixed, so the echo is always a single line
        let expected = [&request[..], &b"\r\n"[..]].concat();
        assert!(written.lock().unwrap()[0].ends_with(&expected));
        assert_eq!(handler.transaction_id(), DEFAULT_TRANSACTION_ID);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transaction_id_rejects_line_terminators() {
        let mut handler = handler("");
        assert_eq!(handler.transaction_id(), 0x0001);
        assert!(handler.set_transaction_id(0x0A0A).is_err());
        assert!(handler.set_transaction_id(0x0D01).is_err());
        assert_eq!(handler.transaction_id(), 0x0001);
        handler.set_transaction_id(0x0102).unwrap();
        assert_eq!(handler.transaction_id(), 0x0102);
    }

    #[test]
    fn test_timeouts_builder() {
        let timeouts = Timeouts::default()
            .scan(Duration::from_secs(120))
            .notification_line(Duration::from_millis(500));
        assert_eq!(timeouts.scan, Duration::from_secs(120));
        assert_eq!(timeouts.notification_line, Duration::from_millis(500));
        assert_eq!(timeouts.command, DEFAULT_COMMAND_TIMEOUT);
    }
}
