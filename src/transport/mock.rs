//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// One scripted receive step.
#[derive(Debug)]
pub enum Step {
    Data(Bytes),
    Fail(io::ErrorKind),
    Delay(Duration),
    /// A delay already in progress; survives a cancelled receive.
    Until(tokio::time::Instant),
}

/// Transport that replays a fixed script and records every write.
///
/// Once the script is exhausted, `receive` never completes.
pub struct MockTransport {
    script: VecDeque<Step>,
    written: Arc<Mutex<Vec<Bytes>>>,
    connected: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            script: VecDeque::new(),
            written: Arc::new(Mutex::new(Vec::new())),
            connected: true,
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that will deliver the given text in one chunk.
    pub fn replying(text: &str) -> Self {
        let mut mock = Self::new();
        mock.push(text);
        mock
    }

    pub fn push(&mut self, text: &str) {
        self.script
            .push_back(Step::Data(Bytes::copy_from_slice(text.as_bytes())));
    }

    pub fn push_step(&mut self, step: Step) {
        self.script.push_back(step);
    }

    pub const fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Handle to the writes, usable after the transport is moved.
    pub fn written(&self) -> Arc<Mutex<Vec<Bytes>>> {
        Arc::clone(&self.written)
    }
}

/// Renders recorded writes as lossy text.
pub fn written_text(written: &Arc<Mutex<Vec<Bytes>>>) -> Vec<String> {
    written
        .lock()
        .unwrap()
        .iter()
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .collect()
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.connected {
                return Err(Error::NotConnected);
            }
            self.written.lock().unwrap().push(data);
            Ok(())
        })
    }

    fn receive<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>> {
        Box::pin(async move {
            loop {
                match self.script.pop_front() {
                    Some(Step::Data(mut data)) => {
                        let n = data.len().min(buf.len());
                        buf[..n].copy_from_slice(&data[..n]);
                        if n < data.len() {
                            let rest = data.split_off(n);
                            self.script.push_front(Step::Data(rest));
                        }
                        return Ok(n);
                    }
                    Some(Step::Fail(kind)) => {
                        return Err(Error::Io(io::Error::new(kind, "scripted failure")));
                    }
                    Some(Step::Delay(delay)) => {
                        let deadline = tokio::time::Instant::now() + delay;
                        self.script.push_front(Step::Until(deadline));
                    }
                    Some(Step::Until(deadline)) => {
                        self.script.push_front(Step::Until(deadline));
                        tokio::time::sleep_until(deadline).await;
                        self.script.pop_front();
                    }
                    None => std::future::pending::<()>().await,
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
