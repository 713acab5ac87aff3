//! Zabbix trapper sink using the external `zabbix_sender` tool.

use std::future::Future;
use std::pin::Pin;

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::sink::MetricSink;

/// Default `zabbix_sender` executable.
pub const DEFAULT_SENDER_PATH: &str = "zabbix_sender";

/// Default Zabbix trapper port.
pub const DEFAULT_SERVER_PORT: u16 = 10051;

/// Sends values with `zabbix_sender -z <server> -p <port> -s <host> -k <key> -o <value>`.
#[derive(Debug, Clone)]
pub struct ZabbixSender {
    sender_path: String,
    server_host: String,
    server_port: u16,
}

impl ZabbixSender {
    /// Creates a sink for the given server using the default executable and port.
    #[must_use]
    pub fn new(server_host: impl Into<String>) -> Self {
        Self {
            sender_path: DEFAULT_SENDER_PATH.to_owned(),
            server_host: server_host.into(),
            server_port: DEFAULT_SERVER_PORT,
        }
    }

    /// Sets the `zabbix_sender` executable.
    #[must_use]
    pub fn sender_path(mut self, path: impl Into<String>) -> Self {
        self.sender_path = path.into();
        self
    }

    /// Sets the server port.
    #[must_use]
    pub const fn server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    /// Builds the argument list for one value.
    fn args(&self, hostname: &str, key: &str, value: &str) -> Vec<String> {
        vec![
            "-z".into(),
            self.server_host.clone(),
            "-p".into(),
            self.server_port.to_string(),
            "-s".into(),
            hostname.into(),
            "-k".into(),
            key.into(),
            "-o".into(),
            value.into(),
        ]
    }
}

impl MetricSink for ZabbixSender {
    fn send<'a>(
        &'a self,
        hostname: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!("{} {} {}={}", self.sender_path, hostname, key, value);

            let output = Command::new(&self.sender_path)
                .args(self.args(hostname, key, value))
                .output()
                .await?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            let status = stdout.lines().next().unwrap_or_default().trim().to_owned();

            if output.status.success() {
                Ok(status)
            } else {
                let program = &self.sender_path;
                Err(Error::Sink {
                    message: format!("{program} exited with {}: {status}", output.status),
                })
            }
        })
    }
}
