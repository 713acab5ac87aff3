//! Metric sinks that receive power readings.
//!
//! A sink accepts a `(hostname, key, value)` triple. Delivery is a one-shot
//! side effect; nothing a sink returns influences the meter protocol.

pub mod zabbix;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Trait for metric sink implementations.
pub trait MetricSink: Send + Sync {
    /// Delivers one value and returns the sink's status text.
    fn send<'a>(
        &'a self,
        hostname: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

pub use zabbix::ZabbixSender;
