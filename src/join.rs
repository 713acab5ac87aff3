//! Network commissioning.
//!
//! Joining the meter's PAN is a fixed sequence of commands. Each step must
//! succeed before the next one starts; the first failure aborts the run and
//! is reported together with the step that failed.

use std::fmt;
use std::future::Future;

use crate::commands::CommandHandler;
use crate::error::{Error, Result};
use crate::protocol::command::DEFAULT_SCAN_DURATION;
use crate::transport::Transport;
use crate::types::{NetworkAddress, PanDescriptor};

/// A step of the commissioning sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinStep {
    Reset,
    Version,
    SetPassword,
    SetRouteId,
    Scan,
    SetChannel,
    SetPanId,
    DeriveAddress,
    Join,
}

impl JoinStep {
    /// All steps in execution order.
    pub const ALL: [Self; 9] = [
        Self::Reset,
        Self::Version,
        Self::SetPassword,
        Self::SetRouteId,
        Self::Scan,
        Self::SetChannel,
        Self::SetPanId,
        Self::DeriveAddress,
        Self::Join,
    ];

    /// Returns a human readable step name.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Version => "version query",
            Self::SetPassword => "password set",
            Self::SetRouteId => "route id set",
            Self::Scan => "scan",
            Self::SetChannel => "channel register write",
            Self::SetPanId => "PAN id register write",
            Self::DeriveAddress => "address derivation",
            Self::Join => "join",
        }
    }
}

impl fmt::Display for JoinStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Route B credentials issued by the utility.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// 32-character authentication id.
    pub route_id: String,
    /// 12-character password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(route_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("route_id", &self.route_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of a successful commissioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commissioned {
    /// Adapter firmware version, if reported.
    pub firmware: Option<String>,
    /// The PAN that was joined.
    pub pan: PanDescriptor,
    /// Address of the meter for data requests.
    pub address: NetworkAddress,
}

/// Runs the commissioning sequence on a command handler.
pub struct JoinSequencer<'a, T> {
    handler: &'a mut CommandHandler<T>,
    scan_duration: u8,
}

impl<'a, T: Transport> JoinSequencer<'a, T> {
    /// Creates a sequencer using the default scan duration.
    pub fn new(handler: &'a mut CommandHandler<T>) -> Self {
        Self {
            handler,
            scan_duration: DEFAULT_SCAN_DURATION,
        }
    }

    /// Sets the active scan duration exponent.
    #[must_use]
    pub const fn scan_duration(mut self, duration: u8) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Runs every step in order and returns the joined network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Commissioning`] naming the first step that failed.
    pub async fn run(self, credentials: &Credentials) -> Result<Commissioned> {
        let handler = self.handler;

        run_step(JoinStep::Reset, handler.reset()).await?;
        let firmware = run_step(JoinStep::Version, handler.version()).await?;
        if let Some(version) = &firmware {
            tracing::info!("adapter firmware {}", version);
        }
        run_step(
            JoinStep::SetPassword,
            handler.set_password(&credentials.password),
        )
        .await?;
        run_step(
            JoinStep::SetRouteId,
            handler.set_route_id(&credentials.route_id),
        )
        .await?;

        let pan = run_step(
            JoinStep::Scan,
            handler.scan_with_duration(self.scan_duration),
        )
        .await?;
        tracing::info!(
            "found PAN {} on channel {} (LQI {})",
            pan.pan_id,
            pan.channel,
            pan.lqi
        );

        run_step(JoinStep::SetChannel, handler.set_channel(&pan.channel)).await?;
        run_step(JoinStep::SetPanId, handler.set_pan_id(&pan.pan_id)).await?;
        let address = run_step(
            JoinStep::DeriveAddress,
            handler.link_local_address(&pan.addr),
        )
        .await?;
        run_step(JoinStep::Join, handler.join(&address)).await?;

        tracing::info!("joined {}", address);
        Ok(Commissioned {
            firmware,
            pan,
            address,
        })
    }
}

/// Awaits one step, attaching the step to any error.
async fn run_step<R>(step: JoinStep, fut: impl Future<Output = Result<R>>) -> Result<R> {
    tracing::info!("> {}", step);
    match fut.await {
        Ok(value) => {
            tracing::debug!("{} done", step);
            Ok(value)
        }
        Err(source) => {
            tracing::error!("{} failed: {}", step, source);
            Err(Error::Commissioning {
                step,
                source: Box::new(source),
            })
        }
    }
}
