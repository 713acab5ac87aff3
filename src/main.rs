//! Polls a smart meter over route B and forwards the instantaneous power to
//! Zabbix.

use std::process::ExitCode;
use std::time::Duration;

use broute::sink::zabbix::{DEFAULT_SENDER_PATH, DEFAULT_SERVER_PORT};
use broute::{Credentials, MetricSink, SmartMeter, ZabbixSender};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "broute")]
#[command(about = "Read instantaneous power from a smart meter and send it to Zabbix")]
struct Args {
    /// Serial device of the Wi-SUN adapter
    #[arg(long, env = "BROUTE_DEVICE", default_value = "/dev/ttyUSB0")]
    device: String,

    /// Route B authentication id
    #[arg(long, env = "BROUTE_ID", value_parser = non_blank)]
    b_id: String,

    /// Route B password
    #[arg(long, env = "BROUTE_PASSWORD", value_parser = non_blank, hide_env_values = true)]
    b_pass: String,

    /// Seconds between readings
    #[arg(long, env = "BROUTE_INTERVAL", default_value_t = 60)]
    interval: u64,

    /// Path to the zabbix_sender executable
    #[arg(long, env = "ZABBIX_SENDER_PATH", value_parser = non_blank)]
    #[arg(default_value = DEFAULT_SENDER_PATH)]
    zabbix_sender_path: String,

    /// Zabbix server host
    #[arg(long, env = "ZABBIX_SERVER_HOST", value_parser = non_blank)]
    zabbix_server_host: String,

    /// Zabbix server port
    #[arg(long, env = "ZABBIX_SERVER_PORT", default_value_t = DEFAULT_SERVER_PORT)]
    zabbix_server_port: u16,

    /// Hostname of the Zabbix item
    #[arg(long, env = "ZBX_ITEM_HOSTNAME", value_parser = non_blank)]
    zbx_item_hostname: String,

    /// Key of the Zabbix item
    #[arg(long, env = "ZBX_ITEM_KEY", value_parser = non_blank)]
    zbx_item_key: String,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "BROUTE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn non_blank(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err("must not be blank".into())
    } else {
        Ok(value.to_owned())
    }
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut meter = SmartMeter::serial(&args.device);
    if let Err(e) = meter.connect().await {
        tracing::error!("error connecting to {}: {}", args.device, e);
        return ExitCode::FAILURE;
    }

    tracing::info!("initializing adapter");
    let credentials = Credentials::new(&args.b_id, &args.b_pass);
    if let Err(e) = meter.commission(&credentials).await {
        tracing::error!("{}", e);
        tracing::error!("exiting");
        return ExitCode::FAILURE;
    }
    tracing::info!("adapter initialized");

    let sink = ZabbixSender::new(&args.zabbix_server_host)
        .sender_path(&args.zabbix_sender_path)
        .server_port(args.zabbix_server_port);
    let interval = Duration::from_secs(args.interval);

    tracing::info!("start polling every {:?}", interval);
    loop {
        let reading = match meter.read_instantaneous_power().await {
            Ok(reading) => reading,
            Err(e) => {
                if e.is_decode() {
                    tracing::warn!("{}", e);
                } else {
                    tracing::error!("{}", e);
                }
                tokio::time::sleep(interval / 4).await;
                continue;
            }
        };
        tracing::info!("instantaneous power: {}W", reading);

        let value = reading.to_string();
        match sink
            .send(&args.zbx_item_hostname, &args.zbx_item_key, &value)
            .await
        {
            Ok(status) => tracing::info!("{}", status),
            Err(e) => tracing::error!("{}", e),
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_every_flag_reads_environment() {
        let command = Args::command();
        for arg in command.get_arguments().filter(|arg| arg.get_id() != "help") {
            assert!(arg.get_env().is_some(), "--{} has no env", arg.get_id());
        }
    }

    #[test]
    fn test_blank_values_are_rejected() {
        let result = Args::try_parse_from([
            "broute",
            "--b-id",
            "00112233445566778899AABBCCDDEEFF",
            "--b-pass",
            "   ",
            "--zabbix-server-host",
            "zabbix.local",
            "--zbx-item-hostname",
            "home",
            "--zbx-item-key",
            "power",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from([
            "broute",
            "--b-id",
            "00112233445566778899AABBCCDDEEFF",
            "--b-pass",
            "SECRETPASS12",
            "--zabbix-server-host",
            "zabbix.local",
            "--zbx-item-hostname",
            "home",
            "--zbx-item-key",
            "power",
        ])
        .unwrap();
        assert_eq!(args.interval, 60);
        assert_eq!(args.zabbix_server_port, 10051);
        assert_eq!(args.zabbix_sender_path, "zabbix_sender");
    }
}
