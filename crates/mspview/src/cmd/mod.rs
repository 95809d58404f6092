use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod monitor;
pub mod ports;
pub mod resolve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll a flight controller and print its telemetry.
    Monitor(MonitorArgs),
    /// Parse a device address and print what it selects.
    Resolve(ResolveArgs),
    /// List serial ports and mark auto-discovery candidates.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Resolve(args) => resolve::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Device address: auto, a serial path (optionally @BAUD), tcp://host:port or udp://host:port.
    #[arg(env = "MSPVIEW_DEVICE", default_value = "auto")]
    pub device: String,
    /// MSP protocol version used for requests.
    #[arg(
        long,
        env = "MSPVIEW_MSP_VERSION",
        default_value = "2",
        value_parser = clap::value_parser!(u8).range(1..=2)
    )]
    pub mspversion: u8,
    /// Pause one second after each telemetry cycle.
    #[arg(long)]
    pub slow: bool,
    /// Exit after one complete telemetry cycle.
    #[arg(long)]
    pub once: bool,
    /// Delay between reconnect attempts (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub backoff: String,
    /// Re-send a request that is unanswered for this long (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub response_timeout: String,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Device address to parse.
    pub device: String,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub(crate) fn parse_duration(name: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{name} must not be empty")));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid {name} value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, format!("{name} must be greater than zero")));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
