use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mspview_frame::MspVersion;
use mspview_session::{Outcome, SessionConfig, Supervisor, TelemetryPoller};
use mspview_transport::{DeviceDescriptor, UsbAllowList};
use tracing::info;

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{OutputFormat, TerminalDisplay};

const SLOW_PACING: Duration = Duration::from_secs(1);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args)?;
    let descriptor = DeviceDescriptor::parse(&args.device);
    info!(device = %descriptor, class = %descriptor.class(), version = %config.version, "monitor starting");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let poller = TelemetryPoller::new(config.version, TerminalDisplay::new(format));
    let mut supervisor = Supervisor::new(descriptor, config, poller, UsbAllowList::default())
        .with_running_flag(running);

    match supervisor
        .run()
        .map_err(|err| session_error("monitor failed", err))?
    {
        Outcome::Completed => info!(
            messages = supervisor.consumer().messages(),
            "telemetry cycle complete"
        ),
        Outcome::Stopped => info!("monitor stopped"),
    }
    Ok(SUCCESS)
}

fn session_config(args: &MonitorArgs) -> CliResult<SessionConfig> {
    let version = MspVersion::from_number(args.mspversion).ok_or_else(|| {
        CliError::new(
            USAGE,
            format!("unsupported MSP version: {}", args.mspversion),
        )
    })?;
    Ok(SessionConfig {
        version,
        backoff: parse_duration("backoff", &args.backoff)?,
        pacing: args.slow.then_some(SLOW_PACING),
        once: args.once,
        response_timeout: parse_duration("response timeout", &args.response_timeout)?,
        ..SessionConfig::default()
    })
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::Release);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
