use mspview_transport::UsbAllowList;

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_ports, OutputFormat};

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let allow = UsbAllowList::default();
    let ports = UsbAllowList::enumerate().map_err(|err| transport_error("port scan failed", err))?;
    let marked: Vec<_> = ports
        .into_iter()
        .map(|port| {
            let candidate = allow.is_candidate(&port);
            (port, candidate)
        })
        .collect();
    print_ports(&marked, format);
    Ok(SUCCESS)
}
