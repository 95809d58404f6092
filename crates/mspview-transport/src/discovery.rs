//! Serial port discovery for `auto` device addresses.

use serialport::SerialPortType;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// USB VID:PID pairs of flight-controller serial bridges.
///
/// - `0483:5740` STM32 virtual COM port
/// - `0403:6001` FTDI FT232
pub const DEFAULT_ALLOW_LIST: &[(u16, u16)] = &[(0x0483, 0x5740), (0x0403, 0x6001)];

/// Picks a serial port when the user asked for `auto`.
pub trait PortDiscovery {
    /// Name of the port to open, if any candidate is present right now.
    fn find_candidate_port(&self) -> Option<String>;
}

impl<F> PortDiscovery for F
where
    F: Fn() -> Option<String>,
{
    fn find_candidate_port(&self) -> Option<String> {
        self()
    }
}

/// One enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub name: String,
    /// `(vid, pid)` for USB ports.
    pub usb_id: Option<(u16, u16)>,
    pub product: Option<String>,
}

impl From<serialport::SerialPortInfo> for PortSummary {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let (usb_id, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (Some((usb.vid, usb.pid)), usb.product),
            _ => (None, None),
        };
        Self {
            name: info.port_name,
            usb_id,
            product,
        }
    }
}

/// Discovery by USB vendor/product allow-listing.
#[derive(Debug, Clone)]
pub struct UsbAllowList {
    allowed: Vec<(u16, u16)>,
}

impl Default for UsbAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOW_LIST)
    }
}

impl UsbAllowList {
    pub fn new(allowed: &[(u16, u16)]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }

    /// Whether a port would be picked by this allow list.
    pub fn is_candidate(&self, port: &PortSummary) -> bool {
        !port.name.is_empty()
            && port
                .usb_id
                .map(|id| self.allowed.contains(&id))
                .unwrap_or(false)
    }

    /// First candidate in enumeration order.
    pub fn select<'a>(&self, ports: &'a [PortSummary]) -> Option<&'a PortSummary> {
        ports.iter().find(|port| self.is_candidate(port))
    }

    /// Enumerate the system's serial ports.
    pub fn enumerate() -> Result<Vec<PortSummary>> {
        let ports = serialport::available_ports().map_err(|err| {
            TransportError::Io(std::io::Error::other(format!(
                "serial port enumeration failed: {err}"
            )))
        })?;
        Ok(ports.into_iter().map(PortSummary::from).collect())
    }
}

impl PortDiscovery for UsbAllowList {
    fn find_candidate_port(&self) -> Option<String> {
        let ports = match Self::enumerate() {
            Ok(ports) => ports,
            Err(err) => {
                warn!(error = %err, "port discovery failed");
                return None;
            }
        };
        let found = self.select(&ports).map(|port| port.name.clone());
        debug!(scanned = ports.len(), found = ?found, "port discovery");
        found
    }
}
