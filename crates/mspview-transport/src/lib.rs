//! Device addressing and byte-stream transports for MSP.
//!
//! Provides a unified interface over the links a flight controller can sit
//! behind:
//! - Serial ports (USB VCP, UART bridges)
//! - TCP (SITL, serial-to-network bridges)
//! - UDP (datagrams treated as a stream source)
//!
//! This is the lowest layer of mspview. Everything else builds on top of
//! the [`MspStream`] type provided here. Nothing in this crate retries; a
//! failed open is reported to the caller, which decides when to try again.

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod net;
pub mod serial;
pub mod traits;

pub use descriptor::{DeviceClass, DeviceDescriptor, DEFAULT_BAUD};
pub use discovery::{PortDiscovery, PortSummary, UsbAllowList, DEFAULT_ALLOW_LIST};
pub use error::{Result, TransportError};
pub use net::{connect_tcp, open_udp};
pub use serial::{open_serial, SerialSettings};
pub use traits::MspStream;

/// Open the link a descriptor points at.
///
/// `Auto` descriptors must be resolved through [`PortDiscovery`] first.
/// Bluetooth addresses are recognized but have no dial path.
pub fn open(descriptor: &DeviceDescriptor, serial: &SerialSettings) -> Result<MspStream> {
    match descriptor {
        DeviceDescriptor::Serial { path, baud } => open_serial(path, *baud, serial),
        DeviceDescriptor::Tcp { host, port } => connect_tcp(host, *port),
        DeviceDescriptor::Udp {
            host,
            port,
            bind_host,
            bind_port,
        } => open_udp(host, *port, bind_host.as_deref(), *bind_port),
        DeviceDescriptor::Bluetooth { .. } => Err(TransportError::Unsupported {
            class: descriptor.class(),
        }),
        DeviceDescriptor::Auto | DeviceDescriptor::Unrecognized(_) => {
            Err(TransportError::InvalidDescriptor(descriptor.to_string()))
        }
    }
}
