use crate::descriptor::DeviceClass;

/// Errors that can occur while resolving or opening a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device address did not match any known grammar.
    #[error("unrecognized device address: {0:?}")]
    InvalidDescriptor(String),

    /// Host name resolution failed or produced no usable address.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        source: std::io::Error,
    },

    /// Failed to connect to the remote endpoint.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    /// Failed to bind the local endpoint.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    /// The serial device could not be opened or configured.
    #[error("serial port {path}: {source}")]
    Serial {
        path: String,
        source: serialport::Error,
    },

    /// The descriptor class is recognized but has no dial path.
    #[error("{class} transport is not supported")]
    Unsupported { class: DeviceClass },

    /// Auto-discovery found no allow-listed serial port.
    #[error("no candidate serial port found")]
    NoCandidatePort,

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
