use std::time::Duration;

use serialport::ClearBuffer;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::MspStream;

/// Serial port settings.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    /// How long a read waits for the first byte before reporting a timeout.
    /// Once bytes are pending a read returns whatever is available, so the
    /// receive loop polls without blocking indefinitely.
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(100),
        }
    }
}

/// Open a serial device at the given baud rate and discard stale input.
pub fn open_serial(path: &str, baud: u32, settings: &SerialSettings) -> Result<MspStream> {
    let port = serialport::new(path, baud)
        .timeout(settings.timeout)
        .open()
        .map_err(|source| TransportError::Serial {
            path: path.to_string(),
            source,
        })?;

    if let Err(err) = port.clear(ClearBuffer::Input) {
        debug!(path, error = %err, "could not flush serial input");
    }

    info!(path, baud, "opened serial port");
    Ok(MspStream::from_serial(port, path))
}
