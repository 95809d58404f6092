use crate::codec::MspVersion;

/// Errors that can occur during frame encoding or while reading frames.
///
/// Checksum and direction failures are not errors: they are reported in
/// [`crate::Message::status`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the length field of the selected version.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The command id does not fit the command field of the selected version.
    #[error("command {command} cannot be sent as {version}")]
    CommandOutOfRange { command: u16, version: MspVersion },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link reached end-of-stream.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
