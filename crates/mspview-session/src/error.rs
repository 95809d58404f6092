/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] mspview_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] mspview_frame::FrameError),

    /// The device address is not in any recognised form.
    #[error("invalid device address: {0:?}")]
    InvalidDescriptor(String),

    /// The device address is recognised but cannot be opened.
    #[error("unsupported device: {0}")]
    Unsupported(String),

    /// The link went away.
    #[error("disconnected: {0}")]
    Disconnected(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
