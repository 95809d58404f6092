//! MultiWii Serial Protocol telemetry for flight controllers.
//!
//! mspview polls identity, power, GPS and arming state from MSP firmware
//! (INAV, Betaflight, MultiWii) over serial, TCP or UDP links.
//!
//! # Crate Structure
//!
//! - [`transport`]: Device addresses, serial/TCP/UDP links, port discovery
//! - [`frame`]: MSPv1/MSPv2 encoding and the streaming decoder
//! - [`session`]: Polling supervisor and telemetry decoding (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use mspview_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mspview_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use mspview_session::*;
}
