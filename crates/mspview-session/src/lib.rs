//! Session supervision for MSP telemetry polling.
//!
//! This is the "just works" layer. A [`Supervisor`] resolves a device
//! address, opens a [`Session`], keeps exactly one request in flight, hands
//! every answer to a [`Consumer`], and reconnects after any failure with a
//! fixed backoff.

pub mod arming;
pub mod config;
pub mod consumer;
pub mod error;
pub mod sequence;
pub mod session;
pub mod supervisor;
pub mod telemetry;

pub use arming::{arming_reasons, arming_text};
pub use config::{SessionConfig, DEFAULT_BACKOFF, DEFAULT_RESPONSE_TIMEOUT};
pub use consumer::{Action, Consumer, TelemetryDisplay, TelemetryPoller};
pub use error::{Result, SessionError};
pub use sequence::{Sequence, Step, CYCLE_END};
pub use session::Session;
pub use supervisor::{Outcome, Phase, Supervisor};
pub use telemetry::{Analog, Field, GpsFix, InavAnalog, Telemetry, TelemetryError};
