//! Polling order: which request follows which answer.
//!
//! The session opens with a one-off identification run and then loops over a
//! short telemetry cycle. The cycle differs per protocol version because the
//! MSPv2-only commands cannot be asked for in a legacy frame.

use mspview_frame::command::{
    ANALOG, API_VERSION, BOARD_INFO, BUILD_INFO, DEBUGMSG, FC_VARIANT, FC_VERSION, IDENT,
    INAV_ANALOG, INAV_STATUS, MISC2, NAME, RAW_GPS, WP_GETINFO,
};
use mspview_frame::MspVersion;

/// Answer that closes a telemetry cycle.
pub const CYCLE_END: u16 = RAW_GPS;

/// `answered -> next request` for MSPv2 sessions.
const V2_TABLE: &[(u16, u16)] = &[
    (IDENT, NAME),
    (NAME, API_VERSION),
    (API_VERSION, FC_VARIANT),
    (FC_VARIANT, FC_VERSION),
    (FC_VERSION, BUILD_INFO),
    (BUILD_INFO, BOARD_INFO),
    (BOARD_INFO, WP_GETINFO),
    (WP_GETINFO, MISC2),
    (MISC2, INAV_STATUS),
    (INAV_STATUS, INAV_ANALOG),
    (INAV_ANALOG, RAW_GPS),
    (RAW_GPS, MISC2),
];

/// `answered -> next request` for MSPv1 sessions.
const V1_TABLE: &[(u16, u16)] = &[
    (IDENT, NAME),
    (NAME, API_VERSION),
    (API_VERSION, FC_VARIANT),
    (FC_VARIANT, FC_VERSION),
    (FC_VERSION, BUILD_INFO),
    (BUILD_INFO, BOARD_INFO),
    (BOARD_INFO, WP_GETINFO),
    (WP_GETINFO, ANALOG),
    (ANALOG, RAW_GPS),
    (RAW_GPS, ANALOG),
];

/// What the session should do after an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Request `0` next.
    Next(u16),
    /// A telemetry cycle just completed; `0` opens the next one.
    CycleEnd(u16),
    /// Pushed by the firmware without a request; nothing to send.
    Unsolicited,
    /// Not part of the polling order.
    Unexpected,
}

/// Command sequencing table for one protocol version.
#[derive(Debug, Clone, Copy)]
pub struct Sequence {
    table: &'static [(u16, u16)],
}

impl Sequence {
    pub fn new(version: MspVersion) -> Self {
        let table = match version {
            MspVersion::V1 => V1_TABLE,
            MspVersion::V2 => V2_TABLE,
        };
        Self { table }
    }

    /// First request of every connection.
    pub fn first(&self) -> u16 {
        IDENT
    }

    /// Step following an answer to `command`.
    pub fn step(&self, command: u16) -> Step {
        if command == DEBUGMSG {
            return Step::Unsolicited;
        }
        match self.table.iter().find(|(answered, _)| *answered == command) {
            Some(&(answered, next)) if answered == CYCLE_END => Step::CycleEnd(next),
            Some(&(_, next)) => Step::Next(next),
            None => Step::Unexpected,
        }
    }

    /// Every command this sequence will request.
    pub fn commands(&self) -> impl Iterator<Item = u16> + '_ {
        self.table.iter().map(|(answered, _)| *answered)
    }
}
