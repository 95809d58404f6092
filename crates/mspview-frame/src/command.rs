//! MSP command ids polled by the monitor.
//!
//! Ids 0-255 are shared between MSPv1 and MSPv2. Ids from 0x1000 upward only
//! exist in MSPv2 frames.

pub const API_VERSION: u16 = 1;
pub const FC_VARIANT: u16 = 2;
pub const FC_VERSION: u16 = 3;
pub const BOARD_INFO: u16 = 4;
pub const BUILD_INFO: u16 = 5;
pub const NAME: u16 = 10;
pub const WP_GETINFO: u16 = 20;
/// Catalogued only; the monitor never sends write commands.
pub const REBOOT: u16 = 68;
pub const IDENT: u16 = 100;
pub const STATUS: u16 = 101;
pub const RAW_GPS: u16 = 106;
pub const ANALOG: u16 = 110;
/// Unsolicited debug text pushed by the firmware.
pub const DEBUGMSG: u16 = 253;
pub const INAV_STATUS: u16 = 0x2000;
pub const INAV_ANALOG: u16 = 0x2002;
pub const MISC2: u16 = 0x203a;

/// Sentinel carried by the terminal message of a failed link. Never sent.
pub const LINK_FAILED: u16 = 0xffff;

/// Returns a human-readable name for a command id.
pub fn command_name(id: u16) -> &'static str {
    match id {
        API_VERSION => "API_VERSION",
        FC_VARIANT => "FC_VARIANT",
        FC_VERSION => "FC_VERSION",
        BOARD_INFO => "BOARD_INFO",
        BUILD_INFO => "BUILD_INFO",
        NAME => "NAME",
        WP_GETINFO => "WP_GETINFO",
        REBOOT => "REBOOT",
        IDENT => "IDENT",
        STATUS => "STATUS",
        RAW_GPS => "RAW_GPS",
        ANALOG => "ANALOG",
        DEBUGMSG => "DEBUGMSG",
        INAV_STATUS => "INAV_STATUS",
        INAV_ANALOG => "INAV_ANALOG",
        MISC2 => "MISC2",
        LINK_FAILED => "LINK_FAILED",
        _ => "UNKNOWN",
    }
}

/// Returns true if the id can only travel in an MSPv2 frame.
pub fn requires_v2(id: u16) -> bool {
    id > 0xff
}
