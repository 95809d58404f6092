//! Payload layouts of the polled commands.
//!
//! All multi-byte fields are little-endian. A payload shorter than its layout
//! is reported as [`TelemetryError::Truncated`] rather than read past the end.

use std::fmt;

use bytes::Buf;
use mspview_frame::command::{
    command_name, ANALOG, API_VERSION, BOARD_INFO, BUILD_INFO, DEBUGMSG, FC_VARIANT, FC_VERSION,
    IDENT, INAV_ANALOG, INAV_STATUS, MISC2, NAME, RAW_GPS, WP_GETINFO,
};

use crate::arming::arming_text;

/// Errors decoding a telemetry payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    #[error("{name} payload truncated: need {need} bytes, got {got}", name = name_of(.command))]
    Truncated { command: u16, need: usize, got: usize },
}

fn name_of(command: &u16) -> &'static str {
    command_name(*command)
}

/// Display slot a decoded value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Ident,
    Name,
    ApiVersion,
    Variant,
    Firmware,
    Build,
    Board,
    Waypoints,
    Uptime,
    Arming,
    Power,
    Gps,
    Debug,
    Rate,
}

impl Field {
    /// Slot that shows the answer to `command`.
    pub fn for_command(command: u16) -> Option<Self> {
        let field = match command {
            IDENT => Field::Ident,
            NAME => Field::Name,
            API_VERSION => Field::ApiVersion,
            FC_VARIANT => Field::Variant,
            FC_VERSION => Field::Firmware,
            BUILD_INFO => Field::Build,
            BOARD_INFO => Field::Board,
            WP_GETINFO => Field::Waypoints,
            MISC2 => Field::Uptime,
            INAV_STATUS => Field::Arming,
            ANALOG | INAV_ANALOG => Field::Power,
            RAW_GPS => Field::Gps,
            DEBUGMSG => Field::Debug,
            _ => return None,
        };
        Some(field)
    }

    /// Short label shown next to the value.
    pub fn label(self) -> &'static str {
        match self {
            Field::Ident => "MW Compat",
            Field::Name => "Name",
            Field::ApiVersion => "API",
            Field::Variant => "Variant",
            Field::Firmware => "Version",
            Field::Build => "Build",
            Field::Board => "Board",
            Field::Waypoints => "WPINFO",
            Field::Uptime => "Uptime",
            Field::Arming => "Arming",
            Field::Power => "Power",
            Field::Gps => "GPS",
            Field::Debug => "Debug",
            Field::Rate => "Rate",
        }
    }

    /// Machine-friendly key.
    pub fn key(self) -> &'static str {
        match self {
            Field::Ident => "ident",
            Field::Name => "name",
            Field::ApiVersion => "api_version",
            Field::Variant => "variant",
            Field::Firmware => "firmware",
            Field::Build => "build",
            Field::Board => "board",
            Field::Waypoints => "waypoints",
            Field::Uptime => "uptime",
            Field::Arming => "arming",
            Field::Power => "power",
            Field::Gps => "gps",
            Field::Debug => "debug",
            Field::Rate => "rate",
        }
    }
}

/// Legacy analog block (`ANALOG`).
#[derive(Debug, Clone, PartialEq)]
pub struct Analog {
    pub volts: f64,
    pub mah_drawn: u16,
    pub rssi: u16,
    pub amps: f64,
}

/// INAV power block (`INAV_ANALOG`).
#[derive(Debug, Clone, PartialEq)]
pub struct InavAnalog {
    pub flags: u8,
    pub volts: f64,
    pub amps: f64,
    pub watts: f64,
    pub mah_drawn: u32,
    pub mwh_drawn: u32,
    pub remaining_capacity: u32,
    pub percent: u8,
    pub rssi: u16,
}

/// GPS fix (`RAW_GPS`).
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    pub fix: u8,
    pub sats: u8,
    pub lat: f64,
    pub lon: f64,
    pub alt_m: i16,
    pub speed_ms: f64,
    pub course_deg: f64,
    /// Only sent by newer firmware.
    pub hdop: Option<f64>,
}

/// One decoded answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    Ident {
        compat: u8,
    },
    Name(String),
    ApiVersion {
        protocol: u8,
        major: u8,
        minor: u8,
    },
    Variant(String),
    Firmware {
        major: u8,
        minor: u8,
        patch: u8,
    },
    Build {
        date: String,
        time: String,
        revision: String,
    },
    Board {
        id: String,
        name: Option<String>,
    },
    Waypoints {
        max: u8,
        valid: u8,
        count: u8,
    },
    Uptime(u32),
    Status {
        arming_flags: u32,
    },
    Analog(Analog),
    InavAnalog(InavAnalog),
    Gps(GpsFix),
    Debug(String),
}

fn need(command: u16, payload: &[u8], need: usize) -> Result<(), TelemetryError> {
    if payload.len() < need {
        return Err(TelemetryError::Truncated {
            command,
            need,
            got: payload.len(),
        });
    }
    Ok(())
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Telemetry {
    /// Decode the payload of an answer. `Ok(None)` for commands without a
    /// known layout.
    pub fn decode(command: u16, payload: &[u8]) -> Result<Option<Self>, TelemetryError> {
        let mut buf = payload;
        let value = match command {
            IDENT => {
                need(command, payload, 1)?;
                Telemetry::Ident { compat: payload[0] }
            }
            NAME => Telemetry::Name(text(payload)),
            API_VERSION => {
                need(command, payload, 3)?;
                Telemetry::ApiVersion {
                    protocol: payload[0],
                    major: payload[1],
                    minor: payload[2],
                }
            }
            FC_VARIANT => {
                need(command, payload, 4)?;
                Telemetry::Variant(text(&payload[..4]))
            }
            FC_VERSION => {
                need(command, payload, 3)?;
                Telemetry::Firmware {
                    major: payload[0],
                    minor: payload[1],
                    patch: payload[2],
                }
            }
            BUILD_INFO => {
                need(command, payload, 19)?;
                Telemetry::Build {
                    date: text(&payload[..11]),
                    time: text(&payload[11..19]),
                    revision: text(&payload[19..]),
                }
            }
            BOARD_INFO => {
                need(command, payload, 4)?;
                let name = (payload.len() > 8).then(|| text(&payload[9..]));
                Telemetry::Board {
                    id: text(&payload[..4]),
                    name,
                }
            }
            WP_GETINFO => {
                need(command, payload, 4)?;
                Telemetry::Waypoints {
                    max: payload[1],
                    valid: payload[2],
                    count: payload[3],
                }
            }
            MISC2 => {
                need(command, payload, 4)?;
                Telemetry::Uptime(buf.get_u32_le())
            }
            INAV_STATUS => {
                need(command, payload, 13)?;
                buf.advance(9);
                Telemetry::Status {
                    arming_flags: buf.get_u32_le(),
                }
            }
            ANALOG => {
                need(command, payload, 7)?;
                Telemetry::Analog(Analog {
                    volts: f64::from(buf.get_u8()) / 10.0,
                    mah_drawn: buf.get_u16_le(),
                    rssi: buf.get_u16_le(),
                    amps: f64::from(buf.get_i16_le()) / 100.0,
                })
            }
            INAV_ANALOG => {
                need(command, payload, 24)?;
                Telemetry::InavAnalog(InavAnalog {
                    flags: buf.get_u8(),
                    volts: f64::from(buf.get_u16_le()) / 100.0,
                    amps: f64::from(buf.get_u16_le()) / 100.0,
                    watts: f64::from(buf.get_u32_le()) / 100.0,
                    mah_drawn: buf.get_u32_le(),
                    mwh_drawn: buf.get_u32_le(),
                    remaining_capacity: buf.get_u32_le(),
                    percent: buf.get_u8(),
                    rssi: buf.get_u16_le(),
                })
            }
            RAW_GPS => {
                need(command, payload, 16)?;
                Telemetry::Gps(GpsFix {
                    fix: buf.get_u8(),
                    sats: buf.get_u8(),
                    lat: f64::from(buf.get_i32_le()) / 1e7,
                    lon: f64::from(buf.get_i32_le()) / 1e7,
                    alt_m: buf.get_i16_le(),
                    speed_ms: f64::from(buf.get_u16_le()) / 100.0,
                    course_deg: f64::from(buf.get_u16_le()) / 10.0,
                    hdop: (buf.remaining() >= 2).then(|| f64::from(buf.get_u16_le()) / 100.0),
                })
            }
            DEBUGMSG => {
                let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
                Telemetry::Debug(text(&payload[..end]))
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    pub fn field(&self) -> Field {
        match self {
            Telemetry::Ident { .. } => Field::Ident,
            Telemetry::Name(_) => Field::Name,
            Telemetry::ApiVersion { .. } => Field::ApiVersion,
            Telemetry::Variant(_) => Field::Variant,
            Telemetry::Firmware { .. } => Field::Firmware,
            Telemetry::Build { .. } => Field::Build,
            Telemetry::Board { .. } => Field::Board,
            Telemetry::Waypoints { .. } => Field::Waypoints,
            Telemetry::Uptime(_) => Field::Uptime,
            Telemetry::Status { .. } => Field::Arming,
            Telemetry::Analog(_) | Telemetry::InavAnalog(_) => Field::Power,
            Telemetry::Gps(_) => Field::Gps,
            Telemetry::Debug(_) => Field::Debug,
        }
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Telemetry::Ident { compat } => write!(f, "{compat}"),
            Telemetry::Name(name) if name.is_empty() => f.write_str("(noname)"),
            Telemetry::Name(name) => write!(f, "\"{name}\""),
            Telemetry::ApiVersion { major, minor, .. } => write!(f, "{major}.{minor}"),
            Telemetry::Variant(variant) => f.write_str(variant),
            Telemetry::Firmware {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
            Telemetry::Build {
                date,
                time,
                revision,
            } => write!(f, "{date} {time} ({revision})"),
            Telemetry::Board { name: Some(name), .. } => f.write_str(name),
            Telemetry::Board { id, name: None } => f.write_str(id),
            Telemetry::Waypoints { max, valid, count } => {
                write!(f, "{count} of {max}, valid {valid}")
            }
            Telemetry::Uptime(seconds) => write!(f, "{seconds}s"),
            Telemetry::Status { arming_flags } => f.write_str(&arming_text(*arming_flags)),
            Telemetry::Analog(a) => write!(
                f,
                "v: {:.1}, psum: {}, amps: {:.2}, rssi: {}",
                a.volts, a.mah_drawn, a.amps, a.rssi
            ),
            Telemetry::InavAnalog(a) => write!(
                f,
                "v: {:.2}, amps: {:.2}, power: {:.2}W, psum: {}mAh {}mWh, {}%, rssi: {}",
                a.volts, a.amps, a.watts, a.mah_drawn, a.mwh_drawn, a.percent, a.rssi
            ),
            Telemetry::Gps(g) => {
                write!(
                    f,
                    "fix {}, sats {}, {:.6}° {:.6}° {}m, spd {:.1} cog {:.0}",
                    g.fix, g.sats, g.lat, g.lon, g.alt_m, g.speed_ms, g.course_deg
                )?;
                if let Some(hdop) = g.hdop {
                    write!(f, ", hdop {hdop:.1}")?;
                }
                Ok(())
            }
            Telemetry::Debug(text) => f.write_str(text),
        }
    }
}
