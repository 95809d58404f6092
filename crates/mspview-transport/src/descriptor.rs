//! Device address grammar.
//!
//! A connection string is classified without touching the system:
//!
//! ```text
//! ""  | "auto"                        discovery
//! AA:BB:CC:DD:EE:FF                   bluetooth (17 chars, colons at 2/8/14)
//! tcp://HOST:PORT                     tcp
//! udp://HOST:PORT[/[BHOST]:BPORT][?bind=BPORT]
//!                                     udp, optional local bind endpoint
//! PATH[@BAUD]                         serial, default 115200 baud
//! ```
//!
//! Parsing never fails. Input that matches none of the forms yields
//! [`DeviceDescriptor::Unrecognized`]; callers check [`DeviceDescriptor::class`]
//! before opening anything.

use std::fmt;

/// Baud rate used when a serial path carries no `@BAUD` suffix.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Transport family selected by a device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// The address matched no known grammar.
    None,
    /// Pick a serial port through discovery.
    Auto,
    Serial,
    Tcp,
    Udp,
    Bluetooth,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::None => "none",
            DeviceClass::Auto => "auto",
            DeviceClass::Serial => "serial",
            DeviceClass::Tcp => "tcp",
            DeviceClass::Udp => "udp",
            DeviceClass::Bluetooth => "bluetooth",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, immutable device address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceDescriptor {
    /// Input that matched none of the recognized forms (kept verbatim).
    Unrecognized(String),
    /// Empty input or the literal `auto`.
    Auto,
    Serial {
        path: String,
        baud: u32,
    },
    Tcp {
        host: String,
        port: u16,
    },
    Udp {
        host: String,
        port: u16,
        bind_host: Option<String>,
        bind_port: Option<u16>,
    },
    Bluetooth {
        address: String,
    },
}

impl DeviceDescriptor {
    /// Classify a connection string.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("auto") {
            return Self::Auto;
        }
        if is_bluetooth_address(input) {
            return Self::Bluetooth {
                address: input.to_string(),
            };
        }
        let parsed = match input.split_once("://") {
            Some((scheme, rest)) => parse_url(scheme, rest),
            None => parse_serial(input),
        };
        parsed.unwrap_or_else(|| Self::Unrecognized(input.to_string()))
    }

    /// The transport family this descriptor selects.
    pub fn class(&self) -> DeviceClass {
        match self {
            Self::Unrecognized(_) => DeviceClass::None,
            Self::Auto => DeviceClass::Auto,
            Self::Serial { .. } => DeviceClass::Serial,
            Self::Tcp { .. } => DeviceClass::Tcp,
            Self::Udp { .. } => DeviceClass::Udp,
            Self::Bluetooth { .. } => DeviceClass::Bluetooth,
        }
    }

    /// Serial descriptor for a discovered port name at the default baud rate.
    pub fn serial(path: impl Into<String>) -> Self {
        Self::Serial {
            path: path.into(),
            baud: DEFAULT_BAUD,
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(raw) => f.write_str(raw),
            Self::Auto => f.write_str("auto"),
            Self::Serial { path, baud } => write!(f, "{path}@{baud}"),
            Self::Tcp { host, port } => write!(f, "tcp://{}", host_port(host, *port)),
            Self::Udp {
                host,
                port,
                bind_host,
                bind_port,
            } => {
                write!(f, "udp://{}", host_port(host, *port))?;
                match (bind_host, bind_port) {
                    (Some(bind_host), Some(bind_port)) => {
                        write!(f, "/{}", host_port(bind_host, *bind_port))?
                    }
                    (Some(bind_host), None) => write!(f, "/{}", bracketed(bind_host))?,
                    (None, Some(bind_port)) => write!(f, "?bind={bind_port}")?,
                    (None, None) => {}
                }
                Ok(())
            }
            Self::Bluetooth { address } => f.write_str(address),
        }
    }
}

/// Bracket IPv6 literals so a following `:port` cannot be misread.
fn bracketed(host: &str) -> String {
    if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

/// Format `host:port`, bracketing IPv6 literals.
pub fn host_port(host: &str, port: u16) -> String {
    format!("{}:{port}", bracketed(host))
}

fn is_bluetooth_address(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 17 && bytes[2] == b':' && bytes[8] == b':' && bytes[14] == b':'
}

fn parse_serial(input: &str) -> Option<DeviceDescriptor> {
    let (path, baud) = match input.rsplit_once('@') {
        Some((path, baud)) => (path, baud.parse::<u32>().ok().filter(|b| *b > 0)?),
        None => (input, DEFAULT_BAUD),
    };
    if path.is_empty() {
        return None;
    }
    Some(DeviceDescriptor::Serial {
        path: path.to_string(),
        baud,
    })
}

fn parse_url(scheme: &str, rest: &str) -> Option<DeviceDescriptor> {
    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (rest, None),
    };
    let (authority, path) = match rest.split_once('/') {
        Some((authority, path)) => (authority, Some(path)),
        None => (rest, None),
    };

    let (host, port) = split_host_port(authority)?;
    let port = port?;

    let (mut bind_host, mut bind_port) = (None, None);
    if let Some(path) = path.filter(|p| !p.is_empty()) {
        let (secondary_host, secondary_port) = split_host_port(path)?;
        bind_host = Some(secondary_host).filter(|h| !h.is_empty());
        bind_port = secondary_port;
    }
    for pair in query.unwrap_or_default().split('&') {
        if let Some(("bind", value)) = pair.split_once('=') {
            bind_port = Some(value.parse().ok()?);
        }
    }

    match scheme.to_ascii_lowercase().as_str() {
        "tcp" if !host.is_empty() => Some(DeviceDescriptor::Tcp { host, port }),
        "udp" => Some(DeviceDescriptor::Udp {
            host,
            port,
            bind_host,
            bind_port,
        }),
        _ => None,
    }
}

/// Split `host[:port]`, accepting bracketed IPv6 hosts. A present but
/// non-numeric port rejects the whole string.
fn split_host_port(input: &str) -> Option<(String, Option<u16>)> {
    if let Some(bracketed) = input.strip_prefix('[') {
        let (host, rest) = bracketed.split_once(']')?;
        let port = match rest {
            "" => None,
            rest => Some(rest.strip_prefix(':')?.parse().ok()?),
        };
        return Some((host.to_string(), port));
    }
    match input.rsplit_once(':') {
        Some((host, port)) => Some((host.to_string(), Some(port.parse().ok()?))),
        None => Some((input.to_string(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_with_baud() {
        assert_eq!(
            DeviceDescriptor::parse("/dev/ttyUSB0@57600"),
            DeviceDescriptor::Serial {
                path: "/dev/ttyUSB0".to_string(),
                baud: 57600,
            }
        );
    }

    #[test]
    fn serial_default_baud() {
        let desc = DeviceDescriptor::parse("/dev/ttyUSB0");
        assert_eq!(desc, DeviceDescriptor::serial("/dev/ttyUSB0"));
        assert_eq!(desc.class(), DeviceClass::Serial);
    }

    #[test]
    fn serial_windows_port() {
        assert_eq!(
            DeviceDescriptor::parse("COM3@9600"),
            DeviceDescriptor::Serial {
                path: "COM3".to_string(),
                baud: 9600,
            }
        );
    }

    #[test]
    fn serial_bad_baud_is_unrecognized() {
        assert_eq!(
            DeviceDescriptor::parse("/dev/ttyACM0@fast").class(),
            DeviceClass::None
        );
        assert_eq!(DeviceDescriptor::parse("@115200").class(), DeviceClass::None);
        assert_eq!(DeviceDescriptor::parse("/dev/ttyACM0@0").class(), DeviceClass::None);
    }

    #[test]
    fn tcp_url() {
        assert_eq!(
            DeviceDescriptor::parse("tcp://192.168.1.1:5760"),
            DeviceDescriptor::Tcp {
                host: "192.168.1.1".to_string(),
                port: 5760,
            }
        );
    }

    #[test]
    fn tcp_ipv6_url() {
        assert_eq!(
            DeviceDescriptor::parse("tcp://[::1]:5760"),
            DeviceDescriptor::Tcp {
                host: "::1".to_string(),
                port: 5760,
            }
        );
    }

    #[test]
    fn tcp_requires_host_and_port() {
        assert_eq!(DeviceDescriptor::parse("tcp://localhost").class(), DeviceClass::None);
        assert_eq!(DeviceDescriptor::parse("tcp://:5760").class(), DeviceClass::None);
        assert_eq!(
            DeviceDescriptor::parse("tcp://localhost:port").class(),
            DeviceClass::None
        );
    }

    #[test]
    fn udp_with_bind_query() {
        assert_eq!(
            DeviceDescriptor::parse("udp://0.0.0.0:14550?bind=14551"),
            DeviceDescriptor::Udp {
                host: "0.0.0.0".to_string(),
                port: 14550,
                bind_host: None,
                bind_port: Some(14551),
            }
        );
    }

    #[test]
    fn udp_with_secondary_path() {
        assert_eq!(
            DeviceDescriptor::parse("udp://10.0.0.2:14550/:14551"),
            DeviceDescriptor::Udp {
                host: "10.0.0.2".to_string(),
                port: 14550,
                bind_host: None,
                bind_port: Some(14551),
            }
        );
        assert_eq!(
            DeviceDescriptor::parse("udp://10.0.0.2:14550/10.0.0.1:14551"),
            DeviceDescriptor::Udp {
                host: "10.0.0.2".to_string(),
                port: 14550,
                bind_host: Some("10.0.0.1".to_string()),
                bind_port: Some(14551),
            }
        );
    }

    #[test]
    fn udp_listen_only() {
        let desc = DeviceDescriptor::parse("udp://:14550");
        assert_eq!(desc.class(), DeviceClass::Udp);
    }

    #[test]
    fn unknown_scheme() {
        assert_eq!(
            DeviceDescriptor::parse("http://example.com:80"),
            DeviceDescriptor::Unrecognized("http://example.com:80".to_string())
        );
    }

    #[test]
    fn bluetooth_mac() {
        let desc = DeviceDescriptor::parse("00:11:22:33:44:55");
        assert_eq!(desc.class(), DeviceClass::Bluetooth);
        assert_eq!(
            desc,
            DeviceDescriptor::Bluetooth {
                address: "00:11:22:33:44:55".to_string()
            }
        );
    }

    #[test]
    fn auto_forms() {
        assert_eq!(DeviceDescriptor::parse(""), DeviceDescriptor::Auto);
        assert_eq!(DeviceDescriptor::parse("auto"), DeviceDescriptor::Auto);
        assert_eq!(DeviceDescriptor::parse("  "), DeviceDescriptor::Auto);
    }

    #[test]
    fn udp_bind_host_without_port_keeps_port_unset() {
        let desc = DeviceDescriptor::parse("udp://10.0.0.2:14550/10.0.0.1");
        assert_eq!(desc.to_string(), "udp://10.0.0.2:14550/10.0.0.1");
        let DeviceDescriptor::Udp {
            bind_host,
            bind_port,
            ..
        } = DeviceDescriptor::parse(&desc.to_string())
        else {
            panic!("expected udp");
        };
        assert_eq!(bind_host.as_deref(), Some("10.0.0.1"));
        assert_eq!(bind_port, None);
    }

    #[test]
    fn display_is_reparseable() {
        for input in [
            "/dev/ttyUSB0@57600",
            "tcp://192.168.1.1:5760",
            "tcp://[::1]:5760",
            "udp://0.0.0.0:14550?bind=14551",
            "udp://10.0.0.2:14550/10.0.0.1:14551",
            "udp://10.0.0.2:14550/10.0.0.1",
            "00:11:22:33:44:55",
        ] {
            let desc = DeviceDescriptor::parse(input);
            assert_eq!(DeviceDescriptor::parse(&desc.to_string()), desc, "{input}");
        }
    }
}
