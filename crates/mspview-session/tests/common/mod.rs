#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use bytes::BytesMut;
use mspview_frame::command::{
    ANALOG, API_VERSION, BOARD_INFO, BUILD_INFO, FC_VARIANT, FC_VERSION, IDENT, INAV_ANALOG,
    INAV_STATUS, MISC2, NAME, RAW_GPS, WP_GETINFO,
};
use mspview_frame::{encode_frame, MspVersion, DIR_RESPONSE};
use mspview_session::{Field, TelemetryDisplay};

/// What the fake flight controller does with one request.
pub enum Reply {
    /// Write these bytes back.
    Bytes(Vec<u8>),
    /// Say nothing.
    Ignore,
    /// Drop the connection.
    Hangup,
}

pub type Script = Box<dyn FnMut(MspVersion, u16) -> Reply + Send>;

pub fn frame(version: MspVersion, command: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_frame(version, DIR_RESPONSE, command, payload, &mut buf).unwrap();
    buf.to_vec()
}

/// A plausible answer payload for every polled command.
pub fn canned_payload(command: u16) -> Vec<u8> {
    match command {
        IDENT => vec![231, 3, 0, 0, 0, 0, 0],
        NAME => b"testquad".to_vec(),
        API_VERSION => vec![0, 2, 5],
        FC_VARIANT => b"INAV".to_vec(),
        FC_VERSION => vec![7, 1, 2],
        BUILD_INFO => b"Jan 01 202412:34:56abc1234".to_vec(),
        BOARD_INFO => b"MTK4\x00\x00\x00\x00\x09MATEKF405".to_vec(),
        WP_GETINFO => vec![0, 120, 1, 0],
        MISC2 => 3600u32.to_le_bytes().to_vec(),
        INAV_STATUS => {
            let mut p = vec![0u8; 9];
            p.extend_from_slice(&(1u32 << 8).to_le_bytes());
            p
        }
        INAV_ANALOG => {
            let mut p = vec![0u8];
            p.extend_from_slice(&1262u16.to_le_bytes());
            p.extend_from_slice(&153u16.to_le_bytes());
            p.extend_from_slice(&1930u32.to_le_bytes());
            p.extend_from_slice(&12u32.to_le_bytes());
            p.extend_from_slice(&150u32.to_le_bytes());
            p.extend_from_slice(&1300u32.to_le_bytes());
            p.push(98);
            p.extend_from_slice(&1000u16.to_le_bytes());
            p
        }
        ANALOG => {
            let mut p = vec![126];
            p.extend_from_slice(&12u16.to_le_bytes());
            p.extend_from_slice(&1000u16.to_le_bytes());
            p.extend_from_slice(&153i16.to_le_bytes());
            p
        }
        RAW_GPS => {
            let mut p = vec![2, 12];
            p.extend_from_slice(&509_100_340i32.to_le_bytes());
            p.extend_from_slice(&(-15_350_000i32).to_le_bytes());
            p.extend_from_slice(&45i16.to_le_bytes());
            p.extend_from_slice(&0u16.to_le_bytes());
            p.extend_from_slice(&0u16.to_le_bytes());
            p
        }
        _ => Vec::new(),
    }
}

/// Answer every request with its canned payload, in the request's grammar.
pub fn answer_all() -> Script {
    Box::new(|version, command| Reply::Bytes(frame(version, command, &canned_payload(command))))
}

/// Parse one request frame (`$M<` or `$X<`) off a byte stream.
pub fn read_request(stream: &mut impl Read) -> io::Result<(MspVersion, u16)> {
    let mut head = [0u8; 3];
    stream.read_exact(&mut head)?;
    assert_eq!(head[0], b'$');
    assert_eq!(head[2], b'<', "requests carry the request direction");
    let (version, command, len) = match head[1] {
        b'M' => {
            let mut h = [0u8; 2];
            stream.read_exact(&mut h)?;
            (MspVersion::V1, h[1] as u16, h[0] as usize)
        }
        b'X' => {
            let mut h = [0u8; 5];
            stream.read_exact(&mut h)?;
            let command = u16::from_le_bytes([h[1], h[2]]);
            let len = u16::from_le_bytes([h[3], h[4]]) as usize;
            (MspVersion::V2, command, len)
        }
        other => panic!("unknown version tag {other:#x}"),
    };
    let mut rest = vec![0u8; len + 1];
    stream.read_exact(&mut rest)?;
    Ok((version, command))
}

/// Flight controller on a loopback TCP port. Each script serves one
/// accepted connection; joining returns the requests seen per connection.
pub struct FakeFc {
    pub port: u16,
    handle: JoinHandle<Vec<Vec<(MspVersion, u16)>>>,
}

impl FakeFc {
    pub fn spawn(scripts: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut log = Vec::new();
            for mut script in scripts {
                let (mut conn, _) = listener.accept().unwrap();
                let mut seen = Vec::new();
                while let Ok((version, command)) = read_request(&mut conn) {
                    seen.push((version, command));
                    match script(version, command) {
                        Reply::Bytes(bytes) => {
                            if conn.write_all(&bytes).is_err() {
                                break;
                            }
                        }
                        Reply::Ignore => {}
                        Reply::Hangup => break,
                    }
                }
                log.push(seen);
            }
            log
        });
        Self { port, handle }
    }

    pub fn address(&self) -> String {
        format!("tcp://127.0.0.1:{}", self.port)
    }

    pub fn join(self) -> Vec<Vec<(MspVersion, u16)>> {
        self.handle.join().unwrap()
    }
}

#[derive(Debug, Default)]
pub struct DisplayLog {
    pub updates: Vec<(Field, String)>,
    pub events: Vec<String>,
}

/// Display that records into shared memory so tests can inspect it after
/// the supervisor took ownership.
#[derive(Clone, Default)]
pub struct SharedDisplay(pub Arc<Mutex<DisplayLog>>);

impl SharedDisplay {
    pub fn value(&self, field: Field) -> Option<String> {
        let log = self.0.lock().unwrap();
        log.updates
            .iter()
            .rev()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.clone())
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().events.clone()
    }
}

impl TelemetryDisplay for SharedDisplay {
    fn update(&mut self, field: Field, value: &str) {
        self.0
            .lock()
            .unwrap()
            .updates
            .push((field, value.to_string()));
    }

    fn connected(&mut self, port: &str) {
        self.0.lock().unwrap().events.push(format!("connected {port}"));
    }

    fn disconnected(&mut self, reason: &str) {
        self.0
            .lock()
            .unwrap()
            .events
            .push(format!("disconnected {reason}"));
    }
}
