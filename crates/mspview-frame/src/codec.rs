use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::LINK_FAILED;
use crate::error::{FrameError, Result};

/// Frame preamble, `$`.
pub const PREAMBLE: u8 = b'$';

/// Direction byte of an outbound request, `<`.
pub const DIR_REQUEST: u8 = b'<';

/// Direction byte of a successful response, `>`.
pub const DIR_RESPONSE: u8 = b'>';

/// Direction byte of a peer-reported error, `!`.
pub const DIR_ERROR: u8 = b'!';

/// Wire grammar of a frame.
///
/// Both grammars share the `$`, version tag and direction envelope. They
/// differ in the width of the command and length fields and in the checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MspVersion {
    /// `$M`: 8-bit command and length, XOR checksum.
    V1,
    /// `$X`: flags byte, 16-bit little-endian command and length, CRC-8/DVB-S2.
    #[default]
    V2,
}

impl MspVersion {
    /// Version tag following the preamble.
    pub fn tag(self) -> u8 {
        match self {
            MspVersion::V1 => b'M',
            MspVersion::V2 => b'X',
        }
    }

    /// Version selected by a tag byte, if any.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'M' => Some(MspVersion::V1),
            b'X' => Some(MspVersion::V2),
            _ => None,
        }
    }

    /// Version from its protocol number (1 or 2).
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(MspVersion::V1),
            2 => Some(MspVersion::V2),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            MspVersion::V1 => 1,
            MspVersion::V2 => 2,
        }
    }

    /// Largest payload the length field can describe.
    pub fn max_payload(self) -> usize {
        match self {
            MspVersion::V1 => u8::MAX as usize,
            MspVersion::V2 => u16::MAX as usize,
        }
    }

    /// Largest command id the command field can carry.
    pub fn max_command(self) -> u16 {
        match self {
            MspVersion::V1 => u8::MAX as u16,
            MspVersion::V2 => u16::MAX,
        }
    }

    /// Bytes a frame occupies besides its payload.
    pub fn overhead(self) -> usize {
        match self {
            // $ M dir len cmd .. crc
            MspVersion::V1 => 6,
            // $ X dir flags cmd(2) len(2) .. crc
            MspVersion::V2 => 9,
        }
    }

    /// Fold one byte into the running checksum of this grammar.
    pub fn checksum_step(self, acc: u8, byte: u8) -> u8 {
        match self {
            MspVersion::V1 => acc ^ byte,
            MspVersion::V2 => crc8_dvb_s2(acc, byte),
        }
    }
}

impl fmt::Display for MspVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MSPv{}", self.number())
    }
}

/// CRC-8/DVB-S2 step: polynomial 0xD5, MSB first, no reflection.
pub fn crc8_dvb_s2(crc: u8, byte: u8) -> u8 {
    let mut crc = crc ^ byte;
    for _ in 0..8 {
        crc = if crc & 0x80 != 0 {
            (crc << 1) ^ 0xd5
        } else {
            crc << 1
        };
    }
    crc
}

/// Outcome attached to every decoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Genuine response with a valid checksum.
    Ok,
    /// The peer answered with `!`; the frame itself was intact.
    DirectionMismatch,
    /// The frame was fully read but its checksum did not match.
    ChecksumError,
    /// The link failed; terminal message of a session.
    LinkFailed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::DirectionMismatch => "direction-mismatch",
            Status::ChecksumError => "checksum-error",
            Status::LinkFailed => "link-failed",
        }
    }
}

/// One decoded MSP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Command id (function) the frame answers.
    pub command: u16,
    /// Payload bytes; length always equals the decoded length field.
    pub payload: Bytes,
    pub status: Status,
}

impl Message {
    pub fn new(command: u16, payload: impl Into<Bytes>, status: Status) -> Self {
        Self {
            command,
            payload: payload.into(),
            status,
        }
    }

    /// Terminal message emitted when the link fails.
    pub fn link_failed() -> Self {
        Self::new(LINK_FAILED, Bytes::new(), Status::LinkFailed)
    }

    /// Whether the payload can be trusted.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Whether this is the terminal message of a failed link.
    pub fn is_link_failed(&self) -> bool {
        self.status == Status::LinkFailed
    }
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: u16,
    pub payload: Bytes,
}

impl Request {
    /// A request without payload, which is all the polling sequence needs.
    pub fn new(command: u16) -> Self {
        Self {
            command,
            payload: Bytes::new(),
        }
    }

    pub fn with_payload(command: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }
}

/// Encode a request frame (direction `<`).
pub fn encode_request(
    version: MspVersion,
    command: u16,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    encode_frame(version, DIR_REQUEST, command, payload, dst)
}

/// Encode a frame with an explicit direction byte into the wire format.
///
/// Wire format:
/// ```text
/// MSPv1  $ M dir len(u8) cmd(u8) payload[len] xor(len, cmd, payload)
/// MSPv2  $ X dir flags(u8=0) cmd(u16 LE) len(u16 LE) payload[len]
///        crc8_dvb_s2(flags .. payload)
/// ```
pub fn encode_frame(
    version: MspVersion,
    direction: u8,
    command: u16,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.len() > version.max_payload() {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: version.max_payload(),
        });
    }
    if command > version.max_command() {
        return Err(FrameError::CommandOutOfRange { command, version });
    }

    dst.reserve(version.overhead() + payload.len());
    dst.put_u8(PREAMBLE);
    dst.put_u8(version.tag());
    dst.put_u8(direction);

    let body_start = dst.len();
    match version {
        MspVersion::V1 => {
            dst.put_u8(payload.len() as u8);
            dst.put_u8(command as u8);
        }
        MspVersion::V2 => {
            dst.put_u8(0); // flags
            dst.put_u16_le(command);
            dst.put_u16_le(payload.len() as u16);
        }
    }
    dst.put_slice(payload);

    let checksum = dst[body_start..]
        .iter()
        .fold(0u8, |acc, &byte| version.checksum_step(acc, byte));
    dst.put_u8(checksum);
    Ok(())
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Grammar used for outbound requests. Inbound frames of either grammar
    /// are always accepted.
    pub version: MspVersion,
    /// Size of a single read from the link. Large enough for a whole MSPv2
    /// frame so no UDP datagram is ever truncated.
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            version: MspVersion::default(),
            read_chunk_size: MspVersion::V2.max_payload() + MspVersion::V2.overhead(),
        }
    }
}
