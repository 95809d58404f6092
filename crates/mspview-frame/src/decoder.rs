//! Byte-at-a-time MSP decoder.
//!
//! The decoder is an explicit state value plus a pure transition function
//! ([`State::advance`]). Bytes may arrive in chunks of any size, including
//! one at a time, and a single [`FrameDecoder`] survives across reads.
//!
//! ```text
//! Idle --$--> Start --M|X--> Direction --> Header fields --> Payload --> Checksum --> Idle
//!                                  (> ok, ! error)   v1: len cmd
//!                                                    v2: flags cmdLo cmdHi lenLo lenHi
//! ```
//!
//! Any unexpected byte before the header resets to `Idle`, which doubles as
//! resynchronisation. A frame whose checksum does not match is still emitted,
//! with [`Status::ChecksumError`].

use bytes::Bytes;
use tracing::{debug, trace};

use crate::codec::{Message, MspVersion, Status, DIR_ERROR, DIR_RESPONSE, PREAMBLE};

/// Header field the decoder expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Flags,
    CommandLo,
    CommandHi,
    LengthLo,
    LengthHi,
}

impl HeaderField {
    /// First header field of a grammar.
    fn first(version: MspVersion) -> Self {
        match version {
            MspVersion::V1 => HeaderField::LengthLo,
            MspVersion::V2 => HeaderField::Flags,
        }
    }

    /// Field following `self`, or `None` once the header is complete.
    fn next(self, version: MspVersion) -> Option<Self> {
        match (version, self) {
            (MspVersion::V1, HeaderField::LengthLo) => Some(HeaderField::CommandLo),
            (MspVersion::V2, HeaderField::Flags) => Some(HeaderField::CommandLo),
            (MspVersion::V2, HeaderField::CommandLo) => Some(HeaderField::CommandHi),
            (MspVersion::V2, HeaderField::CommandHi) => Some(HeaderField::LengthLo),
            (MspVersion::V2, HeaderField::LengthLo) => Some(HeaderField::LengthHi),
            _ => None,
        }
    }
}

/// Header of the frame being decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFrame {
    pub version: MspVersion,
    /// Status implied by the direction byte.
    pub status: Status,
    pub command: u16,
    pub length: u16,
    /// Running checksum over everything after the direction byte.
    pub checksum: u8,
}

impl PartialFrame {
    fn new(version: MspVersion, status: Status) -> Self {
        Self {
            version,
            status,
            command: 0,
            length: 0,
            checksum: 0,
        }
    }

    fn absorb(&mut self, byte: u8) {
        self.checksum = self.version.checksum_step(self.checksum, byte);
    }

    fn into_body(self) -> State {
        if self.length == 0 {
            State::Checksum {
                frame: self,
                payload: Bytes::new(),
            }
        } else {
            let payload = Vec::with_capacity(self.length as usize);
            State::Payload {
                frame: self,
                payload,
            }
        }
    }

    fn finish(self, received: u8, payload: Bytes) -> Message {
        let status = if received == self.checksum {
            self.status
        } else {
            Status::ChecksumError
        };
        Message {
            command: self.command,
            payload,
            status,
        }
    }
}

/// Decoder state. Never straddles the two grammars: the version is fixed by
/// the tag byte and carried until the frame completes or is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    /// Scanning for `$`.
    #[default]
    Idle,
    /// Saw `$`, expecting a version tag.
    Start,
    /// Saw the version tag, expecting a direction byte.
    Direction(MspVersion),
    Header {
        frame: PartialFrame,
        field: HeaderField,
    },
    Payload {
        frame: PartialFrame,
        payload: Vec<u8>,
    },
    Checksum {
        frame: PartialFrame,
        payload: Bytes,
    },
}

impl State {
    /// Consume one byte. Returns the next state and, when the byte was a
    /// checksum, the completed message.
    pub fn advance(self, byte: u8) -> (State, Option<Message>) {
        match self {
            State::Idle => {
                let next = if byte == PREAMBLE {
                    State::Start
                } else {
                    State::Idle
                };
                (next, None)
            }
            State::Start => match MspVersion::from_tag(byte) {
                Some(version) => (State::Direction(version), None),
                None => (State::Idle, None),
            },
            State::Direction(version) => {
                let status = match byte {
                    DIR_RESPONSE => Status::Ok,
                    DIR_ERROR => Status::DirectionMismatch,
                    _ => return (State::Idle, None),
                };
                let frame = PartialFrame::new(version, status);
                let field = HeaderField::first(version);
                (State::Header { frame, field }, None)
            }
            State::Header { mut frame, field } => {
                frame.absorb(byte);
                match field {
                    HeaderField::Flags => {}
                    HeaderField::CommandLo => frame.command = byte as u16,
                    HeaderField::CommandHi => frame.command |= (byte as u16) << 8,
                    HeaderField::LengthLo => frame.length = byte as u16,
                    HeaderField::LengthHi => frame.length |= (byte as u16) << 8,
                }
                match field.next(frame.version) {
                    Some(field) => (State::Header { frame, field }, None),
                    None => (frame.into_body(), None),
                }
            }
            State::Payload {
                mut frame,
                mut payload,
            } => {
                frame.absorb(byte);
                payload.push(byte);
                if payload.len() == frame.length as usize {
                    let payload = Bytes::from(payload);
                    (State::Checksum { frame, payload }, None)
                } else {
                    (State::Payload { frame, payload }, None)
                }
            }
            State::Checksum { frame, payload } => (State::Idle, Some(frame.finish(byte, payload))),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }
}

/// Streaming decoder for both MSP grammars.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: State,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a single byte. Returns a message when the byte completed a frame.
    pub fn feed(&mut self, byte: u8) -> Option<Message> {
        let (next, message) = std::mem::take(&mut self.state).advance(byte);
        self.state = next;
        if let Some(message) = &message {
            match message.status {
                Status::ChecksumError => {
                    debug!(command = message.command, "checksum mismatch")
                }
                Status::DirectionMismatch => {
                    debug!(command = message.command, "peer reported error")
                }
                _ => trace!(
                    command = message.command,
                    size = message.payload.len(),
                    "decoded frame"
                ),
            }
        }
        message
    }

    /// Feed a chunk and collect every message it completes.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<Message> {
        bytes.iter().filter_map(|&byte| self.feed(byte)).collect()
    }

    /// Drop any partially decoded frame and return to `Idle`.
    ///
    /// Returns true if a partial frame was discarded.
    pub fn abandon(&mut self) -> bool {
        let partial = !self.state.is_idle();
        if partial {
            debug!(state = ?self.state_name(), "abandoning partial frame");
        }
        self.state = State::Idle;
        partial
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    fn state_name(&self) -> &'static str {
        match &self.state {
            State::Idle => "idle",
            State::Start => "start",
            State::Direction(_) => "direction",
            State::Header { .. } => "header",
            State::Payload { .. } => "payload",
            State::Checksum { .. } => "checksum",
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, DIR_REQUEST};
    use crate::command::{API_VERSION, IDENT, INAV_ANALOG, NAME};

    fn wire(version: MspVersion, direction: u8, command: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(version, direction, command, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn transitions_v1_one_byte_at_a_time() {
        let bytes = wire(MspVersion::V1, DIR_RESPONSE, IDENT, &[231]);
        let mut state = State::Idle;

        let (next, out) = state.advance(bytes[0]);
        assert_eq!(next, State::Start);
        assert!(out.is_none());
        state = next;

        let (next, _) = state.advance(bytes[1]);
        assert_eq!(next, State::Direction(MspVersion::V1));
        state = next;

        let (next, _) = state.advance(bytes[2]);
        assert!(matches!(
            next,
            State::Header {
                field: HeaderField::LengthLo,
                ..
            }
        ));
        state = next;

        for &byte in &bytes[3..bytes.len() - 1] {
            let (next, out) = state.advance(byte);
            assert!(out.is_none());
            state = next;
        }
        assert!(matches!(state, State::Checksum { .. }));

        let (next, out) = state.advance(*bytes.last().unwrap());
        assert!(next.is_idle());
        assert_eq!(out, Some(Message::new(IDENT, vec![231], Status::Ok)));
    }

    #[test]
    fn decodes_v2_frame() {
        let mut decoder = FrameDecoder::new();
        let payload = [1u8, 2, 3, 4, 5, 6];
        let out = decoder.feed_slice(&wire(MspVersion::V2, DIR_RESPONSE, INAV_ANALOG, &payload));
        assert_eq!(out, vec![Message::new(INAV_ANALOG, payload.to_vec(), Status::Ok)]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn zero_length_skips_payload() {
        let mut decoder = FrameDecoder::new();
        let bytes = wire(MspVersion::V2, DIR_RESPONSE, NAME, &[]);
        let (last, head) = bytes.split_last().unwrap();
        assert!(decoder.feed_slice(head).is_empty());
        assert!(matches!(decoder.state(), State::Checksum { .. }));
        let msg = decoder.feed(*last).unwrap();
        assert!(msg.payload.is_empty());
        assert!(msg.is_ok());
    }

    #[test]
    fn error_direction_is_reported() {
        let mut decoder = FrameDecoder::new();
        let out = decoder.feed_slice(&wire(MspVersion::V1, DIR_ERROR, API_VERSION, &[]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, Status::DirectionMismatch);
        assert_eq!(out[0].command, API_VERSION);
    }

    #[test]
    fn checksum_error_overrides_error_direction() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = wire(MspVersion::V2, DIR_ERROR, API_VERSION, &[9]);
        *bytes.last_mut().unwrap() ^= 0x01;
        let out = decoder.feed_slice(&bytes);
        assert_eq!(out[0].status, Status::ChecksumError);
    }

    #[test]
    fn bad_checksum_still_emits_payload() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = wire(MspVersion::V1, DIR_RESPONSE, NAME, b"wing");
        *bytes.last_mut().unwrap() ^= 0xff;
        let out = decoder.feed_slice(&bytes);
        assert_eq!(out, vec![Message::new(NAME, b"wing".to_vec(), Status::ChecksumError)]);
    }

    #[test]
    fn resyncs_after_garbage() {
        let mut decoder = FrameDecoder::new();
        let mut stream = vec![0x00, b'M', b'$', b'Q', 0xff, b'$', b'M', b'?'];
        stream.extend(wire(MspVersion::V1, DIR_RESPONSE, IDENT, &[1]));
        let out = decoder.feed_slice(&stream);
        assert_eq!(out, vec![Message::new(IDENT, vec![1], Status::Ok)]);
    }

    #[test]
    fn request_direction_is_not_a_response() {
        let mut decoder = FrameDecoder::new();
        let out = decoder.feed_slice(&wire(MspVersion::V2, DIR_REQUEST, IDENT, &[]));
        assert!(out.is_empty());
        assert!(decoder.is_idle());
    }

    #[test]
    fn mixed_grammars_back_to_back() {
        let mut decoder = FrameDecoder::new();
        let mut stream = wire(MspVersion::V1, DIR_RESPONSE, IDENT, &[7]);
        stream.extend(wire(MspVersion::V2, DIR_RESPONSE, INAV_ANALOG, &[8, 9]));
        stream.extend(wire(MspVersion::V1, DIR_RESPONSE, NAME, b"x"));
        let commands: Vec<u16> = decoder.feed_slice(&stream).iter().map(|m| m.command).collect();
        assert_eq!(commands, vec![IDENT, INAV_ANALOG, NAME]);
    }

    #[test]
    fn abandon_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        let bytes = wire(MspVersion::V2, DIR_RESPONSE, NAME, b"partial");
        assert!(decoder.feed_slice(&bytes[..10]).is_empty());
        assert!(decoder.abandon());
        assert!(decoder.is_idle());
        assert!(!decoder.abandon());

        // The tail of the abandoned frame is just noise now.
        assert!(decoder.feed_slice(&bytes[10..]).is_empty());
    }
}
