//! MultiWii Serial Protocol framing.
//!
//! This is the core protocol layer of mspview. Two wire grammars share one
//! envelope:
//! - MSPv1 (`$M`): 8-bit command and length, XOR checksum
//! - MSPv2 (`$X`): flags, 16-bit little-endian command and length, CRC-8/DVB-S2
//!
//! Inbound bytes go through a byte-at-a-time state machine that tolerates any
//! chunking, resynchronises on garbage, and reports checksum or peer errors in
//! the message status instead of dropping frames.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod command;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::MspCodec;
pub use codec::{
    crc8_dvb_s2, encode_frame, encode_request, FrameConfig, Message, MspVersion, Request, Status,
    DIR_ERROR, DIR_REQUEST, DIR_RESPONSE, PREAMBLE,
};
pub use command::{command_name, LINK_FAILED};
pub use decoder::{FrameDecoder, State};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::RequestWriter;
