//! `tokio_util::codec` adapter over the streaming decoder.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_request, Message, MspVersion, Request};
use crate::decoder::FrameDecoder;
use crate::error::FrameError;

/// Codec for `FramedRead`/`FramedWrite`: decodes both grammars, encodes
/// requests in the configured one.
#[derive(Debug, Default)]
pub struct MspCodec {
    decoder: FrameDecoder,
    version: MspVersion,
}

impl MspCodec {
    pub fn new(version: MspVersion) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            version,
        }
    }
}

impl Decoder for MspCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(message) = self.decoder.feed(byte) {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None => {
                self.decoder.abandon();
                Ok(None)
            }
        }
    }
}

impl Encoder<Request> for MspCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_request(self.version, item.command, item.payload.as_ref(), dst)
    }
}
