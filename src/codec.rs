//! Wire codec
//!
//! Newline-delimited JSON: every envelope is one JSON object followed by
//! `\n`. JSON string escaping guarantees a unit never contains a raw
//! newline, so frames survive TCP segmentation and coalescing.
//!
//! Malformed or overlong frames are discarded with a warning and decoding
//! carries on with the next line; only transport errors end the stream.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::error::CodecError;
use crate::message::Envelope;

/// Maximum encoded size of a single frame, newline excluded
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Encode an envelope into one newline-terminated frame
pub fn encode(envelope: &Envelope) -> Result<Bytes, CodecError> {
    let mut buf = serde_json::to_vec(envelope)?;
    buf.push(b'\n');
    Ok(Bytes::from(buf))
}

/// Decode a single frame (trailing newline optional)
pub fn decode(frame: &[u8]) -> Result<Envelope, CodecError> {
    let frame = frame.strip_suffix(b"\n").unwrap_or(frame);
    let frame = frame.strip_suffix(b"\r").unwrap_or(frame);
    Ok(serde_json::from_slice(frame)?)
}

/// `tokio_util` codec for `Envelope` streams
#[derive(Debug)]
pub struct EnvelopeCodec {
    lines: LinesCodec,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_FRAME_LEN),
        }
    }

    fn next_envelope(
        &mut self,
        src: &mut BytesMut,
        eof: bool,
    ) -> Result<Option<Envelope>, CodecError> {
        loop {
            let line = if eof {
                self.lines.decode_eof(src)
            } else {
                self.lines.decode(src)
            };

            match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match decode(line.as_bytes()) {
                        Ok(envelope) => return Ok(Some(envelope)),
                        Err(e) => warn!("Discarding malformed frame: {}", e),
                    }
                }
                Ok(None) => return Ok(None),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    // LinesCodec skips ahead to the next newline on its own
                    warn!("{}", CodecError::LineTooLong(MAX_FRAME_LEN));
                }
                // The offending line has already been consumed
                Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                    warn!("Discarding non UTF-8 frame: {}", e);
                }
                Err(LinesCodecError::Io(e)) => return Err(e.into()),
            }
        }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Envelope>, CodecError> {
        self.next_envelope(src, false)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Envelope>, CodecError> {
        self.next_envelope(src, true)
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), CodecError> {
        let frame = encode(&item)?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}
