//! Newline-delimited JSON framing.
//!
//! Each `\n`-terminated line is one JSON document. Partial lines stay
//! buffered until the terminator arrives; blank lines are skipped. A line
//! that fails to parse yields [`Frame::Malformed`] instead of an error so
//! the stream keeps going.

use super::error::TransportDecodeError;
use bytes::{BufMut, BytesMut};
use serde::Serialize;
use serde_json::Value;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Longest prefix of a malformed line kept for diagnostics.
const MALFORMED_PREVIEW_LEN: usize = 200;

/// One decoded unit from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(Value),
    Malformed(TransportDecodeError),
}

/// `tokio_util` codec for line-delimited JSON.
#[derive(Debug, Default, Clone)]
pub struct JsonLineCodec {
    /// Bytes already scanned for `\n` in the current buffer.
    next_index: usize,
}

impl JsonLineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_line(line: &[u8]) -> Option<Frame> {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return None;
        }
        Some(match serde_json::from_slice::<Value>(trimmed) {
            Ok(value) => Frame::Message(value),
            Err(e) => {
                let text = String::from_utf8_lossy(trimmed);
                let line: String = text.chars().take(MALFORMED_PREVIEW_LEN).collect();
                Frame::Malformed(TransportDecodeError {
                    line,
                    reason: e.to_string(),
                })
            }
        })
    }
}

impl Decoder for JsonLineCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        loop {
            let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = buf.len();
                return Ok(None);
            };
            let line = buf.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            if let Some(frame) = Self::parse_line(&line) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        // Unterminated final line
        let rest = buf.split();
        self.next_index = 0;
        Ok(Self::parse_line(&rest))
    }
}

impl<T: Serialize> Encoder<T> for JsonLineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), io::Error> {
        let json = serde_json::to_vec(&item)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}
