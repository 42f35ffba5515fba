//! Framed message transport.
//!
//! Each message is written as the magic byte [`FRAME_MAGIC`], the payload
//! length as an unsigned LEB128 varint, and the `bincode` payload. The solver
//! shares its stdout between frames and ordinary output, so bytes seen
//! outside a frame are kept as passthrough text instead of being rejected.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CompileError;

/// Marks the start of a frame.
pub const FRAME_MAGIC: u8 = 0xFE;

/// Largest payload a frame may declare.
pub const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// A u64 varint never needs more than ten bytes.
const MAX_VARINT_BYTES: usize = 10;

/// Encodes a message payload with the standard `bincode` configuration.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>, CompileError> {
    bincode::serde::encode_to_vec(message, bincode::config::standard()).map_err(|e| {
        CompileError::Encode {
            reason: e.to_string(),
        }
    })
}

/// Decodes a message payload, requiring the whole payload to be consumed.
pub fn decode_message<T: DeserializeOwned>(payload: &[u8]) -> Result<T, CompileError> {
    let (message, read) = bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .map_err(|e| CompileError::Decode {
        reason: e.to_string(),
    })?;
    if read != payload.len() {
        return Err(CompileError::Decode {
            reason: format!("{} trailing bytes after message", payload.len() - read),
        });
    }
    Ok(message)
}

fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Writes one framed message and flushes the writer.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), CompileError> {
    let payload = encode_message(message)?;
    let mut frame = Vec::with_capacity(payload.len() + 1 + MAX_VARINT_BYTES);
    frame.push(FRAME_MAGIC);
    push_varint(&mut frame, payload.len() as u64);
    frame.extend_from_slice(&payload);
    writer.write_all(&frame)?;
    writer.flush()?;
    tracing::trace!(bytes = payload.len(), "wrote frame");
    Ok(())
}

/// Reads framed messages from a byte stream, collecting bytes that appear
/// between frames.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
    passthrough: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    /// Wraps a byte stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            passthrough: Vec::new(),
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, CompileError> {
        let mut byte = [0u8; 1];
        match self.reader.read_exact(&mut byte) {
            Ok(()) => Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_length(&mut self) -> Result<usize, CompileError> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte()?.ok_or_else(|| CompileError::Framing {
                reason: "stream ended inside a frame length".to_string(),
            })?;
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return match usize::try_from(value) {
                    Ok(len) if len <= MAX_FRAME_LEN => Ok(len),
                    _ => Err(CompileError::Framing {
                        reason: format!("frame length {value} exceeds {MAX_FRAME_LEN} bytes"),
                    }),
                };
            }
        }
        Err(CompileError::Framing {
            reason: "frame length varint is too long".to_string(),
        })
    }

    /// Reads the next frame's raw payload. Returns `None` when the stream
    /// ends outside a frame.
    pub fn read_payload(&mut self) -> Result<Option<Vec<u8>>, CompileError> {
        loop {
            let buffered = self.reader.fill_buf()?;
            if buffered.is_empty() {
                return Ok(None);
            }
            match buffered.iter().position(|&b| b == FRAME_MAGIC) {
                Some(at) => {
                    self.passthrough.extend_from_slice(&buffered[..at]);
                    self.reader.consume(at + 1);
                    break;
                }
                None => {
                    let len = buffered.len();
                    self.passthrough.extend_from_slice(buffered);
                    self.reader.consume(len);
                }
            }
        }
        let len = self.read_length()?;
        let mut payload = Vec::new();
        (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut payload)?;
        if payload.len() < len {
            return Err(CompileError::Framing {
                reason: format!("stream ended inside a {len} byte frame"),
            });
        }
        tracing::trace!(bytes = len, "read frame");
        Ok(Some(payload))
    }

    /// Reads and decodes the next message.
    pub fn read_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, CompileError> {
        match self.read_payload()? {
            Some(payload) => decode_message(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Takes the bytes collected outside frames so far.
    pub fn take_passthrough(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.passthrough)
    }

    /// Logs and clears collected passthrough output, one event per line.
    pub fn log_passthrough(&mut self, source: &str) {
        let bytes = self.take_passthrough();
        for line in String::from_utf8_lossy(&bytes).lines() {
            if !line.trim().is_empty() {
                tracing::info!(source, "{line}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn varint_encoding() {
        let mut out = Vec::new();
        push_varint(&mut out, 1);
        assert_eq!(out, [0x01]);
        out.clear();
        push_varint(&mut out, 300);
        assert_eq!(out, [0xAC, 0x02]);
    }

    #[test]
    fn frame_layout() {
        let mut out = Vec::new();
        write_frame(&mut out, &7u32).unwrap();
        assert_eq!(out[0], FRAME_MAGIC);
        assert_eq!(out[1] as usize, out.len() - 2);
    }

    #[test]
    fn reads_consecutive_frames() {
        let mut stream = Vec::new();
        write_frame(&mut stream, &"first".to_string()).unwrap();
        write_frame(&mut stream, &"second".to_string()).unwrap();
        let mut reader = FrameReader::new(Cursor::new(stream));
        assert_eq!(reader.read_frame::<String>().unwrap().as_deref(), Some("first"));
        assert_eq!(reader.read_frame::<String>().unwrap().as_deref(), Some("second"));
        assert_eq!(reader.read_frame::<String>().unwrap(), None);
    }

    #[test]
    fn text_between_frames_is_passthrough() {
        let mut stream = b"starting solver\n".to_vec();
        write_frame(&mut stream, &1u8).unwrap();
        stream.extend_from_slice(b"done\n");
        let mut reader = FrameReader::new(Cursor::new(stream));
        assert_eq!(reader.read_frame::<u8>().unwrap(), Some(1));
        assert_eq!(reader.take_passthrough(), b"starting solver\n");
        assert_eq!(reader.read_frame::<u8>().unwrap(), None);
        assert_eq!(reader.take_passthrough(), b"done\n");
    }

    #[test]
    fn truncated_payload_is_a_framing_error() {
        let mut stream = Vec::new();
        write_frame(&mut stream, &"truncated".to_string()).unwrap();
        stream.truncate(stream.len() - 3);
        let mut reader = FrameReader::new(Cursor::new(stream));
        let err = reader.read_frame::<String>().unwrap_err();
        assert!(matches!(err, CompileError::Framing { .. }), "{err:?}");
    }

    #[test]
    fn overlong_length_is_a_framing_error() {
        let mut stream = vec![FRAME_MAGIC];
        stream.extend_from_slice(&[0xFF; 11]);
        let mut reader = FrameReader::new(Cursor::new(stream));
        assert!(matches!(
            reader.read_payload().unwrap_err(),
            CompileError::Framing { .. }
        ));
    }

    #[test]
    fn oversized_length_is_rejected_before_reading() {
        let mut stream = vec![FRAME_MAGIC];
        stream.extend_from_slice(&[0xFF; 9]);
        stream.push(0x01);
        let mut reader = FrameReader::new(Cursor::new(stream));
        let err = reader.read_payload().unwrap_err();
        assert!(matches!(err, CompileError::Framing { ref reason } if reason.contains("exceeds")), "{err:?}");
    }

    #[test]
    fn wrong_message_type_is_a_decode_error() {
        let mut stream = Vec::new();
        write_frame(&mut stream, &(1u8, 2u8, 3u8)).unwrap();
        let mut reader = FrameReader::new(Cursor::new(stream));
        let err = reader.read_frame::<u8>().unwrap_err();
        assert!(matches!(err, CompileError::Decode { .. }), "{err:?}");
    }
}
