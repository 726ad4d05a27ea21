use hf_trace::{ESC, ESC_XOR, FLAG};
use thiserror::Error;

/// One verified trace frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence counter maintained by the emitter.
    pub seq: u8,
    pub record_type: u8,
    /// Optional timestamp followed by the record fields.
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame too short (len={0})")]
    FrameTooShort(usize),
    #[error("checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    InvalidChecksum { expected: u8, found: u8 },
}

/// Incremental HDLC decoder that accepts arbitrary byte chunks.
///
/// A corrupt frame is reported in place and decoding carries on with the
/// next flag, so one bad datagram never hides the frames after it.
#[derive(Debug, Default)]
pub struct HdlcDecoder {
    buffer: Vec<u8>,
    escape_next: bool,
    seq: Option<u8>,
    gaps: u64,
}

impl HdlcDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.escape_next = false;
    }

    /// Number of sequence discontinuities seen so far.
    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    pub fn push_bytes(&mut self, input: &[u8]) -> Vec<Result<Frame, DecodeError>> {
        let mut frames = Vec::new();

        for &byte in input {
            if byte == FLAG {
                if !self.buffer.is_empty() {
                    let frame_bytes = std::mem::take(&mut self.buffer);
                    let frame = Self::decode_frame(&frame_bytes);
                    if let Ok(frame) = &frame {
                        self.track(frame.seq);
                    }
                    frames.push(frame);
                }
                self.escape_next = false;
                continue;
            }

            if self.escape_next {
                self.buffer.push(byte ^ ESC_XOR);
                self.escape_next = false;
            } else if byte == ESC {
                self.escape_next = true;
            } else {
                self.buffer.push(byte);
            }
        }

        frames
    }

    fn track(&mut self, seq: u8) {
        if let Some(last) = self.seq {
            if seq != last.wrapping_add(1) {
                self.gaps += 1;
            }
        }
        self.seq = Some(seq);
    }

    fn decode_frame(data: &[u8]) -> Result<Frame, DecodeError> {
        if data.len() < 3 {
            return Err(DecodeError::FrameTooShort(data.len()));
        }

        let (body, checksum) = data.split_at(data.len() - 1);
        let expected = !body.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte));
        if checksum[0] != expected {
            return Err(DecodeError::InvalidChecksum {
                expected,
                found: checksum[0],
            });
        }

        Ok(Frame {
            seq: body[0],
            record_type: body[1],
            payload: body[2..].to_vec(),
        })
    }
}
