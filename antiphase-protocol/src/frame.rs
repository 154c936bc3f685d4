//! Radio link framing
//!
//! ```text
//! 0xA5 | len | seq | payload[len] | crc8
//! ```
//!
//! `len` is at most [`MAX_PAYLOAD_SIZE`]. The CRC (poly 0x07, init 0) covers
//! `len`, `seq` and the payload. The sync byte is not escaped; a receiver
//! that loses alignment discards bytes until the next CRC-valid frame.

use heapless::Vec;

pub const FRAME_START: u8 = 0xA5;

/// Largest postcard payload a frame carries
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// Sync byte, length, sequence and CRC around the payload
const OVERHEAD: usize = 4;

pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + OVERHEAD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    PayloadTooLarge,
    InvalidCrc,
    /// Bad length byte or undecodable payload
    InvalidFrame,
    BufferTooSmall,
}

/// Running CRC-8/SMBUS
#[derive(Debug, Clone, Copy, Default)]
struct Crc8(u8);

impl Crc8 {
    fn push(mut self, byte: u8) -> Self {
        self.0 ^= byte;
        for _ in 0..8 {
            let carry = self.0 & 0x80 != 0;
            self.0 <<= 1;
            if carry {
                self.0 ^= 0x07;
            }
        }
        self
    }

    fn push_all(self, bytes: &[u8]) -> Self {
        bytes.iter().fold(self, |crc, &b| crc.push(b))
    }

    fn value(self) -> u8 {
        self.0
    }
}

/// One link-layer packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: u8,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    pub fn new(seq: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { seq, payload })
    }

    fn checksum(&self) -> u8 {
        Crc8::default()
            .push(self.payload.len() as u8)
            .push(self.seq)
            .push_all(&self.payload)
            .value()
    }

    /// Write the frame into `out`, returning the bytes used
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let total = self.payload.len() + OVERHEAD;
        let out = out.get_mut(..total).ok_or(FrameError::BufferTooSmall)?;

        let (header, rest) = out.split_at_mut(3);
        header.copy_from_slice(&[FRAME_START, self.payload.len() as u8, self.seq]);
        let (body, crc) = rest.split_at_mut(self.payload.len());
        body.copy_from_slice(&self.payload);
        crc[0] = self.checksum();

        Ok(total)
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut out = [0u8; MAX_FRAME_SIZE];
        let used = self.encode(&mut out)?;
        Vec::from_slice(&out[..used]).map_err(|_| FrameError::BufferTooSmall)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Hunt,
    Length,
    Seq { len: u8 },
    Body { len: u8, seq: u8 },
    Crc { seq: u8 },
}

/// Byte-at-a-time frame decoder
///
/// After any error the decoder is back to hunting for a sync byte.
#[derive(Debug, Clone)]
pub struct FrameParser {
    stage: Stage,
    body: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            stage: Stage::Hunt,
            body: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Hunt;
        self.body.clear();
    }

    /// Consume one byte; yields a frame once its CRC checks out
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        self.stage = match self.stage {
            Stage::Hunt if byte == FRAME_START => Stage::Length,
            Stage::Hunt => Stage::Hunt,
            Stage::Length if usize::from(byte) > MAX_PAYLOAD_SIZE => {
                self.reset();
                return Err(FrameError::InvalidFrame);
            }
            Stage::Length => Stage::Seq { len: byte },
            Stage::Seq { len } => {
                self.body.clear();
                if len == 0 {
                    Stage::Crc { seq: byte }
                } else {
                    Stage::Body { len, seq: byte }
                }
            }
            Stage::Body { len, seq } => {
                // Bounded by the length check
                let _ = self.body.push(byte);
                if self.body.len() == usize::from(len) {
                    Stage::Crc { seq }
                } else {
                    Stage::Body { len, seq }
                }
            }
            Stage::Crc { seq } => {
                let frame = Frame {
                    seq,
                    payload: core::mem::take(&mut self.body),
                };
                self.reset();
                if frame.checksum() != byte {
                    return Err(FrameError::InvalidCrc);
                }
                return Ok(Some(frame));
            }
        };
        Ok(None)
    }

    /// Feed bytes until the first complete frame; the rest are left unread
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(Crc8::default().push_all(b"123456789").value(), 0xF4);
    }

    #[test]
    fn test_encoded_layout() {
        let frame = Frame::new(7, &[1, 2, 3]).unwrap();
        let mut out = [0u8; 16];

        assert_eq!(frame.encode(&mut out), Ok(7));
        assert_eq!(&out[..6], &[FRAME_START, 3, 7, 1, 2, 3]);
        assert_eq!(out[6], Crc8::default().push_all(&[3, 7, 1, 2, 3]).value());
    }

    #[test]
    fn test_encode_needs_room() {
        let frame = Frame::new(0, &[0; 8]).unwrap();
        let mut out = [0u8; 11];
        assert_eq!(frame.encode(&mut out), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_empty_payload() {
        let encoded = Frame::new(1, &[]).unwrap().encode_to_vec().unwrap();
        assert_eq!(encoded.len(), OVERHEAD);

        let parsed = FrameParser::new().feed_bytes(&encoded).unwrap().unwrap();
        assert_eq!(parsed.seq, 1);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_corrupted_crc_rejected() {
        let mut encoded = Frame::new(3, &[0x10]).unwrap().encode_to_vec().unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;

        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded), Err(FrameError::InvalidCrc));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed(FRAME_START), Ok(None));
        assert_eq!(
            parser.feed(MAX_PAYLOAD_SIZE as u8 + 1),
            Err(FrameError::InvalidFrame)
        );
    }

    #[test]
    fn test_resync_after_garbage() {
        let encoded = Frame::new(5, &[0xAB]).unwrap().encode_to_vec().unwrap();
        let mut stream = Vec::<u8, 32>::from_slice(&[0x00, 0xFF, 0x12, 0x34]).unwrap();
        stream.extend_from_slice(&encoded).unwrap();

        let parsed = FrameParser::new().feed_bytes(&stream).unwrap().unwrap();
        assert_eq!(parsed.seq, 5);
    }

    #[test]
    fn test_back_to_back_frames() {
        let first = Frame::new(1, &[0xA5, 0xA5]).unwrap().encode_to_vec().unwrap();
        let second = Frame::new(2, &[0x01]).unwrap().encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        let seqs: std::vec::Vec<u8> = first
            .iter()
            .chain(second.iter())
            .filter_map(|&b| parser.feed(b).unwrap())
            .map(|f| f.seq)
            .collect();
        assert_eq!(seqs, [1, 2]);
    }

    #[test]
    fn test_payload_too_large() {
        assert_eq!(
            Frame::new(0, &[0u8; MAX_PAYLOAD_SIZE + 1]),
            Err(FrameError::PayloadTooLarge)
        );
    }

    proptest! {
        #[test]
        fn parser_recovers_after_noise(noise in proptest::collection::vec(any::<u8>(), 0..200)) {
            let mut parser = FrameParser::new();
            for b in noise {
                let _ = parser.feed(b);
            }
            parser.reset();
            let encoded = Frame::new(9, &[1, 2]).unwrap().encode_to_vec().unwrap();
            let parsed = parser.feed_bytes(&encoded).unwrap();
            prop_assert_eq!(parsed.map(|f| f.seq), Some(9));
        }

        #[test]
        fn any_payload_survives_framing(seq in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE)) {
            let frame = Frame::new(seq, &payload).unwrap();
            let encoded = frame.encode_to_vec().unwrap();
            prop_assert_eq!(FrameParser::new().feed_bytes(&encoded).unwrap(), Some(frame));
        }
    }
}
