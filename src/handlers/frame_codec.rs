use thiserror::Error;
use tracing::instrument;

use crate::protocol::{
    CommandKind, END_CODE, FRAME_LEN, ItemNumber, START_CODE, TYPE_GET, TYPE_NOTIFICATION,
    TYPE_REPLY, TYPE_SET,
};

const CHECKSUM_INDEX: usize = 6;
const TYPE_INDEX: usize = 3;

/// One fixed-length wire frame.
pub type Frame = [u8; FRAME_LEN];

/// Errors returned by frame decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// The chunk is not exactly one frame long.
    #[error("invalid frame length: expected 8 bytes, got {actual}")]
    InvalidLength { actual: usize },
    /// The first byte is not `0xA9`.
    #[error("missing start code: got 0x{actual:02X}")]
    MissingStartCode { actual: u8 },
    /// The last byte is not `0x9A`.
    #[error("missing end code: got 0x{actual:02X}")]
    MissingEndCode { actual: u8 },
    /// The type code is not valid for the frame direction.
    #[error("unknown type code 0x{actual:02X}")]
    UnknownTypeCode { actual: u8 },
    /// The checksum byte does not match bytes 1 through 5.
    #[error("checksum mismatch: frame carries 0x{actual:02X}, computed 0x{expected:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// A decoded inbound frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Response {
    item_number: ItemNumber,
    data: u16,
    is_reply: bool,
}

impl Response {
    /// Item number echoed by the device.
    #[must_use]
    pub fn item_number(&self) -> ItemNumber {
        self.item_number
    }

    /// Data word carried by the frame.
    #[must_use]
    pub fn data(&self) -> u16 {
        self.data
    }

    /// `true` for a reply (`0x02`), `false` for a notification (`0x03`).
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.is_reply
    }
}

/// A decoded outbound frame, as seen from the device side of the link.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Request {
    item_number: ItemNumber,
    kind: CommandKind,
    data: u16,
}

impl Request {
    /// Requested item number.
    #[must_use]
    pub fn item_number(&self) -> ItemNumber {
        self.item_number
    }

    /// Get or set.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Data word written by a set request.
    #[must_use]
    pub fn data(&self) -> u16 {
        self.data
    }
}

/// Encoder and decoder for the 8-byte projector control frame.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes an outbound request frame.
    ///
    /// ```
    /// use pjcontrol::{CommandKind, FrameCodec, ItemNumber};
    ///
    /// let frame = FrameCodec::encode(ItemNumber::POWER_STATUS, CommandKind::Get, 0);
    /// assert_eq!([0xA9, 0x01, 0x02, 0x01, 0x00, 0x00, 0x03, 0x9A], frame);
    /// ```
    #[must_use]
    pub fn encode(item_number: ItemNumber, kind: CommandKind, data: u16) -> Frame {
        Self::assemble(item_number, kind.type_code(), data)
    }

    /// Encodes an inbound reply or notification frame.
    #[must_use]
    pub fn encode_response(item_number: ItemNumber, data: u16, is_reply: bool) -> Frame {
        let type_code = if is_reply {
            TYPE_REPLY
        } else {
            TYPE_NOTIFICATION
        };
        Self::assemble(item_number, type_code, data)
    }

    /// Computes the protocol checksum: bitwise OR of bytes 1 through 5.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is shorter than 6 bytes.
    #[must_use]
    pub fn checksum(frame: &[u8]) -> u8 {
        frame[1..CHECKSUM_INDEX]
            .iter()
            .fold(0u8, |checksum, byte| checksum | byte)
    }

    /// Decodes one inbound chunk into a reply or notification.
    ///
    /// # Errors
    ///
    /// Returns an error on a wrong length, missing start or end code, a type
    /// code other than reply or notification, or a checksum mismatch.
    #[instrument(skip(chunk), level = "trace", fields(chunk_len = chunk.len()))]
    pub fn decode(chunk: &[u8]) -> Result<Response, FrameCodecError> {
        let frame = Self::validate(chunk)?;
        let is_reply = match frame[TYPE_INDEX] {
            TYPE_REPLY => true,
            TYPE_NOTIFICATION => false,
            actual => return Err(FrameCodecError::UnknownTypeCode { actual }),
        };
        Self::verify_checksum(frame)?;

        Ok(Response {
            item_number: Self::item_number(frame),
            data: Self::data(frame),
            is_reply,
        })
    }

    /// Decodes one outbound request frame.
    ///
    /// # Errors
    ///
    /// Returns an error on a wrong length, missing start or end code, a type
    /// code other than get or set, or a checksum mismatch.
    pub fn decode_request(chunk: &[u8]) -> Result<Request, FrameCodecError> {
        let frame = Self::validate(chunk)?;
        let kind = match frame[TYPE_INDEX] {
            TYPE_GET => CommandKind::Get,
            TYPE_SET => CommandKind::Set,
            actual => return Err(FrameCodecError::UnknownTypeCode { actual }),
        };
        Self::verify_checksum(frame)?;

        Ok(Request {
            item_number: Self::item_number(frame),
            kind,
            data: Self::data(frame),
        })
    }

    fn assemble(item_number: ItemNumber, type_code: u8, data: u16) -> Frame {
        let [item_high, item_low] = item_number.raw().to_be_bytes();
        let [data_high, data_low] = data.to_be_bytes();
        let mut frame = [
            START_CODE, item_high, item_low, type_code, data_high, data_low, 0x00, END_CODE,
        ];
        frame[CHECKSUM_INDEX] = Self::checksum(&frame);
        frame
    }

    fn validate(chunk: &[u8]) -> Result<&Frame, FrameCodecError> {
        let frame: &Frame = chunk
            .try_into()
            .map_err(|_| FrameCodecError::InvalidLength {
                actual: chunk.len(),
            })?;
        if frame[0] != START_CODE {
            return Err(FrameCodecError::MissingStartCode { actual: frame[0] });
        }
        if frame[FRAME_LEN - 1] != END_CODE {
            return Err(FrameCodecError::MissingEndCode {
                actual: frame[FRAME_LEN - 1],
            });
        }
        Ok(frame)
    }

    fn verify_checksum(frame: &Frame) -> Result<(), FrameCodecError> {
        let expected = Self::checksum(frame);
        let actual = frame[CHECKSUM_INDEX];
        if expected != actual {
            return Err(FrameCodecError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    fn item_number(frame: &Frame) -> ItemNumber {
        ItemNumber::new(u16::from_be_bytes([frame[1], frame[2]]))
    }

    fn data(frame: &Frame) -> u16 {
        u16::from_be_bytes([frame[4], frame[5]])
    }
}
