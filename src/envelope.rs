//! Byte envelope around the serialized log container.
//!
//! Binary format (3 bytes overhead):
//!
//! ```text
//! [MAGIC: 0xA7][VERSION: u8][KIND: u8][PAYLOAD: N bytes]
//! ```
//!
//! The header makes stored logs self-identifying and leaves room for the
//! container schema to evolve without breaking old readers.

use crate::error::{Error, Result};

/// Magic byte identifying oplog-kit serialized data.
pub const MAGIC_BYTE: u8 = 0xA7;

/// Size of the envelope header in bytes.
pub const ENVELOPE_HEADER_SIZE: usize = 3;

/// Current schema version of the log container.
pub const CURRENT_VERSION: u8 = 1;

/// What kind of payload the envelope wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadKind {
    /// A full serialized operation log.
    Log = 1,
}

impl PayloadKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Log),
            _ => None,
        }
    }
}

/// Prefix a payload with the envelope header.
#[must_use]
pub(crate) fn seal(kind: PayloadKind, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());
    bytes.push(MAGIC_BYTE);
    bytes.push(CURRENT_VERSION);
    bytes.push(kind as u8);
    bytes.extend_from_slice(payload);
    bytes
}

/// Strip and validate the envelope header, returning the payload slice.
pub(crate) fn open(bytes: &[u8], expected: PayloadKind) -> Result<&[u8]> {
    if bytes.len() < ENVELOPE_HEADER_SIZE {
        return Err(Error::CorruptLog(
            "data too short for envelope header".into(),
        ));
    }
    if bytes[0] != MAGIC_BYTE {
        return Err(Error::CorruptLog(format!(
            "invalid magic byte 0x{:02X}, expected 0x{MAGIC_BYTE:02X}",
            bytes[0]
        )));
    }
    if bytes[1] > CURRENT_VERSION {
        return Err(Error::CorruptLog(format!(
            "container version {} is newer than supported version {CURRENT_VERSION}",
            bytes[1]
        )));
    }
    match PayloadKind::from_byte(bytes[2]) {
        Some(kind) if kind == expected => Ok(&bytes[ENVELOPE_HEADER_SIZE..]),
        Some(_) | None => Err(Error::CorruptLog(format!(
            "unexpected payload kind {}",
            bytes[2]
        ))),
    }
}
