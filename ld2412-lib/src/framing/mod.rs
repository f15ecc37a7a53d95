//! LD2412 frame synchronization and decoding.
//!
//! The sensor emits two kinds of frames on the same serial line, each delimited by
//! its own 4 byte header and footer magic:
//!
//! | Kind        | Header        | Footer        | Minimum length |
//! |-------------|---------------|---------------|----------------|
//! | Telemetry   | `F4 F3 F2 F1` | `F8 F7 F6 F5` | 21             |
//! | Command/Ack | `FD FC FB FA` | `04 03 02 01` | 7              |
//!
//! All multi-byte values are little-endian.
mod bytes;
mod command;
mod decoder;
mod synchronizer;

pub use bytes::*;
pub use command::*;
pub use decoder::*;
pub use synchronizer::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Telemetry (data) frame header magic.
pub const TELEMETRY_HEADER: [u8; 4] = [0xf4, 0xf3, 0xf2, 0xf1];
/// Telemetry (data) frame footer magic.
pub const TELEMETRY_FOOTER: [u8; 4] = [0xf8, 0xf7, 0xf6, 0xf5];
/// Command and acknowledgment frame header magic.
pub const COMMAND_HEADER: [u8; 4] = [0xfd, 0xfc, 0xfb, 0xfa];
/// Command and acknowledgment frame footer magic.
pub const COMMAND_FOOTER: [u8; 4] = [0x04, 0x03, 0x02, 0x01];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameKind {
    Telemetry,
    Command,
    Unrecognized,
}

impl FrameKind {
    /// Header and footer magic for this kind, or `None` for [FrameKind::Unrecognized].
    #[must_use]
    pub fn magic(&self) -> Option<(&'static [u8; 4], &'static [u8; 4])> {
        match self {
            FrameKind::Telemetry => Some((&TELEMETRY_HEADER, &TELEMETRY_FOOTER)),
            FrameKind::Command => Some((&COMMAND_HEADER, &COMMAND_FOOTER)),
            FrameKind::Unrecognized => None,
        }
    }

    /// Determine the kind of frame starting with `header`, if any.
    #[must_use]
    pub fn from_header(header: &[u8]) -> Option<Self> {
        if header.starts_with(&TELEMETRY_HEADER) {
            Some(FrameKind::Telemetry)
        } else if header.starts_with(&COMMAND_HEADER) {
            Some(FrameKind::Command)
        } else {
            None
        }
    }
}

/// A contiguous span of bytes recognized between a header and its matching footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// All frame bytes, including header and footer.
    pub data: Vec<u8>,
    /// Stream offset of the first header byte.
    pub offset: usize,
}

impl Frame {
    /// Construct a frame from raw bytes, classifying it by its header. Frames that
    /// do not start with a known header are [FrameKind::Unrecognized].
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let kind = FrameKind::from_header(&data).unwrap_or(FrameKind::Unrecognized);
        Frame {
            kind,
            data,
            offset: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
