use std::fmt::Display;

use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{CommandCode, Frame, FrameKind, COMMAND_FOOTER};
use crate::prelude::*;

/// Bitmask reported by the sensor describing what it currently detects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TargetState(pub u8);

impl TargetState {
    pub const PRESENCE: u8 = 0x01;
    pub const MOVING: u8 = 0x02;
    pub const STILL: u8 = 0x04;

    #[must_use]
    pub fn has_target(&self) -> bool {
        self.0 & Self::PRESENCE != 0
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.0 & Self::MOVING != 0
    }

    #[must_use]
    pub fn is_still(&self) -> bool {
        self.0 & Self::STILL != 0
    }

    /// Short human readable description of the detected target(s).
    #[must_use]
    pub fn describe(&self) -> &'static str {
        if !self.has_target() {
            return "no target";
        }
        match (self.is_moving(), self.is_still()) {
            (true, true) => "moving+still",
            (true, false) => "moving",
            (false, true) => "still",
            (false, false) => "present",
        }
    }
}

impl Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X} ({})", self.0, self.describe())
    }
}

/// Sensor readings decoded from a telemetry frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelemetryRecord {
    pub target_state: TargetState,
    pub moving_distance_cm: u16,
    /// Moving target energy, 0-100.
    pub moving_energy: u8,
    pub still_distance_cm: u16,
    /// Still target energy, 0-100.
    pub still_energy: u8,
    /// Distance to the nearest detected target.
    pub detection_distance_cm: u16,
    /// Light sensor value, only present when the frame carries it.
    pub ambient_light: Option<u8>,
    pub frame_length_bytes: usize,
    /// Zero-based sequence index of this record within its session.
    pub captured_at: u64,
}

impl TelemetryRecord {
    /// Minimum telemetry frame length: header(4) + length(2) + type(1) + head(1) +
    /// state(1) + distances and energies(8) + footer(4).
    pub const MIN_LEN: usize = 21;
    /// Offset of the ambient light byte.
    pub const AMBIENT_LIGHT_OFFSET: usize = 17;

    /// Decode a complete telemetry frame, header and footer included.
    ///
    /// # Errors
    /// [Error::MalformedFrame] if there are not enough bytes for the mandatory fields.
    pub fn decode(dat: &[u8], captured_at: u64) -> Result<Self> {
        if dat.len() < Self::MIN_LEN {
            return Err(Error::MalformedFrame {
                kind: FrameKind::Telemetry,
                actual: dat.len(),
                minimum: Self::MIN_LEN,
            });
        }

        let ambient_light = if dat.len() > Self::AMBIENT_LIGHT_OFFSET + 1 {
            Some(dat[Self::AMBIENT_LIGHT_OFFSET])
        } else {
            None
        };

        Ok(TelemetryRecord {
            target_state: TargetState(dat[8]),
            moving_distance_cm: u16::from_le_bytes([dat[9], dat[10]]),
            moving_energy: dat[11],
            still_distance_cm: u16::from_le_bytes([dat[12], dat[13]]),
            still_energy: dat[14],
            detection_distance_cm: u16::from_le_bytes([dat[15], dat[16]]),
            ambient_light,
            frame_length_bytes: dat.len(),
            captured_at,
        })
    }
}

/// A command or acknowledgment frame.
///
/// Only used for passive recognition, e.g., logging echoes of commands sent by
/// another tool. Nothing in the decode pipeline acts on these.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommandFrame {
    pub command_code: u8,
    /// True when the command word marks this as an acknowledgment from the sensor.
    pub ack: bool,
    /// Bytes between the command word and the footer, possibly empty.
    pub payload: Vec<u8>,
}

impl CommandFrame {
    /// Minimum command frame length: header(4) + length(2) + command code(1).
    pub const MIN_LEN: usize = 7;
    const PAYLOAD_OFFSET: usize = 8;

    /// Decode a complete command frame, header and footer included.
    ///
    /// # Errors
    /// [Error::MalformedFrame] if there are not enough bytes for the command code.
    pub fn decode(dat: &[u8]) -> Result<Self> {
        if dat.len() < Self::MIN_LEN {
            return Err(Error::MalformedFrame {
                kind: FrameKind::Command,
                actual: dat.len(),
                minimum: Self::MIN_LEN,
            });
        }
        let end = dat.len().saturating_sub(COMMAND_FOOTER.len());
        let payload = if end > Self::PAYLOAD_OFFSET {
            dat[Self::PAYLOAD_OFFSET..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(CommandFrame {
            command_code: dat[6],
            ack: dat.get(7) == Some(&0x01),
            payload,
        })
    }

    #[must_use]
    pub fn code(&self) -> CommandCode {
        CommandCode::from(self.command_code)
    }

    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.ack
    }
}

impl Display for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CommandFrame{{code: {}, ack: {}, payload: [len={}]}}",
            self.code(),
            self.ack,
            self.payload.len()
        )
    }
}

/// The typed content of a [Frame].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Decoded {
    Telemetry(TelemetryRecord),
    Command(CommandFrame),
}

/// Decodes located [Frame]s into [Decoded] values.
///
/// Telemetry records are stamped with a sequence index that increases by one for
/// each successfully decoded record, so identical input always produces identical
/// records.
#[derive(Debug, Default, Clone)]
pub struct FrameDecoder {
    next_index: u64,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        FrameDecoder::default()
    }

    /// Decode `frame` according to its kind.
    ///
    /// # Errors
    /// [Error::MalformedFrame] if the frame is too short for its kind, or
    /// [Error::UnrecognizedFrame] for frames of unknown kind.
    pub fn decode(&mut self, frame: &Frame) -> Result<Decoded> {
        let zult = match frame.kind {
            FrameKind::Telemetry => {
                TelemetryRecord::decode(&frame.data, self.next_index).map(Decoded::Telemetry)
            }
            FrameKind::Command => CommandFrame::decode(&frame.data).map(Decoded::Command),
            FrameKind::Unrecognized => Err(Error::UnrecognizedFrame),
        };

        match &zult {
            Ok(Decoded::Telemetry(rec)) => {
                trace!(offset = frame.offset, index = rec.captured_at, "telemetry");
                self.next_index += 1;
            }
            Ok(Decoded::Command(cmd)) => trace!(offset = frame.offset, "{cmd}"),
            Err(err) => debug!(offset = frame.offset, "dropping frame: {err}"),
        }

        zult
    }

    /// Number of telemetry records decoded so far.
    #[must_use]
    pub fn decoded(&self) -> u64 {
        self.next_index
    }

    pub fn reset(&mut self) {
        self.next_index = 0;
    }
}
