use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Known LD2412 command codes.
///
/// Commands are only recognized passively; this crate never builds command frames.
/// Acknowledgments echo the command code with the high byte of the command word
/// set to `0x01` (see [super::CommandFrame::is_ack]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommandCode {
    EnterConfig,
    ExitConfig,
    QueryVersion,
    StartDataOutput,
    StopDataOutput,
    SetParameters,
    QueryParameters,
    SetThresholds,
    FactoryReset,
    Reboot,
    Unknown(u8),
}

impl From<u8> for CommandCode {
    fn from(code: u8) -> Self {
        match code {
            0xff => CommandCode::EnterConfig,
            0xfe => CommandCode::ExitConfig,
            0xa0 => CommandCode::QueryVersion,
            0x12 => CommandCode::StartDataOutput,
            0x13 => CommandCode::StopDataOutput,
            0x60 => CommandCode::SetParameters,
            0x61 => CommandCode::QueryParameters,
            0x64 => CommandCode::SetThresholds,
            0xa2 => CommandCode::FactoryReset,
            0xa3 => CommandCode::Reboot,
            x => CommandCode::Unknown(x),
        }
    }
}

impl From<CommandCode> for u8 {
    fn from(code: CommandCode) -> Self {
        match code {
            CommandCode::EnterConfig => 0xff,
            CommandCode::ExitConfig => 0xfe,
            CommandCode::QueryVersion => 0xa0,
            CommandCode::StartDataOutput => 0x12,
            CommandCode::StopDataOutput => 0x13,
            CommandCode::SetParameters => 0x60,
            CommandCode::QueryParameters => 0x61,
            CommandCode::SetThresholds => 0x64,
            CommandCode::FactoryReset => 0xa2,
            CommandCode::Reboot => 0xa3,
            CommandCode::Unknown(x) => x,
        }
    }
}

impl CommandCode {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CommandCode::EnterConfig => "enter-config",
            CommandCode::ExitConfig => "exit-config",
            CommandCode::QueryVersion => "query-version",
            CommandCode::StartDataOutput => "start-data-output",
            CommandCode::StopDataOutput => "stop-data-output",
            CommandCode::SetParameters => "set-parameters",
            CommandCode::QueryParameters => "query-parameters",
            CommandCode::SetThresholds => "set-thresholds",
            CommandCode::FactoryReset => "factory-reset",
            CommandCode::Reboot => "reboot",
            CommandCode::Unknown(_) => "unknown",
        }
    }
}

impl Display for CommandCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X} ({})", u8::from(*self), self.name())
    }
}
