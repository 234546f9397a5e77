//! Status codes returned by SET and RST commands
//!
//! The codes mirror the error enum in the board firmware.

use std::fmt;

/// Outcome of a SET or RST command as reported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandStatus {
    /// Transmission to the target board succeeded
    Success,
    /// The board-side bus transaction failed
    ComError,
    /// Address or channel out of bounds
    AddrError,
    /// Any other code, or an unparseable response
    Unknown,
}

impl CommandStatus {
    /// Map a raw firmware status code
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => CommandStatus::Success,
            1 => CommandStatus::ComError,
            2 => CommandStatus::AddrError,
            _ => CommandStatus::Unknown,
        }
    }

    /// Parse a response line as a status code
    ///
    /// Anything that is not a valid decimal number maps to `Unknown`.
    pub fn parse(line: &str) -> Self {
        match line.trim().parse::<u8>() {
            Ok(code) => Self::from_code(code),
            Err(_) => CommandStatus::Unknown,
        }
    }

    /// Whether the command was acknowledged successfully
    pub fn is_success(&self) -> bool {
        *self == CommandStatus::Success
    }

    /// Canonical label, as exposed to remote clients
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Success => "SUCCESS",
            CommandStatus::ComError => "COM_ERROR",
            CommandStatus::AddrError => "ADDR_ERROR",
            CommandStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_codes() {
        assert_eq!(CommandStatus::parse("0"), CommandStatus::Success);
        assert_eq!(CommandStatus::parse("1"), CommandStatus::ComError);
        assert_eq!(CommandStatus::parse("2"), CommandStatus::AddrError);
    }

    #[test]
    fn unknown_codes_and_garbage() {
        assert_eq!(CommandStatus::parse("7"), CommandStatus::Unknown);
        assert_eq!(CommandStatus::parse("255"), CommandStatus::Unknown);
        assert_eq!(CommandStatus::parse("ERR"), CommandStatus::Unknown);
        assert_eq!(CommandStatus::parse(""), CommandStatus::Unknown);
        assert_eq!(CommandStatus::parse("-1"), CommandStatus::Unknown);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert_eq!(CommandStatus::parse(" 0 "), CommandStatus::Success);
    }

    #[test]
    fn labels() {
        assert_eq!(CommandStatus::Success.to_string(), "SUCCESS");
        assert_eq!(CommandStatus::AddrError.to_string(), "ADDR_ERROR");
    }
}
