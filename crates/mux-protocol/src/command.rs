//! Command encoding for the MUX board wire protocol

use crate::BusAddress;

/// A command sent to the MUX controller board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusCommand {
    /// Activate a channel on one MUX board: `SET <addr> <ch>`
    SetChannel {
        /// Bus address of the target board
        address: BusAddress,
        /// Channel to activate
        channel: u8,
    },
    /// Reset one MUX board to channel 0: `RST <addr>`
    ResetMux {
        /// Bus address of the target board
        address: BusAddress,
    },
    /// Enumerate boards on the bus: `SCN`
    ScanBus,
    /// Liveness probe: `TST`
    Probe,
}

impl BusCommand {
    /// Encode this command to its wire format, including the line terminator
    pub fn encode(&self) -> Vec<u8> {
        let mut line = match self {
            BusCommand::SetChannel { address, channel } => {
                format!("SET {} {}", address, channel)
            }
            BusCommand::ResetMux { address } => format!("RST {}", address),
            BusCommand::ScanBus => "SCN".to_string(),
            BusCommand::Probe => "TST".to_string(),
        }
        .into_bytes();
        line.push(b'\n');
        line
    }

    /// The wire mnemonic for this command (for logging)
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BusCommand::SetChannel { .. } => "SET",
            BusCommand::ResetMux { .. } => "RST",
            BusCommand::ScanBus => "SCN",
            BusCommand::Probe => "TST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_set() {
        let cmd = BusCommand::SetChannel {
            address: 0x20,
            channel: 3,
        };
        assert_eq!(cmd.encode(), b"SET 32 3\n");
    }

    #[test]
    fn encode_reset() {
        let cmd = BusCommand::ResetMux { address: 33 };
        assert_eq!(cmd.encode(), b"RST 33\n");
    }

    #[test]
    fn encode_bare_commands() {
        assert_eq!(BusCommand::ScanBus.encode(), b"SCN\n");
        assert_eq!(BusCommand::Probe.encode(), b"TST\n");
    }
}
