//! Simulated MUX controller bus

use std::collections::BTreeMap;

use mux_protocol::{BusAddress, LineCodec};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Number of selectable channels per board
pub const CHANNELS_PER_BOARD: u8 = 8;

/// Banner returned for `TST`
const PROBE_BANNER: &str = "MUX CONTROLLER READY";

/// Injected failure behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureMode {
    /// Answer commands normally
    #[default]
    None,
    /// Answer every SET/RST with a bus transmission error
    ComError,
    /// Swallow commands entirely (drives caller timeout paths)
    Mute,
    /// Answer SCN with non-numeric garbage (drives parse-failure paths)
    GarbageScan,
}

/// Configuration for a simulated bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimBusConfig {
    /// Board addresses present on the bus
    pub boards: Vec<BusAddress>,
    /// Failure injection
    #[serde(default)]
    pub failure_mode: FailureMode,
}

impl Default for SimBusConfig {
    fn default() -> Self {
        Self {
            boards: vec![0x20, 0x21],
            failure_mode: FailureMode::None,
        }
    }
}

/// A simulated bus of MUX boards behind one controller
///
/// Tracks the active channel per board and answers the line protocol the
/// way the firmware does: `SET`/`RST` with a single-digit status, `SCN`
/// with the sorted address list, `TST` with a banner.
#[derive(Debug)]
pub struct SimBus {
    /// Active channel per board, keyed by address (sorted for stable scans)
    boards: BTreeMap<BusAddress, u8>,
    failure_mode: FailureMode,
}

impl SimBus {
    /// Create a bus populated with the given board addresses
    pub fn new(addresses: impl IntoIterator<Item = BusAddress>) -> Self {
        Self {
            boards: addresses.into_iter().map(|a| (a, 0)).collect(),
            failure_mode: FailureMode::None,
        }
    }

    /// Create a bus from configuration
    pub fn from_config(config: SimBusConfig) -> Self {
        let mut bus = Self::new(config.boards);
        bus.failure_mode = config.failure_mode;
        bus
    }

    /// Change the injected failure behavior
    pub fn set_failure_mode(&mut self, mode: FailureMode) {
        self.failure_mode = mode;
    }

    /// Plug a new board into the bus (visible on the next scan)
    pub fn attach_board(&mut self, address: BusAddress) {
        self.boards.entry(address).or_insert(0);
    }

    /// Unplug a board from the bus
    pub fn detach_board(&mut self, address: BusAddress) {
        self.boards.remove(&address);
    }

    /// Active channel of a board, if present
    pub fn channel_of(&self, address: BusAddress) -> Option<u8> {
        self.boards.get(&address).copied()
    }

    /// Handle one command line, returning the response line (without
    /// terminator), or `None` when the command is swallowed
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let mut tokens = line.split_whitespace();
        let mnemonic = tokens.next().unwrap_or("");

        if self.failure_mode == FailureMode::Mute {
            debug!(%line, "muted, swallowing command");
            return None;
        }

        let response = match mnemonic {
            "SET" => {
                let address = tokens.next().and_then(|t| t.parse::<BusAddress>().ok());
                let channel = tokens.next().and_then(|t| t.parse::<u8>().ok());
                match (address, channel) {
                    (Some(addr), Some(ch)) => self.set_channel(addr, ch),
                    _ => "2".to_string(),
                }
            }
            "RST" => match tokens.next().and_then(|t| t.parse::<BusAddress>().ok()) {
                Some(addr) => self.reset(addr),
                None => "2".to_string(),
            },
            "SCN" => self.scan(),
            "TST" => PROBE_BANNER.to_string(),
            _ => {
                warn!(%line, "unrecognized command");
                "2".to_string()
            }
        };

        Some(response)
    }

    fn set_channel(&mut self, address: BusAddress, channel: u8) -> String {
        if self.failure_mode == FailureMode::ComError {
            return "1".to_string();
        }
        if channel >= CHANNELS_PER_BOARD {
            return "2".to_string();
        }
        match self.boards.get_mut(&address) {
            Some(active) => {
                *active = channel;
                "0".to_string()
            }
            None => "2".to_string(),
        }
    }

    fn reset(&mut self, address: BusAddress) -> String {
        if self.failure_mode == FailureMode::ComError {
            return "1".to_string();
        }
        match self.boards.get_mut(&address) {
            Some(active) => {
                *active = 0;
                "0".to_string()
            }
            None => "2".to_string(),
        }
    }

    fn scan(&self) -> String {
        if self.failure_mode == FailureMode::GarbageScan {
            return "32 oops 34".to_string();
        }
        if self.boards.is_empty() {
            // Empty bus answers a whitespace line so a frame still arrives
            return " ".to_string();
        }
        self.boards
            .keys()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serve a simulated bus over an async byte stream until it closes
///
/// Pairs with `tokio::io::duplex()` to stand in for a serial port.
pub async fn run_sim_bus<T>(mut bus: SimBus, mut io: T)
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    info!(boards = bus.boards.len(), "simulated bus started");

    let mut codec = LineCodec::new();
    let mut buf = vec![0u8; 256];

    loop {
        let n = match io.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };

        codec.push_bytes(&buf[..n]);
        while let Some(line) = codec.next_line() {
            if let Some(mut response) = bus.handle_line(&line) {
                response.push('\n');
                if io.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }

    info!("simulated bus stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_reset() {
        let mut bus = SimBus::new([32, 33]);

        assert_eq!(bus.handle_line("SET 32 5").as_deref(), Some("0"));
        assert_eq!(bus.channel_of(32), Some(5));

        assert_eq!(bus.handle_line("RST 32").as_deref(), Some("0"));
        assert_eq!(bus.channel_of(32), Some(0));
    }

    #[test]
    fn unknown_address_and_bad_channel() {
        let mut bus = SimBus::new([32]);

        assert_eq!(bus.handle_line("SET 99 1").as_deref(), Some("2"));
        assert_eq!(bus.handle_line("SET 32 200").as_deref(), Some("2"));
        assert_eq!(bus.handle_line("RST 99").as_deref(), Some("2"));
    }

    #[test]
    fn scan_lists_boards_sorted() {
        let bus = SimBus::new([33, 32]);
        assert_eq!(bus.scan(), "32 33");
    }

    #[test]
    fn empty_bus_scan_is_whitespace_frame() {
        let bus = SimBus::new([]);
        assert_eq!(bus.scan(), " ");
    }

    #[test]
    fn probe_banner_is_non_empty() {
        let mut bus = SimBus::new([]);
        let banner = bus.handle_line("TST").unwrap();
        assert!(!banner.trim().is_empty());
    }

    #[test]
    fn com_error_mode() {
        let mut bus = SimBus::new([32]);
        bus.set_failure_mode(FailureMode::ComError);

        assert_eq!(bus.handle_line("SET 32 1").as_deref(), Some("1"));
        // A failed command must not change the channel
        assert_eq!(bus.channel_of(32), Some(0));
    }

    #[test]
    fn mute_swallows_commands() {
        let mut bus = SimBus::new([32]);
        bus.set_failure_mode(FailureMode::Mute);
        assert_eq!(bus.handle_line("SET 32 1"), None);
    }

    #[test]
    fn attach_and_detach() {
        let mut bus = SimBus::new([32]);
        bus.attach_board(40);
        assert_eq!(bus.scan(), "32 40");
        bus.detach_board(32);
        assert_eq!(bus.scan(), "40");
    }
}
