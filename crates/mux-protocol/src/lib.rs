//! MUX Board Serial Protocol
//!
//! This crate provides parsing and encoding for the line-oriented command
//! language spoken by MUX controller boards over a serial link.
//!
//! # Format
//!
//! Commands and responses are ASCII lines terminated by `\n`:
//!
//! | Command          | Response                          |
//! |------------------|-----------------------------------|
//! | `SET <addr> <ch>`| single digit status code          |
//! | `RST <addr>`     | single digit status code          |
//! | `SCN`            | space-separated address list      |
//! | `TST`            | arbitrary non-empty text          |
//!
//! Status codes: `0` = SUCCESS, `1` = COM_ERROR, `2` = ADDR_ERROR, anything
//! else (or unparseable) maps to UNKNOWN.
//!
//! # Example
//!
//! ```rust
//! use mux_protocol::{BusCommand, CommandStatus, LineCodec};
//!
//! let cmd = BusCommand::SetChannel { address: 32, channel: 5 };
//! assert_eq!(cmd.encode(), b"SET 32 5\n");
//!
//! let mut codec = LineCodec::new();
//! codec.push_bytes(b"0\n");
//! let line = codec.next_line().unwrap();
//! assert_eq!(CommandStatus::parse(&line), CommandStatus::Success);
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod response;
pub mod status;

pub use codec::LineCodec;
pub use command::BusCommand;
pub use error::ParseError;
pub use response::{is_probe_ack, parse_scan_response};
pub use status::CommandStatus;

/// Address of a MUX board on the bus
pub type BusAddress = u16;
