//! MUX Serial Link
//!
//! This crate owns the physical connection to a MUX controller board and
//! turns it into a request/response primitive the registry can build on.
//!
//! # Architecture
//!
//! A background task continuously drains the serial port into a bounded
//! response channel. Callers issue one command at a time through
//! [`LineTransport::send_command`], which writes a line and waits for the
//! next line the reader enqueues, or a timeout.
//!
//! The protocol carries no correlation identifiers, so at most one exchange
//! may be in flight. The transport does not enforce this itself; callers
//! serialize on their own mutex (the registry does). What the transport does
//! protect against is a *late* response from a previously timed-out
//! exchange: every send discards stale queued lines first.
//!
//! # Disconnect detection
//!
//! A read error or EOF observed by the background reader flips the shared
//! connectivity flag and ends the reader. A send timeout alone does not: a
//! slow board is not necessarily a dead link. [`BusLink::test_connection`]
//! exists for callers that need to tell the two apart.

pub mod error;
pub mod ports;
pub mod serial;
pub mod state;
pub mod transport;

pub use error::LinkError;
pub use ports::{list_ports, SerialPortInfo};
pub use serial::{SerialConfig, SerialLink};
pub use state::ConnectionState;
pub use transport::{BusLink, LineTransport};
