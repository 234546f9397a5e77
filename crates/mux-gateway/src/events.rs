//! Gateway lifecycle events
//!
//! The reconciler can broadcast these over an mpsc channel so a front end
//! or test harness can observe what happened without scraping logs.

use mux_link::ConnectionState;
use mux_protocol::BusAddress;

use crate::registry::DeviceStatus;

/// Things that happen over the lifetime of a running gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The link state changed (also reflected in the status attribute)
    ConnectionStateChanged { state: ConnectionState },
    /// A device gained a remote mirror object
    DeviceMirrored {
        address: BusAddress,
        generation: u64,
    },
    /// A device's channel and status were pushed to the mirror
    DeviceStatePushed {
        address: BusAddress,
        channel: u8,
        status: DeviceStatus,
    },
    /// A non-fatal failure, named by the subsystem it came from
    Error { source: &'static str, message: String },
}
