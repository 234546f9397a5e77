//! Thread-safe device registry
//!
//! The registry is the authoritative table of MUX boards. One mutex covers
//! both the device table and the transport: every hardware-facing operation
//! is a single short synchronous round trip, and the transport forbids
//! overlapping exchanges, so coarse-grained locking costs nothing and is
//! what upholds the one-exchange-in-flight invariant.

use std::collections::{HashMap, HashSet};
use std::fmt;

use mux_link::BusLink;
use mux_protocol::{BusAddress, CommandStatus};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Last-seen status of a device, as exposed to remote clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    /// No command issued since the device was discovered
    #[default]
    Idle,
    /// Last command was acknowledged
    Success,
    /// Board-side bus transaction failed
    ComError,
    /// Address or channel rejected
    AddrError,
    /// Unparseable or missing response
    Unknown,
}

impl From<CommandStatus> for DeviceStatus {
    fn from(status: CommandStatus) -> Self {
        match status {
            CommandStatus::Success => DeviceStatus::Success,
            CommandStatus::ComError => DeviceStatus::ComError,
            CommandStatus::AddrError => DeviceStatus::AddrError,
            CommandStatus::Unknown => DeviceStatus::Unknown,
        }
    }
}

impl DeviceStatus {
    /// Canonical label for the status attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Idle => "IDLE",
            DeviceStatus::Success => "SUCCESS",
            DeviceStatus::ComError => "COM_ERROR",
            DeviceStatus::AddrError => "ADDR_ERROR",
            DeviceStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single MUX board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxDevice {
    /// Bus address, the unique key
    pub address: BusAddress,
    /// Currently active channel
    pub active_channel: u8,
    /// Status of the last hardware command targeting this board
    pub last_status: DeviceStatus,
}

impl MuxDevice {
    /// A freshly discovered device: channel 0, no command history
    pub fn new(address: BusAddress) -> Self {
        Self {
            address,
            active_channel: 0,
            last_status: DeviceStatus::Idle,
        }
    }
}

struct RegistryInner<L> {
    link: L,
    devices: HashMap<BusAddress, MuxDevice>,
}

/// Authoritative, mutex-guarded registry of MUX boards
///
/// Generic over the [`BusLink`] so the serial transport can be swapped for
/// a future variant (or a test double) without touching this layer.
pub struct MuxRegistry<L> {
    inner: Mutex<RegistryInner<L>>,
}

impl<L: BusLink> MuxRegistry<L> {
    /// Create a registry over an unopened link
    pub fn new(link: L) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                link,
                devices: HashMap::new(),
            }),
        }
    }

    /// Open the transport; false if the link cannot be opened
    pub async fn connect(&self) -> bool {
        self.inner.lock().await.link.start().await
    }

    /// Stop the transport
    pub async fn disconnect(&self) {
        self.inner.lock().await.link.stop().await;
    }

    /// Whether the transport currently believes the link is up
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.link.is_connected()
    }

    /// Probe the link to distinguish a slow bus from a dead one
    pub async fn test_connection(&self) -> bool {
        self.inner.lock().await.link.test_connection().await
    }

    /// Scan the bus and merge the result into the device table
    ///
    /// Devices no longer reported are removed; new addresses get
    /// default-state devices. A scan failure is treated as an empty result
    /// and stops the transport, since the link is assumed lost; callers
    /// must connect again before further operations. Returns the full key
    /// list after the merge.
    pub async fn scan_for_devices(&self) -> Vec<BusAddress> {
        let mut inner = self.inner.lock().await;

        if !inner.link.is_connected() {
            warn!("cannot scan, link is not connected");
            return Vec::new();
        }

        let found = match inner.link.scan_bus().await {
            Some(found) => found,
            None => {
                warn!("bus scan failed, stopping link");
                inner.link.stop().await;
                Vec::new()
            }
        };

        let found_set: HashSet<BusAddress> = found.iter().copied().collect();
        let known_set: HashSet<BusAddress> = inner.devices.keys().copied().collect();

        for addr in known_set.difference(&found_set) {
            info!(address = addr, "device no longer reported, removing");
            inner.devices.remove(addr);
        }
        for addr in found_set.difference(&known_set) {
            info!(address = addr, "new device discovered");
            inner.devices.insert(*addr, MuxDevice::new(*addr));
        }

        inner.devices.keys().copied().collect()
    }

    /// Activate a channel on one board
    ///
    /// False for an unknown address or any non-SUCCESS status; the channel
    /// is only mutated on SUCCESS, but `last_status` always records the
    /// outcome.
    pub async fn set_channel(&self, address: BusAddress, channel: u8) -> bool {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let Some(device) = inner.devices.get_mut(&address) else {
            warn!(address, "set_channel on unknown address");
            return false;
        };

        let status = inner.link.set_channel(address, channel).await;
        device.last_status = status.into();

        if status.is_success() {
            device.active_channel = channel;
            debug!(address, channel, "channel changed");
            true
        } else {
            warn!(address, channel, %status, "channel change rejected");
            false
        }
    }

    /// Reset one board back to channel 0
    pub async fn reset_mux(&self, address: BusAddress) -> bool {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let Some(device) = inner.devices.get_mut(&address) else {
            warn!(address, "reset_mux on unknown address");
            return false;
        };

        let status = inner.link.reset_mux(address).await;
        device.last_status = status.into();

        if status.is_success() {
            device.active_channel = 0;
            debug!(address, "board reset");
            true
        } else {
            warn!(address, %status, "reset rejected");
            false
        }
    }

    /// Snapshot of the device table
    ///
    /// Taken under the mutex, so a caller never observes a partially
    /// updated device.
    pub async fn device_states(&self) -> HashMap<BusAddress, MuxDevice> {
        self.inner.lock().await.devices.clone()
    }
}
