//! The reconciler actor
//!
//! Owns the attribute mirror and drives it from the registry: it creates
//! remote objects for discovered devices, pushes channel/status updates,
//! routes remote trigger writes back into the registry, and watches the
//! link on a fixed interval so a dead serial connection heals without
//! operator action.
//!
//! Modeled as a single task over a `select!` loop: remote events arrive on
//! one channel, the reconnection timer fires on the other. All hardware
//! access goes through the registry, which serializes it.

use std::sync::Arc;

use mux_link::{BusLink, ConnectionState};
use mux_protocol::BusAddress;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::attrs::{AttrId, AttrValue, AttributeServer, RemoteEvent};
use crate::config::GatewayConfig;
use crate::error::AttrError;
use crate::events::GatewayEvent;
use crate::mirror::{MirrorEntry, MirrorSet};
use crate::registry::MuxRegistry;

/// Name of the gateway-level status variable
pub const GATEWAY_STATUS_ATTR: &str = "GatewayStatus";
/// Name of the mirrored-device-count variable
pub const MUX_COUNT_ATTR: &str = "MuxBoardCount";

/// Writing this to a channel-select trigger is a no-op; the trigger is
/// parked at this value between commands.
pub const SET_SENTINEL: u8 = 0;

/// Gateway-level node ids, created once at startup
struct GatewayNodes {
    root: AttrId,
    status: AttrId,
    count: AttrId,
}

/// Maintains the remote attribute mirror over a [`MuxRegistry`]
pub struct Reconciler<S, L> {
    registry: Arc<MuxRegistry<L>>,
    server: S,
    config: GatewayConfig,
    mirror: MirrorSet,
    nodes: Option<GatewayNodes>,
    state: ConnectionState,
    event_tx: Option<mpsc::Sender<GatewayEvent>>,
}

impl<S: AttributeServer, L: BusLink> Reconciler<S, L> {
    pub fn new(registry: Arc<MuxRegistry<L>>, server: S, config: GatewayConfig) -> Self {
        Self {
            registry,
            server,
            config,
            mirror: MirrorSet::new(),
            nodes: None,
            state: ConnectionState::Disconnected,
            event_tx: None,
        }
    }

    /// Broadcast lifecycle events on the given channel
    pub fn with_events(mut self, tx: mpsc::Sender<GatewayEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn mirror(&self) -> &MirrorSet {
        &self.mirror
    }

    /// Create the gateway object, connect the link, and run the first
    /// reconcile pass
    ///
    /// A link that fails to open is not an error: the gateway comes up
    /// Disconnected and the monitor keeps retrying.
    pub async fn start(&mut self) -> Result<(), AttrError> {
        let root = self
            .server
            .add_object(None, &self.config.gateway_object)
            .await?;
        let status = self
            .server
            .add_variable(root, GATEWAY_STATUS_ATTR, AttrValue::Text("Connecting".into()), false)
            .await?;
        let count = self
            .server
            .add_variable(root, MUX_COUNT_ATTR, AttrValue::UInt(0), false)
            .await?;
        self.nodes = Some(GatewayNodes { root, status, count });
        // matches the initial value of the status attribute
        self.state = ConnectionState::Connecting;

        if self.registry.connect().await {
            self.set_state(ConnectionState::Connected).await;
            self.reconcile_pass().await;
        } else {
            warn!("link did not open at startup, monitor will retry");
            self.set_state(ConnectionState::Disconnected).await;
        }
        Ok(())
    }

    /// Serve remote events and the reconnection timer until shutdown
    pub async fn run(mut self, mut events: mpsc::Receiver<RemoteEvent>) {
        let mut monitor = tokio::time::interval(self.config.monitor_interval());
        monitor.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick of an interval is immediate, and start() already
        // connected; swallow it
        monitor.tick().await;

        info!("reconciler running");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(RemoteEvent::AttributeWritten { node, value }) => {
                        self.handle_write(node, value).await;
                    }
                    Some(RemoteEvent::RescanRequested) => {
                        info!("rescan requested by remote client");
                        self.reconcile_pass().await;
                    }
                    Some(RemoteEvent::Shutdown) | None => break,
                },
                _ = monitor.tick() => {
                    self.check_connection().await;
                }
            }
        }

        info!("reconciler stopping");
        self.registry.disconnect().await;
    }

    /// Route a remote attribute write to the device that owns the node
    async fn handle_write(&mut self, node: AttrId, value: AttrValue) {
        if let Some(address) = self.mirror.set_trigger_owner(node) {
            self.handle_set_channel(address, value).await;
        } else if let Some(address) = self.mirror.reset_trigger_owner(node) {
            self.handle_reset(address, value).await;
        } else {
            debug!(?node, "write to unrouted node ignored");
        }
    }

    async fn handle_set_channel(&mut self, address: BusAddress, value: AttrValue) {
        let Some(channel) = value.as_byte() else {
            warn!(address, ?value, "non-numeric channel write ignored");
            return;
        };
        // The sentinel carries no request, and parking the trigger after a
        // command writes it back to us. No re-park here: the trigger
        // already holds the sentinel, and writing it again would feed
        // another echo into this handler.
        if channel == SET_SENTINEL {
            return;
        }

        let current = self
            .registry
            .device_states()
            .await
            .get(&address)
            .map(|d| d.active_channel);
        if current == Some(channel) {
            // Suppression compares against the last acknowledged channel
            // only; a repeat write racing an in-flight change can be
            // dropped here.
            debug!(address, channel, "channel already active, suppressing");
            self.reset_set_trigger(address).await;
            return;
        }

        if !self.registry.set_channel(address, channel).await {
            warn!(address, channel, "remote channel request failed");
        }
        self.push_device_state(address).await;
        self.reset_set_trigger(address).await;
    }

    async fn handle_reset(&mut self, address: BusAddress, value: AttrValue) {
        if !value.is_truthy() {
            return;
        }

        if !self.registry.reset_mux(address).await {
            warn!(address, "remote reset request failed");
        }
        self.push_device_state(address).await;

        if let Some(entry) = self.mirror.get(address) {
            if let Err(e) = self
                .server
                .write_value(entry.reset_trigger, AttrValue::Bool(false))
                .await
            {
                warn!(address, error = %e, "failed to park reset trigger");
            }
        }
    }

    /// Park the channel-select trigger back at the sentinel
    async fn reset_set_trigger(&mut self, address: BusAddress) {
        if let Some(entry) = self.mirror.get(address) {
            if let Err(e) = self
                .server
                .write_value(entry.set_trigger, AttrValue::Byte(SET_SENTINEL))
                .await
            {
                warn!(address, error = %e, "failed to park set trigger");
            }
        }
    }

    /// One monitor tick: verify the link, reconnect if it died
    async fn check_connection(&mut self) {
        if self.registry.is_connected().await {
            if self.state != ConnectionState::Connected {
                self.set_state(ConnectionState::Connected).await;
            }
            return;
        }

        warn!("link is down, attempting reconnect");
        self.set_state(ConnectionState::Reconnecting).await;
        if self.registry.connect().await {
            info!("link restored");
            self.set_state(ConnectionState::Connected).await;
            self.reconcile_pass().await;
        } else {
            self.set_state(ConnectionState::Disconnected).await;
        }
    }

    /// Scan the bus and mirror every device that is not yet mirrored
    ///
    /// Addresses that stopped answering keep their remote objects; the
    /// mirror only shrinks by restarting the gateway. A failure mirroring
    /// one device does not stop the others.
    pub async fn reconcile_pass(&mut self) {
        let found = self.registry.scan_for_devices().await;
        debug!(count = found.len(), "reconcile pass over scan result");

        for address in found {
            if self.mirror.contains(address) {
                continue;
            }
            if let Err(e) = self.create_entry(address).await {
                warn!(address, error = %e, "failed to mirror device");
                self.emit(GatewayEvent::Error {
                    source: "mirror",
                    message: format!("device {address:#x}: {e}"),
                })
                .await;
            }
        }

        self.update_count().await;
    }

    /// Create the remote object tree for one device
    async fn create_entry(&mut self, address: BusAddress) -> Result<(), AttrError> {
        let root = self
            .nodes
            .as_ref()
            .ok_or(AttrError::NotInitialized)?
            .root;
        let name = self.config.object_name(address);
        info!(address, name = %name, "mirroring new device");

        let object = self.server.add_object(Some(root), &name).await?;
        let names = &self.config.attributes;
        let channel = self
            .server
            .add_variable(object, &names.channel, AttrValue::Byte(0), false)
            .await?;
        let status = self
            .server
            .add_variable(
                object,
                &names.status,
                AttrValue::Text("IDLE".into()),
                false,
            )
            .await?;
        let set_trigger = self
            .server
            .add_variable(object, &names.set_channel, AttrValue::Byte(SET_SENTINEL), true)
            .await?;
        let reset_trigger = self
            .server
            .add_variable(object, &names.reset, AttrValue::Bool(false), true)
            .await?;
        self.server.watch(set_trigger).await?;
        self.server.watch(reset_trigger).await?;

        self.mirror.insert(MirrorEntry {
            address,
            object,
            channel,
            status,
            set_trigger,
            reset_trigger,
        });
        self.emit(GatewayEvent::DeviceMirrored {
            address,
            generation: self.mirror.generation(),
        })
        .await;

        // Put freshly mirrored hardware in a known state before clients
        // see it.
        if !self.registry.reset_mux(address).await {
            warn!(address, "initial reset of mirrored device failed");
        }
        self.push_device_state(address).await;
        Ok(())
    }

    /// Push one device's channel and status to its mirror variables
    async fn push_device_state(&mut self, address: BusAddress) {
        let states = self.registry.device_states().await;
        let Some(device) = states.get(&address) else {
            debug!(address, "no registry state to push");
            return;
        };
        let Some(entry) = self.mirror.get(address) else {
            return;
        };

        let result = async {
            self.server
                .write_value(entry.channel, AttrValue::Byte(device.active_channel))
                .await?;
            self.server
                .write_value(entry.status, AttrValue::Text(device.last_status.as_str().into()))
                .await
        }
        .await;

        match result {
            Ok(()) => {
                self.emit(GatewayEvent::DeviceStatePushed {
                    address,
                    channel: device.active_channel,
                    status: device.last_status,
                })
                .await;
            }
            Err(e) => {
                warn!(address, error = %e, "failed to push device state");
                self.emit(GatewayEvent::Error {
                    source: "push",
                    message: format!("device {address:#x}: {e}"),
                })
                .await;
            }
        }
    }

    async fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!(from = %self.state, to = %state, "connection state changed");
        self.state = state;

        if let Some(nodes) = &self.nodes {
            if let Err(e) = self
                .server
                .write_value(nodes.status, AttrValue::Text(state.as_str().into()))
                .await
            {
                warn!(error = %e, "failed to publish connection state");
            }
        }
        self.emit(GatewayEvent::ConnectionStateChanged { state }).await;
    }

    async fn update_count(&mut self) {
        if let Some(nodes) = &self.nodes {
            let count = self.mirror.len() as u32;
            if let Err(e) = self.server.write_value(nodes.count, AttrValue::UInt(count)).await {
                warn!(error = %e, "failed to publish device count");
            }
        }
    }

    async fn emit(&self, event: GatewayEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
