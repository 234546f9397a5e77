//! Serial port implementation of [`BusLink`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mux_protocol::{BusAddress, CommandStatus};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{info, warn};

use crate::transport::{
    BusLink, LineTransport, DEFAULT_COMMAND_TIMEOUT, DEFAULT_SCAN_TIMEOUT,
};

/// Configuration for a serial bus connection
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Timeout for single-board commands
    pub command_timeout: Duration,
    /// Timeout for a full bus scan
    pub scan_timeout: Duration,
}

impl SerialConfig {
    /// Configuration for a port with default timings
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 115_200,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// The serial transport: one physical link, one background reader
pub struct SerialLink {
    config: SerialConfig,
    transport: Option<LineTransport<SerialStream>>,
    connected: Arc<AtomicBool>,
}

impl SerialLink {
    /// Create an unopened link for the configured port
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            transport: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configured port path
    pub fn port(&self) -> &str {
        &self.config.port
    }
}

#[async_trait]
impl BusLink for SerialLink {
    async fn start(&mut self) -> bool {
        if self.transport.is_some() && self.is_connected() {
            return true;
        }

        // A transport left over from a dead session is torn down first.
        if let Some(mut stale) = self.transport.take() {
            stale.shutdown().await;
        }

        let stream = match tokio_serial::new(&self.config.port, self.config.baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!(port = %self.config.port, error = %e, "failed to open serial port");
                return false;
            }
        };

        info!(port = %self.config.port, baud = self.config.baud_rate, "serial port opened");

        let mut transport = LineTransport::spawn_with_flag(stream, Arc::clone(&self.connected));
        transport.set_timeouts(self.config.command_timeout, self.config.scan_timeout);
        self.transport = Some(transport);
        true
    }

    async fn stop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown().await;
            info!(port = %self.config.port, "serial link stopped");
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn set_channel(&mut self, address: BusAddress, channel: u8) -> CommandStatus {
        match self.transport.as_mut() {
            Some(transport) => transport.set_channel(address, channel).await,
            None => {
                warn!("cannot send SET, link is not open");
                CommandStatus::Unknown
            }
        }
    }

    async fn reset_mux(&mut self, address: BusAddress) -> CommandStatus {
        match self.transport.as_mut() {
            Some(transport) => transport.reset_mux(address).await,
            None => {
                warn!("cannot send RST, link is not open");
                CommandStatus::Unknown
            }
        }
    }

    async fn scan_bus(&mut self) -> Option<Vec<BusAddress>> {
        self.transport.as_mut()?.scan_bus().await
    }

    async fn test_connection(&mut self) -> bool {
        match self.transport.as_mut() {
            Some(transport) => transport.test_connection().await,
            None => false,
        }
    }
}
