//! Line transport and the abstract bus capability trait
//!
//! [`LineTransport`] is generic over the underlying byte stream so tests can
//! drive it with `tokio::io::duplex()` while production uses a serial port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mux_protocol::{
    is_probe_ack, parse_scan_response, BusAddress, BusCommand, CommandStatus, LineCodec,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::LinkError;

/// Default timeout for single-board commands
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Default timeout for a full bus scan, which takes much longer than a
/// single-board command
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for the background reader to exit on shutdown
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Depth of the response queue between the reader and the caller
const RESPONSE_QUEUE_DEPTH: usize = 4;

/// Capability set of a MUX bus connection
///
/// The registry and reconciler are written against this trait, not a
/// concrete transport. One implementation exists today ([`crate::SerialLink`]);
/// a network variant would slot in without touching the layers above.
///
/// Methods take `&mut self`: the protocol allows one outstanding exchange,
/// and the caller's mutex is what serializes access.
#[async_trait]
pub trait BusLink: Send {
    /// Open the link and start the background reader
    ///
    /// Returns false (without propagating the cause) when the link cannot be
    /// opened. Idempotent if already started.
    async fn start(&mut self) -> bool;

    /// Stop the reader and close the link; safe to call when not started
    async fn stop(&mut self);

    /// Whether the link is currently believed to be up
    fn is_connected(&self) -> bool;

    /// Issue `SET <addr> <ch>` and return the board's status code
    async fn set_channel(&mut self, address: BusAddress, channel: u8) -> CommandStatus;

    /// Issue `RST <addr>` and return the board's status code
    async fn reset_mux(&mut self, address: BusAddress) -> CommandStatus;

    /// Issue `SCN` and return the discovered addresses
    ///
    /// `None` on timeout or an unparseable response; a partial list is never
    /// returned.
    async fn scan_bus(&mut self) -> Option<Vec<BusAddress>>;

    /// Issue `TST` to distinguish a slow board from a dead link
    async fn test_connection(&mut self) -> bool;
}

/// Request/response transport over any async byte stream
///
/// Owns the write half and a background reader task that drains the read
/// half into a bounded line queue.
pub struct LineTransport<T> {
    writer: WriteHalf<T>,
    response_rx: mpsc::Receiver<String>,
    shutdown_tx: mpsc::Sender<()>,
    reader: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
    command_timeout: Duration,
    scan_timeout: Duration,
}

impl<T> LineTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Split the stream and spawn the background reader
    pub fn spawn(io: T) -> Self {
        Self::spawn_with_flag(io, Arc::new(AtomicBool::new(false)))
    }

    /// Like [`Self::spawn`], sharing an externally owned connectivity flag
    ///
    /// The flag is set true here and flipped false by the reader on I/O
    /// failure or EOF.
    pub fn spawn_with_flag(io: T, connected: Arc<AtomicBool>) -> Self {
        connected.store(true, Ordering::SeqCst);

        let (read_half, writer) = tokio::io::split(io);
        let (line_tx, response_rx) = mpsc::channel(RESPONSE_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let reader = tokio::spawn(read_loop(
            read_half,
            line_tx,
            shutdown_rx,
            Arc::clone(&connected),
        ));

        Self {
            writer,
            response_rx,
            shutdown_tx,
            reader: Some(reader),
            connected,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }

    /// Override the default command and scan timeouts
    pub fn set_timeouts(&mut self, command: Duration, scan: Duration) {
        self.command_timeout = command;
        self.scan_timeout = scan;
    }

    /// Whether the reader is still healthy
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Send one command line and wait for exactly one response line
    ///
    /// Stale queued responses are discarded before the write: a late reply
    /// to an already-timed-out exchange must never be taken as the answer to
    /// this one. A timeout here does not flip connectivity; only the reader
    /// observing an I/O failure does.
    pub async fn send_command(
        &mut self,
        command: &BusCommand,
        timeout: Duration,
    ) -> Result<String, LinkError> {
        while let Ok(stale) = self.response_rx.try_recv() {
            debug!(%stale, "discarding stale response");
        }

        self.writer.write_all(&command.encode()).await?;
        self.writer.flush().await?;
        debug!(cmd = command.mnemonic(), "command sent");

        match tokio::time::timeout(timeout, self.response_rx.recv()).await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(LinkError::Closed),
            Err(_) => {
                warn!(cmd = command.mnemonic(), ?timeout, "no response within timeout");
                Err(LinkError::Timeout(timeout))
            }
        }
    }

    /// Issue a SET command and parse the status reply
    pub async fn set_channel(&mut self, address: BusAddress, channel: u8) -> CommandStatus {
        let cmd = BusCommand::SetChannel { address, channel };
        match self.send_command(&cmd, self.command_timeout).await {
            Ok(line) => CommandStatus::parse(&line),
            Err(e) => {
                warn!(address, channel, error = %e, "SET failed");
                CommandStatus::Unknown
            }
        }
    }

    /// Issue an RST command and parse the status reply
    pub async fn reset_mux(&mut self, address: BusAddress) -> CommandStatus {
        let cmd = BusCommand::ResetMux { address };
        match self.send_command(&cmd, self.command_timeout).await {
            Ok(line) => CommandStatus::parse(&line),
            Err(e) => {
                warn!(address, error = %e, "RST failed");
                CommandStatus::Unknown
            }
        }
    }

    /// Issue a bus scan with the extended timeout
    pub async fn scan_bus(&mut self) -> Option<Vec<BusAddress>> {
        let line = match self.send_command(&BusCommand::ScanBus, self.scan_timeout).await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "SCN failed");
                return None;
            }
        };

        match parse_scan_response(&line) {
            Ok(addresses) => {
                info!(count = addresses.len(), "bus scan complete");
                Some(addresses)
            }
            Err(e) => {
                warn!(%line, error = %e, "unparseable scan response");
                None
            }
        }
    }

    /// Issue a liveness probe
    pub async fn test_connection(&mut self) -> bool {
        match self.send_command(&BusCommand::Probe, self.command_timeout).await {
            Ok(line) => is_probe_ack(&line),
            Err(_) => false,
        }
    }

    /// Signal the reader to stop and join it with a bounded wait
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.reader.take() {
            if tokio::time::timeout(READER_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("reader did not exit within join timeout");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Background reader: drain the stream into the line queue
///
/// This is the only place disconnection is detected automatically. Read
/// errors and EOF flip the connectivity flag and end the task.
async fn read_loop<R>(
    mut reader: ReadHalf<R>,
    line_tx: mpsc::Sender<String>,
    mut shutdown_rx: mpsc::Receiver<()>,
    connected: Arc<AtomicBool>,
) where
    R: AsyncRead + Send,
{
    let mut codec = LineCodec::new();
    let mut buf = vec![0u8; 256];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("reader shutdown requested");
                break;
            }

            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    info!("link closed by peer");
                    connected.store(false, Ordering::SeqCst);
                    break;
                }
                Ok(n) => {
                    codec.push_bytes(&buf[..n]);
                    while let Some(line) = codec.next_line() {
                        debug!(%line, "received line");
                        if line_tx.send(line).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "read error, link assumed lost");
                    connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    debug!("reader exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn request_response_round_trip() {
        let (ours, mut theirs) = tokio::io::duplex(256);
        let mut transport = LineTransport::spawn(ours);

        let board = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = theirs.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"SET 32 5\n");
            theirs.write_all(b"0\n").await.unwrap();
            theirs
        });

        let status = transport.set_channel(32, 5).await;
        assert_eq!(status, CommandStatus::Success);

        board.await.unwrap();
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn timeout_is_reported_and_does_not_flip_connectivity() {
        let (ours, _theirs) = tokio::io::duplex(256);
        let mut transport = LineTransport::spawn(ours);

        let result = transport
            .send_command(&BusCommand::Probe, Duration::from_millis(50))
            .await;

        assert!(matches!(result, Err(LinkError::Timeout(_))));
        assert!(transport.is_connected());

        transport.shutdown().await;
    }

    #[tokio::test]
    async fn stale_response_is_discarded_not_the_next_exchange() {
        let (ours, mut theirs) = tokio::io::duplex(256);
        let mut transport = LineTransport::spawn(ours);

        // Exchange 1 times out; its answer arrives late.
        let result = transport
            .send_command(
                &BusCommand::SetChannel {
                    address: 32,
                    channel: 1,
                },
                Duration::from_millis(50),
            )
            .await;
        assert!(matches!(result, Err(LinkError::Timeout(_))));

        theirs.write_all(b"1\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Exchange 2 must see its own answer, not the late "1".
        let board = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let _ = theirs.read(&mut buf).await.unwrap();
            theirs.write_all(b"0\n").await.unwrap();
            theirs
        });

        let status = transport.set_channel(32, 2).await;
        assert_eq!(status, CommandStatus::Success);

        board.await.unwrap();
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn eof_flips_connectivity() {
        let (ours, theirs) = tokio::io::duplex(256);
        let mut transport = LineTransport::spawn(ours);
        assert!(transport.is_connected());

        drop(theirs);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!transport.is_connected());
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn scan_parse_failure_yields_none() {
        let (ours, mut theirs) = tokio::io::duplex(256);
        let mut transport = LineTransport::spawn(ours);

        let board = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let _ = theirs.read(&mut buf).await.unwrap();
            theirs.write_all(b"32 oops 34\n").await.unwrap();
            theirs
        });

        assert_eq!(transport.scan_bus().await, None);

        board.await.unwrap();
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn empty_scan_line_is_empty_bus() {
        let (ours, mut theirs) = tokio::io::duplex(256);
        let mut transport = LineTransport::spawn(ours);

        let board = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let _ = theirs.read(&mut buf).await.unwrap();
            // Firmware sends a blank line then the prompt-free empty list
            theirs.write_all(b" \n").await.unwrap();
            theirs
        });

        assert_eq!(transport.scan_bus().await, Some(vec![]));

        board.await.unwrap();
        transport.shutdown().await;
    }
}
