//! Transport integration tests against the simulated firmware
//!
//! These drive [`LineTransport`] over an in-memory duplex stream with a
//! [`SimBus`] on the far end, exercising the same request/response path the
//! serial port uses.

use std::time::Duration;

use mux_link::LineTransport;
use mux_protocol::CommandStatus;
use mux_sim::{run_sim_bus, FailureMode, SimBus};

fn sim_transport(bus: SimBus) -> LineTransport<tokio::io::DuplexStream> {
    let (ours, theirs) = tokio::io::duplex(1024);
    tokio::spawn(run_sim_bus(bus, theirs));
    LineTransport::spawn(ours)
}

#[tokio::test]
async fn full_command_cycle_against_sim() {
    let mut transport = sim_transport(SimBus::new([32, 33]));

    assert!(transport.test_connection().await);
    assert_eq!(transport.scan_bus().await, Some(vec![32, 33]));
    assert_eq!(transport.set_channel(32, 5).await, CommandStatus::Success);
    assert_eq!(transport.set_channel(99, 1).await, CommandStatus::AddrError);
    assert_eq!(transport.reset_mux(32).await, CommandStatus::Success);

    transport.shutdown().await;
}

#[tokio::test]
async fn com_error_is_surfaced() {
    let mut bus = SimBus::new([32]);
    bus.set_failure_mode(FailureMode::ComError);
    let mut transport = sim_transport(bus);

    assert_eq!(transport.set_channel(32, 2).await, CommandStatus::ComError);

    transport.shutdown().await;
}

#[tokio::test]
async fn muted_bus_times_out() {
    let mut bus = SimBus::new([32]);
    bus.set_failure_mode(FailureMode::Mute);
    let mut transport = sim_transport(bus);
    transport.set_timeouts(Duration::from_millis(50), Duration::from_millis(50));

    // No response at all maps to UNKNOWN, and the link is still considered up
    assert_eq!(transport.set_channel(32, 1).await, CommandStatus::Unknown);
    assert!(transport.is_connected());

    transport.shutdown().await;
}

#[tokio::test]
async fn garbage_scan_is_rejected_whole() {
    let mut bus = SimBus::new([32, 34]);
    bus.set_failure_mode(FailureMode::GarbageScan);
    let mut transport = sim_transport(bus);

    assert_eq!(transport.scan_bus().await, None);

    transport.shutdown().await;
}

#[tokio::test]
async fn empty_bus_scans_empty() {
    let mut transport = sim_transport(SimBus::new([]));

    assert_eq!(transport.scan_bus().await, Some(vec![]));

    transport.shutdown().await;
}
