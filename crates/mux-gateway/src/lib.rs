//! MUX Gateway Engine
//!
//! This crate keeps two independently-mutating views of a MUX installation
//! consistent: the physical device registry (what the serial bus reports)
//! and a remotely exposed attribute mirror (what subscribed clients see and
//! write to).
//!
//! # Architecture
//!
//! - [`MuxRegistry`] is the authoritative, mutex-guarded device table. Every
//!   hardware-facing operation serializes on its single lock, which is also
//!   what guarantees the transport's one-exchange-in-flight contract.
//! - [`Reconciler`] builds and maintains the remote mirror: it creates one
//!   [`MirrorEntry`] per device, routes remote trigger writes into registry
//!   commands, and runs a reconnection monitor that repairs the link and
//!   re-populates the mirror after an outage.
//! - The remote-attribute protocol itself is an external collaborator,
//!   abstracted behind the [`AttributeServer`] trait; remote activity
//!   arrives as a stream of [`RemoteEvent`]s.
//!
//! The mirror only grows at runtime. Live subscriptions cannot be detached
//! safely, so entries for vanished devices persist with their last known
//! state until the process restarts; see [`MirrorSet`].

pub mod attrs;
pub mod config;
pub mod error;
pub mod events;
pub mod mirror;
pub mod reconciler;
pub mod registry;

pub use attrs::{AttrId, AttrValue, AttributeServer, RemoteEvent};
pub use config::{AttributeNames, GatewayConfig};
pub use error::{AttrError, ConfigError};
pub use events::GatewayEvent;
pub use mirror::{MirrorEntry, MirrorSet};
pub use reconciler::Reconciler;
pub use registry::{DeviceStatus, MuxDevice, MuxRegistry};
