//! ovsmon - Open vSwitch metrics polling cache and exporter library.
//!
//! The library decouples the scrape rate from the backend poll rate:
//! - [`client`] talks to the vswitch control plane (database JSON-RPC,
//!   appctl control sockets, pidfiles, log files),
//! - [`collector`] runs rate-limited collection passes with per-probe
//!   failure isolation and publishes atomically-swapped snapshots,
//! - [`metrics`] declares the record model and the descriptor catalogue,
//! - [`emit`] renders snapshots as exposition text for the `ovsmond`
//!   HTTP daemon.

pub mod client;
pub mod collector;
pub mod config;
pub mod emit;
pub mod metrics;

/// Crate version, surfaced by the daemon CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
