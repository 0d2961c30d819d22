//! Backend client for the vswitch control plane.
//!
//! The collection pipeline only talks to the [`OvsClient`] trait; the
//! concrete [`OvsdbClient`] implements it against a live installation
//! through four channels:
//! - OVSDB JSON-RPC over the database unix socket ([`ovsdb`]),
//! - the appctl control protocol of each daemon ([`appctl`]),
//! - pidfiles and `/proc` for process state ([`proc`]),
//! - daemon log files ([`logs`]).
//!
//! All calls are synchronous and bounded by the configured per-call timeout.
//! [`mock::MockClient`] provides canned scenarios for tests.

mod appctl;
mod logs;
pub mod mock;
mod ovsdb;
mod proc;

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};

use thiserror::Error;

use crate::config::{Config, Daemon, Service};

/// Failure modes of backend calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} is not running")]
    NotRunning(String),
}

/// Global identity of the vswitch stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemInfo {
    pub system_id: String,
    pub run_dir: String,
    pub hostname: String,
    pub system_type: String,
    pub system_version: String,
    /// Version of the database engine.
    pub db_version: String,
    /// Version of the database schema.
    pub schema_version: String,
}

/// Process state of one managed daemon.
#[derive(Debug, Clone, Default)]
pub struct ProcessInfo {
    pub id: i64,
    pub user: String,
    pub group: String,
}

/// Size and location of a daemon's log file.
#[derive(Debug, Clone)]
pub struct LogFileInfo {
    pub component: String,
    pub path: String,
    pub size: u64,
}

/// Log event counts grouped by severity, then source module.
pub type LogEventStats = BTreeMap<String, BTreeMap<String, u64>>;

/// Per-event coverage values grouped by period. Period `"total"` is the
/// lifetime counter; the others are rate windows.
pub type CoverageMetrics = BTreeMap<String, BTreeMap<String, f64>>;

/// One datapath with its lookup, flow and mask counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datapath {
    pub name: String,
    pub lookups_hit: f64,
    pub lookups_missed: f64,
    pub lookups_lost: f64,
    pub flows: f64,
    pub masks_hit: f64,
    pub masks_total: f64,
    pub masks_hit_ratio: f64,
}

/// A bridge attached to a datapath.
#[derive(Debug, Clone, PartialEq)]
pub struct Bridge {
    pub name: String,
    pub datapath_name: String,
}

/// A port of a bridge as seen by the forwarding plane.
#[derive(Debug, Clone, PartialEq)]
pub struct DpPort {
    pub name: String,
    pub datapath_name: String,
    pub bridge_name: String,
    pub ofport: f64,
    pub index: f64,
    pub port_type: String,
}

/// Datapaths, bridges and ports as reported by the forwarding plane.
#[derive(Debug, Clone, Default)]
pub struct DatapathTopology {
    pub datapaths: Vec<Datapath>,
    pub bridges: Vec<Bridge>,
    pub ports: Vec<DpPort>,
}

/// One row of the Interface table.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRec {
    pub uuid: String,
    pub name: String,
    /// Name of the owning bridge, resolved through the Port table.
    pub bridge_name: String,
    pub admin_state: String,
    pub link_state: String,
    pub ingress_policing_burst: f64,
    pub ingress_policing_rate: f64,
    pub mac_in_use: String,
    pub mtu: f64,
    pub duplex: String,
    pub ofport: f64,
    pub if_index: f64,
    pub local_index: f64,
    pub link_resets: f64,
    pub link_speed: f64,
    pub statistics: BTreeMap<String, i64>,
    pub status: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub external_ids: BTreeMap<String, String>,
}

/// Synchronous contract between the collection pipeline and the backend.
///
/// Every method opens its own connection and honors the configured per-call
/// timeout, so a single hung daemon bounds one probe rather than the
/// process.
pub trait OvsClient: Send + Sync {
    fn system_info(&self) -> Result<SystemInfo, ClientError>;
    fn process_info(&self, daemon: Daemon) -> Result<ProcessInfo, ClientError>;
    fn log_file_info(&self, daemon: Daemon) -> Result<LogFileInfo, ClientError>;
    fn log_event_stats(&self, daemon: Daemon) -> Result<LogEventStats, ClientError>;
    fn list_admin_commands(&self, service: Service) -> Result<BTreeSet<String>, ClientError>;
    fn coverage_metrics(&self, service: Service) -> Result<CoverageMetrics, ClientError>;
    fn memory_metrics(&self, service: Service) -> Result<BTreeMap<String, f64>, ClientError>;
    fn datapath_topology(&self, service: Service) -> Result<DatapathTopology, ClientError>;
    fn interfaces(&self) -> Result<Vec<InterfaceRec>, ClientError>;
    fn is_default_port_up(&self, service: Service) -> Result<bool, ClientError>;
    fn is_ssl_port_up(&self, service: Service) -> Result<bool, ClientError>;
}

/// Client against a live vswitch installation.
pub struct OvsdbClient {
    config: Config,
}

impl OvsdbClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Probes TCP reachability of a database listener port.
    ///
    /// A refused connection means the port is down, not an error; anything
    /// else (timeout, unreachable network) is reported to the caller.
    fn probe_port(&self, port: u16) -> Result<bool, ClientError> {
        let addr = (self.config.db_host.as_str(), port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                ClientError::Parse(format!("{} resolves to no address", self.config.db_host))
            })?;
        match TcpStream::connect_timeout(&addr, self.config.timeout) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => Ok(false),
            Err(e) => Err(ClientError::Io(e)),
        }
    }
}

impl OvsClient for OvsdbClient {
    fn system_info(&self) -> Result<SystemInfo, ClientError> {
        ovsdb::system_info(&self.config)
    }

    fn process_info(&self, daemon: Daemon) -> Result<ProcessInfo, ClientError> {
        proc::process_info(&self.config, daemon)
    }

    fn log_file_info(&self, daemon: Daemon) -> Result<LogFileInfo, ClientError> {
        logs::log_file_info(&self.config, daemon)
    }

    fn log_event_stats(&self, daemon: Daemon) -> Result<LogEventStats, ClientError> {
        logs::log_event_stats(&self.config, daemon)
    }

    fn list_admin_commands(&self, service: Service) -> Result<BTreeSet<String>, ClientError> {
        let output = appctl::call(&self.config, service.daemon(), "list-commands")?;
        Ok(appctl::parse_list_commands(&output))
    }

    fn coverage_metrics(&self, service: Service) -> Result<CoverageMetrics, ClientError> {
        let output = appctl::call(&self.config, service.daemon(), "coverage/show")?;
        Ok(appctl::parse_coverage(&output))
    }

    fn memory_metrics(&self, service: Service) -> Result<BTreeMap<String, f64>, ClientError> {
        let output = appctl::call(&self.config, service.daemon(), "memory/show")?;
        Ok(appctl::parse_memory(&output))
    }

    fn datapath_topology(&self, service: Service) -> Result<DatapathTopology, ClientError> {
        let output = appctl::call(&self.config, service.daemon(), "dpif/show")?;
        appctl::parse_dpif_show(&output)
    }

    fn interfaces(&self) -> Result<Vec<InterfaceRec>, ClientError> {
        ovsdb::interfaces(&self.config)
    }

    fn is_default_port_up(&self, _service: Service) -> Result<bool, ClientError> {
        self.probe_port(self.config.db_port)
    }

    fn is_ssl_port_up(&self, _service: Service) -> Result<bool, ClientError> {
        self.probe_port(self.config.db_ssl_port)
    }
}
