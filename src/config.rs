//! Exporter configuration: poll cadence, backend paths and probe gating.
//!
//! Defaults match a stock Open vSwitch installation. The `ovsmond` binary
//! populates this from CLI flags; the library never reads the environment.

use std::path::PathBuf;
use std::time::Duration;

/// A managed daemon probed for process state and log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Daemon {
    OvsdbServer,
    Vswitchd,
    OvnController,
}

impl Daemon {
    /// The fixed set of managed daemons, in probe order.
    pub const ALL: [Daemon; 3] = [Daemon::OvsdbServer, Daemon::Vswitchd, Daemon::OvnController];

    pub fn name(&self) -> &'static str {
        match self {
            Daemon::OvsdbServer => "ovsdb-server",
            Daemon::Vswitchd => "ovs-vswitchd",
            Daemon::OvnController => "ovn-controller",
        }
    }
}

/// A managed service probed through the administrative control socket.
///
/// Service names differ from daemon names for historical reasons; the
/// control socket itself belongs to the underlying daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    OvsdbServer,
    Vswitchd,
    OvnController,
}

impl Service {
    /// The fixed set of managed services, in probe order.
    pub const ALL: [Service; 3] = [
        Service::OvsdbServer,
        Service::Vswitchd,
        Service::OvnController,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Service::OvsdbServer => "ovsdb-server",
            Service::Vswitchd => "vswitchd-service",
            Service::OvnController => "ovncontroller-service",
        }
    }

    /// The daemon that owns this service's control socket.
    pub fn daemon(&self) -> Daemon {
        match self {
            Service::OvsdbServer => Daemon::OvsdbServer,
            Service::Vswitchd => Daemon::Vswitchd,
            Service::OvnController => Daemon::OvnController,
        }
    }
}

/// Exporter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum interval between two collection passes, in seconds.
    pub poll_interval_secs: i64,
    /// Timeout applied to every backend call (socket connect/read/write).
    pub timeout: Duration,
    /// Gate for the process, log and administrative probes. The liveness
    /// record is emitted either way.
    pub collect_process_metrics: bool,

    /// Run directory of the vswitch daemons (pidfiles, control sockets).
    pub run_dir: PathBuf,
    /// Run directory of the OVN controller daemon.
    pub ovn_run_dir: PathBuf,
    /// Unix socket of the database server.
    pub db_socket: PathBuf,
    /// Name of the vswitch database.
    pub db_name: String,
    /// File holding the persistent system id.
    pub system_id_file: PathBuf,
    /// Base path of the proc filesystem. Overridable for tests.
    pub proc_dir: PathBuf,

    /// Per-daemon log file paths, indexed like [`Daemon::ALL`].
    pub log_files: [PathBuf; 3],
    /// Per-daemon pid file paths, indexed like [`Daemon::ALL`].
    pub pid_files: [PathBuf; 3],

    /// Host probed for database port reachability.
    pub db_host: String,
    /// Plain-text database listener port.
    pub db_port: u16,
    /// TLS database listener port.
    pub db_ssl_port: u16,
}

impl Config {
    pub fn log_file(&self, daemon: Daemon) -> &PathBuf {
        &self.log_files[Self::daemon_index(daemon)]
    }

    pub fn pid_file(&self, daemon: Daemon) -> &PathBuf {
        &self.pid_files[Self::daemon_index(daemon)]
    }

    /// Run directory holding the daemon's control socket.
    pub fn daemon_run_dir(&self, daemon: Daemon) -> &PathBuf {
        match daemon {
            Daemon::OvnController => &self.ovn_run_dir,
            _ => &self.run_dir,
        }
    }

    fn daemon_index(daemon: Daemon) -> usize {
        match daemon {
            Daemon::OvsdbServer => 0,
            Daemon::Vswitchd => 1,
            Daemon::OvnController => 2,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            timeout: Duration::from_secs(2),
            collect_process_metrics: true,
            run_dir: PathBuf::from("/var/run/openvswitch"),
            ovn_run_dir: PathBuf::from("/var/run/ovn"),
            db_socket: PathBuf::from("/var/run/openvswitch/db.sock"),
            db_name: "Open_vSwitch".to_string(),
            system_id_file: PathBuf::from("/etc/openvswitch/system-id.conf"),
            proc_dir: PathBuf::from("/proc"),
            log_files: [
                PathBuf::from("/var/log/openvswitch/ovsdb-server.log"),
                PathBuf::from("/var/log/openvswitch/ovs-vswitchd.log"),
                PathBuf::from("/var/log/ovn/ovn-controller.log"),
            ],
            pid_files: [
                PathBuf::from("/var/run/openvswitch/ovsdb-server.pid"),
                PathBuf::from("/var/run/openvswitch/ovs-vswitchd.pid"),
                PathBuf::from("/var/run/ovn/ovn-controller.pid"),
            ],
            db_host: "127.0.0.1".to_string(),
            db_port: 6640,
            db_ssl_port: 6632,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_paths() {
        let config = Config::default();
        assert!(
            config
                .log_file(Daemon::Vswitchd)
                .ends_with("ovs-vswitchd.log")
        );
        assert!(
            config
                .pid_file(Daemon::OvnController)
                .starts_with("/var/run/ovn")
        );
        assert_eq!(
            config.daemon_run_dir(Daemon::OvnController),
            &PathBuf::from("/var/run/ovn")
        );
        assert_eq!(
            config.daemon_run_dir(Daemon::OvsdbServer),
            &PathBuf::from("/var/run/openvswitch")
        );
    }

    #[test]
    fn test_service_daemon_mapping() {
        assert_eq!(Service::Vswitchd.daemon().name(), "ovs-vswitchd");
        assert_eq!(Service::OvnController.daemon().name(), "ovn-controller");
        assert_eq!(Service::OvsdbServer.name(), "ovsdb-server");
        assert_eq!(Service::Vswitchd.name(), "vswitchd-service");
    }
}
