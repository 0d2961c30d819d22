//! Mock backend client with canned scenarios for testing.
//!
//! `MockClient::typical_system()` answers every probe with a small, fully
//! populated installation; the `fail_*` switches turn individual probes into
//! failures so tests can exercise the pipeline's failure isolation without a
//! live daemon.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{Daemon, Service};

use super::{
    Bridge, ClientError, CoverageMetrics, Datapath, DatapathTopology, DpPort, InterfaceRec,
    LogEventStats, LogFileInfo, OvsClient, ProcessInfo, SystemInfo,
};

#[derive(Debug, Clone, Default)]
pub struct MockClient {
    pub system: SystemInfo,
    pub commands: BTreeSet<String>,
    pub coverage: CoverageMetrics,
    pub memory: BTreeMap<String, f64>,
    pub topology: DatapathTopology,
    pub interfaces: Vec<InterfaceRec>,
    pub default_port_up: bool,
    pub ssl_port_up: bool,

    pub fail_system: bool,
    pub fail_process: bool,
    pub fail_logs: bool,
    pub fail_admin: bool,
    pub fail_coverage: bool,
    pub fail_memory: bool,
    pub fail_datapath: bool,
    pub fail_interfaces: bool,
    pub fail_ports: bool,
}

fn injected() -> ClientError {
    ClientError::Rpc("injected failure".to_string())
}

impl MockClient {
    /// A small but fully populated installation: three running daemons, one
    /// datapath with one bridge and two ports, two configured interfaces.
    pub fn typical_system() -> Self {
        let mut commands = BTreeSet::new();
        for cmd in ["list-commands", "coverage/show", "memory/show", "dpif/show"] {
            commands.insert(cmd.to_string());
        }

        let mut coverage = CoverageMetrics::new();
        let mut netlink = BTreeMap::new();
        netlink.insert("5s".to_string(), 27.1);
        netlink.insert("1m".to_string(), 26.967);
        netlink.insert("1h".to_string(), 26.9656);
        netlink.insert("total".to_string(), 137909.0);
        coverage.insert("netlink_received".to_string(), netlink);

        let mut memory = BTreeMap::new();
        memory.insert("cells".to_string(), 432.0);
        memory.insert("monitors".to_string(), 2.0);

        let topology = DatapathTopology {
            datapaths: vec![Datapath {
                name: "system@ovs-system".to_string(),
                lookups_hit: 985483.0,
                lookups_missed: 477.0,
                lookups_lost: 3.0,
                flows: 5.0,
                masks_hit: 2005648.0,
                masks_total: 2.0,
                masks_hit_ratio: 1.04,
            }],
            bridges: vec![Bridge {
                name: "br-int".to_string(),
                datapath_name: "system@ovs-system".to_string(),
            }],
            ports: vec![
                DpPort {
                    name: "br-int".to_string(),
                    datapath_name: "system@ovs-system".to_string(),
                    bridge_name: "br-int".to_string(),
                    ofport: 65534.0,
                    index: 2.0,
                    port_type: "internal".to_string(),
                },
                DpPort {
                    name: "veth0".to_string(),
                    datapath_name: "system@ovs-system".to_string(),
                    bridge_name: "br-int".to_string(),
                    ofport: 1.0,
                    index: 5.0,
                    port_type: "system".to_string(),
                },
            ],
        };

        let mut eth0 = InterfaceRec {
            uuid: "aa11".to_string(),
            name: "eth0".to_string(),
            bridge_name: "br-int".to_string(),
            admin_state: "up".to_string(),
            link_state: "up".to_string(),
            ingress_policing_burst: 8000.0,
            ingress_policing_rate: 0.0,
            mac_in_use: "02:00:00:00:00:01".to_string(),
            mtu: 1500.0,
            duplex: "full".to_string(),
            ofport: 1.0,
            if_index: 14.0,
            local_index: 0.0,
            link_resets: 2.0,
            link_speed: 10_000_000_000.0,
            ..InterfaceRec::default()
        };
        eth0.statistics.insert("rx_bytes".to_string(), 12345);
        eth0.statistics.insert("rx_packets".to_string(), 10);
        eth0.statistics.insert("tx_bytes".to_string(), 67890);
        eth0.status.insert("driver_name".to_string(), "veth".to_string());
        eth0.options.insert("peer".to_string(), "eth1".to_string());
        eth0.external_ids
            .insert("iface-id".to_string(), "vm-port-1".to_string());

        let veth1 = InterfaceRec {
            uuid: "bb22".to_string(),
            name: "veth1".to_string(),
            bridge_name: "br-int".to_string(),
            admin_state: "down".to_string(),
            link_state: "flapping".to_string(),
            mtu: 9000.0,
            ofport: 2.0,
            if_index: 15.0,
            ..InterfaceRec::default()
        };

        Self {
            system: SystemInfo {
                system_id: "4a32-ffff".to_string(),
                run_dir: "/var/run/openvswitch".to_string(),
                hostname: "node1".to_string(),
                system_type: "ubuntu".to_string(),
                system_version: "22.04".to_string(),
                db_version: "3.1.0".to_string(),
                schema_version: "8.3.0".to_string(),
            },
            commands,
            coverage,
            memory,
            topology,
            interfaces: vec![eth0, veth1],
            default_port_up: true,
            ssl_port_up: false,
            ..Self::default()
        }
    }

    /// An installation whose backend cannot be reached at all.
    pub fn unreachable() -> Self {
        Self {
            fail_system: true,
            fail_process: true,
            fail_logs: true,
            fail_admin: true,
            fail_interfaces: true,
            fail_ports: true,
            ..Self::default()
        }
    }

    pub fn with_failed_system(mut self) -> Self {
        self.fail_system = true;
        self
    }

    pub fn with_failed_processes(mut self) -> Self {
        self.fail_process = true;
        self
    }

    pub fn with_failed_logs(mut self) -> Self {
        self.fail_logs = true;
        self
    }

    pub fn with_failed_interfaces(mut self) -> Self {
        self.fail_interfaces = true;
        self
    }
}

impl OvsClient for MockClient {
    fn system_info(&self) -> Result<SystemInfo, ClientError> {
        if self.fail_system {
            return Err(injected());
        }
        Ok(self.system.clone())
    }

    fn process_info(&self, daemon: Daemon) -> Result<ProcessInfo, ClientError> {
        if self.fail_process {
            return Err(injected());
        }
        let base = Daemon::ALL.iter().position(|d| *d == daemon).unwrap_or(0) as i64;
        Ok(ProcessInfo {
            id: 100 + base,
            user: "openvswitch".to_string(),
            group: "openvswitch".to_string(),
        })
    }

    fn log_file_info(&self, daemon: Daemon) -> Result<LogFileInfo, ClientError> {
        if self.fail_logs {
            return Err(injected());
        }
        Ok(LogFileInfo {
            component: daemon.name().to_string(),
            path: format!("/var/log/openvswitch/{}.log", daemon.name()),
            size: 2048,
        })
    }

    fn log_event_stats(&self, _daemon: Daemon) -> Result<LogEventStats, ClientError> {
        if self.fail_logs {
            return Err(injected());
        }
        let mut stats = LogEventStats::new();
        let mut info = BTreeMap::new();
        info.insert("reconnect".to_string(), 2u64);
        stats.insert("info".to_string(), info);
        let mut warn = BTreeMap::new();
        warn.insert("bridge".to_string(), 1u64);
        stats.insert("warn".to_string(), warn);
        Ok(stats)
    }

    fn list_admin_commands(&self, _service: Service) -> Result<BTreeSet<String>, ClientError> {
        if self.fail_admin {
            return Err(injected());
        }
        Ok(self.commands.clone())
    }

    fn coverage_metrics(&self, _service: Service) -> Result<CoverageMetrics, ClientError> {
        if self.fail_coverage {
            return Err(injected());
        }
        Ok(self.coverage.clone())
    }

    fn memory_metrics(&self, _service: Service) -> Result<BTreeMap<String, f64>, ClientError> {
        if self.fail_memory {
            return Err(injected());
        }
        Ok(self.memory.clone())
    }

    fn datapath_topology(&self, _service: Service) -> Result<DatapathTopology, ClientError> {
        if self.fail_datapath {
            return Err(injected());
        }
        Ok(self.topology.clone())
    }

    fn interfaces(&self) -> Result<Vec<InterfaceRec>, ClientError> {
        if self.fail_interfaces {
            return Err(injected());
        }
        Ok(self.interfaces.clone())
    }

    fn is_default_port_up(&self, _service: Service) -> Result<bool, ClientError> {
        if self.fail_ports {
            return Err(injected());
        }
        Ok(self.default_port_up)
    }

    fn is_ssl_port_up(&self, _service: Service) -> Result<bool, ClientError> {
        if self.fail_ports {
            return Err(injected());
        }
        Ok(self.ssl_port_up)
    }
}
