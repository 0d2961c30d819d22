//! One collection pass: the probe set, per-probe failure isolation and the
//! mapping from backend domain data to metric records.
//!
//! Every probe failure is caught at the probe boundary: it is logged,
//! counted, and the pass carries on. Only the system-info and per-process
//! probes are required; their failure turns the liveness record off. The
//! optional probes merely shrink the record set.

use tracing::{debug, error, warn};

use crate::client::{DatapathTopology, OvsClient, ProcessInfo};
use crate::config::{Daemon, Service};
use crate::metrics::{MetricRecord, catalog};

use super::Exporter;

/// Administrative state and observed link state share one value scheme.
fn link_state_value(state: &str) -> f64 {
    match state {
        "down" => 0.0,
        "up" => 1.0,
        _ => 2.0,
    }
}

fn duplex_value(duplex: &str) -> f64 {
    match duplex {
        "half" => 1.0,
        "full" => 2.0,
        _ => 0.0,
    }
}

impl<C: OvsClient> Exporter<C> {
    pub(super) fn run_pass(&self, now: i64) -> Vec<MetricRecord> {
        let mut records = Vec::new();
        let mut up = true;

        let system = match self.client.system_info() {
            Ok(info) => {
                *self.identity.write().unwrap() = info.clone();
                info
            }
            Err(e) => {
                warn!(error = %e, "system info probe failed");
                self.bump_errors();
                up = false;
                self.identity.read().unwrap().clone()
            }
        };
        let sid = system.system_id.as_str();

        if self.collect_process_metrics {
            self.collect_processes(sid, &mut records, &mut up);
            self.collect_logs(sid, &mut records);
            self.collect_admin(sid, &mut records);
        } else {
            debug!("process, log and administrative probes disabled");
        }

        self.collect_interfaces(sid, &mut records);
        self.collect_ports(sid, &mut records);

        records.push(catalog::UP.record(&[], if up { 1.0 } else { 0.0 }));
        records.push(catalog::INFO.record(
            &[
                sid,
                &system.run_dir,
                &system.hostname,
                &system.system_type,
                &system.system_version,
                &system.db_version,
                &system.schema_version,
            ],
            1.0,
        ));
        records.push(catalog::REQUEST_ERRORS.record(&[sid], self.error_count() as f64));
        records.push(catalog::NEXT_POLL.record(&[sid], (now + self.interval_secs) as f64));

        records
    }

    fn collect_processes(&self, sid: &str, records: &mut Vec<MetricRecord>, up: &mut bool) {
        for daemon in Daemon::ALL {
            let info = match self.client.process_info(daemon) {
                Ok(info) => info,
                Err(e) => {
                    error!(component = daemon.name(), error = %e, "process probe failed");
                    self.bump_errors();
                    *up = false;
                    // The record is still emitted, with id 0.
                    ProcessInfo::default()
                }
            };
            records.push(catalog::PID.record(
                &[sid, daemon.name(), &info.user, &info.group],
                info.id as f64,
            ));
        }
    }

    fn collect_logs(&self, sid: &str, records: &mut Vec<MetricRecord>) {
        for daemon in Daemon::ALL {
            let file = match self.client.log_file_info(daemon) {
                Ok(file) => file,
                Err(e) => {
                    error!(component = daemon.name(), error = %e, "log file probe failed");
                    self.bump_errors();
                    continue;
                }
            };
            records.push(catalog::LOG_FILE_SIZE.record(
                &[sid, &file.component, &file.path],
                file.size as f64,
            ));

            let stats = match self.client.log_event_stats(daemon) {
                Ok(stats) => stats,
                Err(e) => {
                    error!(component = daemon.name(), error = %e, "log event probe failed");
                    self.bump_errors();
                    continue;
                }
            };
            for (severity, sources) in &stats {
                for (source, count) in sources {
                    records.push(catalog::LOG_EVENT_COUNT.record(
                        &[sid, daemon.name(), severity, source],
                        *count as f64,
                    ));
                }
            }
        }
    }

    fn collect_admin(&self, sid: &str, records: &mut Vec<MetricRecord>) {
        for service in Service::ALL {
            let commands = match self.client.list_admin_commands(service) {
                Ok(commands) => commands,
                Err(e) => {
                    error!(service = service.name(), error = %e, "list-commands probe failed");
                    self.bump_errors();
                    continue;
                }
            };

            // An absent sub-command is feature detection, not a failure.
            if commands.contains("coverage/show") {
                match self.client.coverage_metrics(service) {
                    Ok(metrics) => {
                        for (event, periods) in &metrics {
                            for (period, value) in periods {
                                if period == "total" {
                                    records.push(catalog::COVERAGE_TOTAL.record(
                                        &[sid, service.name(), event],
                                        *value,
                                    ));
                                } else {
                                    records.push(catalog::COVERAGE_AVG.record(
                                        &[sid, service.name(), event, period],
                                        *value,
                                    ));
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!(service = service.name(), error = %e, "coverage probe failed");
                        self.bump_errors();
                    }
                }
            }

            if commands.contains("memory/show") && service != Service::OvnController {
                match self.client.memory_metrics(service) {
                    Ok(metrics) => {
                        for (facility, value) in &metrics {
                            records.push(catalog::MEMORY_USAGE.record(
                                &[sid, service.name(), facility],
                                *value,
                            ));
                        }
                    }
                    Err(e) => {
                        error!(service = service.name(), error = %e, "memory probe failed");
                        self.bump_errors();
                    }
                }
            }

            if commands.contains("dpif/show") && service == Service::Vswitchd {
                match self.client.datapath_topology(service) {
                    Ok(topology) => map_topology(sid, &topology, records),
                    Err(e) => {
                        error!(service = service.name(), error = %e, "datapath probe failed");
                        self.bump_errors();
                    }
                }
            }
        }
    }

    fn collect_interfaces(&self, sid: &str, records: &mut Vec<MetricRecord>) {
        let interfaces = match self.client.interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                error!(error = %e, "interface probe failed");
                self.bump_errors();
                return;
            }
        };

        for intf in &interfaces {
            let uuid = intf.uuid.as_str();
            let name = intf.name.as_str();

            records.push(catalog::INTERFACE.record(&[sid, uuid, name, &intf.bridge_name], 1.0));
            records.push(
                catalog::INTERFACE_ADMIN_STATE
                    .record(&[sid, uuid, name], link_state_value(&intf.admin_state)),
            );
            records.push(
                catalog::INTERFACE_LINK_STATE
                    .record(&[sid, uuid, name], link_state_value(&intf.link_state)),
            );
            records.push(
                catalog::INTERFACE_INGRESS_POLICING_BURST
                    .record(&[sid, uuid, name], intf.ingress_policing_burst),
            );
            records.push(
                catalog::INTERFACE_INGRESS_POLICING_RATE
                    .record(&[sid, uuid, name], intf.ingress_policing_rate),
            );
            records.push(
                catalog::INTERFACE_MAC_IN_USE.record(&[sid, uuid, &intf.mac_in_use, name], 1.0),
            );
            records.push(catalog::INTERFACE_MTU.record(&[sid, uuid, name], intf.mtu));
            records.push(
                catalog::INTERFACE_DUPLEX.record(&[sid, uuid, name], duplex_value(&intf.duplex)),
            );
            records.push(catalog::INTERFACE_OF_PORT.record(&[sid, uuid, name], intf.ofport));
            records.push(catalog::INTERFACE_IF_INDEX.record(&[sid, uuid, name], intf.if_index));
            records
                .push(catalog::INTERFACE_LOCAL_INDEX.record(&[sid, uuid, name], intf.local_index));

            for (key, value) in &intf.statistics {
                match catalog::interface_stat(key) {
                    Some(desc) => {
                        records.push(desc.record(&[sid, uuid, name], *value as f64));
                    }
                    None => {
                        debug!(key, value, interface = name, "unsupported statistics key");
                    }
                }
            }

            records
                .push(catalog::INTERFACE_LINK_RESETS.record(&[sid, uuid, name], intf.link_resets));
            records.push(catalog::INTERFACE_LINK_SPEED.record(&[sid, uuid, name], intf.link_speed));

            for (key, value) in &intf.status {
                records.push(catalog::INTERFACE_STATUS_KV.record(&[sid, uuid, key, value, name], 1.0));
            }
            for (key, value) in &intf.options {
                records
                    .push(catalog::INTERFACE_OPTIONS_KV.record(&[sid, uuid, key, value, name], 1.0));
            }
            for (key, value) in &intf.external_ids {
                records.push(
                    catalog::INTERFACE_EXTERNAL_IDS_KV.record(&[sid, uuid, key, value, name], 1.0),
                );
            }
        }
    }

    fn collect_ports(&self, sid: &str, records: &mut Vec<MetricRecord>) {
        for service in [Service::OvsdbServer] {
            let default_up = match self.client.is_default_port_up(service) {
                Ok(is_up) => is_up as i64 as f64,
                Err(e) => {
                    error!(service = service.name(), error = %e, "default port probe failed");
                    self.bump_errors();
                    0.0
                }
            };
            records.push(catalog::NETWORK_PORT.record(&[sid, service.name(), "default"], default_up));

            let ssl_up = match self.client.is_ssl_port_up(service) {
                Ok(is_up) => is_up as i64 as f64,
                Err(e) => {
                    error!(service = service.name(), error = %e, "ssl port probe failed");
                    self.bump_errors();
                    0.0
                }
            };
            records.push(catalog::NETWORK_PORT.record(&[sid, service.name(), "ssl"], ssl_up));
        }
    }
}

/// Maps forwarding-plane topology into datapath records: one presence record
/// per (datapath, bridge, port), an interface count per bridge, and the
/// lookup, flow and mask counters per datapath.
fn map_topology(sid: &str, topology: &DatapathTopology, records: &mut Vec<MetricRecord>) {
    for dp in &topology.datapaths {
        for bridge in &topology.bridges {
            if bridge.datapath_name != dp.name {
                continue;
            }
            let mut bridge_ports = 0;
            for port in &topology.ports {
                if port.datapath_name != dp.name || port.bridge_name != bridge.name {
                    continue;
                }
                bridge_ports += 1;
                let ofport = format!("{:.0}", port.ofport);
                let index = format!("{:.0}", port.index);
                records.push(catalog::DP_INTERFACE.record(
                    &[sid, &dp.name, &bridge.name, &port.name, &ofport, &index, &port.port_type],
                    1.0,
                ));
            }
            records.push(catalog::DP_BRIDGE_INTERFACE_TOTAL.record(
                &[sid, &dp.name, &bridge.name],
                bridge_ports as f64,
            ));
        }

        records.push(catalog::DP_LOOKUPS_HIT.record(&[sid, &dp.name], dp.lookups_hit));
        records.push(catalog::DP_LOOKUPS_MISSED.record(&[sid, &dp.name], dp.lookups_missed));
        records.push(catalog::DP_LOOKUPS_LOST.record(&[sid, &dp.name], dp.lookups_lost));
        records.push(catalog::DP_FLOWS_TOTAL.record(&[sid, &dp.name], dp.flows));
        records.push(catalog::DP_MASKS_HIT.record(&[sid, &dp.name], dp.masks_hit));
        records.push(catalog::DP_MASKS_TOTAL.record(&[sid, &dp.name], dp.masks_total));
        records.push(catalog::DP_MASKS_HIT_RATIO.record(&[sid, &dp.name], dp.masks_hit_ratio));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use crate::collector::Exporter;
    use crate::config::Config;
    use crate::metrics::MetricRecord;

    fn collect(client: MockClient) -> (Exporter<MockClient>, Vec<MetricRecord>) {
        let exporter = Exporter::new(client, &Config::default());
        let records = (*exporter.collect(0)).clone();
        (exporter, records)
    }

    fn by_name<'a>(records: &'a [MetricRecord], name: &str) -> Vec<&'a MetricRecord> {
        records.iter().filter(|r| r.name() == name).collect()
    }

    fn single<'a>(records: &'a [MetricRecord], name: &str) -> &'a MetricRecord {
        let found = by_name(records, name);
        assert_eq!(found.len(), 1, "expected exactly one {name}");
        found[0]
    }

    #[test]
    fn test_healthy_pass() {
        let (exporter, records) = collect(MockClient::typical_system());

        assert_eq!(single(&records, "ovs_up").value(), 1.0);
        assert_eq!(exporter.error_count(), 0);

        let info = single(&records, "ovs_info");
        assert_eq!(info.label("system_id"), Some("4a32-ffff"));
        assert_eq!(info.label("hostname"), Some("node1"));
        assert_eq!(info.label("ovs_version"), Some("3.1.0"));
        assert_eq!(info.label("db_version"), Some("8.3.0"));

        let pids = by_name(&records, "ovs_pid");
        assert_eq!(pids.len(), 3);
        assert_eq!(pids[0].label("component"), Some("ovsdb-server"));
        assert_eq!(pids[0].value(), 100.0);
        assert_eq!(pids[2].label("component"), Some("ovn-controller"));
        assert_eq!(pids[2].value(), 102.0);

        // 3 daemons x (info + warn/reconnect breakdown).
        assert_eq!(by_name(&records, "ovs_log_file_size").len(), 3);
        assert_eq!(by_name(&records, "ovs_log_event_count").len(), 6);

        assert_eq!(single(&records, "ovs_failed_req_count").value(), 0.0);
        assert_eq!(single(&records, "ovs_next_poll").value(), 15.0);
    }

    #[test]
    fn test_admin_probes() {
        let (_, records) = collect(MockClient::typical_system());

        // Every service supports coverage/show; one event with three rate
        // windows plus the lifetime total.
        let totals = by_name(&records, "ovs_coverage_total");
        assert_eq!(totals.len(), 3);
        assert_eq!(totals[0].value(), 137909.0);
        let avgs = by_name(&records, "ovs_coverage_avg");
        assert_eq!(avgs.len(), 9);
        assert!(avgs.iter().any(|r| r.label("interval") == Some("1h")));

        // memory/show is skipped for the controller service variant.
        let memory = by_name(&records, "ovs_memory_usage");
        assert_eq!(memory.len(), 4);
        assert!(
            memory
                .iter()
                .all(|r| r.label("component") != Some("ovncontroller-service"))
        );

        // Datapath topology comes only from the forwarding-plane service.
        let dp_ifs = by_name(&records, "ovs_dp_if");
        assert_eq!(dp_ifs.len(), 2);
        assert!(
            dp_ifs
                .iter()
                .all(|r| r.label("datapath") == Some("system@ovs-system"))
        );
        let internal = dp_ifs
            .iter()
            .find(|r| r.label("name") == Some("br-int"))
            .unwrap();
        assert_eq!(internal.label("ofport"), Some("65534"));
        assert_eq!(internal.label("index"), Some("2"));
        assert_eq!(internal.label("port_type"), Some("internal"));

        assert_eq!(single(&records, "ovs_dp_br_if_total").value(), 2.0);
        assert_eq!(single(&records, "ovs_dp_lookups_hit").value(), 985483.0);
        assert_eq!(single(&records, "ovs_dp_lookups_lost").value(), 3.0);
        assert_eq!(single(&records, "ovs_dp_flows").value(), 5.0);
        assert_eq!(single(&records, "ovs_dp_masks_hit_ratio").value(), 1.04);
    }

    #[test]
    fn test_feature_detection_skips_missing_commands() {
        let mut client = MockClient::typical_system();
        client.commands.remove("coverage/show");
        client.commands.remove("dpif/show");
        let (exporter, records) = collect(client);

        assert!(by_name(&records, "ovs_coverage_total").is_empty());
        assert!(by_name(&records, "ovs_dp_if").is_empty());
        // Skips are not failures.
        assert_eq!(exporter.error_count(), 0);
        assert!(!by_name(&records, "ovs_memory_usage").is_empty());
    }

    #[test]
    fn test_interface_records() {
        let (_, records) = collect(MockClient::typical_system());

        let mains = by_name(&records, "ovs_interface");
        assert_eq!(mains.len(), 2);
        assert_eq!(mains[0].label("bridge_name"), Some("br-int"));

        let admin = by_name(&records, "ovs_interface_admin_state");
        assert_eq!(admin[0].value(), 1.0); // eth0 up
        assert_eq!(admin[1].value(), 0.0); // veth1 down

        // veth1 reports a link state that is neither down nor up.
        let link = by_name(&records, "ovs_interface_link_state");
        assert_eq!(link[0].value(), 1.0);
        assert_eq!(link[1].value(), 2.0);

        let duplex = by_name(&records, "ovs_interface_duplex");
        assert_eq!(duplex[0].value(), 2.0); // full
        assert_eq!(duplex[1].value(), 0.0); // unset

        let rx_bytes = single(&records, "ovs_interface_rx_bytes");
        assert_eq!(rx_bytes.value(), 12345.0);
        assert_eq!(rx_bytes.label("name"), Some("eth0"));

        let mac = by_name(&records, "ovs_interface_mac_in_use");
        assert_eq!(mac[0].label("mac_address"), Some("02:00:00:00:00:01"));

        let status = single(&records, "ovs_interface_status");
        assert_eq!(status.label("key"), Some("driver_name"));
        assert_eq!(status.label("value"), Some("veth"));
        assert_eq!(status.value(), 1.0);

        let external = single(&records, "ovs_interface_external_ids");
        assert_eq!(external.label("key"), Some("iface-id"));
    }

    #[test]
    fn test_unknown_statistics_key_is_skipped_silently() {
        let mut client = MockClient::typical_system();
        client.interfaces[0]
            .statistics
            .insert("bogus_counter".to_string(), 7);
        let (exporter, records) = collect(client);

        // Known keys still map; the unknown one yields nothing and is not
        // counted as a failure.
        assert_eq!(single(&records, "ovs_interface_rx_bytes").value(), 12345.0);
        assert_eq!(exporter.error_count(), 0);
        assert!(records.iter().all(|r| !r.name().contains("bogus")));
    }

    #[test]
    fn test_port_probes() {
        let (_, records) = collect(MockClient::typical_system());
        let ports = by_name(&records, "ovs_network_port");
        assert_eq!(ports.len(), 2);

        let default = ports
            .iter()
            .find(|r| r.label("usage") == Some("default"))
            .unwrap();
        assert_eq!(default.value(), 1.0);
        assert_eq!(default.label("component"), Some("ovsdb-server"));

        let ssl = ports.iter().find(|r| r.label("usage") == Some("ssl")).unwrap();
        assert_eq!(ssl.value(), 0.0);
    }

    #[test]
    fn test_required_probe_failure_flips_liveness() {
        let (exporter, records) = collect(MockClient::typical_system().with_failed_system());

        assert_eq!(single(&records, "ovs_up").value(), 0.0);
        assert_eq!(exporter.error_count(), 1);
        // Optional probes still contribute.
        assert!(!by_name(&records, "ovs_coverage_total").is_empty());
        assert_eq!(single(&records, "ovs_failed_req_count").value(), 1.0);
    }

    #[test]
    fn test_process_failure_flips_liveness_but_keeps_records() {
        let (exporter, records) = collect(MockClient::typical_system().with_failed_processes());

        assert_eq!(single(&records, "ovs_up").value(), 0.0);
        // One failure per managed daemon; records still emitted with id 0.
        assert_eq!(exporter.error_count(), 3);
        let pids = by_name(&records, "ovs_pid");
        assert_eq!(pids.len(), 3);
        assert!(pids.iter().all(|r| r.value() == 0.0));
    }

    #[test]
    fn test_optional_probe_failures_do_not_flip_liveness() {
        let (exporter, records) =
            collect(MockClient::typical_system().with_failed_logs().with_failed_interfaces());

        assert_eq!(single(&records, "ovs_up").value(), 1.0);
        // 3 log probes + 1 interface probe.
        assert_eq!(exporter.error_count(), 4);
        assert!(by_name(&records, "ovs_log_file_size").is_empty());
        assert!(by_name(&records, "ovs_interface").is_empty());
    }

    #[test]
    fn test_unreachable_backend_still_yields_bookkeeping() {
        let (exporter, records) = collect(MockClient::unreachable());

        assert_eq!(single(&records, "ovs_up").value(), 0.0);
        assert!(single(&records, "ovs_failed_req_count").value() > 0.0);
        assert_eq!(single(&records, "ovs_next_poll").value(), 15.0);
        // system + 3 processes + 3 logs + 3 list-commands + interfaces + 2 ports
        assert_eq!(exporter.error_count(), 13);
        // Port records are emitted as down even when the probe errors.
        let ports = by_name(&records, "ovs_network_port");
        assert_eq!(ports.len(), 2);
        assert!(ports.iter().all(|r| r.value() == 0.0));
    }

    #[test]
    fn test_gate_suppresses_process_log_admin_probes() {
        let mut config = Config::default();
        config.collect_process_metrics = false;
        let exporter = Exporter::new(MockClient::typical_system(), &config);
        let records = (*exporter.collect(0)).clone();

        assert!(by_name(&records, "ovs_pid").is_empty());
        assert!(by_name(&records, "ovs_log_file_size").is_empty());
        assert!(by_name(&records, "ovs_coverage_total").is_empty());
        assert!(by_name(&records, "ovs_memory_usage").is_empty());
        assert!(by_name(&records, "ovs_dp_if").is_empty());

        // Interfaces, ports and bookkeeping are not gated, and liveness is
        // emitted regardless of the gate.
        assert!(!by_name(&records, "ovs_interface").is_empty());
        assert_eq!(by_name(&records, "ovs_network_port").len(), 2);
        assert_eq!(single(&records, "ovs_up").value(), 1.0);
    }

    #[test]
    fn test_link_state_values() {
        assert_eq!(link_state_value("down"), 0.0);
        assert_eq!(link_state_value("up"), 1.0);
        assert_eq!(link_state_value("flapping"), 2.0);
        assert_eq!(link_state_value(""), 2.0);

        assert_eq!(duplex_value("half"), 1.0);
        assert_eq!(duplex_value("full"), 2.0);
        assert_eq!(duplex_value(""), 0.0);
    }
}
