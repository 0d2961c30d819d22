//! The descriptor catalogue: every metric the exporter emits, as static data.
//!
//! Label sets are fixed per metric name. `system_id` is the first label of
//! every labeled metric so all series of one host group together.

use super::{MetricDesc, MetricKind};

macro_rules! desc {
    ($ident:ident, $name:expr, $kind:ident, [$($label:expr),*], $help:expr) => {
        pub static $ident: MetricDesc = MetricDesc {
            name: $name,
            help: $help,
            kind: MetricKind::$kind,
            labels: &[$($label),*],
        };
    };
}

desc!(UP, "ovs_up", Gauge, [], "Whether the vswitch stack is up (1) or down (0).");
desc!(
    INFO,
    "ovs_info",
    Gauge,
    ["system_id", "rundir", "hostname", "system_type", "system_version", "ovs_version", "db_version"],
    "Basic identity of the vswitch stack. Always set to 1."
);
desc!(
    REQUEST_ERRORS,
    "ovs_failed_req_count",
    Counter,
    ["system_id"],
    "Cumulative number of failed requests to the vswitch stack since start."
);
desc!(
    NEXT_POLL,
    "ovs_next_poll",
    Counter,
    ["system_id"],
    "Unix timestamp of the next potential poll of the vswitch stack."
);
desc!(
    PID,
    "ovs_pid",
    Gauge,
    ["system_id", "component", "user", "group"],
    "Process ID of a running vswitch component, or 0 when it is not running."
);
desc!(
    LOG_FILE_SIZE,
    "ovs_log_file_size",
    Gauge,
    ["system_id", "component", "filename"],
    "Size of the log file associated with a vswitch component, in bytes."
);
desc!(
    LOG_EVENT_COUNT,
    "ovs_log_event_count",
    Gauge,
    ["system_id", "component", "severity", "source"],
    "Number of recorded log messages of a component, by severity and source."
);
desc!(
    NETWORK_PORT,
    "ovs_network_port",
    Gauge,
    ["system_id", "component", "usage"],
    "Whether the TCP port used for database connections is in use (1) or not (0)."
);

// Coverage and memory counters from administrative introspection.
desc!(
    COVERAGE_AVG,
    "ovs_coverage_avg",
    Gauge,
    ["system_id", "component", "event", "interval"],
    "Average rate at which an event occurs during a daemon's runtime."
);
desc!(
    COVERAGE_TOTAL,
    "ovs_coverage_total",
    Counter,
    ["system_id", "component", "event"],
    "Total number of times an event occurred during a daemon's runtime."
);
desc!(
    MEMORY_USAGE,
    "ovs_memory_usage",
    Gauge,
    ["system_id", "component", "facility"],
    "Memory usage of a daemon, by facility."
);

// Datapath topology.
desc!(
    DP_INTERFACE,
    "ovs_dp_if",
    Gauge,
    ["system_id", "datapath", "bridge", "name", "ofport", "index", "port_type"],
    "An existing datapath interface. Always set to 1."
);
desc!(
    DP_BRIDGE_INTERFACE_TOTAL,
    "ovs_dp_br_if_total",
    Gauge,
    ["system_id", "datapath", "bridge"],
    "Total number of interfaces attached to a bridge."
);
desc!(
    DP_FLOWS_TOTAL,
    "ovs_dp_flows",
    Gauge,
    ["system_id", "datapath"],
    "Number of flows in a datapath."
);
desc!(
    DP_LOOKUPS_HIT,
    "ovs_dp_lookups_hit",
    Counter,
    ["system_id", "datapath"],
    "Incoming packets matching an existing flow in the datapath."
);
desc!(
    DP_LOOKUPS_MISSED,
    "ovs_dp_lookups_missed",
    Counter,
    ["system_id", "datapath"],
    "Incoming packets matching no existing flow in the datapath."
);
desc!(
    DP_LOOKUPS_LOST,
    "ovs_dp_lookups_lost",
    Counter,
    ["system_id", "datapath"],
    "Incoming packets destined for userspace but dropped before reaching it."
);
desc!(
    DP_MASKS_HIT,
    "ovs_dp_masks_hit",
    Counter,
    ["system_id", "datapath"],
    "Total number of masks visited while matching incoming packets."
);
desc!(
    DP_MASKS_TOTAL,
    "ovs_dp_masks_total",
    Counter,
    ["system_id", "datapath"],
    "Number of masks in a datapath."
);
desc!(
    DP_MASKS_HIT_RATIO,
    "ovs_dp_masks_hit_ratio",
    Gauge,
    ["system_id", "datapath"],
    "Average number of masks visited per packet in a datapath."
);

// Interface records from the persistent database.
desc!(
    INTERFACE,
    "ovs_interface",
    Gauge,
    ["system_id", "uuid", "name", "bridge_name"],
    "A configured interface; the primary series for all other interface metrics. Always set to 1."
);
desc!(
    INTERFACE_ADMIN_STATE,
    "ovs_interface_admin_state",
    Gauge,
    ["system_id", "uuid", "name"],
    "Administrative state of the physical link: down(0), up(1), other(2)."
);
desc!(
    INTERFACE_LINK_STATE,
    "ovs_interface_link_state",
    Gauge,
    ["system_id", "uuid", "name"],
    "Observed state of the physical link: down(0), up(1), other(2)."
);
desc!(
    INTERFACE_INGRESS_POLICING_BURST,
    "ovs_interface_ingress_policing_burst",
    Gauge,
    ["system_id", "uuid", "name"],
    "Maximum burst size for received data, in kb."
);
desc!(
    INTERFACE_INGRESS_POLICING_RATE,
    "ovs_interface_ingress_policing_rate",
    Gauge,
    ["system_id", "uuid", "name"],
    "Maximum rate for received data, in kbps. 0 disables policing."
);
desc!(
    INTERFACE_MAC_IN_USE,
    "ovs_interface_mac_in_use",
    Gauge,
    ["system_id", "uuid", "mac_address", "name"],
    "The MAC address in use by an interface."
);
desc!(
    INTERFACE_MTU,
    "ovs_interface_mtu",
    Gauge,
    ["system_id", "uuid", "name"],
    "Currently configured MTU of an interface."
);
desc!(
    INTERFACE_DUPLEX,
    "ovs_interface_duplex",
    Gauge,
    ["system_id", "uuid", "name"],
    "Duplex mode of the physical link: other(0), half(1), full(2)."
);
desc!(
    INTERFACE_OF_PORT,
    "ovs_interface_of_port",
    Gauge,
    ["system_id", "uuid", "name"],
    "OpenFlow port number associated with an interface."
);
desc!(
    INTERFACE_IF_INDEX,
    "ovs_interface_if_index",
    Gauge,
    ["system_id", "uuid", "name"],
    "Kernel interface index associated with an interface."
);
desc!(
    INTERFACE_LOCAL_INDEX,
    "ovs_interface_local_index",
    Gauge,
    ["system_id", "uuid", "name"],
    "Local index associated with an interface."
);

// Interface traffic counters, mapped from the statistics column.
desc!(
    INTERFACE_RX_CRC_ERR,
    "ovs_interface_rx_crc_err",
    Counter,
    ["system_id", "uuid", "name"],
    "CRC errors on packets received by an interface."
);
desc!(
    INTERFACE_RX_DROPPED,
    "ovs_interface_rx_dropped",
    Counter,
    ["system_id", "uuid", "name"],
    "Input packets dropped by an interface."
);
desc!(
    INTERFACE_RX_FRAME_ERR,
    "ovs_interface_rx_frame_err",
    Counter,
    ["system_id", "uuid", "name"],
    "Frame alignment errors on packets received by an interface."
);
desc!(
    INTERFACE_RX_OVER_ERR,
    "ovs_interface_rx_over_err",
    Counter,
    ["system_id", "uuid", "name"],
    "Packets received with RX overrun by an interface."
);
desc!(
    INTERFACE_RX_ERRORS,
    "ovs_interface_rx_errors",
    Counter,
    ["system_id", "uuid", "name"],
    "Total packets with errors received by an interface."
);
desc!(
    INTERFACE_RX_MISSED_ERRORS,
    "ovs_interface_rx_missed_errors",
    Counter,
    ["system_id", "uuid", "name"],
    "Missed packets on an interface."
);
desc!(
    INTERFACE_RX_PACKETS,
    "ovs_interface_rx_packets",
    Counter,
    ["system_id", "uuid", "name"],
    "Packets received by an interface."
);
desc!(
    INTERFACE_RX_BYTES,
    "ovs_interface_rx_bytes",
    Counter,
    ["system_id", "uuid", "name"],
    "Bytes received by an interface."
);
desc!(
    INTERFACE_TX_PACKETS,
    "ovs_interface_tx_packets",
    Counter,
    ["system_id", "uuid", "name"],
    "Packets transmitted by an interface."
);
desc!(
    INTERFACE_TX_BYTES,
    "ovs_interface_tx_bytes",
    Counter,
    ["system_id", "uuid", "name"],
    "Bytes transmitted by an interface."
);
desc!(
    INTERFACE_TX_DROPPED,
    "ovs_interface_tx_dropped",
    Counter,
    ["system_id", "uuid", "name"],
    "Output packets dropped by an interface."
);
desc!(
    INTERFACE_TX_ERRORS,
    "ovs_interface_tx_errors",
    Counter,
    ["system_id", "uuid", "name"],
    "Total transmit errors on an interface."
);
desc!(
    INTERFACE_COLLISIONS,
    "ovs_interface_collisions",
    Counter,
    ["system_id", "uuid", "name"],
    "Collisions on an interface."
);
desc!(
    INTERFACE_RX_MULTICAST_PACKETS,
    "ovs_interface_rx_multicast_packets",
    Counter,
    ["system_id", "uuid", "name"],
    "Multicast packets received by an interface."
);

desc!(
    INTERFACE_LINK_RESETS,
    "ovs_interface_link_resets",
    Counter,
    ["system_id", "uuid", "name"],
    "Number of observed link state changes of an interface."
);
desc!(
    INTERFACE_LINK_SPEED,
    "ovs_interface_link_speed",
    Gauge,
    ["system_id", "uuid", "name"],
    "Negotiated speed of the physical link of an interface."
);

// Free-form key/value annotations become one record per key.
desc!(
    INTERFACE_STATUS_KV,
    "ovs_interface_status",
    Gauge,
    ["system_id", "uuid", "key", "value", "name"],
    "Key-value pair reporting port status of an interface."
);
desc!(
    INTERFACE_OPTIONS_KV,
    "ovs_interface_options",
    Gauge,
    ["system_id", "uuid", "key", "value", "name"],
    "Key-value pair reporting options of an interface."
);
desc!(
    INTERFACE_EXTERNAL_IDS_KV,
    "ovs_interface_external_ids",
    Gauge,
    ["system_id", "uuid", "key", "value", "name"],
    "Key-value pair reporting external IDs of an interface."
);

/// All descriptors, in exposition order.
pub static ALL: &[&MetricDesc] = &[
    &UP,
    &INFO,
    &REQUEST_ERRORS,
    &NEXT_POLL,
    &PID,
    &LOG_FILE_SIZE,
    &LOG_EVENT_COUNT,
    &NETWORK_PORT,
    &COVERAGE_AVG,
    &COVERAGE_TOTAL,
    &MEMORY_USAGE,
    &DP_INTERFACE,
    &DP_BRIDGE_INTERFACE_TOTAL,
    &DP_FLOWS_TOTAL,
    &DP_LOOKUPS_HIT,
    &DP_LOOKUPS_MISSED,
    &DP_LOOKUPS_LOST,
    &DP_MASKS_HIT,
    &DP_MASKS_TOTAL,
    &DP_MASKS_HIT_RATIO,
    &INTERFACE,
    &INTERFACE_ADMIN_STATE,
    &INTERFACE_LINK_STATE,
    &INTERFACE_INGRESS_POLICING_BURST,
    &INTERFACE_INGRESS_POLICING_RATE,
    &INTERFACE_MAC_IN_USE,
    &INTERFACE_MTU,
    &INTERFACE_DUPLEX,
    &INTERFACE_OF_PORT,
    &INTERFACE_IF_INDEX,
    &INTERFACE_LOCAL_INDEX,
    &INTERFACE_RX_CRC_ERR,
    &INTERFACE_RX_DROPPED,
    &INTERFACE_RX_FRAME_ERR,
    &INTERFACE_RX_OVER_ERR,
    &INTERFACE_RX_ERRORS,
    &INTERFACE_RX_MISSED_ERRORS,
    &INTERFACE_RX_PACKETS,
    &INTERFACE_RX_BYTES,
    &INTERFACE_TX_PACKETS,
    &INTERFACE_TX_BYTES,
    &INTERFACE_TX_DROPPED,
    &INTERFACE_TX_ERRORS,
    &INTERFACE_COLLISIONS,
    &INTERFACE_RX_MULTICAST_PACKETS,
    &INTERFACE_LINK_RESETS,
    &INTERFACE_LINK_SPEED,
    &INTERFACE_STATUS_KV,
    &INTERFACE_OPTIONS_KV,
    &INTERFACE_EXTERNAL_IDS_KV,
];

/// Looks up a descriptor by metric name.
pub fn find(name: &str) -> Option<&'static MetricDesc> {
    ALL.iter().copied().find(|d| d.name == name)
}

/// Maps a key of the interface statistics column to its traffic-counter
/// descriptor. Returns `None` for keys outside the fixed catalogue; callers
/// log and skip those.
pub fn interface_stat(key: &str) -> Option<&'static MetricDesc> {
    match key {
        "rx_crc_err" => Some(&INTERFACE_RX_CRC_ERR),
        "rx_dropped" => Some(&INTERFACE_RX_DROPPED),
        "rx_frame_err" => Some(&INTERFACE_RX_FRAME_ERR),
        "rx_over_err" => Some(&INTERFACE_RX_OVER_ERR),
        "rx_errors" => Some(&INTERFACE_RX_ERRORS),
        "rx_missed_errors" => Some(&INTERFACE_RX_MISSED_ERRORS),
        "rx_packets" => Some(&INTERFACE_RX_PACKETS),
        "rx_bytes" => Some(&INTERFACE_RX_BYTES),
        "tx_packets" => Some(&INTERFACE_TX_PACKETS),
        "tx_bytes" => Some(&INTERFACE_TX_BYTES),
        "tx_dropped" => Some(&INTERFACE_TX_DROPPED),
        "tx_errors" => Some(&INTERFACE_TX_ERRORS),
        "collisions" => Some(&INTERFACE_COLLISIONS),
        "rx_multicast_packets" => Some(&INTERFACE_RX_MULTICAST_PACKETS),
        _ => None,
    }
}
