//! Administrative control-socket access and output parsers.
//!
//! Each daemon listens on `<rundir>/<daemon>.<pid>.ctl` and answers the same
//! JSON-RPC framing as the database socket; results are plain text meant for
//! operators, so every command gets its own parser. Unrecognized lines are
//! skipped rather than treated as errors: the output format is not a stable
//! interface and new fields appear between releases.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use crate::config::{Config, Daemon};

use super::{Bridge, ClientError, CoverageMetrics, Datapath, DatapathTopology, DpPort};
use super::{ovsdb, proc};

/// Runs one administrative command against a daemon's control socket.
pub(super) fn call(config: &Config, daemon: Daemon, command: &str) -> Result<String, ClientError> {
    let pid = proc::read_pidfile(config, daemon)?;
    let socket = config
        .daemon_run_dir(daemon)
        .join(format!("{}.{}.ctl", daemon.name(), pid));
    let result = ovsdb::unix_rpc(&socket, config.timeout, command, json!([]))?;
    result
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ClientError::Parse(format!("{command}: non-text reply")))
}

/// Parses `list-commands` output: a header line followed by one indented
/// command (plus usage) per line.
pub(super) fn parse_list_commands(output: &str) -> BTreeSet<String> {
    let mut commands = BTreeSet::new();
    for line in output.lines() {
        if !line.starts_with([' ', '\t']) {
            continue;
        }
        if let Some(name) = line.split_whitespace().next() {
            commands.insert(name.to_string());
        }
    }
    commands
}

/// Parses `coverage/show` output.
///
/// Counted events appear as
/// `event  R/sec  R/sec  R/sec  total: N`
/// with rates averaged over the last five seconds, minute and hour. Those
/// windows become periods `5s`, `1m` and `1h`; the lifetime count becomes
/// period `total`.
pub(super) fn parse_coverage(output: &str) -> CoverageMetrics {
    const PERIODS: [&str; 3] = ["5s", "1m", "1h"];

    let mut metrics = CoverageMetrics::new();
    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 6 || tokens[4] != "total:" {
            continue;
        }
        let Ok(total) = tokens[5].parse::<f64>() else {
            continue;
        };
        let event = metrics.entry(tokens[0].to_string()).or_default();
        for (period, token) in PERIODS.iter().zip(&tokens[1..4]) {
            if let Some(rate) = token.strip_suffix("/sec").and_then(|r| r.parse::<f64>().ok()) {
                event.insert(period.to_string(), rate);
            }
        }
        event.insert("total".to_string(), total);
    }
    metrics
}

/// Parses `memory/show` output: whitespace-separated `facility:value` pairs.
/// Tokens without a colon or a numeric value are skipped.
pub(super) fn parse_memory(output: &str) -> BTreeMap<String, f64> {
    let mut facilities = BTreeMap::new();
    for token in output.split_whitespace() {
        if let Some((facility, value)) = token.split_once(':')
            && let Ok(value) = value.parse::<f64>()
        {
            facilities.insert(facility.to_string(), value);
        }
    }
    facilities
}

fn kv_f64(token: &str, key: &str) -> Option<f64> {
    token.strip_prefix(key)?.strip_prefix(':')?.parse().ok()
}

/// Parses `dpif/show` output into datapaths, bridges and ports.
///
/// The accepted shape:
///
/// ```text
/// system@ovs-system: hit:985483 missed:477 lost:0
///   flows: 5
///   masks: hit:2005648 total:2 hit/pkt:1.00
///   br-int:
///     br-int 65534/2: (internal)
///     veth0 1/5: (system)
/// ```
///
/// A top-level `type@name:` line opens a datapath; `flows:`/`masks:` lines
/// attach to it; an indented `name:` line opens a bridge; deeper
/// `name ofport/index: (type)` lines are its ports.
pub(super) fn parse_dpif_show(output: &str) -> Result<DatapathTopology, ClientError> {
    let mut topology = DatapathTopology::default();

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indented = line.starts_with([' ', '\t']);

        if !indented {
            let mut tokens = trimmed.split_whitespace();
            let Some(header) = tokens.next() else {
                continue;
            };
            let name = header.trim_end_matches(':').to_string();
            if !name.contains('@') {
                return Err(ClientError::Parse(format!("unexpected dpif line: {trimmed}")));
            }
            let mut dp = Datapath {
                name,
                ..Datapath::default()
            };
            for token in tokens {
                if let Some(v) = kv_f64(token, "hit") {
                    dp.lookups_hit = v;
                } else if let Some(v) = kv_f64(token, "missed") {
                    dp.lookups_missed = v;
                } else if let Some(v) = kv_f64(token, "lost") {
                    dp.lookups_lost = v;
                }
            }
            topology.datapaths.push(dp);
            continue;
        }

        let Some(dp) = topology.datapaths.last_mut() else {
            return Err(ClientError::Parse(format!("dpif line outside datapath: {trimmed}")));
        };

        if let Some(flows) = trimmed.strip_prefix("flows:") {
            dp.flows = flows.trim().parse().unwrap_or_default();
        } else if let Some(masks) = trimmed.strip_prefix("masks:") {
            for token in masks.split_whitespace() {
                if let Some(v) = kv_f64(token, "hit") {
                    dp.masks_hit = v;
                } else if let Some(v) = kv_f64(token, "total") {
                    dp.masks_total = v;
                } else if let Some(v) = kv_f64(token, "hit/pkt") {
                    dp.masks_hit_ratio = v;
                }
            }
        } else if !trimmed.contains(' ') && trimmed.ends_with(':') {
            topology.bridges.push(Bridge {
                name: trimmed.trim_end_matches(':').to_string(),
                datapath_name: dp.name.clone(),
            });
        } else {
            // Port line: `name ofport/index: (type)`.
            let Some(bridge) = topology.bridges.last() else {
                continue;
            };
            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.len() < 2 {
                continue;
            }
            let Some((ofport, index)) = tokens[1].trim_end_matches(':').split_once('/') else {
                continue;
            };
            let port_type = tokens
                .get(2)
                .map(|t| t.trim_matches(['(', ')']).to_string())
                .unwrap_or_else(|| "system".to_string());
            topology.ports.push(DpPort {
                name: tokens[0].to_string(),
                datapath_name: dp.name.clone(),
                bridge_name: bridge.name.clone(),
                ofport: ofport.parse().unwrap_or_default(),
                index: index.parse().unwrap_or_default(),
                port_type,
            });
        }
    }
    Ok(topology)
}
