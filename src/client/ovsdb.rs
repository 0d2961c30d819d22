//! OVSDB JSON-RPC access over the database unix socket.
//!
//! One request per connection; the configured timeout is applied as the
//! socket read/write deadline. Column values arrive in the OVSDB wire
//! encoding (`["uuid", …]`, `["set", …]`, `["map", …]`) and are decoded by
//! the helpers in [`decode`].

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;

use super::{ClientError, InterfaceRec, SystemInfo};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
}

/// Performs a single JSON-RPC call on a fresh unix-socket connection.
///
/// Shared with the appctl channel, which speaks the same framing on the
/// daemon control sockets.
pub(super) fn unix_rpc(
    socket: &Path,
    timeout: Duration,
    method: &str,
    params: Value,
) -> Result<Value, ClientError> {
    let mut stream = UnixStream::connect(socket)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let request = json!({ "method": method, "params": params, "id": 0 });
    debug!(method, socket = %socket.display(), "unix rpc");
    stream.write_all(&serde_json::to_vec(&request)?)?;

    let mut de = serde_json::Deserializer::from_reader(&stream);
    let response = RpcResponse::deserialize(&mut de)?;
    if !response.error.is_null() {
        return Err(ClientError::Rpc(response.error.to_string()));
    }
    Ok(response.result)
}

fn rpc(config: &Config, method: &str, params: Value) -> Result<Value, ClientError> {
    unix_rpc(&config.db_socket, config.timeout, method, params)
}

/// Selects all rows (all columns) of a table.
fn select(config: &Config, table: &str) -> Result<Vec<Value>, ClientError> {
    let params = json!([config.db_name, { "op": "select", "table": table, "where": [] }]);
    let result = rpc(config, "transact", params)?;

    let first = result
        .as_array()
        .and_then(|ops| ops.first())
        .ok_or_else(|| ClientError::Parse(format!("empty transact result for {table}")))?;
    if let Some(error) = first.get("error").and_then(Value::as_str) {
        return Err(ClientError::Rpc(format!("select {table}: {error}")));
    }
    first
        .get("rows")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| ClientError::Parse(format!("select {table}: no rows field")))
}

pub(super) fn system_info(config: &Config) -> Result<SystemInfo, ClientError> {
    let rows = select(config, &config.db_name)?;
    let row = rows
        .first()
        .ok_or_else(|| ClientError::Parse(format!("empty {} table", config.db_name)))?;

    let external_ids = decode::string_map(row.get("external_ids"));
    let system_id = match fs::read_to_string(&config.system_id_file) {
        Ok(content) => content.trim().to_string(),
        Err(_) => external_ids.get("system-id").cloned().unwrap_or_default(),
    };
    let hostname = match external_ids.get("hostname") {
        Some(name) => name.clone(),
        None => fs::read_to_string(config.proc_dir.join("sys/kernel/hostname"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    };

    let schema = rpc(config, "get_schema", json!([config.db_name]))?;
    let schema_version = schema
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(SystemInfo {
        system_id,
        run_dir: config.run_dir.display().to_string(),
        hostname,
        system_type: decode::scalar_string(row.get("system_type")),
        system_version: decode::scalar_string(row.get("system_version")),
        // The engine reports its own version in the ovs_version column.
        db_version: decode::scalar_string(row.get("ovs_version")),
        schema_version,
    })
}

pub(super) fn interfaces(config: &Config) -> Result<Vec<InterfaceRec>, ClientError> {
    let bridges = select(config, "Bridge")?;
    let ports = select(config, "Port")?;
    let iface_rows = select(config, "Interface")?;

    // Interface rows do not name their bridge; resolve through Port rows.
    let mut port_bridge: BTreeMap<String, String> = BTreeMap::new();
    for bridge in &bridges {
        let name = decode::scalar_string(bridge.get("name"));
        for port_uuid in decode::uuid_set(bridge.get("ports")) {
            port_bridge.insert(port_uuid, name.clone());
        }
    }
    let mut iface_bridge: BTreeMap<String, String> = BTreeMap::new();
    for port in &ports {
        let Some(bridge_name) = decode::uuid(port.get("_uuid")).and_then(|u| port_bridge.get(&u))
        else {
            continue;
        };
        for iface_uuid in decode::uuid_set(port.get("interfaces")) {
            iface_bridge.insert(iface_uuid, bridge_name.clone());
        }
    }

    let mut records = Vec::with_capacity(iface_rows.len());
    for row in &iface_rows {
        let uuid = decode::uuid(row.get("_uuid")).unwrap_or_default();
        records.push(InterfaceRec {
            bridge_name: iface_bridge.get(&uuid).cloned().unwrap_or_default(),
            uuid,
            name: decode::scalar_string(row.get("name")),
            admin_state: decode::scalar_string(row.get("admin_state")),
            link_state: decode::scalar_string(row.get("link_state")),
            ingress_policing_burst: decode::scalar_f64(row.get("ingress_policing_burst")),
            ingress_policing_rate: decode::scalar_f64(row.get("ingress_policing_rate")),
            mac_in_use: decode::scalar_string(row.get("mac_in_use")),
            mtu: decode::scalar_f64(row.get("mtu")),
            duplex: decode::scalar_string(row.get("duplex")),
            ofport: decode::scalar_f64(row.get("ofport")),
            if_index: decode::scalar_f64(row.get("ifindex")),
            local_index: decode::scalar_f64(row.get("index")),
            link_resets: decode::scalar_f64(row.get("link_resets")),
            link_speed: decode::scalar_f64(row.get("link_speed")),
            statistics: decode::int_map(row.get("statistics")),
            status: decode::string_map(row.get("status")),
            options: decode::string_map(row.get("options")),
            external_ids: decode::string_map(row.get("external_ids")),
        });
    }
    Ok(records)
}

/// Decoders for OVSDB wire values.
pub(super) mod decode {
    use std::collections::BTreeMap;

    use serde_json::Value;

    fn set_elements(value: &Value) -> Option<&Vec<Value>> {
        let arr = value.as_array()?;
        if arr.len() == 2 && arr[0].as_str() == Some("set") {
            arr[1].as_array()
        } else {
            None
        }
    }

    /// Unwraps `["set", [x]]` to `x`; empty sets decode to `None`.
    fn unwrap_scalar(value: &Value) -> Option<&Value> {
        match set_elements(value) {
            Some(elems) => elems.first(),
            None => Some(value),
        }
    }

    /// A scalar string column; empty sets and non-strings decode to `""`.
    pub fn scalar_string(value: Option<&Value>) -> String {
        value
            .and_then(unwrap_scalar)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// A scalar numeric column; empty sets and non-numbers decode to 0.
    pub fn scalar_f64(value: Option<&Value>) -> f64 {
        value
            .and_then(unwrap_scalar)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    /// A `["uuid", "…"]` value.
    pub fn uuid(value: Option<&Value>) -> Option<String> {
        let arr = value?.as_array()?;
        if arr.len() == 2 && arr[0].as_str() == Some("uuid") {
            arr[1].as_str().map(str::to_string)
        } else {
            None
        }
    }

    /// A column holding one uuid or a `["set", […]]` of uuids.
    pub fn uuid_set(value: Option<&Value>) -> Vec<String> {
        let Some(value) = value else {
            return Vec::new();
        };
        if let Some(single) = uuid(Some(value)) {
            return vec![single];
        }
        set_elements(value)
            .map(|elems| elems.iter().filter_map(|e| uuid(Some(e))).collect())
            .unwrap_or_default()
    }

    fn map_entries(value: Option<&Value>) -> Option<&Vec<Value>> {
        let arr = value?.as_array()?;
        if arr.len() == 2 && arr[0].as_str() == Some("map") {
            arr[1].as_array()
        } else {
            None
        }
    }

    /// A `["map", …]` column with string values.
    pub fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for entry in map_entries(value).into_iter().flatten() {
            if let Some(pair) = entry.as_array()
                && pair.len() == 2
                && let Some(key) = pair[0].as_str()
            {
                let val = match &pair[1] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.insert(key.to_string(), val);
            }
        }
        out
    }

    /// A `["map", …]` column with integer values, e.g. interface statistics.
    pub fn int_map(value: Option<&Value>) -> BTreeMap<String, i64> {
        let mut out = BTreeMap::new();
        for entry in map_entries(value).into_iter().flatten() {
            if let Some(pair) = entry.as_array()
                && pair.len() == 2
                && let (Some(key), Some(val)) = (pair[0].as_str(), pair[1].as_i64())
            {
                out.insert(key.to_string(), val);
            }
        }
        out
    }
}
