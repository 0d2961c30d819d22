//! Process state of the managed daemons: pidfile plus `/proc/<pid>/status`,
//! with uid/gid resolved through `/etc/passwd` and `/etc/group`.

use std::fs;

use crate::config::{Config, Daemon};

use super::{ClientError, ProcessInfo};

/// Reads a daemon's pidfile. A missing or unparsable pidfile means the
/// daemon is not running.
pub(super) fn read_pidfile(config: &Config, daemon: Daemon) -> Result<u32, ClientError> {
    let content = fs::read_to_string(config.pid_file(daemon))
        .map_err(|_| ClientError::NotRunning(daemon.name().to_string()))?;
    content
        .trim()
        .parse()
        .map_err(|_| ClientError::NotRunning(daemon.name().to_string()))
}

pub(super) fn process_info(config: &Config, daemon: Daemon) -> Result<ProcessInfo, ClientError> {
    let pid = read_pidfile(config, daemon)?;

    // A stale pidfile with no matching process is equivalent to not running.
    let status_path = config.proc_dir.join(pid.to_string()).join("status");
    let status = fs::read_to_string(&status_path)
        .map_err(|_| ClientError::NotRunning(daemon.name().to_string()))?;
    let (uid, gid) = parse_status_ids(&status)
        .ok_or_else(|| ClientError::Parse(format!("no uid/gid in {}", status_path.display())))?;

    let user = fs::read_to_string("/etc/passwd")
        .ok()
        .and_then(|content| lookup_name(&content, uid))
        .unwrap_or_else(|| uid.to_string());
    let group = fs::read_to_string("/etc/group")
        .ok()
        .and_then(|content| lookup_name(&content, gid))
        .unwrap_or_else(|| gid.to_string());

    Ok(ProcessInfo {
        id: pid as i64,
        user,
        group,
    })
}

/// Extracts the real uid and gid from `/proc/<pid>/status` content.
pub(super) fn parse_status_ids(status: &str) -> Option<(u32, u32)> {
    let mut uid = None;
    let mut gid = None;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("Uid:") {
            uid = rest.split_whitespace().next()?.parse().ok();
        } else if let Some(rest) = line.strip_prefix("Gid:") {
            gid = rest.split_whitespace().next()?.parse().ok();
        }
    }
    Some((uid?, gid?))
}

/// Resolves a numeric id to a name in passwd/group format content
/// (`name:x:id:…` per line).
pub(super) fn lookup_name(content: &str, id: u32) -> Option<String> {
    for line in content.lines() {
        let mut fields = line.split(':');
        let Some(name) = fields.next() else { continue };
        let Some(entry_id) = fields.nth(1) else {
            continue;
        };
        if entry_id.parse() == Ok(id) {
            return Some(name.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_status_ids() {
        let status = "Name:\tovs-vswitchd\nPid:\t123\nUid:\t998\t998\t998\t998\nGid:\t995\t995\t995\t995\n";
        assert_eq!(parse_status_ids(status), Some((998, 995)));
        assert_eq!(parse_status_ids("Name:\tx\n"), None);
    }

    #[test]
    fn test_lookup_name() {
        let passwd = "root:x:0:0:root:/root:/bin/bash\nopenvswitch:x:998:995::/var/run/openvswitch:/sbin/nologin\n";
        assert_eq!(lookup_name(passwd, 998), Some("openvswitch".to_string()));
        assert_eq!(lookup_name(passwd, 0), Some("root".to_string()));
        assert_eq!(lookup_name(passwd, 12345), None);
        assert_eq!(lookup_name("garbage", 0), None);
    }

    #[test]
    fn test_read_pidfile() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("ovsdb-server.pid");
        let mut file = std::fs::File::create(&pid_path).unwrap();
        writeln!(file, "4242").unwrap();

        let mut config = Config::default();
        config.pid_files[0] = pid_path;
        assert_eq!(read_pidfile(&config, Daemon::OvsdbServer).unwrap(), 4242);

        // Missing pidfile reports the daemon as not running.
        let err = read_pidfile(&config, Daemon::Vswitchd).unwrap_err();
        assert!(matches!(err, ClientError::NotRunning(_)));
    }
}
