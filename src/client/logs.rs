//! Daemon log files: size and per-(severity, source) event counts.
//!
//! Log lines follow the VLOG format
//! `2023-06-14T08:03:01.640Z|00007|module|LEVEL|message`. Lines whose first
//! field is not a timestamp (continuation lines, truncated writes) are
//! skipped.

use std::fs;

use chrono::DateTime;

use crate::config::{Config, Daemon};

use super::{ClientError, LogEventStats, LogFileInfo};

pub(super) fn log_file_info(config: &Config, daemon: Daemon) -> Result<LogFileInfo, ClientError> {
    let path = config.log_file(daemon);
    let meta = fs::metadata(path)?;
    Ok(LogFileInfo {
        component: daemon.name().to_string(),
        path: path.display().to_string(),
        size: meta.len(),
    })
}

pub(super) fn log_event_stats(config: &Config, daemon: Daemon) -> Result<LogEventStats, ClientError> {
    let content = fs::read_to_string(config.log_file(daemon))?;
    Ok(parse_vlog_stats(&content))
}

/// Counts log events by severity, then source module.
pub(super) fn parse_vlog_stats(content: &str) -> LogEventStats {
    let mut stats = LogEventStats::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 5 {
            continue;
        }
        if DateTime::parse_from_rfc3339(fields[0]).is_err() {
            continue;
        }
        let source = fields[2];
        let severity = fields[3].to_ascii_lowercase();
        *stats
            .entry(severity)
            .or_default()
            .entry(source.to_string())
            .or_default() += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
2023-06-14T08:03:01.640Z|00001|vlog|INFO|opened log file\n\
2023-06-14T08:03:01.643Z|00002|reconnect|INFO|unix:/var/run/db.sock: connecting...\n\
2023-06-14T08:03:01.650Z|00003|reconnect|WARN|unix:/var/run/db.sock: connection dropped\n\
continuation line without timestamp\n\
2023-06-14T08:04:12.001Z|00004|bridge|ERR|could not add network device\n";

    #[test]
    fn test_parse_vlog_stats() {
        let stats = parse_vlog_stats(SAMPLE);

        assert_eq!(stats["info"]["vlog"], 1);
        assert_eq!(stats["info"]["reconnect"], 1);
        assert_eq!(stats["warn"]["reconnect"], 1);
        assert_eq!(stats["err"]["bridge"], 1);
        // The malformed line contributes nothing.
        let total: u64 = stats.values().flat_map(|s| s.values()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_parse_vlog_stats_empty() {
        assert!(parse_vlog_stats("").is_empty());
    }

    #[test]
    fn test_log_file_probes() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("ovs-vswitchd.log");
        let mut file = std::fs::File::create(&log_path).unwrap();
        write!(file, "{SAMPLE}").unwrap();

        let mut config = Config::default();
        config.log_files[1] = log_path.clone();

        let info = log_file_info(&config, Daemon::Vswitchd).unwrap();
        assert_eq!(info.component, "ovs-vswitchd");
        assert_eq!(info.size, SAMPLE.len() as u64);
        assert_eq!(info.path, log_path.display().to_string());

        let stats = log_event_stats(&config, Daemon::Vswitchd).unwrap();
        assert_eq!(stats["err"]["bridge"], 1);

        // A missing log file is an I/O failure, not a panic.
        assert!(log_file_info(&config, Daemon::OvsdbServer).is_err());
    }
}
