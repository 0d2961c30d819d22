//! Plain-text metric exposition for scrape handlers.
//!
//! Renders a snapshot in the conventional `# HELP`/`# TYPE` text format.
//! When no pass has ever completed, the minimal fallback records are
//! rendered instead so a scrape is never empty.

use std::collections::HashSet;
use std::fmt::Write;

use crate::client::OvsClient;
use crate::collector::Exporter;
use crate::metrics::MetricRecord;

/// Runs a pass if one is due, then renders the current snapshot.
pub fn render<C: OvsClient>(exporter: &Exporter<C>, now: i64) -> String {
    let snapshot = exporter.collect(now);
    if snapshot.is_empty() {
        render_records(&exporter.fallback_records())
    } else {
        render_records(&snapshot)
    }
}

/// Renders records in order, emitting the `# HELP`/`# TYPE` header once per
/// metric name at its first appearance.
pub fn render_records(records: &[MetricRecord]) -> String {
    let mut out = String::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for record in records {
        if seen.insert(record.name()) {
            let _ = writeln!(out, "# HELP {} {}", record.name(), record.help());
            let _ = writeln!(out, "# TYPE {} {}", record.name(), record.kind());
        }

        out.push_str(record.name());
        let mut labels = record.labels().peekable();
        if labels.peek().is_some() {
            out.push('{');
            for (i, (key, value)) in labels.enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{key}=\"{}\"", escape_label(value));
            }
            out.push('}');
        }
        let _ = writeln!(out, " {}", format_value(record.value()));
    }
    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Integral values print without a fractional part, everything else with
/// Rust's shortest float representation.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use crate::config::Config;
    use crate::metrics::catalog;

    #[test]
    fn test_render_records_groups_headers() {
        let records = vec![
            catalog::UP.record(&[], 1.0),
            catalog::NETWORK_PORT.record(&["sid", "ovsdb-server", "default"], 1.0),
            catalog::NETWORK_PORT.record(&["sid", "ovsdb-server", "ssl"], 0.0),
        ];
        let text = render_records(&records);

        let expected = "\
# HELP ovs_up Whether the vswitch stack is up (1) or down (0).\n\
# TYPE ovs_up gauge\n\
ovs_up 1\n\
# HELP ovs_network_port Whether the TCP port used for database connections is in use (1) or not (0).\n\
# TYPE ovs_network_port gauge\n\
ovs_network_port{system_id=\"sid\",component=\"ovsdb-server\",usage=\"default\"} 1\n\
ovs_network_port{system_id=\"sid\",component=\"ovsdb-server\",usage=\"ssl\"} 0\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_label_escaping() {
        let record = catalog::NETWORK_PORT.record(&["s\"d\\x\ny", "c", "default"], 1.0);
        let text = render_records(&[record]);
        assert!(text.contains("system_id=\"s\\\"d\\\\x\\ny\""));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(12345.0), "12345");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(1.04), "1.04");
        assert_eq!(format_value(-2.0), "-2");
    }

    #[test]
    fn test_render_scrapes_snapshot() {
        let exporter = Exporter::new(MockClient::typical_system(), &Config::default());
        let text = render(&exporter, 0);

        assert!(text.contains("ovs_up 1"));
        assert!(text.contains("ovs_interface_rx_bytes"));
        // Repeated scrape inside the interval renders the cached snapshot.
        let again = render(&exporter, 1);
        assert_eq!(text, again);
    }

    #[test]
    fn test_render_fallback_is_never_empty() {
        let exporter = Exporter::new(MockClient::typical_system(), &Config::default());
        let text = render_records(&exporter.fallback_records());

        assert!(text.contains("ovs_up 0"));
        assert!(text.contains("ovs_info"));
        assert!(text.contains("ovs_failed_req_count"));
        assert!(text.contains("ovs_next_poll"));
    }
}
