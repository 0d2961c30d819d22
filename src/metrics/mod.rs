//! Metric record model and the static descriptor catalogue.
//!
//! Every metric the exporter can produce is declared once in [`catalog`] as a
//! [`MetricDesc`] with a fixed, ordered set of label keys. Records are built
//! through their descriptor, so two records of the same metric name always
//! carry the same label keys in the same order.

pub mod catalog;

use std::fmt;

/// Whether a metric accumulates (counter) or represents a point-in-time
/// value (gauge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Counter => write!(f, "counter"),
        }
    }
}

/// Static description of one exported metric: its name, help text, kind and
/// the ordered label keys every record of this metric carries.
#[derive(Debug)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

impl MetricDesc {
    /// Builds a record for this descriptor.
    ///
    /// # Panics
    /// Panics if the number of label values does not match the descriptor's
    /// label keys. Descriptors and their call sites are both static, so a
    /// mismatch is a programming error, not an input error.
    pub fn record(&'static self, label_values: &[&str], value: f64) -> MetricRecord {
        assert_eq!(
            label_values.len(),
            self.labels.len(),
            "label arity mismatch for metric {}",
            self.name
        );
        MetricRecord {
            desc: self,
            label_values: label_values.iter().map(|v| v.to_string()).collect(),
            value,
        }
    }
}

/// One collected sample: a descriptor, its label values and a numeric value.
///
/// Records are immutable once created and identified structurally by name
/// plus label set. Duplicates are legal; the store does not deduplicate.
#[derive(Debug, Clone)]
pub struct MetricRecord {
    desc: &'static MetricDesc,
    label_values: Vec<String>,
    value: f64,
}

impl MetricRecord {
    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    pub fn kind(&self) -> MetricKind {
        self.desc.kind
    }

    pub fn help(&self) -> &'static str {
        self.desc.help
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Ordered (key, value) label pairs.
    pub fn labels(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.desc
            .labels
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
    }

    /// Looks up a single label value by key.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::catalog;

    #[test]
    fn test_record_labels_ordered() {
        let rec = catalog::INFO.record(
            &["id1", "/var/run", "host1", "ubuntu", "22.04", "3.1.0", "8.3.0"],
            1.0,
        );
        let labels: Vec<_> = rec.labels().collect();
        assert_eq!(labels[0], ("system_id", "id1"));
        assert_eq!(labels[1], ("rundir", "/var/run"));
        assert_eq!(labels[6], ("db_version", "8.3.0"));
        assert_eq!(rec.label("hostname"), Some("host1"));
        assert_eq!(rec.label("nope"), None);
    }

    #[test]
    #[should_panic(expected = "label arity mismatch")]
    fn test_record_arity_checked() {
        catalog::UP.record(&["unexpected"], 1.0);
    }
}
