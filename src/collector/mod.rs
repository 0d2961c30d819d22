//! The polling core: rate-limited scheduler, collection pipeline and the
//! concurrency-safe snapshot store.
//!
//! [`Exporter`] reconciles two kinds of callers. Scrape handlers call
//! [`Exporter::collect`] concurrently; a pass against the backend is
//! expensive, so at most one runs at a time and only when the poll interval
//! has elapsed. Everyone else gets the cached snapshot.
//!
//! Lock discipline: the due-check, the whole pass and the `next_poll_at`
//! update happen under one pass mutex, so two triggers racing past a stale
//! due-check cannot both start a pass. The published snapshot is an
//! `Arc<Vec<MetricRecord>>` behind an `RwLock`; readers clone the `Arc`
//! under the shared lock and are blocked only for the final swap, never for
//! the duration of a pass. The error counter is an independent atomic so a
//! failing probe never contends with readers or with the pass lock.

mod pass;

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::client::{OvsClient, SystemInfo};
use crate::config::Config;
use crate::metrics::{MetricRecord, catalog};

/// Metrics-polling cache in front of a vswitch backend client.
pub struct Exporter<C> {
    client: C,
    interval_secs: i64,
    collect_process_metrics: bool,

    /// Serializes due-check plus pass execution (single-flight).
    pass_lock: Mutex<()>,
    /// Unix timestamp before which `collect` serves the cache.
    next_poll_at: AtomicI64,
    snapshot: RwLock<Arc<Vec<MetricRecord>>>,
    /// Cumulative count of failed backend requests since start.
    errors: AtomicU64,
    /// Last successfully probed identity, kept for degraded passes and the
    /// no-pass-yet fallback.
    identity: RwLock<SystemInfo>,
}

impl<C: OvsClient> Exporter<C> {
    pub fn new(client: C, config: &Config) -> Self {
        Self {
            client,
            interval_secs: config.poll_interval_secs.max(1),
            collect_process_metrics: config.collect_process_metrics,
            pass_lock: Mutex::new(()),
            next_poll_at: AtomicI64::new(0),
            snapshot: RwLock::new(Arc::new(Vec::new())),
            errors: AtomicU64::new(0),
            identity: RwLock::new(SystemInfo::default()),
        }
    }

    /// Runs a collection pass if one is due, then returns the current
    /// snapshot. When the interval has not elapsed, this returns the cached
    /// snapshot unchanged (the same `Arc`).
    pub fn collect(&self, now: i64) -> Arc<Vec<MetricRecord>> {
        let _pass = self.pass_lock.lock().unwrap();
        if now < self.next_poll_at.load(Ordering::SeqCst) {
            return self.read();
        }

        let records = Arc::new(self.run_pass(now));
        *self.snapshot.write().unwrap() = Arc::clone(&records);
        self.next_poll_at
            .store(now + self.interval_secs, Ordering::SeqCst);
        records
    }

    /// Returns the current snapshot without any side effects. Before the
    /// first completed pass this is empty; [`Exporter::fallback_records`]
    /// covers that case at the emission boundary.
    pub fn read(&self) -> Arc<Vec<MetricRecord>> {
        Arc::clone(&self.snapshot.read().unwrap())
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::SeqCst)
    }

    pub fn next_poll_at(&self) -> i64 {
        self.next_poll_at.load(Ordering::SeqCst)
    }

    /// Minimal record set served when no pass has ever completed: liveness
    /// down plus the identity, error-count and next-poll bookkeeping.
    pub fn fallback_records(&self) -> Vec<MetricRecord> {
        let system = self.identity.read().unwrap().clone();
        let sid = system.system_id.as_str();
        vec![
            catalog::UP.record(&[], 0.0),
            catalog::INFO.record(
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
            ),
            catalog::REQUEST_ERRORS.record(&[sid], self.error_count() as f64),
            catalog::NEXT_POLL.record(&[sid], self.next_poll_at() as f64),
        ]
    }

    fn bump_errors(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;

    fn exporter(client: MockClient) -> Exporter<MockClient> {
        Exporter::new(client, &Config::default())
    }

    #[test]
    fn test_cached_until_due() {
        let e = exporter(MockClient::typical_system());

        let first = e.collect(0);
        assert!(!first.is_empty());
        assert_eq!(e.next_poll_at(), 15);

        // Not yet due: the very same snapshot comes back.
        let cached = e.collect(10);
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(e.next_poll_at(), 15);

        // Due: a fresh pass runs and the horizon advances from `now`.
        let fresh = e.collect(16);
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(e.next_poll_at(), 31);
    }

    #[test]
    fn test_minimum_interval_granularity() {
        let mut config = Config::default();
        config.poll_interval_secs = 0;
        let e = Exporter::new(MockClient::typical_system(), &config);
        e.collect(100);
        assert_eq!(e.next_poll_at(), 101);
    }

    #[test]
    fn test_read_before_first_pass_is_empty() {
        let e = exporter(MockClient::typical_system());
        assert!(e.read().is_empty());
        assert_eq!(e.error_count(), 0);
        assert_eq!(e.next_poll_at(), 0);
    }

    #[test]
    fn test_accessors_do_not_trigger_a_pass() {
        let e = exporter(MockClient::typical_system());
        let _ = e.error_count();
        let _ = e.next_poll_at();
        let _ = e.read();
        assert!(e.read().is_empty());
    }

    #[test]
    fn test_error_counter_is_cumulative() {
        let e = exporter(MockClient::unreachable());

        e.collect(0);
        let after_first = e.error_count();
        assert!(after_first > 0);

        e.collect(20);
        assert_eq!(e.error_count(), after_first * 2);
    }

    #[test]
    fn test_fallback_records() {
        let e = exporter(MockClient::typical_system());
        let records = e.fallback_records();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].name(), "ovs_up");
        assert_eq!(records[0].value(), 0.0);
        assert_eq!(records[1].name(), "ovs_info");
        assert_eq!(records[2].name(), "ovs_failed_req_count");
        assert_eq!(records[3].name(), "ovs_next_poll");
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let e = exporter(MockClient::typical_system());
        let expected = e.collect(0).len();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let e = &e;
                scope.spawn(move || {
                    for i in 0..200 {
                        let snapshot = e.collect((worker * 200 + i) as i64);
                        assert_eq!(snapshot.len(), expected);
                    }
                });
            }
        });
    }
}
