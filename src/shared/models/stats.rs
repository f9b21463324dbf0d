//! Process-wide statistics collector.
//!
//! Spec §5/§9: a "process-wide statistics collector (counters only;
//! initialized lazily, written by every component, read at end-of-run)...
//! logically owned by the orchestrator and must not outlive the run." Rather
//! than a global singleton this is an explicit struct threaded through every
//! component, as the design note in spec §9 prescribes. Counter names are
//! open-ended (components register whatever they need, e.g. `unsafe_cast`),
//! so the backing map is keyed by `&'static str` rather than a fixed enum.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Counters collected during one analysis run.
///
/// Lock-free increments for existing keys; new keys take a brief `Mutex` lock
/// to insert. `BTreeMap` keeps the eventual text dump sorted, so output is
/// deterministic independent of insertion order (spec §8, property 5).
#[derive(Debug, Default)]
pub struct AnalysisContext {
    counters: Mutex<BTreeMap<&'static str, AtomicU64>>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a named counter by `delta`, creating it at zero if absent.
    pub fn add(&self, key: &'static str, delta: u64) {
        let map = self.counters.lock().expect("stats mutex poisoned");
        if let Some(counter) = map.get(key) {
            counter.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        drop(map);
        let mut map = self.counters.lock().expect("stats mutex poisoned");
        map.entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
    }

    pub fn incr(&self, key: &'static str) {
        self.add(key, 1);
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counters
            .lock()
            .expect("stats mutex poisoned")
            .get(key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Snapshot all counters as a sorted `key=value` sequence, the format
    /// `ProjectionStats`/`KernelIdiomStats`/etc. (spec §6) are written in.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.counters
            .lock()
            .expect("stats mutex poisoned")
            .iter()
            .map(|(k, v)| (k.to_string(), v.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn render_kv(&self) -> String {
        self.snapshot()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
