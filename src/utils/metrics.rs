//! Metrics collection for pipeline runs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

/// Counters and accumulated timers, shared by every clone of a pipeline
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    counters: Arc<RwLock<HashMap<String, u64>>>,
    timers: Arc<RwLock<HashMap<String, Duration>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_counter(&self, name: &str) {
        self.add_to_counter(name, 1);
    }

    pub fn add_to_counter(&self, name: &str, amount: u64) {
        let mut counters = self.counters.write();
        *counters.entry(name.to_string()).or_insert(0) += amount;
    }

    /// Adds `elapsed` to the named timer
    pub fn record_duration(&self, name: &str, elapsed: Duration) {
        let mut timers = self.timers.write();
        *timers.entry(name.to_string()).or_default() += elapsed;
    }

    pub fn get_counter(&self, name: &str) -> u64 {
        self.counters.read().get(name).copied().unwrap_or(0)
    }

    pub fn get_timer(&self, name: &str) -> Option<Duration> {
        self.timers.read().get(name).copied()
    }

    pub fn reset(&self) {
        self.counters.write().clear();
        self.timers.write().clear();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.read().clone(),
            timers_ms: self
                .timers
                .read()
                .iter()
                .map(|(name, elapsed)| (name.clone(), elapsed.as_millis() as u64))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub timers_ms: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        clone.increment_counter("documents");
        metrics.add_to_counter("documents", 2);
        assert_eq!(metrics.get_counter("documents"), 3);
        assert_eq!(metrics.get_counter("missing"), 0);
    }

    #[test]
    fn test_timers_accumulate() {
        let metrics = Metrics::new();
        metrics.record_duration("extraction", Duration::from_millis(5));
        metrics.record_duration("extraction", Duration::from_millis(7));
        assert_eq!(metrics.get_timer("extraction"), Some(Duration::from_millis(12)));
        assert_eq!(metrics.snapshot().timers_ms["extraction"], 12);

        metrics.reset();
        assert_eq!(metrics.get_timer("extraction"), None);
    }
}
