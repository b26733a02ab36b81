//! In-memory call-traffic log exposed through `/metrics` and `/status`.
//!
//! [`TrafficLog`] is a fixed-capacity ring buffer: once full, the oldest
//! entry is evicted to make room for the newest. This gives a bounded, O(1)
//! memory footprint regardless of request volume, in the style of the
//! teacher's `traffic.rs`.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct TrafficLog {
    capacity: usize,
    entries: Mutex<VecDeque<TrafficEntry>>,
}

impl TrafficLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    /// Record a completed call. Best-effort and non-blocking: under lock
    /// contention the entry is dropped rather than delaying the response.
    pub fn push(&self, entry: TrafficEntry) {
        if let Ok(mut entries) = self.entries.try_lock() {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    pub async fn recent(&self, limit: usize) -> Vec<TrafficEntry> {
        let entries = self.entries.lock().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub async fn stats(&self) -> TrafficStats {
        let entries = self.entries.lock().await;
        let total = entries.len();
        let avg_latency_ms = if total == 0 {
            0.0
        } else {
            entries.iter().map(|e| e.latency_ms as f64).sum::<f64>() / total as f64
        };
        let error_count = entries.iter().filter(|e| !e.success).count();

        let mut method_counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for entry in entries.iter() {
            *method_counts.entry(entry.method.clone()).or_default() += 1;
        }

        TrafficStats { total_requests: total, error_count, avg_latency_ms, method_counts }
    }
}

/// One demultiplexed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub backends_called: Vec<String>,
    pub backends_skipped: Vec<String>,
    pub latency_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl TrafficEntry {
    pub fn new(method: String, latency_ms: u64, success: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            method,
            backends_called: Vec::new(),
            backends_skipped: Vec::new(),
            latency_ms,
            success,
            error: None,
        }
    }

    pub fn with_backends(mut self, called: Vec<String>, skipped: Vec<String>) -> Self {
        self.backends_called = called;
        self.backends_skipped = skipped;
        self
    }

    pub fn with_error(mut self, err: &str) -> Self {
        self.error = Some(err.to_string());
        self
    }
}

#[derive(Debug, Serialize)]
pub struct TrafficStats {
    pub total_requests: usize,
    pub error_count: usize,
    pub avg_latency_ms: f64,
    pub method_counts: std::collections::HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(method: &str, latency_ms: u64, success: bool) -> TrafficEntry {
        TrafficEntry::new(method.into(), latency_ms, success)
    }

    #[tokio::test]
    async fn push_and_retrieve_single_entry() {
        let log = TrafficLog::new(10);
        log.push(make_entry("system.listSystems", 42, true));
        let recent = log.recent(10).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].method, "system.listSystems");
    }

    #[tokio::test]
    async fn oldest_entry_evicted_when_capacity_exceeded() {
        let log = TrafficLog::new(2);
        log.push(make_entry("a", 1, true));
        log.push(make_entry("b", 2, true));
        log.push(make_entry("c", 3, true));

        let all = log.recent(100).await;
        assert_eq!(all.len(), 2);
        assert!(!all.iter().any(|e| e.method == "a"));
    }

    #[tokio::test]
    async fn stats_compute_average_latency_and_error_count() {
        let log = TrafficLog::new(10);
        log.push(make_entry("a", 100, true));
        log.push(make_entry("a", 200, false));

        let stats = log.stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.error_count, 1);
        assert!((stats.avg_latency_ms - 150.0).abs() < f64::EPSILON);
        assert_eq!(stats.method_counts["a"], 2);
    }
}
