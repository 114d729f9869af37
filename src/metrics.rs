//! Feed refresh metrics collection and reporting
//!
//! Tracks latency percentiles and success rates of provider chain runs,
//! one collector per feed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Metrics for a single feed
#[derive(Debug, Clone)]
pub struct FeedMetrics {
    /// Name of the feed
    pub feed: String,
    /// 50th percentile refresh latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile refresh latency in milliseconds
    pub latency_p99_ms: f64,
    /// Share of refreshes served by a provider (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of completed refreshes
    pub total_refreshes: u64,
    /// Refreshes where every provider failed
    pub failed_refreshes: u64,
    /// Provider that served the most recent successful refresh
    pub last_provider: Option<&'static str>,
}

impl FeedMetrics {
    /// Creates metrics with no data
    pub fn empty(feed: &str) -> Self {
        Self {
            feed: feed.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_refreshes: 0,
            failed_refreshes: 0,
            last_provider: None,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    failed: u64,
    last_provider: Option<&'static str>,
}

/// Collects and computes metrics for one feed
pub struct MetricsCollector {
    feed: String,
    /// Rolling window of latency samples
    samples: Arc<RwLock<VecDeque<LatencySample>>>,
    /// Lifetime counters
    counters: Arc<RwLock<Counters>>,
}

impl MetricsCollector {
    pub fn new(feed: &str) -> Self {
        Self {
            feed: feed.to_string(),
            samples: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_SAMPLES))),
            counters: Arc::new(RwLock::new(Counters::default())),
        }
    }

    /// Records a finished refresh; `provider` is the strategy that served it
    pub async fn record_refresh(&self, duration: Duration, provider: Option<&'static str>) {
        let success = provider.is_some();

        {
            let mut counters = self.counters.write().await;
            counters.total += 1;
            if success {
                counters.last_provider = provider;
            } else {
                counters.failed += 1;
            }
        }

        let mut samples = self.samples.write().await;
        if samples.len() >= MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> FeedMetrics {
        let samples = self.samples.read().await;
        let counters = self.counters.read().await;

        if samples.is_empty() {
            return FeedMetrics::empty(&self.feed);
        }

        // Percentiles over successful refreshes only
        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if counters.total > 0 {
            (counters.total - counters.failed) as f64 / counters.total as f64
        } else {
            1.0
        };

        FeedMetrics {
            feed: self.feed.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_refreshes: counters.total,
            failed_refreshes: counters.failed,
            last_provider: counters.last_provider,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
