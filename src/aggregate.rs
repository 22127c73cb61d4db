//! Metric Aggregator
//!
//! Reduces one client's samples (one time window) to [`AggregateStats`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::types::{AggregateStats, MetricSample};

/// خلاصه‌سازی نمونه‌ها
///
/// An empty slice yields the "no data" result: uptime 0, no latency, no last sample.
pub fn aggregate(samples: &[MetricSample]) -> AggregateStats {
    let Some(last) = latest(samples) else {
        return AggregateStats::default();
    };

    let total = samples.len();
    let online = samples.iter().filter(|s| s.online).count();

    let latencies: Vec<f64> = samples
        .iter()
        .filter(|s| s.online)
        .filter_map(|s| s.latency_ms)
        .collect();
    let avg_latency_ms = if latencies.is_empty() {
        None
    } else {
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    };

    let total_bytes = samples
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.bytes));

    AggregateStats {
        sample_count: total,
        online_count: online,
        uptime_pct: uptime_pct(online, total),
        avg_latency_ms,
        total_bytes,
        last_seen: Some(last.recorded_at),
        is_online: Some(last.online),
    }
}

/// Keeps samples with `start <= recorded_at <= end`, then aggregates.
pub fn aggregate_window(
    samples: &[MetricSample],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AggregateStats {
    let in_window: Vec<MetricSample> = samples
        .iter()
        .filter(|s| s.recorded_at >= start && s.recorded_at <= end)
        .cloned()
        .collect();
    aggregate(&in_window)
}

/// `round(100 * online / max(1, total), 2)`
pub fn uptime_pct(online: usize, total: usize) -> f64 {
    let pct = 100.0 * online as f64 / total.max(1) as f64;
    round2(pct).clamp(0.0, 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Greatest timestamp, then greatest id, then latest position in the slice.
fn latest(samples: &[MetricSample]) -> Option<&MetricSample> {
    samples
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| ia.cmp(ib))
        })
        .map(|(_, s)| s)
}

impl AggregateStats {
    /// Average latency rounded to two decimals, for display.
    pub fn avg_latency_rounded(&self) -> Option<f64> {
        self.avg_latency_ms.map(round2)
    }

    pub fn has_data(&self) -> bool {
        self.sample_count > 0
    }
}

/// Sort helper used by reports: highest uptime first, unknown latency last.
pub fn compare_health(a: &AggregateStats, b: &AggregateStats) -> Ordering {
    b.uptime_pct
        .partial_cmp(&a.uptime_pct)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match (a.avg_latency_ms, b.avg_latency_ms) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
