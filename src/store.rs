//! Metrics store collaborator
//!
//! The probe writes samples somewhere; this is the read side the monitor needs.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::{PanelError, Result};
use crate::types::MetricSample;

/// Source of metric samples
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Samples of one client with `start <= recorded_at <= end`.
    async fn fetch(
        &self,
        client_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>>;
}

/// In-process store, keyed by client id. Append-only.
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    samples: DashMap<String, Vec<MetricSample>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// افزودن نمونه
    pub fn append(&self, sample: MetricSample) {
        self.samples
            .entry(sample.client_id.clone())
            .or_default()
            .push(sample);
    }

    pub fn extend<I: IntoIterator<Item = MetricSample>>(&self, samples: I) {
        for sample in samples {
            self.append(sample);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn client_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.samples.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Load a JSON-lines file (one [`MetricSample`] per line; blank and `#` lines skipped).
    pub async fn load_jsonl(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| PanelError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let parsed = parse_jsonl(&content).map_err(|(line, source)| PanelError::Sample {
            path: path.to_path_buf(),
            line,
            source,
        })?;
        let count = parsed.len();
        self.extend(parsed);

        info!("📥 {} samples loaded from {}", count, path.display());
        Ok(count)
    }
}

fn parse_jsonl(
    content: &str,
) -> std::result::Result<Vec<MetricSample>, (usize, serde_json::Error)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| serde_json::from_str(line).map_err(|e| (n, e)))
        .collect()
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn fetch(
        &self,
        client_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>> {
        let rows: Vec<MetricSample> = self
            .samples
            .get(client_id)
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|s| s.recorded_at >= start && s.recorded_at <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!("fetch {} [{} .. {}] -> {} rows", client_id, start, end, rows.len());
        Ok(rows)
    }
}
