//! Status Monitor
//!
//! Fetch → aggregate → classify for every client, with bounded parallelism.
//! مانیتورینگ وضعیت کلاینت‌ها

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, round2};
use crate::classify::{AlertKind, Alerts, Status, StatusClassifier, StatusReport};
use crate::store::MetricsStore;
use crate::types::{AggregateStats, ClientCredential};

/// تنظیمات مانیتور
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Window looked back from `now`
    pub window: Duration,
    /// Concurrent store fetches
    pub max_concurrent: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window: Duration::hours(24),
            max_concurrent: 16,
        }
    }
}

/// Status of one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub client_id: String,
    pub label: String,
    pub protocol: String,
    pub stats: AggregateStats,
    pub report: StatusReport,
    /// Set when the store could not be read
    pub error: Option<String>,
}

pub struct StatusMonitor<S: MetricsStore> {
    store: Arc<S>,
    classifier: StatusClassifier,
    config: MonitorConfig,
}

impl<S: MetricsStore + 'static> StatusMonitor<S> {
    pub fn new(store: Arc<S>, classifier: StatusClassifier, config: MonitorConfig) -> Self {
        Self {
            store,
            classifier,
            config,
        }
    }

    pub fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    /// ارزیابی یک کلاینت
    pub async fn evaluate(&self, client: &ClientCredential, now: DateTime<Utc>) -> ClientStatus {
        let start = now - self.config.window;
        let (stats, reachable, error) = match self.store.fetch(&client.id, start, now).await {
            Ok(samples) => (aggregate(&samples), true, None),
            Err(e) => {
                warn!("⚠️ metrics for {} unavailable: {}", client.id, e);
                (AggregateStats::default(), false, Some(e.to_string()))
            }
        };

        let mut report = self
            .classifier
            .classify(&stats, client.expires_at, now, reachable);
        if error.is_some() {
            // No samples were read, so uptime and latency are unknown, not bad
            report.alerts = report.alerts.expiry_only();
        }

        for kind in report.alerts.active() {
            warn!("🚨 {} [{}]: {}", client.display_label(), client.id, kind.as_str());
            metrics::increment_counter!("status_alerts_total", "kind" => kind.as_str());
        }
        debug!(
            "{} → {} (uptime {:.2}%, latency {:?})",
            client.id, report.status, stats.uptime_pct, stats.avg_latency_ms
        );

        ClientStatus {
            client_id: client.id.clone(),
            label: client.display_label(),
            protocol: client.protocol.to_string(),
            stats,
            report,
            error,
        }
    }

    /// All clients, at most `max_concurrent` in flight. Output follows input order.
    pub async fn evaluate_all(
        &self,
        clients: &[ClientCredential],
        now: DateTime<Utc>,
    ) -> Vec<ClientStatus> {
        info!("🔍 evaluating {} clients", clients.len());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));

        let tasks = clients.iter().map(|client| {
            let sem = semaphore.clone();
            async move {
                let _permit = sem.acquire().await.ok();
                self.evaluate(client, now).await
            }
        });
        let statuses = join_all(tasks).await;

        let summary = FleetSummary::from_statuses(&statuses);
        info!(
            "✅ {} online / {} offline / {} error, {} with alerts",
            summary.online, summary.offline, summary.error, summary.with_alerts
        );
        statuses
    }
}

/// Fleet-wide totals for the overview cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub clients: usize,
    pub online: usize,
    pub offline: usize,
    pub error: usize,
    pub with_alerts: usize,
    pub alert_counts: BTreeMap<String, usize>,
    /// Mean uptime over clients that have samples
    pub avg_uptime_pct: Option<f64>,
    pub total_bytes: u64,
}

impl FleetSummary {
    pub fn from_statuses(statuses: &[ClientStatus]) -> Self {
        let mut summary = Self {
            clients: statuses.len(),
            ..Default::default()
        };

        let mut uptimes = Vec::new();
        for s in statuses {
            match s.report.status {
                Status::Online => summary.online += 1,
                Status::Offline => summary.offline += 1,
                Status::Error => summary.error += 1,
            }
            if s.report.alerts.any() {
                summary.with_alerts += 1;
            }
            for kind in s.report.alerts.active() {
                *summary.alert_counts.entry(kind.as_str().to_string()).or_default() += 1;
            }
            if s.stats.has_data() {
                uptimes.push(s.stats.uptime_pct);
            }
            summary.total_bytes = summary.total_bytes.saturating_add(s.stats.total_bytes);
        }

        if !uptimes.is_empty() {
            summary.avg_uptime_pct = Some(round2(uptimes.iter().sum::<f64>() / uptimes.len() as f64));
        }
        summary
    }

    pub fn alert_count(&self, kind: AlertKind) -> usize {
        self.alert_counts.get(kind.as_str()).copied().unwrap_or(0)
    }
}

/// Statuses with any alert raised.
pub fn alerting(statuses: &[ClientStatus]) -> impl Iterator<Item = &ClientStatus> {
    statuses.iter().filter(|s| s.report.alerts != Alerts::default())
}
