//! proxy-status-core — share links and status aggregation for proxy accounts
//!
//! لینک اشتراک‌گذاری، آمار مصرف و وضعیت سرویس برای کلاینت‌های
//! VLESS / VMess / Trojan / Shadowsocks.
//!
//! Counters (`links_encoded_total`, `status_alerts_total`) go through the
//! `metrics` facade. They are dropped unless the embedding application
//! installs a recorder; the bundled binaries do not.

// ── Core ────────────────────────────────────────────────────────────────────
pub mod types;
pub mod error;
pub mod config;

// ── Links ───────────────────────────────────────────────────────────────────
pub mod link;

// ── Status ──────────────────────────────────────────────────────────────────
pub mod aggregate;
pub mod classify;
pub mod store;
pub mod monitor;

// ── Utilities ───────────────────────────────────────────────────────────────
pub mod report;
pub mod logging;

// ── Re-exports ──────────────────────────────────────────────────────────────

pub use types::{
    AggregateStats, ClientCredential, MetricSample, Protocol, ServerEndpoint, DEFAULT_PORT,
    SHADOWSOCKS_METHOD,
};

pub use aggregate::{aggregate, aggregate_window};
pub use classify::{AlertKind, Alerts, Status, StatusClassifier, StatusReport, Thresholds};
pub use config::{AppConfig, Inventory};
pub use error::PanelError;
pub use link::{encode_link, ConfigGuide, LinkEncoder, LinkOptions};
pub use monitor::{ClientStatus, FleetSummary, MonitorConfig, StatusMonitor};
pub use store::{InMemoryMetricsStore, MetricsStore};
