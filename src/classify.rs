//! Status Classifier
//!
//! وضعیت نمایش + هشدارها از روی آمار تجمیعی. Stateless per call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AggregateStats, EXPIRY_WARNING_DAYS, HIGH_LATENCY_MS, LOW_UPTIME_PCT};

/// وضعیت
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Last sample was online
    Online,
    /// Last sample offline, or no samples at all
    Offline,
    /// Endpoint unreachable when classifying (reported by the caller)
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighLatency,
    LowUptime,
    ExpiringSoon,
    Expired,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighLatency => "high_latency",
            Self::LowUptime => "low_uptime",
            Self::ExpiringSoon => "expiring_soon",
            Self::Expired => "expired",
        }
    }
}

/// Independent alert flags; any combination may be raised together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    pub high_latency: bool,
    pub low_uptime: bool,
    pub expiring_soon: bool,
    pub expired: bool,
}

impl Alerts {
    pub fn active(&self) -> Vec<AlertKind> {
        [
            (self.high_latency, AlertKind::HighLatency),
            (self.low_uptime, AlertKind::LowUptime),
            (self.expiring_soon, AlertKind::ExpiringSoon),
            (self.expired, AlertKind::Expired),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect()
    }

    pub fn any(&self) -> bool {
        self.high_latency || self.low_uptime || self.expiring_soon || self.expired
    }

    /// Only the expiry flags; health flags need samples to mean anything.
    pub fn expiry_only(self) -> Self {
        Self {
            high_latency: false,
            low_uptime: false,
            ..self
        }
    }
}

/// آستانه‌های هشدار
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Average latency above this raises high_latency
    pub high_latency_ms: f64,
    /// Uptime below this raises low_uptime
    pub low_uptime_pct: f64,
    /// expiring_soon covers 1..=this many days
    pub expiry_warning_days: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_latency_ms: HIGH_LATENCY_MS,
            low_uptime_pct: LOW_UPTIME_PCT,
            expiry_warning_days: EXPIRY_WARNING_DAYS,
        }
    }
}

/// Result of one classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: Status,
    pub alerts: Alerts,
    /// Calendar days (UTC dates) from now to expiry, negative once past.
    /// An account expiring later today is at 0 and already flagged `expired`,
    /// so dashboards should show the expiry timestamp next to the flag.
    pub days_until_expiry: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusClassifier {
    thresholds: Thresholds,
}

impl StatusClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// طبقه‌بندی وضعیت
    pub fn classify(
        &self,
        stats: &AggregateStats,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        reachable: bool,
    ) -> StatusReport {
        let status = if !reachable {
            Status::Error
        } else if stats.is_online == Some(true) {
            Status::Online
        } else {
            Status::Offline
        };

        let days_until_expiry = expires_at.map(|exp| days_between(now, exp));

        let alerts = Alerts {
            high_latency: stats
                .avg_latency_ms
                .is_some_and(|avg| avg > self.thresholds.high_latency_ms),
            low_uptime: stats.uptime_pct < self.thresholds.low_uptime_pct,
            expiring_soon: days_until_expiry
                .is_some_and(|d| (1..=self.thresholds.expiry_warning_days).contains(&d)),
            expired: days_until_expiry.is_some_and(|d| d <= 0),
        };

        StatusReport {
            status,
            alerts,
            days_until_expiry,
        }
    }
}

/// Calendar-day difference in UTC (time of day ignored).
pub fn days_between(now: DateTime<Utc>, expiry: DateTime<Utc>) -> i64 {
    (expiry.date_naive() - now.date_naive()).num_days()
}
