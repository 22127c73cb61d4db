//! Markdown / JSON status reports

use serde_json::json;

use crate::classify::Status;
use crate::monitor::{ClientStatus, FleetSummary};

/// گزارش Markdown
pub fn markdown_report(statuses: &[ClientStatus]) -> String {
    let summary = FleetSummary::from_statuses(statuses);

    let mut md = String::new();
    md.push_str("# Proxy Status Report\n\n");
    md.push_str(&format!(
        "![online](https://img.shields.io/badge/online-{}-green) \
         ![offline](https://img.shields.io/badge/offline-{}-lightgrey) \
         ![error](https://img.shields.io/badge/error-{}-red) \
         ![alerts](https://img.shields.io/badge/alerts-{}-orange)\n\n",
        summary.online, summary.offline, summary.error, summary.with_alerts
    ));
    if let Some(uptime) = summary.avg_uptime_pct {
        md.push_str(&format!("Average uptime: **{:.2}%**\n\n", uptime));
    }

    md.push_str("| # | Client | Protocol | Status | Uptime | Latency | Traffic | Alerts |\n");
    md.push_str("|---|--------|----------|--------|--------|---------|---------|--------|\n");
    for (i, s) in statuses.iter().enumerate() {
        let latency = s
            .stats
            .avg_latency_rounded()
            .map(|l| format!("{:.2}ms", l))
            .unwrap_or_else(|| "—".to_string());
        let alerts: Vec<&str> = s.report.alerts.active().iter().map(|k| k.as_str()).collect();
        md.push_str(&format!(
            "| {} | `{}` | {} | {} {} | {:.2}% | {} | {} | {} |\n",
            i + 1,
            s.label,
            s.protocol,
            status_emoji(s.report.status),
            s.report.status,
            s.stats.uptime_pct,
            latency,
            human_bytes(s.stats.total_bytes),
            if alerts.is_empty() { "-".to_string() } else { alerts.join(", ") },
        ));
    }
    md
}

pub fn json_report(statuses: &[ClientStatus]) -> serde_json::Value {
    json!({
        "summary": FleetSummary::from_statuses(statuses),
        "clients": statuses,
    })
}

pub fn status_emoji(status: Status) -> &'static str {
    match status {
        Status::Online => "🟢",
        Status::Offline => "⚪",
        Status::Error => "🔴",
    }
}

/// 1536 → "1.50 KiB"
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
