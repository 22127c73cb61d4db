//! Status Watch — پروسه پس‌زمینه برای هشدارهای وضعیت

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::interval;
use tracing::{error, info};

use proxy_status_core::{
    logging,
    monitor::{alerting, FleetSummary, MonitorConfig, StatusMonitor},
    AppConfig, InMemoryMetricsStore, StatusClassifier,
};

#[derive(Debug, Parser)]
#[command(name = "status-watch", version)]
struct Cli {
    #[arg(short, long, default_value = "proxy-status.toml")]
    config: PathBuf,
    /// JSON-lines sample file, re-read every tick
    #[arg(long)]
    samples: PathBuf,
    /// Overrides monitor.interval_secs
    #[arg(long)]
    interval: Option<u64>,
    /// Evaluate once and exit
    #[arg(long, action)]
    once: bool,
    #[arg(long, action)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    logging::init(config.log_level.as_deref().unwrap_or("info"), cli.log_json);

    let inventory = config.inventory()?;
    let clients = inventory.credentials();
    let period = Duration::from_secs(cli.interval.unwrap_or(config.monitor.interval_secs).max(1));
    info!("🌙 status-watch started: {} clients, every {:?}", clients.len(), period);

    let mut tick = interval(period);
    loop {
        tick.tick().await;

        // The probe appends to the file between ticks; start from a fresh store each time
        let store = Arc::new(InMemoryMetricsStore::new());
        if let Err(e) = store.load_jsonl(&cli.samples).await {
            error!("❌ {}", e);
            if cli.once {
                return Err(e.into());
            }
            continue;
        }

        let monitor = StatusMonitor::new(
            store,
            StatusClassifier::new(config.thresholds.clone()),
            MonitorConfig {
                window: config.window(),
                max_concurrent: config.monitor.max_concurrent,
            },
        );
        let statuses = monitor.evaluate_all(&clients, chrono::Utc::now()).await;
        let summary = FleetSummary::from_statuses(&statuses);
        info!(
            "📊 uptime {:?}% | {} clients alerting",
            summary.avg_uptime_pct,
            alerting(&statuses).count()
        );

        if cli.once {
            return Ok(());
        }
    }
}
