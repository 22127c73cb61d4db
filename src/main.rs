//! proxy-status — share links, subscriptions and status reports from the command line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use proxy_status_core::{
    config::{AppConfig, ClientEntry},
    logging,
    monitor::{MonitorConfig, StatusMonitor},
    report, InMemoryMetricsStore, LinkEncoder, Status, StatusClassifier,
};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "proxy-status",
    version,
    about = "🔗 Share links and 📊 status reports for VLESS / VMess / Trojan / Shadowsocks accounts"
)]
struct Cli {
    /// فایل پیکربندی
    #[arg(short, long, default_value = "proxy-status.toml")]
    config: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(short, long)]
    log_level: Option<String>,

    /// JSON log lines
    #[arg(long, action)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// Print share links
    Links {
        /// Only this client
        #[arg(long)]
        client: Option<String>,
    },
    /// Print the base64 subscription feed of every client
    Subscription,
    /// Connection guide of one client
    Guide {
        #[arg(long)]
        client: String,
    },
    /// Aggregate samples and classify every client
    Status {
        /// JSON-lines sample file
        #[arg(long)]
        samples: PathBuf,
        /// Print JSON instead of the table
        #[arg(long, action)]
        json: bool,
        /// Write a markdown report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Issue a new secret for a client and print the updated entry
    Regenerate {
        #[arg(long)]
        client: String,
    },
    /// Supported protocols and thresholds
    Info,
}

// ── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(Some(&cli.config))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    logging::init(&level, cli.log_json);

    match cli.command.clone() {
        Commands::Links { client } => run_links(&config, client.as_deref())?,
        Commands::Subscription => run_subscription(&config)?,
        Commands::Guide { client } => run_guide(&config, &client)?,
        Commands::Status { samples, json, report } => {
            run_status(&config, samples, json, report).await?
        }
        Commands::Regenerate { client } => run_regenerate(&config, &client)?,
        Commands::Info => print_info(&config),
    }

    Ok(())
}

// ── Command Handlers ─────────────────────────────────────────────────────────

fn run_links(config: &AppConfig, only: Option<&str>) -> Result<()> {
    let inventory = config.inventory()?;
    let encoder = LinkEncoder::new(config.links.clone());

    let selected: Vec<_> = match only {
        Some(id) => vec![inventory
            .client(id)
            .with_context(|| format!("unknown client {}", id))?],
        None => inventory.clients().collect(),
    };

    for (cred, endpoint) in selected {
        let link = encoder.encode(cred, endpoint);
        if link.is_empty() {
            warn!("⚠️ no link for {} (protocol {})", cred.id, cred.protocol);
            continue;
        }
        println!("{}", link);
    }
    Ok(())
}

fn run_subscription(config: &AppConfig) -> Result<()> {
    let inventory = config.inventory()?;
    let encoder = LinkEncoder::new(config.links.clone());
    println!("{}", encoder.subscription(inventory.clients()));
    Ok(())
}

fn run_guide(config: &AppConfig, id: &str) -> Result<()> {
    let inventory = config.inventory()?;
    let (cred, endpoint) = inventory
        .client(id)
        .with_context(|| format!("unknown client {}", id))?;
    let guide = LinkEncoder::new(config.links.clone()).guide(cred, endpoint);

    println!("{}", "═".repeat(60).cyan());
    println!("  📘 {} ({})", guide.label.bold(), guide.protocol.to_string().yellow());
    println!("{}", "═".repeat(60).cyan());
    if guide.link.is_empty() {
        println!("  ❌ {}", "no share link for this protocol".red());
        return Ok(());
    }
    println!("\n  🔗 {}\n", guide.link.green());
    println!("  📱 Client apps:");
    for app in &guide.client_apps {
        println!("  ├── {} ({})", app.name.bright_white(), app.platforms.join(", "));
    }
    Ok(())
}

async fn run_status(
    config: &AppConfig,
    samples: PathBuf,
    json: bool,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let inventory = config.inventory()?;
    let store = Arc::new(InMemoryMetricsStore::new());
    store.load_jsonl(&samples).await?;

    let monitor = StatusMonitor::new(
        store,
        StatusClassifier::new(config.thresholds.clone()),
        MonitorConfig {
            window: config.window(),
            max_concurrent: config.monitor.max_concurrent,
        },
    );
    let statuses = monitor
        .evaluate_all(&inventory.credentials(), chrono::Utc::now())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report::json_report(&statuses))?);
    } else {
        print_status_table(&statuses);
    }

    if let Some(path) = report_path {
        tokio::fs::write(&path, report::markdown_report(&statuses))
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!("💾 report saved: {}", path.display());
        println!("\n  💾 Report saved: {}", path.display());
    }
    Ok(())
}

fn print_status_table(statuses: &[proxy_status_core::ClientStatus]) {
    let summary = proxy_status_core::FleetSummary::from_statuses(statuses);

    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  📊 Proxy Status".cyan().bold());
    println!("{}", "═".repeat(60).cyan());
    println!("  ├── Clients: {}", summary.clients);
    println!("  ├── Online:  {}", summary.online.to_string().green());
    println!("  ├── Offline: {}", summary.offline.to_string().yellow());
    println!("  └── Error:   {}", summary.error.to_string().red());
    println!();

    for s in statuses {
        let status = match s.report.status {
            Status::Online => s.report.status.as_str().green(),
            Status::Offline => s.report.status.as_str().yellow(),
            Status::Error => s.report.status.as_str().red(),
        };
        let latency = match s.stats.avg_latency_rounded() {
            Some(ms) if ms < 100.0 => format!("{:.0}ms ⚡", ms).green().to_string(),
            Some(ms) if ms < 200.0 => format!("{:.0}ms", ms).yellow().to_string(),
            Some(ms) => format!("{:.0}ms 🐌", ms).red().to_string(),
            None => "—".to_string(),
        };
        let alerts: Vec<&str> = s.report.alerts.active().iter().map(|k| k.as_str()).collect();
        println!(
            "  {} {:<24} {:<8} {:>7.2}% {:>10} {:>12}  {}",
            report::status_emoji(s.report.status),
            s.label.cyan(),
            status,
            s.stats.uptime_pct,
            latency,
            report::human_bytes(s.stats.total_bytes),
            alerts.join(",").red()
        );
    }
}

fn run_regenerate(config: &AppConfig, id: &str) -> Result<()> {
    let inventory = config.inventory()?;
    let entry = inventory
        .entry(id)
        .with_context(|| format!("unknown client {}", id))?;
    let updated = ClientEntry {
        server: entry.server.clone(),
        credential: entry.credential.regenerate(),
    };
    info!("🔑 new secret issued for {}", id);

    #[derive(serde::Serialize)]
    struct Snippet<'a> {
        clients: [&'a ClientEntry; 1],
    }
    println!("{}", toml::to_string(&Snippet { clients: [&updated] })?);

    if let Some(endpoint) = inventory.server(&updated.server) {
        let link = LinkEncoder::new(config.links.clone()).encode(&updated.credential, endpoint);
        if !link.is_empty() {
            println!("# new link (previous links no longer work)\n# {}", link);
        }
    }
    Ok(())
}

fn print_info(config: &AppConfig) {
    println!("{}", "  🔗 Protocols".cyan().bold());
    println!("  ├── vless       vless://<uuid>@host:port?...#label");
    println!("  ├── vmess       vmess://<base64 json>");
    println!("  ├── trojan      trojan://<password>@host:port?...#label");
    println!("  └── shadowsocks ss://<base64 {}:secret>@host:port#label", config.links.shadowsocks_method);
    println!();
    println!("{}", "  🚨 Alerts".cyan().bold());
    println!("  ├── high_latency   avg > {} ms", config.thresholds.high_latency_ms);
    println!("  ├── low_uptime     uptime < {}%", config.thresholds.low_uptime_pct);
    println!("  ├── expiring_soon  1..={} days left", config.thresholds.expiry_warning_days);
    println!("  └── expired        0 or fewer days left");
    println!();
    println!("  ⏱  window: {}h", config.monitor.window_hours);
}
