//! Logging setup shared by the binaries

use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins; otherwise `fallback` (e.g. "info", "proxy_status_core=debug").
pub fn init(fallback: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().try_init().ok();
    } else {
        builder.try_init().ok();
    }
}
