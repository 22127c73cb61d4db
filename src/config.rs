//! Configuration Management
//!
//! TOML file + `PROXY_STATUS__*` environment overrides, via the `config` crate.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::Thresholds;
use crate::error::{PanelError, Result};
use crate::link::LinkOptions;
use crate::types::{ClientCredential, ServerEndpoint};

pub const ENV_PREFIX: &str = "PROXY_STATUS";

/// تنظیمات مانیتورینگ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Aggregation window, hours back from now
    pub window_hours: i64,
    /// Clients evaluated in parallel
    pub max_concurrent: usize,
    /// Re-evaluation period of status-watch
    pub interval_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            window_hours: 24,
            max_concurrent: 16,
            interval_secs: 60,
        }
    }
}

/// Named server in the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    #[serde(flatten)]
    pub endpoint: ServerEndpoint,
}

/// Issued account and the server it lives on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEntry {
    /// Server name
    pub server: String,
    #[serde(flatten)]
    pub credential: ClientCredential,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fallback log filter when RUST_LOG is unset
    pub log_level: Option<String>,
    pub monitor: MonitorSettings,
    pub thresholds: Thresholds,
    pub links: LinkOptions,
    pub servers: Vec<ServerEntry>,
    pub clients: Vec<ClientEntry>,
}

impl AppConfig {
    /// بارگذاری پیکربندی. A missing file means defaults plus environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("config file: {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }
        let cfg: AppConfig = builder
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: AppConfig = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Server names unique, client ids unique, every client points at a known server.
    pub fn validate(&self) -> Result<()> {
        self.inventory().map(|_| ())
    }

    pub fn inventory(&self) -> Result<Inventory> {
        let mut servers = IndexMap::new();
        for entry in &self.servers {
            if servers.insert(entry.name.clone(), entry.endpoint.clone()).is_some() {
                return Err(PanelError::Inventory(format!("duplicate server {:?}", entry.name)));
            }
        }

        let mut clients: IndexMap<String, ClientEntry> = IndexMap::new();
        for entry in &self.clients {
            if !servers.contains_key(&entry.server) {
                return Err(PanelError::Inventory(format!(
                    "client {:?} references unknown server {:?}",
                    entry.credential.id, entry.server
                )));
            }
            if clients
                .insert(entry.credential.id.clone(), entry.clone())
                .is_some()
            {
                return Err(PanelError::Inventory(format!(
                    "duplicate client id {:?}",
                    entry.credential.id
                )));
            }
        }

        Ok(Inventory { servers, clients })
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.monitor.window_hours.max(1))
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Validated lookup view over the configured servers and clients
#[derive(Debug, Clone)]
pub struct Inventory {
    servers: IndexMap<String, ServerEndpoint>,
    clients: IndexMap<String, ClientEntry>,
}

impl Inventory {
    pub fn server(&self, name: &str) -> Option<&ServerEndpoint> {
        self.servers.get(name)
    }

    pub fn client(&self, id: &str) -> Option<(&ClientCredential, &ServerEndpoint)> {
        let entry = self.clients.get(id)?;
        Some((&entry.credential, self.servers.get(&entry.server)?))
    }

    /// Clients in configuration order, each with its endpoint.
    pub fn clients(&self) -> impl Iterator<Item = (&ClientCredential, &ServerEndpoint)> {
        self.clients.values().filter_map(|entry| {
            self.servers
                .get(&entry.server)
                .map(|ep| (&entry.credential, ep))
        })
    }

    pub fn credentials(&self) -> Vec<ClientCredential> {
        self.clients.values().map(|e| e.credential.clone()).collect()
    }

    pub fn entry(&self, id: &str) -> Option<&ClientEntry> {
        self.clients.get(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
