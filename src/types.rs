//! Shared types and constants for proxy-status-core

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ==================== CONSTANTS ====================

/// Port used when an endpoint does not carry one
pub const DEFAULT_PORT: u16 = 443;

/// Cipher used for every Shadowsocks account
pub const SHADOWSOCKS_METHOD: &str = "aes-256-gcm";

/// Alert thresholds
pub const HIGH_LATENCY_MS: f64 = 200.0;
pub const LOW_UPTIME_PCT: f64 = 90.0;
pub const EXPIRY_WARNING_DAYS: i64 = 7;

// ==================== PROTOCOL ====================

/// Tunnel protocol of a client account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// VLESS
    #[default]
    Vless,
    /// VMess
    Vmess,
    /// Trojan
    Trojan,
    /// Shadowsocks
    Shadowsocks,
    /// Anything else the inventory contains
    Unknown(String),
}

impl Protocol {
    /// نام پروتکل
    pub fn as_str(&self) -> &str {
        match self {
            Self::Vless => "vless",
            Self::Vmess => "vmess",
            Self::Trojan => "trojan",
            Self::Shadowsocks => "shadowsocks",
            Self::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl FromStr for Protocol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "vless" => Self::Vless,
            "vmess" => Self::Vmess,
            "trojan" => Self::Trojan,
            "shadowsocks" | "ss" => Self::Shadowsocks,
            _ => Self::Unknown(s.trim().to_string()),
        })
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|never| match never {}))
    }
}

// ==================== CORE STRUCTS ====================

/// One issued proxy account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCredential {
    /// UUID or numeric id
    pub id: String,
    /// پروتکل
    pub protocol: Protocol,
    /// UUID for vless/vmess, password for trojan/shadowsocks
    pub secret: String,
    /// Email or display label
    #[serde(default)]
    pub label: Option<String>,
    /// تاریخ انقضا
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ClientCredential {
    /// ایجاد حساب جدید با secret تصادفی
    pub fn issue(id: impl Into<String>, protocol: Protocol, label: Option<String>) -> Self {
        Self {
            id: id.into(),
            secret: fresh_secret(&protocol),
            protocol,
            label,
            expires_at: None,
        }
    }

    /// Same account with a new secret. Links built from the old secret stop working.
    pub fn regenerate(&self) -> Self {
        Self {
            secret: fresh_secret(&self.protocol),
            ..self.clone()
        }
    }

    /// Label shown in share links, `client-<id>` when none was stored.
    pub fn display_label(&self) -> String {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("client-{}", self.id),
        }
    }
}

fn fresh_secret(protocol: &Protocol) -> String {
    match protocol {
        Protocol::Shadowsocks | Protocol::Trojan => uuid::Uuid::new_v4().simple().to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

/// Network location of a proxy service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    /// Hostname
    #[serde(default)]
    pub host: Option<String>,
    /// Raw IP, used when host is missing
    #[serde(default)]
    pub ip: Option<String>,
    /// پورت
    #[serde(default)]
    pub port: Option<u16>,
    /// tls / reality / none
    #[serde(default)]
    pub security: Option<String>,
    /// SNI
    #[serde(default)]
    pub sni: Option<String>,
    /// Header obfuscation type
    #[serde(default)]
    pub header_type: Option<String>,
    /// VLESS flow
    #[serde(default)]
    pub flow: Option<String>,
}

impl ServerEndpoint {
    /// آدرس سرور
    pub fn address(&self) -> &str {
        non_empty(&self.host)
            .or_else(|| non_empty(&self.ip))
            .unwrap_or_default()
    }

    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }
}

/// Trimmed value of an optional field, `None` when blank.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// One probe observation for a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Row id from the metrics store
    #[serde(default)]
    pub id: Option<u64>,
    /// Client id
    pub client_id: String,
    /// زمان ثبت
    pub recorded_at: DateTime<Utc>,
    /// Reachable at probe time
    pub online: bool,
    /// Latency (ms), meaningful only when online
    #[serde(default)]
    pub latency_ms: Option<f64>,
    /// Bytes transferred since the previous sample
    #[serde(default)]
    pub bytes: u64,
}

/// Summary of one client's samples over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// تعداد نمونه‌ها
    pub sample_count: usize,
    /// Samples with online = true
    pub online_count: usize,
    /// Uptime percentage, 0..=100, two decimals
    pub uptime_pct: f64,
    /// Average latency of online samples
    pub avg_latency_ms: Option<f64>,
    /// Summed bytes
    pub total_bytes: u64,
    /// Timestamp of the latest sample
    pub last_seen: Option<DateTime<Utc>>,
    /// Online flag of the latest sample
    pub is_online: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_is_permissive() {
        assert_eq!("VLESS".parse::<Protocol>().unwrap(), Protocol::Vless);
        assert_eq!("ss".parse::<Protocol>().unwrap(), Protocol::Shadowsocks);
        assert_eq!(
            "wireguard".parse::<Protocol>().unwrap(),
            Protocol::Unknown("wireguard".to_string())
        );
    }

    #[test]
    fn test_protocol_serde() {
        let p: Protocol = serde_json::from_str("\"trojan\"").unwrap();
        assert_eq!(p, Protocol::Trojan);
        assert_eq!(serde_json::to_string(&Protocol::Vmess).unwrap(), "\"vmess\"");
    }

    #[test]
    fn test_display_label_fallback() {
        let mut cred = ClientCredential::issue("42", Protocol::Vless, None);
        assert_eq!(cred.display_label(), "client-42");
        cred.label = Some("  ".to_string());
        assert_eq!(cred.display_label(), "client-42");
        cred.label = Some("user@test".to_string());
        assert_eq!(cred.display_label(), "user@test");
    }

    #[test]
    fn test_regenerate_replaces_secret_only() {
        let cred = ClientCredential::issue("7", Protocol::Trojan, Some("a".into()));
        let next = cred.regenerate();
        assert_ne!(cred.secret, next.secret);
        assert_eq!(cred.id, next.id);
        assert_eq!(cred.label, next.label);
    }

    #[test]
    fn test_endpoint_address_fallback() {
        let ep = ServerEndpoint {
            host: Some(String::new()),
            ip: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(ep.address(), "10.0.0.1");
        assert_eq!(ep.port_or(DEFAULT_PORT), 443);
        assert_eq!(ServerEndpoint::default().address(), "");
    }
}
