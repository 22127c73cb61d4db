//! Share Link Encoder
//!
//! تولید لینک اشتراک‌گذاری برای کلاینت‌ها (v2rayNG, Hiddify, Streisand, ...).
//! VLESS | VMess | Trojan | Shadowsocks

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::form_urlencoded;

use crate::types::{
    non_empty, ClientCredential, Protocol, ServerEndpoint, DEFAULT_PORT, SHADOWSOCKS_METHOD,
};

// ── Options ────────────────────────────────────────────────────────────────

/// تنظیمات تولید لینک
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Port used when the endpoint has none
    pub default_port: u16,
    /// Shadowsocks cipher
    pub shadowsocks_method: String,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            shadowsocks_method: SHADOWSOCKS_METHOD.to_string(),
        }
    }
}

// ── VMess payload ──────────────────────────────────────────────────────────

/// Field order is part of the format; serde keeps declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmessPayload {
    pub v: String,
    pub ps: String,
    pub add: String,
    pub port: String,
    pub id: String,
    pub aid: String,
    pub net: String,
    #[serde(rename = "type")]
    pub header_type: String,
    pub host: String,
    pub path: String,
    pub tls: String,
    pub sni: String,
}

// ── Encoder ────────────────────────────────────────────────────────────────

/// موتور تولید لینک
#[derive(Debug, Clone, Default)]
pub struct LinkEncoder {
    options: LinkOptions,
}

impl LinkEncoder {
    pub fn new(options: LinkOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    /// Share URI for a credential on an endpoint. Unknown protocols give an empty string.
    pub fn encode(&self, cred: &ClientCredential, endpoint: &ServerEndpoint) -> String {
        let link = match &cred.protocol {
            Protocol::Vless => self.vless(cred, endpoint),
            Protocol::Vmess => self.vmess(cred, endpoint),
            Protocol::Trojan => self.trojan(cred, endpoint),
            Protocol::Shadowsocks => self.shadowsocks(cred, endpoint),
            Protocol::Unknown(name) => {
                debug!("no link format for protocol {:?} (client {})", name, cred.id);
                return String::new();
            }
        };
        metrics::increment_counter!("links_encoded_total", "protocol" => cred.protocol.as_str().to_string());
        link
    }

    /// `host:port`, IPv6 literals in brackets.
    fn authority(&self, endpoint: &ServerEndpoint) -> String {
        let address = endpoint.address();
        let port = endpoint.port_or(self.options.default_port);
        if address.contains(':') && !address.starts_with('[') {
            format!("[{}]:{}", address, port)
        } else {
            format!("{}:{}", address, port)
        }
    }

    fn vless(&self, cred: &ClientCredential, ep: &ServerEndpoint) -> String {
        let query = build_query(&[
            ("type", "tcp"),
            ("security", or_default(&ep.security, "reality")),
            ("sni", or_default(&ep.sni, "")),
            ("headerType", or_default(&ep.header_type, "none")),
            ("flow", or_default(&ep.flow, "")),
        ]);
        format!(
            "vless://{}@{}?{}#{}",
            encode_userinfo(&cred.secret),
            self.authority(ep),
            query,
            encode_component(&cred.display_label())
        )
    }

    fn vmess(&self, cred: &ClientCredential, ep: &ServerEndpoint) -> String {
        let sni = non_empty(&ep.sni).unwrap_or_default().to_string();
        let tls = if non_empty(&ep.security) == Some("tls") { "tls" } else { "" };
        let payload = VmessPayload {
            v: "2".to_string(),
            ps: cred.display_label(),
            add: ep.address().to_string(),
            port: ep.port_or(self.options.default_port).to_string(),
            id: cred.secret.clone(),
            aid: "0".to_string(),
            net: "tcp".to_string(),
            header_type: or_default(&ep.header_type, "none").to_string(),
            host: sni.clone(),
            path: String::new(),
            tls: tls.to_string(),
            sni,
        };
        // Serializing a struct of Strings cannot fail
        let json = serde_json::to_string(&payload).unwrap_or_default();
        format!("vmess://{}", STANDARD.encode(json))
    }

    fn trojan(&self, cred: &ClientCredential, ep: &ServerEndpoint) -> String {
        let query = build_query(&[
            ("type", "tcp"),
            ("security", or_default(&ep.security, "tls")),
            ("sni", or_default(&ep.sni, "")),
            ("headerType", or_default(&ep.header_type, "none")),
        ]);
        format!(
            "trojan://{}@{}?{}#{}",
            encode_userinfo(&cred.secret),
            self.authority(ep),
            query,
            encode_component(&cred.display_label())
        )
    }

    fn shadowsocks(&self, cred: &ClientCredential, ep: &ServerEndpoint) -> String {
        // SIP002 userinfo: URL-safe alphabet, no padding
        let auth =
            URL_SAFE_NO_PAD.encode(format!("{}:{}", self.options.shadowsocks_method, cred.secret));
        format!(
            "ss://{}@{}#{}",
            auth,
            self.authority(ep),
            encode_component(&cred.display_label())
        )
    }

    /// Subscription feed: newline-joined links, base64 encoded. Entries without a link are skipped.
    pub fn subscription<'a, I>(&self, entries: I) -> String
    where
        I: IntoIterator<Item = (&'a ClientCredential, &'a ServerEndpoint)>,
    {
        let links: Vec<String> = entries
            .into_iter()
            .map(|(cred, ep)| self.encode(cred, ep))
            .filter(|link| !link.is_empty())
            .collect();
        STANDARD.encode(links.join("\n"))
    }

    /// راهنمای اتصال
    pub fn guide(&self, cred: &ClientCredential, endpoint: &ServerEndpoint) -> ConfigGuide {
        ConfigGuide {
            client_id: cred.id.clone(),
            protocol: cred.protocol.clone(),
            label: cred.display_label(),
            link: self.encode(cred, endpoint),
            client_apps: recommended_apps(&cred.protocol),
        }
    }
}

/// Share URI with default options.
pub fn encode_link(cred: &ClientCredential, endpoint: &ServerEndpoint) -> String {
    LinkEncoder::default().encode(cred, endpoint)
}

/// Per-client connection guide: the link plus apps that import it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigGuide {
    pub client_id: String,
    pub protocol: Protocol,
    pub label: String,
    pub link: String,
    pub client_apps: Vec<ClientApp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientApp {
    pub name: &'static str,
    pub platforms: &'static [&'static str],
}

const V2RAYNG: ClientApp = ClientApp { name: "v2rayNG", platforms: &["android"] };
const HIDDIFY: ClientApp = ClientApp {
    name: "Hiddify",
    platforms: &["android", "ios", "windows", "macos", "linux"],
};
const STREISAND: ClientApp = ClientApp { name: "Streisand", platforms: &["ios", "macos"] };
const NEKOBOX: ClientApp = ClientApp { name: "NekoBox", platforms: &["android", "windows", "linux"] };
const V2RAYN: ClientApp = ClientApp { name: "v2rayN", platforms: &["windows"] };
const OUTLINE: ClientApp = ClientApp {
    name: "Outline",
    platforms: &["android", "ios", "windows", "macos", "linux"],
};

fn recommended_apps(protocol: &Protocol) -> Vec<ClientApp> {
    match protocol {
        Protocol::Vless | Protocol::Vmess | Protocol::Trojan => {
            vec![V2RAYNG, HIDDIFY, STREISAND, NEKOBOX, V2RAYN]
        }
        Protocol::Shadowsocks => vec![OUTLINE, HIDDIFY, V2RAYNG, STREISAND],
        Protocol::Unknown(_) => Vec::new(),
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Missing fields take the default; a field stored as blank stays blank and is dropped from the query.
fn or_default<'a>(field: &'a Option<String>, default: &'a str) -> &'a str {
    match field {
        Some(value) => value.trim(),
        None => default,
    }
}

/// `k=v&...` with empty values dropped.
fn build_query(params: &[(&str, &str)]) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if !value.is_empty() {
            ser.append_pair(key, value);
        }
    }
    ser.finish()
}

fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Percent-encoded secret for the userinfo part. A literal `+` is already `%2B`,
/// so every remaining `+` is a space and becomes `%20`.
fn encode_userinfo(value: &str) -> String {
    encode_component(value).replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(protocol: Protocol) -> ClientCredential {
        ClientCredential {
            id: "1".to_string(),
            protocol,
            secret: "abc-123".to_string(),
            label: Some("user@test".to_string()),
            expires_at: None,
        }
    }

    fn bare_endpoint() -> ServerEndpoint {
        ServerEndpoint {
            host: Some("1.2.3.4".to_string()),
            port: Some(443),
            security: Some("reality".to_string()),
            sni: Some(String::new()),
            header_type: Some(String::new()),
            flow: Some(String::new()),
            ..Default::default()
        }
    }

    #[test]
    fn test_vless_omits_empty_params() {
        let link = encode_link(&cred(Protocol::Vless), &bare_endpoint());
        assert_eq!(
            link,
            "vless://abc-123@1.2.3.4:443?type=tcp&security=reality#user%40test"
        );
        assert!(!link.contains("sni="));
        assert!(!link.contains("headerType="));
        assert!(!link.contains("flow="));
    }

    #[test]
    fn test_vless_full_round_trip() {
        let ep = ServerEndpoint {
            host: Some("edge.example.com".to_string()),
            port: Some(8443),
            security: Some("tls".to_string()),
            sni: Some("cdn.example.com".to_string()),
            header_type: Some("http".to_string()),
            flow: Some("xtls-rprx-vision".to_string()),
            ..Default::default()
        };
        let mut c = cred(Protocol::Vless);
        c.secret = "123e4567-e89b-12d3-a456-426614174000".to_string();
        let link = encode_link(&c, &ep);

        let url = url::Url::parse(&link).unwrap();
        assert_eq!(url.scheme(), "vless");
        assert_eq!(url.username(), c.secret);
        assert_eq!(url.host_str(), Some("edge.example.com"));
        assert_eq!(url.port(), Some(8443));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("sni".into(), "cdn.example.com".into())));
        assert!(pairs.contains(&("flow".into(), "xtls-rprx-vision".into())));
        assert!(pairs.contains(&("headerType".into(), "http".into())));
        assert_eq!(url.fragment(), Some("user%40test"));
    }

    #[test]
    fn test_vless_defaults_when_fields_missing() {
        let ep = ServerEndpoint {
            ip: Some("9.9.9.9".to_string()),
            ..Default::default()
        };
        let mut c = cred(Protocol::Vless);
        c.label = None;
        let link = encode_link(&c, &ep);
        assert_eq!(
            link,
            "vless://abc-123@9.9.9.9:443?type=tcp&security=reality&headerType=none#client-1"
        );
    }

    #[test]
    fn test_trojan_defaults_to_tls() {
        let ep = ServerEndpoint {
            host: Some("t.example.com".to_string()),
            port: Some(2083),
            sni: Some("t.example.com".to_string()),
            ..Default::default()
        };
        let link = encode_link(&cred(Protocol::Trojan), &ep);
        assert_eq!(
            link,
            "trojan://abc-123@t.example.com:2083?type=tcp&security=tls&sni=t.example.com&headerType=none#user%40test"
        );
        assert!(!link.contains("sni=&"));
        assert!(!link.contains("sni=#"));
    }

    #[test]
    fn test_vmess_payload() {
        let ep = ServerEndpoint {
            host: Some("v.example.com".to_string()),
            security: Some("tls".to_string()),
            sni: Some("v.example.com".to_string()),
            ..Default::default()
        };
        let link = encode_link(&cred(Protocol::Vmess), &ep);
        let encoded = link.strip_prefix("vmess://").unwrap();
        let json = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(json.starts_with(r#"{"v":"2","ps":"user@test","add":"v.example.com","port":"443","id":"abc-123","aid":"0""#));

        let payload: VmessPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.tls, "tls");
        assert_eq!(payload.header_type, "none");
        assert_eq!(payload.sni, "v.example.com");
    }

    #[test]
    fn test_vmess_tls_only_for_tls_security() {
        let link = encode_link(&cred(Protocol::Vmess), &bare_endpoint());
        let json = STANDARD.decode(link.strip_prefix("vmess://").unwrap()).unwrap();
        let payload: VmessPayload = serde_json::from_slice(&json).unwrap();
        assert_eq!(payload.tls, "");
        assert_eq!(payload.aid, "0");
    }

    #[test]
    fn test_shadowsocks_link() {
        let link = encode_link(&cred(Protocol::Shadowsocks), &bare_endpoint());
        let expected_auth = URL_SAFE_NO_PAD.encode("aes-256-gcm:abc-123");
        assert_eq!(link, format!("ss://{}@1.2.3.4:443#user%40test", expected_auth));
        assert!(!link.contains('='));
    }

    fn endpoint(host: &str) -> ServerEndpoint {
        ServerEndpoint {
            host: Some(host.to_string()),
            port: Some(443),
            sni: Some(host.to_string()),
            ..Default::default()
        }
    }

    fn with_secret(protocol: Protocol, secret: &str) -> ClientCredential {
        ClientCredential {
            secret: secret.to_string(),
            ..cred(protocol)
        }
    }

    fn decode_userinfo(raw: &str) -> String {
        form_urlencoded::parse(format!("v={}", raw).as_bytes())
            .next()
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn test_shadowsocks_round_trip() {
        // "aes-256-gcm:pw100?" puts a '/' into standard base64
        let link = encode_link(&with_secret(Protocol::Shadowsocks, "pw100?"), &endpoint("h.example.com"));
        let url = url::Url::parse(&link).unwrap();
        assert_eq!(url.host_str(), Some("h.example.com"));
        assert_eq!(url.port(), Some(443));
        assert_eq!(url.path(), "");
        let auth = URL_SAFE_NO_PAD.decode(url.username()).unwrap();
        assert_eq!(String::from_utf8(auth).unwrap(), "aes-256-gcm:pw100?");
    }

    #[test]
    fn test_trojan_round_trip_with_reserved_chars() {
        let secret = "p#ss@1/?:x";
        let link = encode_link(&with_secret(Protocol::Trojan, secret), &endpoint("h.example.com"));
        let url = url::Url::parse(&link).unwrap();
        assert_eq!(url.scheme(), "trojan");
        assert_eq!(url.host_str(), Some("h.example.com"));
        assert_eq!(url.port(), Some(443));
        assert_eq!(decode_userinfo(url.username()), secret);
        assert_eq!(url.password(), None);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("sni".into(), "h.example.com".into())));
        assert_eq!(url.fragment(), Some("user%40test"));
    }

    #[test]
    fn test_secrets_survive_round_trip() {
        let secrets = [
            "123e4567-e89b-12d3-a456-426614174000",
            "s3cret",
            "a b+c",
            "100%/safe?",
            "x&y=z#frag",
            "user:pass@host",
            "پسورد",
        ];
        for secret in secrets {
            for protocol in [Protocol::Vless, Protocol::Trojan, Protocol::Shadowsocks] {
                let link = encode_link(&with_secret(protocol.clone(), secret), &endpoint("h.example.com"));
                let url = url::Url::parse(&link)
                    .unwrap_or_else(|e| panic!("{} {:?}: {} ({})", protocol, secret, e, link));
                assert_eq!(url.host_str(), Some("h.example.com"), "{}", link);
                assert_eq!(url.port(), Some(443), "{}", link);
                let decoded = match protocol {
                    Protocol::Shadowsocks => {
                        let auth = URL_SAFE_NO_PAD.decode(url.username()).unwrap();
                        String::from_utf8(auth).unwrap()
                    }
                    _ => decode_userinfo(url.username()),
                };
                let expected = match protocol {
                    Protocol::Shadowsocks => format!("aes-256-gcm:{}", secret),
                    _ => secret.to_string(),
                };
                assert_eq!(decoded, expected, "{}", link);
            }
        }
    }

    #[test]
    fn test_ipv6_endpoint_is_bracketed() {
        let ep = ServerEndpoint {
            ip: Some("2001:db8::1".to_string()),
            port: Some(8443),
            ..Default::default()
        };
        for protocol in [Protocol::Vless, Protocol::Trojan, Protocol::Shadowsocks] {
            let link = encode_link(&cred(protocol), &ep);
            assert!(link.contains("@[2001:db8::1]:8443"), "{}", link);
            let url = url::Url::parse(&link).unwrap();
            assert_eq!(url.host_str(), Some("[2001:db8::1]"));
            assert_eq!(url.port(), Some(8443));
        }

        let link = encode_link(&cred(Protocol::Vmess), &ep);
        let json = STANDARD.decode(link.strip_prefix("vmess://").unwrap()).unwrap();
        let payload: VmessPayload = serde_json::from_slice(&json).unwrap();
        assert_eq!(payload.add, "2001:db8::1");
    }

    #[test]
    fn test_unknown_protocol_is_empty() {
        let link = encode_link(&cred(Protocol::Unknown("wireguard".into())), &bare_endpoint());
        assert!(link.is_empty());
    }

    #[test]
    fn test_label_encoding_uses_plus_for_space() {
        let mut c = cred(Protocol::Trojan);
        c.label = Some("my phone".to_string());
        let link = encode_link(&c, &bare_endpoint());
        assert!(link.ends_with("#my+phone"));
    }

    #[test]
    fn test_custom_default_port() {
        let encoder = LinkEncoder::new(LinkOptions {
            default_port: 8443,
            ..Default::default()
        });
        let ep = ServerEndpoint {
            host: Some("h".to_string()),
            ..Default::default()
        };
        assert!(encoder.encode(&cred(Protocol::Trojan), &ep).contains("@h:8443?"));
    }

    #[test]
    fn test_subscription_skips_unknown() {
        let ep = bare_endpoint();
        let a = cred(Protocol::Vless);
        let b = cred(Protocol::Unknown("x".into()));
        let c = cred(Protocol::Trojan);
        let encoder = LinkEncoder::default();
        let feed = encoder.subscription([(&a, &ep), (&b, &ep), (&c, &ep)]);
        let decoded = String::from_utf8(STANDARD.decode(feed).unwrap()).unwrap();
        let lines: Vec<&str> = decoded.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("vless://"));
        assert!(lines[1].starts_with("trojan://"));
    }

    #[test]
    fn test_guide_lists_apps() {
        let guide = LinkEncoder::default().guide(&cred(Protocol::Shadowsocks), &bare_endpoint());
        assert!(guide.link.starts_with("ss://"));
        assert_eq!(guide.client_apps[0].name, "Outline");
    }
}
