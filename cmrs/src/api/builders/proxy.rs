//! Manual proxy server entries.
//!
//! ConnMan stores manual proxy servers as plain strings of the form
//! `[protocol://]host[:port]`. Entries without a protocol are treated as
//! SOCKS servers.

use serde::Serialize;

/// SOCKS protocol version selected for the socks server field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SocksVersion {
    V4,
    #[default]
    V5,
}

impl SocksVersion {
    /// URL scheme used when the entry has no explicit protocol.
    pub fn scheme(self) -> &'static str {
        match self {
            Self::V4 => "socks4",
            Self::V5 => "socks5",
        }
    }
}

/// A parsed manual proxy server entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyServerEntry {
    /// Protocol before `://`, or `"socks"` when the entry had none.
    pub protocol: String,
    pub server: String,
    /// Port after the host, `0` when absent or not a number.
    pub port: u16,
}

/// Parses `[protocol://]host[:port]`.
///
/// # Example
///
/// ```rust
/// use cmrs::builders::parse_server_entry;
///
/// let entry = parse_server_entry("proxy.example.com");
/// assert_eq!(entry.protocol, "socks");
/// assert_eq!(entry.server, "proxy.example.com");
/// assert_eq!(entry.port, 0);
/// ```
pub fn parse_server_entry(entry: &str) -> ProxyServerEntry {
    let mut parts = entry.split("://");
    let first = parts.next().unwrap_or_default();

    let (protocol, host_port) = match parts.next() {
        Some(rest) => (first, rest),
        None => ("socks", first),
    };

    let mut host_parts = host_port.split(':');
    let server = host_parts.next().unwrap_or_default();
    let port = host_parts.next().map(leading_port).unwrap_or(0);

    ProxyServerEntry {
        protocol: protocol.to_string(),
        server: server.to_string(),
        port,
    }
}

/// Reads the digits at the start of `text`, so `8080/` is 8080. Anything
/// else, or a value out of range, is 0.
fn leading_port(text: &str) -> u16 {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().unwrap_or(0)
}

/// Formats a server field back into an entry ConnMan accepts.
///
/// `scheme` is prefixed when `host` has no `://` of its own, and `:port` is
/// appended when `port` is non-zero. Empty hosts produce `None`.
///
/// # Example
///
/// ```rust
/// use cmrs::builders::format_server_entry;
///
/// assert_eq!(
///     format_server_entry("proxy.example.com", 3128, "http").as_deref(),
///     Some("http://proxy.example.com:3128")
/// );
/// ```
pub fn format_server_entry(host: &str, port: u16, scheme: &str) -> Option<String> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let mut entry = if host.contains("://") {
        host.to_string()
    } else {
        format!("{scheme}://{host}")
    };

    if port > 0 {
        entry.push_str(&format!(":{port}"));
    }

    Some(entry)
}
