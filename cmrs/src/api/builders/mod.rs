//! Configuration value builders for ConnMan services.
//!
//! ConnMan accepts service configuration as variant dictionaries keyed by
//! `Method` plus method specific keys. These builders turn the typed
//! configuration enums into those dictionaries, and translate manual proxy
//! server entries to and from the `[protocol://]host[:port]` form.
//!
//! # Examples
//!
//! ```rust
//! use cmrs::builders::{build_ipv4_configuration, parse_server_entry};
//! use cmrs::{Ipv4Config, Ipv4Settings};
//!
//! let ipv4 = build_ipv4_configuration(&Ipv4Config::Manual(Ipv4Settings {
//!     address: "192.168.1.20".into(),
//!     netmask: "255.255.255.0".into(),
//!     gateway: "192.168.1.1".into(),
//! }));
//! assert_eq!(ipv4.len(), 4);
//!
//! let entry = parse_server_entry("https://proxy.example.com:8443");
//! assert_eq!(entry.protocol, "https");
//! assert_eq!(entry.port, 8443);
//! ```

pub mod config;
pub mod proxy;

pub use config::{
    build_ipv4_configuration, build_ipv6_configuration, build_proxy_configuration,
};
pub use proxy::{ProxyServerEntry, SocksVersion, format_server_entry, parse_server_entry};
