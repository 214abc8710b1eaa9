//! `*.Configuration` dictionaries for ConnMan services.
//!
//! Each builder emits `Method` plus the keys that method needs:
//! - IPv4 `manual` carries `Address`, `Netmask`, `Gateway`
//! - IPv6 `auto` carries `Privacy`; `manual` carries `Address`,
//!   `PrefixLength`, `Gateway`
//! - Proxy `auto` carries `URL`; `manual` carries `Servers` and `Excludes`

use std::collections::HashMap;
use zvariant::Value;

use crate::api::models::{Ipv4Config, Ipv6Config, ProxyConfig};
use crate::types::constants::config_key;

/// Builds the value for `IPv4.Configuration`.
pub fn build_ipv4_configuration(config: &Ipv4Config) -> HashMap<&'static str, Value<'static>> {
    let mut dict = HashMap::new();
    dict.insert(config_key::METHOD, Value::from(config.method()));

    if let Ipv4Config::Manual(settings) = config {
        dict.insert(config_key::ADDRESS, Value::from(settings.address.clone()));
        dict.insert(config_key::NETMASK, Value::from(settings.netmask.clone()));
        dict.insert(config_key::GATEWAY, Value::from(settings.gateway.clone()));
    }

    dict
}

/// Builds the value for `IPv6.Configuration`.
pub fn build_ipv6_configuration(config: &Ipv6Config) -> HashMap<&'static str, Value<'static>> {
    let mut dict = HashMap::new();
    dict.insert(config_key::METHOD, Value::from(config.method()));

    match config {
        Ipv6Config::Auto { privacy, .. } => {
            dict.insert(config_key::PRIVACY, Value::from(privacy.as_str()));
        }
        Ipv6Config::Manual(settings) => {
            dict.insert(config_key::ADDRESS, Value::from(settings.address.clone()));
            dict.insert(config_key::PREFIX_LENGTH, Value::from(settings.prefix_length));
            dict.insert(config_key::GATEWAY, Value::from(settings.gateway.clone()));
        }
        _ => {}
    }

    dict
}

/// Builds the value for `Proxy.Configuration`.
pub fn build_proxy_configuration(config: &ProxyConfig) -> HashMap<&'static str, Value<'static>> {
    let mut dict = HashMap::new();
    dict.insert(config_key::METHOD, Value::from(config.method()));

    match config {
        ProxyConfig::Direct => {}
        ProxyConfig::Auto { url } => {
            if let Some(url) = url.as_ref().filter(|u| !u.is_empty()) {
                dict.insert(config_key::URL, Value::from(url.clone()));
            }
        }
        ProxyConfig::Manual { servers, excludes } => {
            if !servers.is_empty() {
                dict.insert(config_key::SERVERS, Value::from(servers.clone()));
            }
            dict.insert(config_key::EXCLUDES, Value::from(excludes.clone()));
        }
    }

    dict
}
