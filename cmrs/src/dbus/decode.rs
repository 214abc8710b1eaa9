//! Conversion between ConnMan property variants and typed values.
//!
//! ConnMan hands every property out as a variant, and the dictionaries
//! inside (`IPv4`, `Proxy`, `Ethernet`, ...) hold variants again. Values of
//! an unexpected type decode to the `Other` case of the property enum and
//! are ignored by the core.

use log::debug;
use std::collections::HashMap;
use zvariant::{OwnedValue, Value};

use crate::api::builders::{
    build_ipv4_configuration, build_ipv6_configuration, build_proxy_configuration,
};
use crate::api::models::{
    EthernetInfo, Ipv4Config, Ipv4Settings, Ipv6Config, Ipv6Privacy, Ipv6Settings, ProxyConfig,
    Security, ServiceState, ServiceType,
};
use crate::core::events::{ManagerProperty, PropertyValue, ServiceProperty, TechnologyProperty};
use crate::types::constants::{config_key, property};

/// Strips any number of variant wrappers.
fn peel<'v, 'a>(value: &'v Value<'a>) -> &'v Value<'a> {
    match value {
        Value::Value(inner) => peel(inner),
        other => other,
    }
}

fn as_bool(value: &Value<'_>) -> Option<bool> {
    match peel(value) {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

fn as_str<'v>(value: &'v Value<'_>) -> Option<&'v str> {
    match peel(value) {
        Value::Str(s) => Some(s.as_str()),
        Value::ObjectPath(p) => Some(p.as_str()),
        _ => None,
    }
}

fn as_u8(value: &Value<'_>) -> Option<u8> {
    match peel(value) {
        Value::U8(n) => Some(*n),
        Value::U16(n) => u8::try_from(*n).ok(),
        Value::U32(n) => u8::try_from(*n).ok(),
        _ => None,
    }
}

fn as_u16(value: &Value<'_>) -> Option<u16> {
    match peel(value) {
        Value::U8(n) => Some(u16::from(*n)),
        Value::U16(n) => Some(*n),
        Value::U32(n) => u16::try_from(*n).ok(),
        _ => None,
    }
}

fn as_strings(value: &Value<'_>) -> Option<Vec<String>> {
    match peel(value) {
        Value::Array(array) => Some(
            array
                .iter()
                .filter_map(|v| as_str(v).map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}

fn as_dict<'v, 'a>(value: &'v Value<'a>) -> Option<HashMap<&'v str, &'v Value<'a>>> {
    match peel(value) {
        Value::Dict(dict) => Some(
            dict.iter()
                .filter_map(|(k, v)| as_str(k).map(|k| (k, v)))
                .collect(),
        ),
        _ => None,
    }
}

fn string_of(dict: &HashMap<&str, &Value<'_>>, key: &str) -> String {
    dict.get(key)
        .and_then(|v| as_str(v))
        .unwrap_or_default()
        .to_string()
}

fn decode_ipv4(value: &Value<'_>) -> Option<Ipv4Config> {
    let dict = as_dict(value)?;
    let settings = || Ipv4Settings {
        address: string_of(&dict, config_key::ADDRESS),
        netmask: string_of(&dict, config_key::NETMASK),
        gateway: string_of(&dict, config_key::GATEWAY),
    };

    let method = dict.get(config_key::METHOD).and_then(|v| as_str(v));
    Some(match method {
        Some("dhcp") => Ipv4Config::Dhcp(settings()),
        Some("manual") => Ipv4Config::Manual(settings()),
        Some("fixed") => Ipv4Config::Fixed(settings()),
        _ => Ipv4Config::Off,
    })
}

fn decode_ipv6(value: &Value<'_>) -> Option<Ipv6Config> {
    let dict = as_dict(value)?;
    let settings = || Ipv6Settings {
        address: string_of(&dict, config_key::ADDRESS),
        prefix_length: dict
            .get(config_key::PREFIX_LENGTH)
            .and_then(|v| as_u8(v))
            .unwrap_or_default(),
        gateway: string_of(&dict, config_key::GATEWAY),
    };

    let method = dict.get(config_key::METHOD).and_then(|v| as_str(v));
    Some(match method {
        Some("auto") => Ipv6Config::Auto {
            privacy: dict
                .get(config_key::PRIVACY)
                .and_then(|v| as_str(v))
                .map(Ipv6Privacy::from)
                .unwrap_or_default(),
            settings: settings(),
        },
        Some("manual") => Ipv6Config::Manual(settings()),
        Some("6to4") => Ipv6Config::SixToFour(settings()),
        Some("fixed") => Ipv6Config::Fixed(settings()),
        _ => Ipv6Config::Off,
    })
}

fn decode_proxy(value: &Value<'_>) -> Option<ProxyConfig> {
    let dict = as_dict(value)?;
    let strings = |key: &str| {
        dict.get(key)
            .and_then(|v| as_strings(v))
            .unwrap_or_default()
    };

    let method = dict.get(config_key::METHOD).and_then(|v| as_str(v));
    Some(match method {
        Some("auto") => ProxyConfig::Auto {
            url: dict
                .get(config_key::URL)
                .and_then(|v| as_str(v))
                .map(str::to_string),
        },
        Some("manual") => ProxyConfig::Manual {
            servers: strings(config_key::SERVERS),
            excludes: strings(config_key::EXCLUDES),
        },
        _ => ProxyConfig::Direct,
    })
}

fn decode_ethernet(value: &Value<'_>) -> Option<EthernetInfo> {
    let dict = as_dict(value)?;
    let text = |key: &str| dict.get(key).and_then(|v| as_str(v)).map(str::to_string);

    Some(EthernetInfo {
        method: text(config_key::METHOD),
        interface: text(config_key::INTERFACE),
        address: text(config_key::ADDRESS),
        mtu: dict.get(config_key::MTU).and_then(|v| as_u16(v)),
    })
}

/// Decodes one `net.connman.Manager` property.
pub(crate) fn manager_property(name: &str, value: &Value<'_>) -> ManagerProperty {
    let decoded = match name {
        property::STATE => as_str(value).map(|s| ManagerProperty::State(s.to_string())),
        property::OFFLINE_MODE => as_bool(value).map(ManagerProperty::OfflineMode),
        _ => None,
    };
    decoded.unwrap_or_else(|| ManagerProperty::Other(name.to_string()))
}

/// Decodes one `net.connman.Technology` property.
pub(crate) fn technology_property(name: &str, value: &Value<'_>) -> TechnologyProperty {
    let decoded = match name {
        property::TYPE => as_str(value).map(|s| TechnologyProperty::Type(s.to_string())),
        property::POWERED => as_bool(value).map(TechnologyProperty::Powered),
        property::TETHERING => as_bool(value).map(TechnologyProperty::Tethering),
        property::TETHERING_IDENTIFIER => {
            as_str(value).map(|s| TechnologyProperty::TetheringIdentifier(s.to_string()))
        }
        property::TETHERING_PASSPHRASE => {
            as_str(value).map(|s| TechnologyProperty::TetheringPassphrase(s.to_string()))
        }
        _ => None,
    };
    decoded.unwrap_or_else(|| TechnologyProperty::Other(name.to_string()))
}

/// Decodes one `net.connman.Service` property.
///
/// Only the active `IPv4`, `IPv6` and `Proxy` values are tracked; the
/// `*.Configuration` echoes are reported as `Other`.
pub(crate) fn service_property(name: &str, value: &Value<'_>) -> ServiceProperty {
    let decoded = match name {
        property::NAME => as_str(value).map(|s| ServiceProperty::Name(s.to_string())),
        property::TYPE => as_str(value).map(|s| ServiceProperty::Type(ServiceType::from(s))),
        property::STATE => as_str(value).map(|s| ServiceProperty::State(ServiceState::from(s))),
        property::SECURITY => {
            as_strings(value).map(|list| ServiceProperty::Security(Security::from_list(&list)))
        }
        property::STRENGTH => as_u8(value).map(ServiceProperty::Strength),
        property::FAVORITE => as_bool(value).map(ServiceProperty::Favorite),
        property::AUTOCONNECT => as_bool(value).map(ServiceProperty::AutoConnect),
        property::ETHERNET => decode_ethernet(value).map(ServiceProperty::Ethernet),
        property::IPV4 => decode_ipv4(value).map(ServiceProperty::Ipv4),
        property::IPV6 => decode_ipv6(value).map(ServiceProperty::Ipv6),
        property::NAMESERVERS => as_strings(value).map(ServiceProperty::Nameservers),
        property::DOMAINS => as_strings(value).map(ServiceProperty::Domains),
        property::PROXY => decode_proxy(value).map(ServiceProperty::Proxy),
        _ => None,
    };

    decoded.unwrap_or_else(|| {
        if !name.ends_with(".Configuration") {
            debug!("Ignoring service property {name}");
        }
        ServiceProperty::Other(name.to_string())
    })
}

/// Decodes a whole `a{sv}` property map with `decode`.
pub(crate) fn properties<T>(
    map: &HashMap<String, OwnedValue>,
    decode: impl Fn(&str, &Value<'_>) -> T,
) -> Vec<T> {
    map.iter().map(|(name, value)| decode(name, value)).collect()
}

/// Encodes a typed `SetProperty` argument into the variant ConnMan expects.
pub(crate) fn encode(value: &PropertyValue) -> Value<'static> {
    match value {
        PropertyValue::Bool(b) => Value::from(*b),
        PropertyValue::Str(s) => Value::from(s.clone()),
        PropertyValue::Strings(list) => Value::from(list.clone()),
        PropertyValue::Ipv4(config) => Value::from(build_ipv4_configuration(config)),
        PropertyValue::Ipv6(config) => Value::from(build_ipv6_configuration(config)),
        PropertyValue::Proxy(config) => Value::from(build_proxy_configuration(config)),
    }
}
