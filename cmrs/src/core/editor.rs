//! Staged configuration edits for one service.
//!
//! An editor is seeded from a [`ServiceRow`] and collects user input in an
//! [`EditBuffer`]. Each configuration group has its own dirty bit; applying
//! the editor produces one `SetProperty` per dirty group and nothing else.
//!
//! # Example
//!
//! ```rust
//! use cmrs::{ConnectionEditor, DirtyGroups, EditorInput, ServiceRow};
//!
//! let mut row = ServiceRow::new("/net/connman/service/wifi_home");
//! row.nameservers = vec!["8.8.8.8".into()];
//!
//! let mut editor = ConnectionEditor::open(&row);
//! editor.input(EditorInput::SetNameservers("1.1.1.1,1.0.0.1".into()));
//! assert_eq!(editor.dirty(), DirtyGroups::NAMESERVERS);
//!
//! let changes = editor.apply();
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].property, "Nameservers.Configuration");
//! ```

use bitflags::bitflags;
use log::debug;
use serde::Serialize;

use crate::api::builders::proxy::{SocksVersion, format_server_entry, parse_server_entry};
use crate::api::models::{
    Ipv4Config, Ipv4Settings, Ipv6Config, Ipv6Privacy, Ipv6Settings, ProxyConfig, ServiceRow,
};
use crate::core::events::{PropertyValue, ServiceProperty};
use crate::types::constants::property;
use crate::util::utils::{split_commas, split_nameservers};

bitflags! {
    /// Configuration groups of a service, one dirty bit each.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyGroups: u8 {
        const PROXY = 1;
        const IPV4 = 1 << 1;
        const IPV6 = 1 << 2;
        const DOMAINS = 1 << 3;
        const NAMESERVERS = 1 << 4;
        const AUTOCONNECT = 1 << 5;
    }
}

impl DirtyGroups {
    /// Group refreshed by a change of `property`, if any.
    pub(crate) fn for_property(property: &ServiceProperty) -> Option<Self> {
        match property {
            ServiceProperty::Proxy(_) => Some(Self::PROXY),
            ServiceProperty::Ipv4(_) => Some(Self::IPV4),
            ServiceProperty::Ipv6(_) => Some(Self::IPV6),
            ServiceProperty::Domains(_) => Some(Self::DOMAINS),
            ServiceProperty::Nameservers(_) => Some(Self::NAMESERVERS),
            ServiceProperty::AutoConnect(_) => Some(Self::AUTOCONNECT),
            _ => None,
        }
    }
}

/// Proxy method choices offered by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ProxyMethod {
    #[default]
    Direct,
    Auto,
    Manual,
}

/// IPv4 method choices offered by the editor. `fixed` is shown as manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Ipv4Method {
    #[default]
    Off,
    Dhcp,
    Manual,
}

/// IPv6 method choices offered by the editor. `6to4` and `fixed` are shown
/// as manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Ipv6Method {
    #[default]
    Off,
    Auto,
    Manual,
}

/// One of the three manual proxy server fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProxyServerKind {
    Http,
    Https,
    Socks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Ipv4Field {
    Address,
    Netmask,
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Ipv6Field {
    Address,
    PrefixLength,
    Gateway,
}

/// Host and port of a manual proxy server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ServerField {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProxyFields {
    pub method: ProxyMethod,
    pub url: String,
    pub http: ServerField,
    pub https: ServerField,
    pub socks: ServerField,
    pub socks_version: SocksVersion,
    /// Comma separated hosts that bypass the proxy.
    pub excludes: String,
}

impl ProxyFields {
    fn from_config(config: &ProxyConfig) -> Self {
        let mut fields = Self::default();

        match config {
            ProxyConfig::Direct => {}
            ProxyConfig::Auto { url } => {
                fields.method = ProxyMethod::Auto;
                fields.url = url.clone().unwrap_or_default();
            }
            ProxyConfig::Manual { servers, excludes } => {
                fields.method = ProxyMethod::Manual;
                for server in servers {
                    let entry = parse_server_entry(server);
                    let field = ServerField {
                        host: entry.server,
                        port: entry.port,
                    };
                    match entry.protocol.as_str() {
                        "http" => fields.http = field,
                        "https" => fields.https = field,
                        "socks" | "socks4" | "socks5" => {
                            fields.socks_version = if entry.protocol == "socks4" {
                                SocksVersion::V4
                            } else {
                                SocksVersion::V5
                            };
                            fields.socks = field;
                        }
                        other => debug!("Ignoring proxy server with protocol {other}"),
                    }
                }
                fields.excludes = excludes.join(",");
            }
        }

        fields
    }

    fn has_server(&self) -> bool {
        [&self.http, &self.https, &self.socks]
            .iter()
            .any(|f| !f.host.trim().is_empty())
    }

    fn server_mut(&mut self, kind: ProxyServerKind) -> &mut ServerField {
        match kind {
            ProxyServerKind::Http => &mut self.http,
            ProxyServerKind::Https => &mut self.https,
            ProxyServerKind::Socks => &mut self.socks,
        }
    }

    fn to_config(&self) -> ProxyConfig {
        match self.method {
            ProxyMethod::Direct => ProxyConfig::Direct,
            ProxyMethod::Auto => ProxyConfig::Auto {
                url: Some(self.url.trim().to_string()).filter(|u| !u.is_empty()),
            },
            ProxyMethod::Manual => {
                let servers = [
                    (&self.http, "http"),
                    (&self.https, "https"),
                    (&self.socks, self.socks_version.scheme()),
                ]
                .into_iter()
                .filter_map(|(field, scheme)| format_server_entry(&field.host, field.port, scheme))
                .collect();

                ProxyConfig::Manual {
                    servers,
                    excludes: split_commas(&self.excludes),
                }
            }
        }
    }

    fn clear(&mut self) {
        self.url.clear();
        self.http = ServerField::default();
        self.https = ServerField::default();
        self.socks = ServerField::default();
        self.excludes.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ipv4Fields {
    pub method: Ipv4Method,
    pub address: String,
    pub netmask: String,
    pub gateway: String,
}

impl Ipv4Fields {
    fn from_config(config: &Ipv4Config) -> Self {
        let method = match config {
            Ipv4Config::Off => Ipv4Method::Off,
            Ipv4Config::Dhcp(_) => Ipv4Method::Dhcp,
            Ipv4Config::Manual(_) | Ipv4Config::Fixed(_) => Ipv4Method::Manual,
        };
        let settings = config.settings().cloned().unwrap_or_default();

        Self {
            method,
            address: settings.address,
            netmask: settings.netmask,
            gateway: settings.gateway,
        }
    }

    fn is_complete(&self) -> bool {
        [&self.address, &self.netmask, &self.gateway]
            .iter()
            .all(|f| !f.trim().is_empty())
    }

    fn to_config(&self) -> Ipv4Config {
        match self.method {
            Ipv4Method::Off => Ipv4Config::Off,
            Ipv4Method::Dhcp => Ipv4Config::Dhcp(Ipv4Settings::default()),
            Ipv4Method::Manual => Ipv4Config::Manual(Ipv4Settings {
                address: self.address.trim().to_string(),
                netmask: self.netmask.trim().to_string(),
                gateway: self.gateway.trim().to_string(),
            }),
        }
    }

    fn clear(&mut self) {
        self.address.clear();
        self.netmask.clear();
        self.gateway.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ipv6Fields {
    pub method: Ipv6Method,
    pub privacy: Ipv6Privacy,
    pub address: String,
    pub prefix_length: String,
    pub gateway: String,
}

impl Ipv6Fields {
    fn from_config(config: &Ipv6Config) -> Self {
        let (method, privacy) = match config {
            Ipv6Config::Off => (Ipv6Method::Off, Ipv6Privacy::default()),
            Ipv6Config::Auto { privacy, .. } => (Ipv6Method::Auto, *privacy),
            Ipv6Config::Manual(_) | Ipv6Config::SixToFour(_) | Ipv6Config::Fixed(_) => {
                (Ipv6Method::Manual, Ipv6Privacy::default())
            }
        };
        let settings = config.settings().cloned().unwrap_or_default();

        Self {
            method,
            privacy,
            address: settings.address,
            prefix_length: match settings.prefix_length {
                0 => String::new(),
                n => n.to_string(),
            },
            gateway: settings.gateway,
        }
    }

    fn is_complete(&self) -> bool {
        [&self.address, &self.prefix_length, &self.gateway]
            .iter()
            .all(|f| !f.trim().is_empty())
    }

    fn to_config(&self) -> Ipv6Config {
        match self.method {
            Ipv6Method::Off => Ipv6Config::Off,
            Ipv6Method::Auto => Ipv6Config::Auto {
                privacy: self.privacy,
                settings: Ipv6Settings::default(),
            },
            Ipv6Method::Manual => Ipv6Config::Manual(Ipv6Settings {
                address: self.address.trim().to_string(),
                prefix_length: self.prefix_length.trim().parse().unwrap_or(0),
                gateway: self.gateway.trim().to_string(),
            }),
        }
    }

    fn clear(&mut self) {
        self.address.clear();
        self.prefix_length.clear();
        self.gateway.clear();
    }
}

/// Everything an editor lets the user change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EditBuffer {
    pub autoconnect: bool,
    pub proxy: ProxyFields,
    pub ipv4: Ipv4Fields,
    pub ipv6: Ipv6Fields,
    /// Comma separated search domains.
    pub domains: String,
    /// Nameservers separated by commas, semicolons or spaces.
    pub nameservers: String,
}

/// One user edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorInput {
    SetAutoconnect(bool),
    SetProxyMethod(ProxyMethod),
    SetProxyUrl(String),
    SetProxyServer {
        kind: ProxyServerKind,
        host: String,
        port: u16,
    },
    SetSocksVersion(SocksVersion),
    SetProxyExcludes(String),
    SetIpv4Method(Ipv4Method),
    SetIpv4Field(Ipv4Field, String),
    SetIpv6Method(Ipv6Method),
    SetIpv6Privacy(Ipv6Privacy),
    SetIpv6Field(Ipv6Field, String),
    SetDomains(String),
    SetNameservers(String),
}

/// A `SetProperty` produced by [`ConnectionEditor::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceChange {
    pub group: DirtyGroups,
    pub property: &'static str,
    pub value: PropertyValue,
}

/// Edit session for one service.
///
/// The editor refers to its service by path only; the row itself stays in
/// the panel's registry.
#[derive(Debug, Clone)]
pub struct ConnectionEditor {
    path: String,
    favorite: bool,
    row_autoconnect: bool,
    buffer: EditBuffer,
    dirty: DirtyGroups,
}

/// Read-only view of an open editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub path: String,
    /// Autoconnect is only offered for favorite services.
    pub favorite: bool,
    pub buffer: EditBuffer,
    pub dirty: DirtyGroups,
}

impl ConnectionEditor {
    /// Opens an editor seeded from `row`, with nothing dirty.
    pub fn open(row: &ServiceRow) -> Self {
        Self {
            path: row.path.clone(),
            favorite: row.favorite,
            row_autoconnect: row.autoconnect,
            buffer: EditBuffer {
                autoconnect: row.autoconnect,
                proxy: ProxyFields::from_config(&row.proxy),
                ipv4: Ipv4Fields::from_config(&row.ipv4),
                ipv6: Ipv6Fields::from_config(&row.ipv6),
                domains: row.domains.join(","),
                nameservers: row.nameservers.join(","),
            },
            dirty: DirtyGroups::empty(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn dirty(&self) -> DirtyGroups {
        self.dirty
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            path: self.path.clone(),
            favorite: self.favorite,
            buffer: self.buffer.clone(),
            dirty: self.dirty,
        }
    }

    /// Explicitly marks groups for submission.
    pub fn mark_dirty(&mut self, groups: DirtyGroups) {
        self.dirty |= groups;
    }

    fn set_dirty(&mut self, group: DirtyGroups, dirty: bool) {
        self.dirty.set(group, dirty);
    }

    fn update_proxy_dirty(&mut self) {
        let proxy = &self.buffer.proxy;
        let dirty = match proxy.method {
            ProxyMethod::Direct => true,
            ProxyMethod::Auto => !proxy.url.trim().is_empty(),
            ProxyMethod::Manual => proxy.has_server(),
        };
        self.set_dirty(DirtyGroups::PROXY, dirty);
    }

    /// Records one edit and updates the group's dirty bit.
    pub fn input(&mut self, input: EditorInput) {
        match input {
            EditorInput::SetAutoconnect(autoconnect) => {
                self.buffer.autoconnect = autoconnect;
                self.set_dirty(DirtyGroups::AUTOCONNECT, autoconnect != self.row_autoconnect);
            }
            EditorInput::SetProxyMethod(method) => {
                self.buffer.proxy.method = method;
                self.update_proxy_dirty();
            }
            EditorInput::SetProxyUrl(url) => {
                self.buffer.proxy.url = url;
                if self.buffer.proxy.method == ProxyMethod::Auto {
                    self.update_proxy_dirty();
                }
            }
            EditorInput::SetProxyServer { kind, host, port } => {
                *self.buffer.proxy.server_mut(kind) = ServerField { host, port };
                if self.buffer.proxy.method == ProxyMethod::Manual {
                    self.update_proxy_dirty();
                }
            }
            EditorInput::SetSocksVersion(version) => {
                self.buffer.proxy.socks_version = version;
                if self.buffer.proxy.method == ProxyMethod::Manual {
                    self.update_proxy_dirty();
                }
            }
            EditorInput::SetProxyExcludes(excludes) => {
                let non_empty = !excludes.trim().is_empty();
                self.buffer.proxy.excludes = excludes;
                if self.buffer.proxy.method == ProxyMethod::Manual && non_empty {
                    self.mark_dirty(DirtyGroups::PROXY);
                }
            }
            EditorInput::SetIpv4Method(method) => {
                self.buffer.ipv4.method = method;
                let dirty = method != Ipv4Method::Manual || self.buffer.ipv4.is_complete();
                self.set_dirty(DirtyGroups::IPV4, dirty);
            }
            EditorInput::SetIpv4Field(field, value) => {
                let ipv4 = &mut self.buffer.ipv4;
                match field {
                    Ipv4Field::Address => ipv4.address = value,
                    Ipv4Field::Netmask => ipv4.netmask = value,
                    Ipv4Field::Gateway => ipv4.gateway = value,
                }
                if ipv4.method == Ipv4Method::Manual {
                    let complete = ipv4.is_complete();
                    self.set_dirty(DirtyGroups::IPV4, complete);
                }
            }
            EditorInput::SetIpv6Method(method) => {
                self.buffer.ipv6.method = method;
                let dirty = method != Ipv6Method::Manual || self.buffer.ipv6.is_complete();
                self.set_dirty(DirtyGroups::IPV6, dirty);
            }
            EditorInput::SetIpv6Privacy(privacy) => {
                self.buffer.ipv6.privacy = privacy;
                if self.buffer.ipv6.method == Ipv6Method::Auto {
                    self.mark_dirty(DirtyGroups::IPV6);
                }
            }
            EditorInput::SetIpv6Field(field, value) => {
                let ipv6 = &mut self.buffer.ipv6;
                match field {
                    Ipv6Field::Address => ipv6.address = value,
                    Ipv6Field::PrefixLength => ipv6.prefix_length = value,
                    Ipv6Field::Gateway => ipv6.gateway = value,
                }
                if ipv6.method == Ipv6Method::Manual {
                    let complete = ipv6.is_complete();
                    self.set_dirty(DirtyGroups::IPV6, complete);
                }
            }
            EditorInput::SetDomains(domains) => {
                self.buffer.domains = domains;
                self.mark_dirty(DirtyGroups::DOMAINS);
            }
            EditorInput::SetNameservers(nameservers) => {
                let non_empty = !nameservers.trim().is_empty();
                self.buffer.nameservers = nameservers;
                self.set_dirty(DirtyGroups::NAMESERVERS, non_empty);
            }
        }
    }

    /// Reloads `groups` from the live row and clears their dirty bits.
    ///
    /// Called when ConnMan reports a new value for a group while the editor
    /// is open.
    pub fn refresh(&mut self, groups: DirtyGroups, row: &ServiceRow) {
        self.favorite = row.favorite;

        if groups.contains(DirtyGroups::PROXY) {
            self.buffer.proxy = ProxyFields::from_config(&row.proxy);
        }
        if groups.contains(DirtyGroups::IPV4) {
            self.buffer.ipv4 = Ipv4Fields::from_config(&row.ipv4);
        }
        if groups.contains(DirtyGroups::IPV6) {
            self.buffer.ipv6 = Ipv6Fields::from_config(&row.ipv6);
        }
        if groups.contains(DirtyGroups::DOMAINS) {
            self.buffer.domains = row.domains.join(",");
        }
        if groups.contains(DirtyGroups::NAMESERVERS) {
            self.buffer.nameservers = row.nameservers.join(",");
        }
        if groups.contains(DirtyGroups::AUTOCONNECT) {
            self.row_autoconnect = row.autoconnect;
            self.buffer.autoconnect = row.autoconnect;
        }

        self.dirty.remove(groups);
    }

    /// Builds one change per dirty group, in a fixed group order.
    ///
    /// Text fields of submitted groups are cleared and every dirty bit is
    /// reset afterwards.
    pub fn apply(&mut self) -> Vec<ServiceChange> {
        let dirty = self.dirty;
        let mut changes = Vec::new();

        if dirty.contains(DirtyGroups::PROXY) {
            changes.push(ServiceChange {
                group: DirtyGroups::PROXY,
                property: property::PROXY_CONFIGURATION,
                value: PropertyValue::Proxy(self.buffer.proxy.to_config()),
            });
            self.buffer.proxy.clear();
        }
        if dirty.contains(DirtyGroups::IPV4) {
            changes.push(ServiceChange {
                group: DirtyGroups::IPV4,
                property: property::IPV4_CONFIGURATION,
                value: PropertyValue::Ipv4(self.buffer.ipv4.to_config()),
            });
            self.buffer.ipv4.clear();
        }
        if dirty.contains(DirtyGroups::IPV6) {
            changes.push(ServiceChange {
                group: DirtyGroups::IPV6,
                property: property::IPV6_CONFIGURATION,
                value: PropertyValue::Ipv6(self.buffer.ipv6.to_config()),
            });
            self.buffer.ipv6.clear();
        }
        if dirty.contains(DirtyGroups::DOMAINS) {
            changes.push(ServiceChange {
                group: DirtyGroups::DOMAINS,
                property: property::DOMAINS_CONFIGURATION,
                value: PropertyValue::Strings(split_commas(&self.buffer.domains)),
            });
            self.buffer.domains.clear();
        }
        if dirty.contains(DirtyGroups::NAMESERVERS) {
            changes.push(ServiceChange {
                group: DirtyGroups::NAMESERVERS,
                property: property::NAMESERVERS_CONFIGURATION,
                value: PropertyValue::Strings(split_nameservers(&self.buffer.nameservers)),
            });
            self.buffer.nameservers.clear();
        }
        if dirty.contains(DirtyGroups::AUTOCONNECT) {
            changes.push(ServiceChange {
                group: DirtyGroups::AUTOCONNECT,
                property: property::AUTOCONNECT,
                value: PropertyValue::Bool(self.buffer.autoconnect),
            });
        }

        self.dirty = DirtyGroups::empty();
        changes
    }
}
