//! Public data types for ConnMan services, technologies and errors.
//!
//! Everything here is decoded once at the D-Bus boundary; the rest of the
//! crate never looks at raw variant dictionaries.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::types::constants::{display, error_name};
use crate::util::utils::{security_icon_name, strength_label, type_icon_name};

/// Global connectivity state of the ConnMan manager, as displayed by the panel.
///
/// The manager's `State` string is folded onto these values by
/// [`GlobalState::from_manager_state`]. `Connecting` is also used as a
/// transient display state while any service is associating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum GlobalState {
    /// The ConnMan daemon is not on the bus.
    #[default]
    Unavailable,
    /// Offline (flight) mode is active.
    Offline,
    /// No service is connected.
    Idle,
    /// A service is associating or configuring.
    Connecting,
    /// Connected without confirmed internet access.
    Ready,
    /// Connected with internet access.
    Online,
    /// A technology is sharing its connection.
    Tethered,
}

impl GlobalState {
    /// Maps a manager or service `State` string onto a display state.
    ///
    /// `failure` is shown as idle; unknown strings map to `Unavailable`.
    pub fn from_manager_state(state: &str) -> Self {
        match state {
            "offline" => Self::Offline,
            "idle" | "failure" => Self::Idle,
            "ready" => Self::Ready,
            "online" => Self::Online,
            "association" | "configuration" => Self::Connecting,
            "tethered" => Self::Tethered,
            _ => Self::Unavailable,
        }
    }

    /// Human readable status line.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unavailable => "Unavailable",
            Self::Offline => "In-flight mode",
            Self::Idle => "Not Connected",
            Self::Connecting => "Connecting",
            Self::Ready => "Connected",
            Self::Online => "Online",
            Self::Tethered => "Hotspot",
        }
    }

    /// Icon name for the status indicator.
    pub fn icon_name(self) -> &'static str {
        match self {
            Self::Unavailable => "connman_unavailable",
            Self::Offline => "connman_offline",
            Self::Idle => "connman_noconn",
            Self::Connecting => "connman_conn",
            Self::Ready | Self::Online => "connman_online",
            Self::Tethered => "connman_hotspot",
        }
    }
}

impl fmt::Display for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Connection state of a single ConnMan service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ServiceState {
    #[default]
    Idle,
    Failure,
    Association,
    Configuration,
    Ready,
    Online,
    Disconnect,
    /// A state string this crate does not know about.
    Unknown,
}

impl ServiceState {
    /// Returns `true` while the service is associating or configuring.
    ///
    /// Rows in these states carry a running spinner pulse.
    pub fn is_connecting(self) -> bool {
        matches!(self, Self::Association | Self::Configuration)
    }

    /// Returns `true` for states in which activating the row disconnects it.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Ready | Self::Online)
    }

    /// The ConnMan spelling of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Failure => "failure",
            Self::Association => "association",
            Self::Configuration => "configuration",
            Self::Ready => "ready",
            Self::Online => "online",
            Self::Disconnect => "disconnect",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for ServiceState {
    fn from(value: &str) -> Self {
        match value {
            "idle" => Self::Idle,
            "failure" => Self::Failure,
            "association" => Self::Association,
            "configuration" => Self::Configuration,
            "ready" => Self::Ready,
            "online" => Self::Online,
            "disconnect" => Self::Disconnect,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four technologies a panel exposes switches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TechnologyKind {
    Ethernet,
    Wifi,
    Bluetooth,
    Cellular,
}

impl TechnologyKind {
    /// All kinds, in display order.
    pub const ALL: [TechnologyKind; 4] = [
        TechnologyKind::Ethernet,
        TechnologyKind::Wifi,
        TechnologyKind::Bluetooth,
        TechnologyKind::Cellular,
    ];

    /// Parses a technology `Type` string. Unknown types return `None`.
    pub fn from_type(value: &str) -> Option<Self> {
        match value {
            "ethernet" => Some(Self::Ethernet),
            "wifi" => Some(Self::Wifi),
            "bluetooth" => Some(Self::Bluetooth),
            "cellular" => Some(Self::Cellular),
            _ => None,
        }
    }

    /// The ConnMan `Type` string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ethernet => "ethernet",
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::Cellular => "cellular",
        }
    }

    /// Whether the panel offers a tethering switch for this kind.
    pub fn supports_tethering(self) -> bool {
        !matches!(self, Self::Cellular)
    }
}

impl fmt::Display for TechnologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethernet => write!(f, "Ethernet"),
            Self::Wifi => write!(f, "Wi-Fi"),
            Self::Bluetooth => write!(f, "Bluetooth"),
            Self::Cellular => write!(f, "Cellular"),
        }
    }
}

/// Technology type of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ServiceType {
    Ethernet,
    Wifi,
    Bluetooth,
    Cellular,
    #[default]
    Unknown,
}

impl From<&str> for ServiceType {
    fn from(value: &str) -> Self {
        match TechnologyKind::from_type(value) {
            Some(TechnologyKind::Ethernet) => Self::Ethernet,
            Some(TechnologyKind::Wifi) => Self::Wifi,
            Some(TechnologyKind::Bluetooth) => Self::Bluetooth,
            Some(TechnologyKind::Cellular) => Self::Cellular,
            None => Self::Unknown,
        }
    }
}

/// Security of a wifi service, taken from the first entry of its
/// `Security` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Security {
    #[default]
    None,
    Wep,
    Psk,
    Wps,
    Ieee8021x,
    Unknown,
}

impl Security {
    /// Builds the security kind from a ConnMan `Security` list.
    pub fn from_list<S: AsRef<str>>(list: &[S]) -> Self {
        match list.first().map(AsRef::as_ref) {
            None | Some("none") => Self::None,
            Some("wep") => Self::Wep,
            Some("psk") => Self::Psk,
            Some("wps") => Self::Wps,
            Some("ieee8021x") => Self::Ieee8021x,
            Some(_) => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Wep => "wep",
            Self::Psk => "psk",
            Self::Wps => "wps",
            Self::Ieee8021x => "ieee8021x",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressing details shared by the IPv4 configuration methods.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ipv4Settings {
    pub address: String,
    pub netmask: String,
    pub gateway: String,
}

/// IPv4 configuration of a service, tagged by method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Ipv4Config {
    #[default]
    Off,
    Dhcp(Ipv4Settings),
    Manual(Ipv4Settings),
    /// Set by the network itself (e.g. cellular); not user editable.
    Fixed(Ipv4Settings),
}

impl Ipv4Config {
    /// The ConnMan `Method` value.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Dhcp(_) => "dhcp",
            Self::Manual(_) => "manual",
            Self::Fixed(_) => "fixed",
        }
    }

    /// Address details, if the method carries any.
    pub fn settings(&self) -> Option<&Ipv4Settings> {
        match self {
            Self::Off => None,
            Self::Dhcp(s) | Self::Manual(s) | Self::Fixed(s) => Some(s),
        }
    }
}

/// Addressing details shared by the IPv6 configuration methods.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ipv6Settings {
    pub address: String,
    pub prefix_length: u8,
    pub gateway: String,
}

/// IPv6 privacy extension setting used with the `auto` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Ipv6Privacy {
    #[default]
    Disabled,
    Enabled,
    Preferred,
}

impl Ipv6Privacy {
    /// The ConnMan spelling, including its `prefered` typo.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
            Self::Preferred => "prefered",
        }
    }
}

impl From<&str> for Ipv6Privacy {
    fn from(value: &str) -> Self {
        match value {
            "enabled" => Self::Enabled,
            "prefered" | "preferred" => Self::Preferred,
            _ => Self::Disabled,
        }
    }
}

/// IPv6 configuration of a service, tagged by method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Ipv6Config {
    #[default]
    Off,
    Auto {
        privacy: Ipv6Privacy,
        settings: Ipv6Settings,
    },
    Manual(Ipv6Settings),
    SixToFour(Ipv6Settings),
    Fixed(Ipv6Settings),
}

impl Ipv6Config {
    /// The ConnMan `Method` value.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Auto { .. } => "auto",
            Self::Manual(_) => "manual",
            Self::SixToFour(_) => "6to4",
            Self::Fixed(_) => "fixed",
        }
    }

    /// Address details, if the method carries any.
    pub fn settings(&self) -> Option<&Ipv6Settings> {
        match self {
            Self::Off => None,
            Self::Auto { settings, .. } => Some(settings),
            Self::Manual(s) | Self::SixToFour(s) | Self::Fixed(s) => Some(s),
        }
    }
}

/// Proxy configuration of a service, tagged by method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum ProxyConfig {
    #[default]
    Direct,
    Auto {
        url: Option<String>,
    },
    Manual {
        servers: Vec<String>,
        excludes: Vec<String>,
    },
}

impl ProxyConfig {
    /// The ConnMan `Method` value.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Auto { .. } => "auto",
            Self::Manual { .. } => "manual",
        }
    }
}

/// Link-layer details from a service's `Ethernet` dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EthernetInfo {
    pub method: Option<String>,
    pub interface: Option<String>,
    pub address: Option<String>,
    pub mtu: Option<u16>,
}

/// Identifies one running spinner timer.
///
/// Ids are never reused within a panel, so ticks from a timer that has
/// already been stopped can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub(crate) u64);

/// One row of the service list.
///
/// Rows are owned by the panel's registry; everything else refers to a row
/// by its object path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRow {
    /// D-Bus object path, the row's unique key.
    pub path: String,
    pub name: String,
    pub state: ServiceState,
    pub favorite: bool,
    pub autoconnect: bool,
    pub security: Security,
    /// Signal strength, 0-100.
    pub strength: u8,
    pub service_type: ServiceType,
    pub ethernet: EthernetInfo,
    pub ipv4: Ipv4Config,
    pub ipv6: Ipv6Config,
    pub nameservers: Vec<String>,
    pub domains: Vec<String>,
    pub proxy: ProxyConfig,
    /// Spinner animation counter, advanced while connecting.
    pub pulse: u32,
    /// The spinner timer driving `pulse`, if one is running.
    pub pulse_timer: Option<TimerId>,
}

impl ServiceRow {
    /// Creates an empty row for `path` with the hidden-network placeholder name.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: display::HIDDEN_NETWORK_NAME.to_string(),
            state: ServiceState::default(),
            favorite: false,
            autoconnect: false,
            security: Security::default(),
            strength: 0,
            service_type: ServiceType::default(),
            ethernet: EthernetInfo::default(),
            ipv4: Ipv4Config::default(),
            ipv6: Ipv6Config::default(),
            nameservers: Vec::new(),
            domains: Vec::new(),
            proxy: ProxyConfig::default(),
            pulse: 0,
            pulse_timer: None,
        }
    }

    /// Signal quality label ("Excellent", "Good", "ok", "weak", "n/a").
    pub fn strength_label(&self) -> &'static str {
        strength_label(self.service_type, self.strength)
    }

    /// Icon for the service's technology, scaled by signal strength.
    pub fn type_icon_name(&self) -> Option<&'static str> {
        type_icon_name(self.service_type, self.strength)
    }

    /// Lock icon for secured networks.
    pub fn security_icon_name(&self) -> Option<&'static str> {
        security_icon_name(self.security)
    }

    /// Read-only details shown alongside an editor.
    pub fn details(&self) -> ServiceDetails {
        let ipv4 = self.ipv4.settings();
        let ipv6 = self.ipv6.settings();

        ServiceDetails {
            interface: self.ethernet.interface.clone(),
            mac_address: self.ethernet.address.clone(),
            ipv4_address: ipv4.map(|s| s.address.clone()),
            ipv4_netmask: ipv4.map(|s| s.netmask.clone()),
            ipv4_gateway: ipv4.map(|s| s.gateway.clone()),
            ipv6_address: ipv6.map(|s| s.address.clone()),
            ipv6_prefix_length: ipv6.map(|s| s.prefix_length),
            ipv6_gateway: ipv6.map(|s| s.gateway.clone()),
            nameservers: self.nameservers.join(", "),
            domains: self.domains.join(", "),
            security: self.security.as_str().to_uppercase(),
            strength: self.strength_label(),
        }
    }
}

/// Read-only summary of a service, as shown next to its editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDetails {
    pub interface: Option<String>,
    pub mac_address: Option<String>,
    pub ipv4_address: Option<String>,
    pub ipv4_netmask: Option<String>,
    pub ipv4_gateway: Option<String>,
    pub ipv6_address: Option<String>,
    pub ipv6_prefix_length: Option<u8>,
    pub ipv6_gateway: Option<String>,
    pub nameservers: String,
    pub domains: String,
    pub security: String,
    pub strength: &'static str,
}

/// Displayed state of one technology switch pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnologyStatus {
    pub kind: TechnologyKind,
    /// `false` while ConnMan does not advertise the technology; the switches
    /// are insensitive then.
    pub present: bool,
    pub powered: bool,
    pub tethering: bool,
    pub tethering_identifier: Option<String>,
    pub tethering_passphrase: Option<String>,
}

/// Emitted when a connection editor closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorDone {
    /// Path of the service the editor was editing.
    pub path: String,
    /// `true` after apply (or when the service disappeared), `false` after
    /// cancel or forget.
    pub success: bool,
}

/// Description of a failed D-Bus call, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    /// Remote error name, e.g. `net.connman.Error.AlreadyEnabled`.
    pub name: Option<String>,
    pub message: String,
}

impl CallError {
    pub fn new(name: Option<String>, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
        }
    }

    /// Returns `true` if the remote side reported that the requested state
    /// was already in effect. Such failures are treated as success.
    pub fn is_already_in_state(&self) -> bool {
        matches!(
            self.name.as_deref(),
            Some(error_name::ALREADY_ENABLED) | Some(error_name::ALREADY_DISABLED)
        )
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<&zbus::Error> for CallError {
    fn from(err: &zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, detail, _) => CallError::new(
                Some(name.as_str().to_string()),
                detail.clone().unwrap_or_default(),
            ),
            other => CallError::new(None, other.to_string()),
        }
    }
}

impl From<zbus::Error> for CallError {
    fn from(err: zbus::Error) -> Self {
        CallError::from(&err)
    }
}

/// Errors returned by the panel API.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    /// `net.connman` is not on the bus.
    #[error("ConnMan is not running")]
    ServiceUnavailable,

    /// No service with this object path is known.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// The technology is not advertised by ConnMan.
    #[error("{0} technology is not available")]
    TechnologyUnavailable(TechnologyKind),

    /// Tethering was requested with unusable settings.
    #[error("invalid tethering settings: {0}")]
    InvalidTethering(String),

    /// No editor is open for this service.
    #[error("no connection editor open for {0}")]
    EditorNotOpen(String),

    /// The panel's dispatch loop has shut down.
    #[error("panel has been shut down")]
    PanelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_state_mapping() {
        assert_eq!(GlobalState::from_manager_state("offline"), GlobalState::Offline);
        assert_eq!(GlobalState::from_manager_state("idle"), GlobalState::Idle);
        assert_eq!(GlobalState::from_manager_state("failure"), GlobalState::Idle);
        assert_eq!(GlobalState::from_manager_state("ready"), GlobalState::Ready);
        assert_eq!(GlobalState::from_manager_state("online"), GlobalState::Online);
        assert_eq!(
            GlobalState::from_manager_state("association"),
            GlobalState::Connecting
        );
        assert_eq!(
            GlobalState::from_manager_state("configuration"),
            GlobalState::Connecting
        );
        assert_eq!(GlobalState::from_manager_state("tethered"), GlobalState::Tethered);
        assert_eq!(GlobalState::from_manager_state("bogus"), GlobalState::Unavailable);
        assert_eq!(GlobalState::from_manager_state(""), GlobalState::Unavailable);
    }

    #[test]
    fn global_state_labels_and_icons() {
        assert_eq!(GlobalState::Offline.label(), "In-flight mode");
        assert_eq!(GlobalState::Idle.label(), "Not Connected");
        assert_eq!(GlobalState::Ready.label(), "Connected");
        assert_eq!(GlobalState::Tethered.label(), "Hotspot");
        assert_eq!(GlobalState::Ready.icon_name(), "connman_online");
        assert_eq!(GlobalState::Online.icon_name(), "connman_online");
        assert_eq!(GlobalState::Unavailable.icon_name(), "connman_unavailable");
        assert_eq!(format!("{}", GlobalState::Connecting), "Connecting");
    }

    #[test]
    fn service_state_parse() {
        assert_eq!(ServiceState::from("association"), ServiceState::Association);
        assert_eq!(ServiceState::from("disconnect"), ServiceState::Disconnect);
        assert_eq!(ServiceState::from("weird"), ServiceState::Unknown);
        assert!(ServiceState::Configuration.is_connecting());
        assert!(!ServiceState::Ready.is_connecting());
        assert!(ServiceState::Online.is_connected());
    }

    #[test]
    fn technology_kind_parse() {
        assert_eq!(TechnologyKind::from_type("wifi"), Some(TechnologyKind::Wifi));
        assert_eq!(TechnologyKind::from_type("p2p"), None);
        assert!(!TechnologyKind::Cellular.supports_tethering());
        assert!(TechnologyKind::Bluetooth.supports_tethering());
        assert_eq!(ServiceType::from("gadget"), ServiceType::Unknown);
    }

    #[test]
    fn security_uses_first_entry() {
        assert_eq!(Security::from_list(&["psk", "wps"]), Security::Psk);
        assert_eq!(Security::from_list::<&str>(&[]), Security::None);
        assert_eq!(Security::from_list(&["ieee8021x"]), Security::Ieee8021x);
        assert_eq!(Security::from_list(&["sae"]), Security::Unknown);
    }

    #[test]
    fn ipv6_privacy_spelling() {
        assert_eq!(Ipv6Privacy::Preferred.as_str(), "prefered");
        assert_eq!(Ipv6Privacy::from("prefered"), Ipv6Privacy::Preferred);
        assert_eq!(Ipv6Privacy::from("enabled"), Ipv6Privacy::Enabled);
        assert_eq!(Ipv6Privacy::from(""), Ipv6Privacy::Disabled);
    }

    #[test]
    fn new_row_uses_hidden_network_name() {
        let row = ServiceRow::new("/net/connman/service/hidden");
        assert_eq!(row.name, "Connect to a Hidden Network");
        assert_eq!(row.pulse_timer, None);
        assert_eq!(row.ipv4, Ipv4Config::Off);
        assert_eq!(row.proxy, ProxyConfig::Direct);
    }

    #[test]
    fn details_summarise_row() {
        let mut row = ServiceRow::new("/net/connman/service/wifi_1");
        row.service_type = ServiceType::Wifi;
        row.strength = 60;
        row.security = Security::Psk;
        row.nameservers = vec!["8.8.8.8".into(), "8.8.4.4".into()];
        row.ipv4 = Ipv4Config::Dhcp(Ipv4Settings {
            address: "192.168.1.20".into(),
            netmask: "255.255.255.0".into(),
            gateway: "192.168.1.1".into(),
        });

        let details = row.details();
        assert_eq!(details.security, "PSK");
        assert_eq!(details.strength, "Good");
        assert_eq!(details.nameservers, "8.8.8.8, 8.8.4.4");
        assert_eq!(details.ipv4_gateway.as_deref(), Some("192.168.1.1"));
        assert_eq!(details.ipv6_address, None);
    }

    #[test]
    fn already_in_state_errors() {
        let enabled = CallError::new(Some("net.connman.Error.AlreadyEnabled".into()), "");
        let disabled = CallError::new(Some("net.connman.Error.AlreadyDisabled".into()), "");
        let other = CallError::new(Some("net.connman.Error.Failed".into()), "boom");
        let local = CallError::new(None, "timeout");

        assert!(enabled.is_already_in_state());
        assert!(disabled.is_already_in_state());
        assert!(!other.is_already_in_state());
        assert!(!local.is_already_in_state());
        assert_eq!(other.to_string(), "net.connman.Error.Failed: boom");
        assert_eq!(local.to_string(), "timeout");
    }

    #[test]
    fn connection_error_display() {
        assert_eq!(
            ConnectionError::TechnologyUnavailable(TechnologyKind::Wifi).to_string(),
            "Wi-Fi technology is not available"
        );
        assert_eq!(
            ConnectionError::ServiceNotFound("/x".into()).to_string(),
            "service not found: /x"
        );
    }
}
