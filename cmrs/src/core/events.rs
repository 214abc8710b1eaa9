//! Events consumed and actions produced by the panel core.
//!
//! Every source of change (manager signals, per-object `PropertyChanged`
//! signals, call completions, spinner ticks) is turned into an [`Event`] at
//! the D-Bus boundary. [`PanelState`](crate::PanelState) answers each event
//! with a list of [`Action`]s for the dispatch loop to carry out.

use tokio::sync::mpsc;

use crate::api::models::{
    CallError, EditorDone, EthernetInfo, Ipv4Config, Ipv6Config, ProxyConfig, Security,
    ServiceState, ServiceType, TimerId,
};

/// Identifies one in-flight D-Bus call.
pub type CallId = u64;

/// Channel used by transports to deliver events to the dispatch loop.
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Something that happened on the bus or in a timer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A signal or bootstrap result from the manager object.
    Manager(ManagerEvent),
    /// A signal from one technology object.
    Technology {
        path: String,
        event: TechnologyEvent,
    },
    /// A signal from one service object.
    Service { path: String, event: ServiceEvent },
    /// One spinner tick for a connecting service.
    PulseTick { path: String, timer: TimerId },
    /// A call issued through [`Action::Call`] has completed.
    CallFinished {
        id: CallId,
        result: Result<(), CallError>,
    },
    /// `net.connman` dropped off the bus.
    Vanished,
}

/// Events from `net.connman.Manager`.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
    /// Result of `GetProperties`, delivered when the daemon appears.
    Properties(Vec<ManagerProperty>),
    PropertyChanged(ManagerProperty),
    TechnologyAdded {
        path: String,
        properties: Vec<TechnologyProperty>,
    },
    TechnologyRemoved { path: String },
    /// Result of `GetServices`, in the manager's order.
    Services(Vec<(String, Vec<ServiceProperty>)>),
    ServicesChanged {
        added: Vec<(String, Vec<ServiceProperty>)>,
        removed: Vec<String>,
    },
}

/// A decoded manager property.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerProperty {
    State(String),
    OfflineMode(bool),
    /// A property the panel does not track.
    Other(String),
}

/// Events from `net.connman.Technology`.
#[derive(Debug, Clone, PartialEq)]
pub enum TechnologyEvent {
    PropertyChanged(TechnologyProperty),
}

/// A decoded technology property.
#[derive(Debug, Clone, PartialEq)]
pub enum TechnologyProperty {
    Type(String),
    Powered(bool),
    Tethering(bool),
    TetheringIdentifier(String),
    TetheringPassphrase(String),
    Other(String),
}

/// Events from `net.connman.Service`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    PropertyChanged(ServiceProperty),
}

/// A decoded service property.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceProperty {
    Name(String),
    Type(ServiceType),
    State(ServiceState),
    Security(Security),
    Strength(u8),
    Favorite(bool),
    AutoConnect(bool),
    Ethernet(EthernetInfo),
    Ipv4(Ipv4Config),
    Ipv6(Ipv6Config),
    Nameservers(Vec<String>),
    Domains(Vec<String>),
    Proxy(ProxyConfig),
    Other(String),
}

/// Work requested by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Issue a D-Bus call and report back with [`Event::CallFinished`].
    Call { id: CallId, call: DbusCall },
    /// Forward `PropertyChanged` of a service as [`Event::Service`].
    WatchService(String),
    UnwatchService(String),
    /// Forward `PropertyChanged` of a technology as [`Event::Technology`].
    WatchTechnology(String),
    UnwatchTechnology(String),
    /// Start a periodic [`Event::PulseTick`] for `path`.
    StartPulse { path: String, timer: TimerId },
    StopPulse(TimerId),
    /// A connection editor closed.
    EditorDone(EditorDone),
}

/// A D-Bus call on one ConnMan object.
#[derive(Debug, Clone, PartialEq)]
pub struct DbusCall {
    pub target: CallTarget,
    pub method: CallMethod,
}

/// Object a call is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Manager,
    Technology(String),
    Service(String),
}

/// Method invoked on the target.
#[derive(Debug, Clone, PartialEq)]
pub enum CallMethod {
    SetProperty {
        name: &'static str,
        value: PropertyValue,
    },
    Scan,
    Connect,
    Disconnect,
    Remove,
}

/// Typed value for `SetProperty`, encoded into a variant by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Str(String),
    Strings(Vec<String>),
    Ipv4(Ipv4Config),
    Ipv6(Ipv6Config),
    Proxy(ProxyConfig),
}

impl DbusCall {
    pub(crate) fn set_property(target: CallTarget, name: &'static str, value: PropertyValue) -> Self {
        Self {
            target,
            method: CallMethod::SetProperty { name, value },
        }
    }
}
