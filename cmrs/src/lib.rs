//! A Rust library for building network panels on top of ConnMan.
//!
//! This crate keeps a live, typed model of the ConnMan daemon
//! (`net.connman` on the system bus) and exposes the operations a settings
//! panel offers:
//!
//! - Global status and offline (flight) mode
//! - Powering and tethering the ethernet, wifi, bluetooth and cellular
//!   technologies
//! - An ordered list of services with signal strength, security and
//!   addressing details
//! - Connecting, disconnecting and forgetting services
//! - A connection editor for proxy, IPv4, IPv6, DNS and domain settings
//!
//! # Example
//!
//! ```no_run
//! use cmrs::{NetworkPanel, TechnologyKind};
//!
//! # async fn example() -> cmrs::Result<()> {
//! let panel = NetworkPanel::new().await?;
//! let snapshot = panel.wait_available().await?;
//!
//! println!("{}", snapshot.status.label());
//! for service in &snapshot.services {
//!     println!("{:<32} {:<12} {}", service.name, service.state, service.strength_label());
//! }
//!
//! panel.set_powered(TechnologyKind::Wifi, true).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! All panel logic lives in [`PanelState`], a state machine that performs
//! no I/O. It consumes [`Event`]s (decoded signals, call completions,
//! spinner ticks) and returns [`Action`]s. A background task owned by
//! [`NetworkPanel`] feeds it and carries the actions out through a
//! [`Transport`], which is [`ZbusTransport`] in production and can be
//! replaced in tests.
//!
//! # Error Handling
//!
//! Requests return `Result<T, ConnectionError>`. Failures of the D-Bus
//! calls themselves are logged; a switch whose call fails returns to its
//! previous position.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod monitoring;
mod types;
mod util;

// Public API modules
pub mod api;

pub use crate::api::builders;
pub use crate::api::config::PanelConfig;
pub use crate::api::models::{
    CallError, ConnectionError, EditorDone, EthernetInfo, GlobalState, Ipv4Config, Ipv4Settings,
    Ipv6Config, Ipv6Privacy, Ipv6Settings, ProxyConfig, Security, ServiceDetails, ServiceRow,
    ServiceState, ServiceType, TechnologyKind, TechnologyStatus, TimerId,
};
pub use crate::api::panel::NetworkPanel;
pub use crate::core::editor::{
    ConnectionEditor, DirtyGroups, EditBuffer, EditorInput, EditorSnapshot, Ipv4Field,
    Ipv4Fields, Ipv4Method, Ipv6Field, Ipv6Fields, Ipv6Method, ProxyFields, ProxyMethod,
    ProxyServerKind, ServerField, ServiceChange,
};
pub use crate::core::events::{
    Action, CallId, CallMethod, CallTarget, DbusCall, Event, EventSender, ManagerEvent,
    ManagerProperty, PropertyValue, ServiceEvent, ServiceProperty, TechnologyEvent,
    TechnologyProperty,
};
pub use crate::core::panel_state::{PanelSnapshot, PanelState};
pub use crate::monitoring::transport::{Transport, WatchTarget, ZbusTransport};

/// A specialized `Result` type for panel operations.
pub type Result<T> = std::result::Result<T, ConnectionError>;
