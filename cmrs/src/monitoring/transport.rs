//! The seam between the dispatch loop and the bus.

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use zbus::Connection;

use crate::Result;
use crate::api::models::CallError;
use crate::core::events::{
    CallMethod, CallTarget, DbusCall, Event, EventSender, ServiceEvent, TechnologyEvent,
};
use crate::dbus::{ConnmanManagerProxy, ConnmanServiceProxy, ConnmanTechnologyProxy, decode};
use crate::monitoring::manager;

/// Object whose `PropertyChanged` signal is forwarded by [`Transport::watch`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    Technology(String),
    Service(String),
}

/// Carries out the I/O side of a panel.
///
/// [`ZbusTransport`] talks to ConnMan on the system bus; tests substitute
/// their own implementation.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Performs one method call and reports how it ended.
    async fn call(&self, call: &DbusCall) -> std::result::Result<(), CallError>;

    /// Forwards `target`'s property changes into `events` until `cancel`
    /// fires.
    async fn watch(
        &self,
        target: WatchTarget,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Result<()>;

    /// Tracks the manager across daemon restarts: bootstraps when
    /// `net.connman` appears, forwards manager signals, and sends
    /// [`Event::Vanished`] when it goes away.
    async fn run_manager(&self, events: EventSender, cancel: CancellationToken) -> Result<()>;
}

/// [`Transport`] over a zbus connection.
#[derive(Debug, Clone)]
pub struct ZbusTransport {
    conn: Connection,
}

impl ZbusTransport {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Connects to the system bus.
    pub async fn system() -> Result<Self> {
        Ok(Self::new(Connection::system().await?))
    }
}

fn unsupported(call: &DbusCall) -> CallError {
    CallError::new(None, format!("unsupported call {:?} on {:?}", call.method, call.target))
}

#[async_trait]
impl Transport for ZbusTransport {
    async fn call(&self, call: &DbusCall) -> std::result::Result<(), CallError> {
        debug!("Calling {:?} on {:?}", call.method, call.target);

        match &call.target {
            CallTarget::Manager => {
                let proxy = ConnmanManagerProxy::new(&self.conn).await?;
                match &call.method {
                    CallMethod::SetProperty { name, value } => {
                        proxy.set_property(name, &decode::encode(value)).await?
                    }
                    _ => return Err(unsupported(call)),
                }
            }
            CallTarget::Technology(path) => {
                let proxy = ConnmanTechnologyProxy::builder(&self.conn)
                    .path(path.as_str())?
                    .build()
                    .await?;
                match &call.method {
                    CallMethod::SetProperty { name, value } => {
                        proxy.set_property(name, &decode::encode(value)).await?
                    }
                    CallMethod::Scan => proxy.scan().await?,
                    _ => return Err(unsupported(call)),
                }
            }
            CallTarget::Service(path) => {
                let proxy = ConnmanServiceProxy::builder(&self.conn)
                    .path(path.as_str())?
                    .build()
                    .await?;
                match &call.method {
                    CallMethod::SetProperty { name, value } => {
                        proxy.set_property(name, &decode::encode(value)).await?
                    }
                    CallMethod::Connect => proxy.connect().await?,
                    CallMethod::Disconnect => proxy.disconnect().await?,
                    CallMethod::Remove => proxy.remove().await?,
                    CallMethod::Scan => return Err(unsupported(call)),
                }
            }
        }

        Ok(())
    }

    async fn watch(
        &self,
        target: WatchTarget,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Result<()> {
        match target {
            WatchTarget::Technology(path) => {
                let proxy = ConnmanTechnologyProxy::builder(&self.conn)
                    .path(path.as_str())?
                    .build()
                    .await?;
                let mut stream = proxy.receive_property_changed().await?;
                debug!("Watching technology {path}");

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        signal = stream.next() => {
                            let Some(signal) = signal else { break };
                            let args = signal.args()?;
                            let event = Event::Technology {
                                path: path.clone(),
                                event: TechnologyEvent::PropertyChanged(
                                    decode::technology_property(args.name(), args.value()),
                                ),
                            };
                            if events.send(event).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            WatchTarget::Service(path) => {
                let proxy = ConnmanServiceProxy::builder(&self.conn)
                    .path(path.as_str())?
                    .build()
                    .await?;
                let mut stream = proxy.receive_property_changed().await?;
                debug!("Watching service {path}");

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        signal = stream.next() => {
                            let Some(signal) = signal else { break };
                            let args = signal.args()?;
                            let event = Event::Service {
                                path: path.clone(),
                                event: ServiceEvent::PropertyChanged(
                                    decode::service_property(args.name(), args.value()),
                                ),
                            };
                            if events.send(event).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        if !cancel.is_cancelled() {
            warn!("Property stream ended before the watch was cancelled");
        }
        Ok(())
    }

    async fn run_manager(&self, events: EventSender, cancel: CancellationToken) -> Result<()> {
        manager::run(&self.conn, &events, &cancel).await
    }
}
