//! Tracking of the ConnMan manager object.
//!
//! While `net.connman` owns its bus name, the manager's signals are
//! subscribed first and its current state fetched second, so no change can
//! fall between the two. When the name loses its owner the panel is told
//! through [`Event::Vanished`] and tracking starts over once it returns.

use futures::stream::{Stream, StreamExt, select_all};
use log::{debug, info, warn};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use zbus::Connection;
use zbus::fdo::{DBusProxy, NameOwnerChangedStream};
use zbus::names::BusName;

use crate::Result;
use crate::core::events::{Event, EventSender, ManagerEvent, ServiceProperty};
use crate::dbus::{ConnmanManagerProxy, ObjectProperties, decode};
use crate::types::constants::bus;

type EventStream = Pin<Box<dyn Stream<Item = Option<Event>> + Send>>;

/// Runs until `cancel` fires or the event channel closes.
pub(crate) async fn run(
    conn: &Connection,
    events: &EventSender,
    cancel: &CancellationToken,
) -> Result<()> {
    let dbus = DBusProxy::new(conn).await?;
    let mut owner_changes = dbus
        .receive_name_owner_changed_with_args(&[(0, bus::SERVICE)])
        .await?;

    let name = BusName::try_from(bus::SERVICE).map_err(zbus::Error::from)?;
    let mut present = dbus
        .name_has_owner(name)
        .await
        .map_err(zbus::Error::from)?;

    loop {
        if !present {
            debug!("Waiting for {} to appear", bus::SERVICE);
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                appeared = owner_change(&mut owner_changes, true) => {
                    if !appeared {
                        warn!("NameOwnerChanged stream ended");
                        return Ok(());
                    }
                }
            }
        }

        info!("{} appeared on the bus", bus::SERVICE);
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = session(conn, events) => {
                if let Err(e) = result {
                    warn!("Lost track of the ConnMan manager: {e}");
                }
                // Start over only once the name has dropped.
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = owner_change(&mut owner_changes, false) => {}
                }
            }
            _ = owner_change(&mut owner_changes, false) => {}
        }

        info!("{} vanished from the bus", bus::SERVICE);
        if events.send(Event::Vanished).is_err() {
            return Ok(());
        }
        present = false;
    }
}

/// Waits until the name gains (`appeared`) or loses an owner.
///
/// Returns `false` if the signal stream ends first.
async fn owner_change(stream: &mut NameOwnerChangedStream, appeared: bool) -> bool {
    while let Some(signal) = stream.next().await {
        let Ok(args) = signal.args() else { continue };
        if args.name().as_str() != bus::SERVICE {
            continue;
        }
        if args.new_owner().is_some() == appeared {
            return true;
        }
    }
    false
}

fn service_entries(list: &ObjectProperties) -> Vec<(String, Vec<ServiceProperty>)> {
    list.iter()
        .map(|(path, properties)| {
            (
                path.as_str().to_string(),
                decode::properties(properties, decode::service_property),
            )
        })
        .collect()
}

/// Bootstraps the panel and forwards manager signals while ConnMan runs.
async fn session(conn: &Connection, events: &EventSender) -> Result<()> {
    let manager = ConnmanManagerProxy::new(conn).await?;

    let property_changed = manager.receive_property_changed().await?;
    let technology_added = manager.receive_technology_added().await?;
    let technology_removed = manager.receive_technology_removed().await?;
    let services_changed = manager.receive_services_changed().await?;

    let properties = manager.get_properties().await?;
    let technologies = manager.get_technologies().await?;
    let services = manager.get_services().await?;

    let mut bootstrap = Vec::with_capacity(technologies.len() + 2);
    for (path, properties) in &technologies {
        bootstrap.push(Event::Manager(ManagerEvent::TechnologyAdded {
            path: path.as_str().to_string(),
            properties: decode::properties(properties, decode::technology_property),
        }));
    }
    bootstrap.push(Event::Manager(ManagerEvent::Services(service_entries(
        &services,
    ))));
    // Sent last: it marks the panel available, so everything else is in
    // place by the time a caller sees that.
    bootstrap.push(Event::Manager(ManagerEvent::Properties(
        decode::properties(&properties, decode::manager_property),
    )));

    for event in bootstrap {
        if events.send(event).is_err() {
            return Ok(());
        }
    }
    debug!(
        "Manager bootstrapped with {} technologies and {} services",
        technologies.len(),
        services.len()
    );

    let streams: Vec<EventStream> = vec![
        Box::pin(property_changed.map(|signal| {
            let args = signal.args().ok()?;
            Some(Event::Manager(ManagerEvent::PropertyChanged(
                decode::manager_property(args.name(), args.value()),
            )))
        })),
        Box::pin(technology_added.map(|signal| {
            let args = signal.args().ok()?;
            Some(Event::Manager(ManagerEvent::TechnologyAdded {
                path: args.path().as_str().to_string(),
                properties: decode::properties(args.properties(), decode::technology_property),
            }))
        })),
        Box::pin(technology_removed.map(|signal| {
            let args = signal.args().ok()?;
            Some(Event::Manager(ManagerEvent::TechnologyRemoved {
                path: args.path().as_str().to_string(),
            }))
        })),
        Box::pin(services_changed.map(|signal| {
            let args = signal.args().ok()?;
            Some(Event::Manager(ManagerEvent::ServicesChanged {
                added: service_entries(args.changed()),
                removed: args
                    .removed()
                    .iter()
                    .map(|path| path.as_str().to_string())
                    .collect(),
            }))
        })),
    ];

    let mut merged = select_all(streams);
    while let Some(event) = merged.next().await {
        match event {
            Some(event) => {
                if events.send(event).is_err() {
                    return Ok(());
                }
            }
            None => debug!("Dropping undecodable manager signal"),
        }
    }

    warn!("Manager signal streams ended");
    Ok(())
}
