//! End-to-end tests of `NetworkPanel` over a scripted transport.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use cmrs::{
    CallError, CallMethod, ConnectionError, DbusCall, EditorInput, Event, EventSender,
    GlobalState, ManagerEvent, ManagerProperty, NetworkPanel, PanelConfig, PanelSnapshot,
    ServiceEvent, ServiceProperty, ServiceState, TechnologyKind, TechnologyProperty, Transport,
    WatchTarget,
};

const WIFI: &str = "/net/connman/technology/wifi";
const HOME: &str = "/net/connman/service/wifi_home";
const CAFE: &str = "/net/connman/service/wifi_cafe";

#[derive(Default)]
struct ScriptedTransport {
    calls: Mutex<Vec<DbusCall>>,
    watches: Mutex<Vec<WatchTarget>>,
    manager: Mutex<Option<EventSender>>,
    fail_calls: bool,
    call_delay: Option<Duration>,
    completed: AtomicUsize,
    abandoned: AtomicUsize,
}

/// Counts a call as abandoned if its future is dropped before it finishes.
struct InFlight<'a> {
    abandoned: &'a AtomicUsize,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ScriptedTransport {
    fn failing() -> Self {
        Self {
            fail_calls: true,
            ..Self::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            call_delay: Some(delay),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<DbusCall> {
        self.calls.lock().unwrap().clone()
    }

    fn inject(&self, event: Event) {
        let manager = self.manager.lock().unwrap();
        manager
            .as_ref()
            .expect("manager running")
            .send(event)
            .expect("panel alive");
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, call: &DbusCall) -> Result<(), CallError> {
        self.calls.lock().unwrap().push(call.clone());
        if let Some(delay) = self.call_delay {
            let mut in_flight = InFlight {
                abandoned: &self.abandoned,
                finished: false,
            };
            tokio::time::sleep(delay).await;
            in_flight.finished = true;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.fail_calls {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(CallError::new(
                Some("net.connman.Error.Failed".into()),
                "Operation failed",
            ))
        } else {
            Ok(())
        }
    }

    async fn watch(
        &self,
        target: WatchTarget,
        _events: EventSender,
        cancel: CancellationToken,
    ) -> cmrs::Result<()> {
        self.watches.lock().unwrap().push(target);
        cancel.cancelled().await;
        Ok(())
    }

    async fn run_manager(&self, events: EventSender, cancel: CancellationToken) -> cmrs::Result<()> {
        let bootstrap = [
            Event::Manager(ManagerEvent::TechnologyAdded {
                path: WIFI.into(),
                properties: vec![
                    TechnologyProperty::Type("wifi".into()),
                    TechnologyProperty::Powered(false),
                ],
            }),
            Event::Manager(ManagerEvent::Services(vec![
                (
                    HOME.into(),
                    vec![
                        ServiceProperty::Name("Home".into()),
                        ServiceProperty::State(ServiceState::Online),
                        ServiceProperty::Strength(90),
                    ],
                ),
                (
                    CAFE.into(),
                    vec![
                        ServiceProperty::Name("Cafe".into()),
                        ServiceProperty::State(ServiceState::Idle),
                        ServiceProperty::Strength(40),
                    ],
                ),
            ])),
            Event::Manager(ManagerEvent::Properties(vec![
                ManagerProperty::State("online".into()),
                ManagerProperty::OfflineMode(false),
            ])),
        ];
        for event in bootstrap {
            let _ = events.send(event);
        }

        *self.manager.lock().unwrap() = Some(events);
        cancel.cancelled().await;
        Ok(())
    }
}

fn panel(transport: &Arc<ScriptedTransport>, config: PanelConfig) -> NetworkPanel {
    let transport: Arc<dyn Transport> = transport.clone();
    NetworkPanel::with_transport(transport, config)
}

async fn wait_until(panel: &NetworkPanel, f: impl Fn(&PanelSnapshot) -> bool) -> PanelSnapshot {
    let mut updates = panel.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(2), updates.wait_for(|s| f(s)))
        .await
        .expect("condition reached in time")
        .expect("panel alive");
    snapshot.clone()
}

/// Polls `f` until it holds, for state outside the snapshot.
async fn eventually(f: impl Fn() -> bool) {
    let polled = tokio::time::timeout(Duration::from_secs(2), async {
        while !f() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "condition not reached in time");
}

#[tokio::test]
async fn bootstrap_populates_snapshot() {
    let transport = Arc::new(ScriptedTransport::default());
    let panel = panel(&transport, PanelConfig::default());

    let snapshot = tokio::time::timeout(Duration::from_secs(2), panel.wait_available())
        .await
        .expect("available in time")
        .unwrap();

    assert_eq!(snapshot.status, GlobalState::Online);
    let names: Vec<&str> = snapshot.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Home", "Cafe"]);
    assert_eq!(snapshot.services[0].strength_label(), "Excellent");

    let wifi = snapshot
        .technologies
        .iter()
        .find(|t| t.kind == TechnologyKind::Wifi)
        .unwrap();
    assert!(wifi.present);
    assert!(!wifi.powered);

    eventually(|| transport.watches.lock().unwrap().len() == 3).await;
    let watches = transport.watches.lock().unwrap().clone();
    assert!(watches.contains(&WatchTarget::Technology(WIFI.into())));
    assert!(watches.contains(&WatchTarget::Service(HOME.into())));
}

#[tokio::test]
async fn failed_power_toggle_reverts() {
    let transport = Arc::new(ScriptedTransport::failing());
    let panel = panel(&transport, PanelConfig::default());
    panel.wait_available().await.unwrap();

    panel.set_powered(TechnologyKind::Wifi, true).await.unwrap();
    wait_until(&panel, |s| {
        s.technologies
            .iter()
            .any(|t| t.kind == TechnologyKind::Wifi && t.powered)
    })
    .await;

    eventually(|| {
        transport
            .calls()
            .iter()
            .any(|c| matches!(c.method, CallMethod::SetProperty { name: "Powered", .. }))
    })
    .await;
    let snapshot = wait_until(&panel, |s| {
        s.technologies
            .iter()
            .any(|t| t.kind == TechnologyKind::Wifi && !t.powered)
    })
    .await;
    assert!(snapshot.available);
}

#[tokio::test]
async fn activating_connected_service_disconnects() {
    let transport = Arc::new(ScriptedTransport::default());
    let panel = panel(&transport, PanelConfig::default());
    panel.wait_available().await.unwrap();

    panel.activate_service(HOME).await.unwrap();
    eventually(|| {
        transport
            .calls()
            .iter()
            .any(|c| c.method == CallMethod::Disconnect)
    })
    .await;

    assert!(matches!(
        panel.activate_service("/net/connman/service/missing").await,
        Err(ConnectionError::ServiceNotFound(_))
    ));
}

#[tokio::test]
async fn editor_apply_reports_done() {
    let transport = Arc::new(ScriptedTransport::default());
    let panel = panel(&transport, PanelConfig::default());
    panel.wait_available().await.unwrap();

    let mut done = panel.editor_events();
    panel.open_editor(HOME).await.unwrap();
    let editor = panel
        .edit(HOME, EditorInput::SetNameservers("1.1.1.1".into()))
        .await
        .unwrap();
    assert!(!editor.dirty.is_empty());

    panel.apply_editor(HOME).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(2), done.recv())
        .await
        .expect("editor closed in time")
        .unwrap();
    assert_eq!(event.path, HOME);
    assert!(event.success);

    eventually(|| {
        transport.calls().iter().any(|c| {
            matches!(
                c.method,
                CallMethod::SetProperty {
                    name: "Nameservers.Configuration",
                    ..
                }
            )
        })
    })
    .await;
}

#[tokio::test]
async fn connecting_service_pulses() {
    let transport = Arc::new(ScriptedTransport::default());
    let panel = panel(
        &transport,
        PanelConfig::new().with_pulse_interval(Duration::from_millis(5)),
    );
    panel.wait_available().await.unwrap();

    transport.inject(Event::Service {
        path: CAFE.into(),
        event: ServiceEvent::PropertyChanged(ServiceProperty::State(ServiceState::Association)),
    });

    let snapshot = wait_until(&panel, |s| {
        s.services.iter().any(|r| r.path == CAFE && r.pulse >= 2)
    })
    .await;
    assert_eq!(snapshot.status, GlobalState::Connecting);

    transport.inject(Event::Service {
        path: CAFE.into(),
        event: ServiceEvent::PropertyChanged(ServiceProperty::State(ServiceState::Ready)),
    });
    let snapshot = wait_until(&panel, |s| {
        s.services
            .iter()
            .any(|r| r.path == CAFE && r.pulse == 0 && r.pulse_timer.is_none())
    })
    .await;
    assert_eq!(snapshot.status, GlobalState::Online);
}

#[tokio::test]
async fn vanish_clears_panel() {
    let transport = Arc::new(ScriptedTransport::default());
    let panel = panel(&transport, PanelConfig::default());
    panel.wait_available().await.unwrap();

    let mut done = panel.editor_events();
    panel.open_editor(CAFE).await.unwrap();
    transport.inject(Event::Vanished);

    let snapshot = wait_until(&panel, |s| !s.available).await;
    assert!(snapshot.services.is_empty());
    assert_eq!(snapshot.status, GlobalState::Unavailable);

    let event = done.recv().await.unwrap();
    assert!(!event.success);

    assert!(matches!(
        panel.set_offline_mode(true).await,
        Err(ConnectionError::ServiceUnavailable)
    ));
}

#[tokio::test]
async fn requests_fail_after_shutdown() {
    let transport = Arc::new(ScriptedTransport::default());
    let panel = panel(&transport, PanelConfig::default());
    panel.wait_available().await.unwrap();

    panel.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match panel.scan().await {
                Err(ConnectionError::PanelClosed) => break,
                _ => tokio::task::yield_now().await,
            }
        }
    })
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn shutdown_abandons_in_flight_calls() {
    let transport = Arc::new(ScriptedTransport::slow(Duration::from_millis(500)));
    let panel = panel(&transport, PanelConfig::default());
    panel.wait_available().await.unwrap();

    panel.set_powered(TechnologyKind::Wifi, true).await.unwrap();
    eventually(|| transport.calls().len() == 1).await;

    panel.shutdown();
    eventually(|| transport.abandoned.load(Ordering::SeqCst) == 1).await;

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(transport.completed.load(Ordering::SeqCst), 0);
}
