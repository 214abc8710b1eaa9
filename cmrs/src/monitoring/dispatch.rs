//! The task that owns a panel's state.
//!
//! Events from the bus and requests from [`NetworkPanel`](crate::NetworkPanel)
//! are applied to the [`PanelState`] one at a time; the resulting actions
//! are carried out here and a fresh snapshot is published after each step.

use futures_timer::Delay;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::api::models::{EditorDone, TimerId};
use crate::core::events::{Action, Event, EventSender};
use crate::core::panel_state::{PanelSnapshot, PanelState};
use crate::monitoring::transport::{Transport, WatchTarget};

/// Answers a request once its effects are visible in the published snapshot.
pub(crate) type Reply = Box<dyn FnOnce() + Send>;

/// A request run against the state on the dispatch task.
pub(crate) type Request = Box<dyn FnOnce(&mut PanelState) -> (Vec<Action>, Reply) + Send>;

pub(crate) struct Dispatcher {
    state: PanelState,
    transport: Arc<dyn Transport>,
    events_tx: EventSender,
    events: mpsc::UnboundedReceiver<Event>,
    requests: mpsc::UnboundedReceiver<Request>,
    snapshots: watch::Sender<PanelSnapshot>,
    editor_done: broadcast::Sender<EditorDone>,
    watches: HashMap<WatchTarget, CancellationToken>,
    pulses: HashMap<TimerId, CancellationToken>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(
        state: PanelState,
        transport: Arc<dyn Transport>,
        requests: mpsc::UnboundedReceiver<Request>,
        snapshots: watch::Sender<PanelSnapshot>,
        editor_done: broadcast::Sender<EditorDone>,
        cancel: CancellationToken,
    ) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        Self {
            state,
            transport,
            events_tx,
            events,
            requests,
            snapshots,
            editor_done,
            watches: HashMap::new(),
            pulses: HashMap::new(),
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        let transport = Arc::clone(&self.transport);
        let events = self.events_tx.clone();
        let token = self.cancel.child_token();
        tokio::spawn(async move {
            if let Err(e) = transport.run_manager(events, token).await {
                warn!("ConnMan manager tracking stopped: {e}");
            }
        });

        loop {
            let (actions, reply) = tokio::select! {
                _ = self.cancel.cancelled() => break,
                Some(event) = self.events.recv() => (self.state.handle(event), None),
                Some(request) = self.requests.recv() => {
                    let (actions, reply) = request(&mut self.state);
                    (actions, Some(reply))
                }
                else => break,
            };

            for action in actions {
                self.apply(action);
            }
            self.snapshots.send_replace(self.state.snapshot());

            if let Some(reply) = reply {
                reply();
            }
        }

        for (_, token) in self.watches.drain() {
            token.cancel();
        }
        for (_, token) in self.pulses.drain() {
            token.cancel();
        }
        debug!("Panel dispatch loop stopped");
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Call { id, call } => {
                let transport = Arc::clone(&self.transport);
                let events = self.events_tx.clone();
                let token = self.cancel.child_token();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => debug!("Abandoning call {id}"),
                        result = transport.call(&call) => {
                            let _ = events.send(Event::CallFinished { id, result });
                        }
                    }
                });
            }
            Action::WatchService(path) => self.watch(WatchTarget::Service(path)),
            Action::WatchTechnology(path) => self.watch(WatchTarget::Technology(path)),
            Action::UnwatchService(path) => self.unwatch(&WatchTarget::Service(path)),
            Action::UnwatchTechnology(path) => self.unwatch(&WatchTarget::Technology(path)),
            Action::StartPulse { path, timer } => {
                let token = self.cancel.child_token();
                if let Some(old) = self.pulses.insert(timer, token.clone()) {
                    old.cancel();
                }
                let events = self.events_tx.clone();
                let interval = self.state.config().pulse_interval;
                tokio::spawn(pulse(path, timer, interval, events, token));
            }
            Action::StopPulse(timer) => {
                if let Some(token) = self.pulses.remove(&timer) {
                    token.cancel();
                }
            }
            Action::EditorDone(done) => {
                debug!("Editor for {} closed (success: {})", done.path, done.success);
                // No receivers is fine.
                let _ = self.editor_done.send(done);
            }
        }
    }

    fn watch(&mut self, target: WatchTarget) {
        let token = self.cancel.child_token();
        if let Some(old) = self.watches.insert(target.clone(), token.clone()) {
            old.cancel();
        }

        let transport = Arc::clone(&self.transport);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.watch(target.clone(), events, token).await {
                warn!("Watching {target:?} failed: {e}");
            }
        });
    }

    fn unwatch(&mut self, target: &WatchTarget) {
        match self.watches.remove(target) {
            Some(token) => token.cancel(),
            None => debug!("{target:?} was not being watched"),
        }
    }
}

/// Sends a [`Event::PulseTick`] every `interval` until cancelled.
async fn pulse(
    path: String,
    timer: TimerId,
    interval: Duration,
    events: EventSender,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = Delay::new(interval) => {
                let tick = Event::PulseTick { path: path.clone(), timer };
                if events.send(tick).is_err() {
                    break;
                }
            }
        }
    }
}
