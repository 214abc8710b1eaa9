use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::config::PanelConfig;
use crate::api::models::{ConnectionError, EditorDone, TechnologyKind};
use crate::core::editor::{DirtyGroups, EditorInput, EditorSnapshot};
use crate::core::events::Action;
use crate::core::panel_state::{PanelSnapshot, PanelState};
use crate::monitoring::dispatch::{Dispatcher, Reply, Request};
use crate::monitoring::transport::{Transport, ZbusTransport};

/// Capacity of the editor-closed broadcast channel.
const EDITOR_EVENTS_CAPACITY: usize = 32;

/// High-level handle to a ConnMan network panel.
///
/// Creating a panel spawns a background task that tracks `net.connman` on
/// the system bus. The task keeps a live model of the manager state, the
/// four technologies and every service, which can be read with
/// [`snapshot`](Self::snapshot) or followed with [`subscribe`](Self::subscribe).
///
/// Requests return as soon as the panel has accepted them. The outcome of
/// the underlying D-Bus call shows up in later snapshots; failed switch
/// toggles revert on their own.
///
/// Dropping the panel stops the background task. A Tokio runtime must be
/// running.
///
/// # Examples
///
/// ```no_run
/// use cmrs::{NetworkPanel, TechnologyKind};
///
/// # async fn example() -> cmrs::Result<()> {
/// let panel = NetworkPanel::new().await?;
/// let snapshot = panel.wait_available().await?;
///
/// println!("Status: {}", snapshot.status.label());
/// for service in &snapshot.services {
///     println!("{} ({})", service.name, service.strength_label());
/// }
///
/// panel.set_powered(TechnologyKind::Wifi, true).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NetworkPanel {
    requests: mpsc::UnboundedSender<Request>,
    snapshots: watch::Receiver<PanelSnapshot>,
    editor_done: broadcast::Sender<EditorDone>,
    cancel: CancellationToken,
}

impl NetworkPanel {
    /// Connects to the system bus with the default configuration.
    pub async fn new() -> Result<Self> {
        Self::with_config(PanelConfig::default()).await
    }

    /// Connects to the system bus with a custom configuration.
    pub async fn with_config(config: PanelConfig) -> Result<Self> {
        let transport = ZbusTransport::system().await?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Builds a panel on top of any [`Transport`].
    pub fn with_transport(transport: Arc<dyn Transport>, config: PanelConfig) -> Self {
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots) = watch::channel(PanelSnapshot::default());
        let (editor_done, _) = broadcast::channel(EDITOR_EVENTS_CAPACITY);
        let cancel = CancellationToken::new();

        let dispatcher = Dispatcher::new(
            PanelState::new(config),
            transport,
            requests_rx,
            snapshots_tx,
            editor_done.clone(),
            cancel.clone(),
        );
        tokio::spawn(dispatcher.run());

        Self {
            requests,
            snapshots,
            editor_done,
            cancel,
        }
    }

    /// The most recent state of the panel.
    pub fn snapshot(&self) -> PanelSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Follows every change of the panel state.
    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.snapshots.clone()
    }

    /// Reports each connection editor as it closes.
    pub fn editor_events(&self) -> broadcast::Receiver<EditorDone> {
        self.editor_done.subscribe()
    }

    /// Waits until `net.connman` is on the bus and fully loaded.
    pub async fn wait_available(&self) -> Result<PanelSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| s.available)
            .await
            .map_err(|_| ConnectionError::PanelClosed)?;
        Ok(snapshot.clone())
    }

    /// Waits until every call sent so far has completed.
    pub async fn wait_idle(&self) -> Result<PanelSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| s.pending_calls == 0)
            .await
            .map_err(|_| ConnectionError::PanelClosed)?;
        Ok(snapshot.clone())
    }

    /// Runs `f` on the dispatch task and hands back its value.
    async fn request<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PanelState) -> Result<(T, Vec<Action>)> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let request: Request = Box::new(move |state| {
            let (result, actions) = match f(state) {
                Ok((value, actions)) => (Ok(value), actions),
                Err(e) => (Err(e), Vec::new()),
            };
            let reply: Reply = Box::new(move || {
                let _ = tx.send(result);
            });
            (actions, reply)
        });

        self.requests
            .send(request)
            .map_err(|_| ConnectionError::PanelClosed)?;
        rx.await.map_err(|_| ConnectionError::PanelClosed)?
    }

    async fn request_actions<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut PanelState) -> Result<Vec<Action>> + Send + 'static,
    {
        self.request(move |state| f(state).map(|actions| ((), actions)))
            .await
    }

    /// Turns offline (flight) mode on or off.
    pub async fn set_offline_mode(&self, offline: bool) -> Result<()> {
        self.request_actions(move |s| s.set_offline_mode(offline))
            .await
    }

    /// Powers a technology on or off.
    pub async fn set_powered(&self, kind: TechnologyKind, powered: bool) -> Result<()> {
        self.request_actions(move |s| s.set_powered(kind, powered))
            .await
    }

    /// Starts or stops sharing a technology's connection.
    ///
    /// Wifi tethering needs credentials from
    /// [`set_tethering_credentials`](Self::set_tethering_credentials) or
    /// from ConnMan itself.
    pub async fn set_tethering(&self, kind: TechnologyKind, tethering: bool) -> Result<()> {
        self.request_actions(move |s| s.set_tethering(kind, tethering))
            .await
    }

    /// Sets the wifi hotspot name and passphrase (at least 8 characters).
    pub async fn set_tethering_credentials(
        &self,
        identifier: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Result<()> {
        let identifier = identifier.into();
        let passphrase = passphrase.into();
        self.request_actions(move |s| s.set_tethering_credentials(&identifier, &passphrase))
            .await
    }

    /// Asks wifi to scan for networks.
    pub async fn scan(&self) -> Result<()> {
        self.request_actions(|s| s.scan()).await
    }

    /// Connects or disconnects a service, as clicking its row would.
    pub async fn activate_service(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request_actions(move |s| s.activate_service(&path))
            .await
    }

    /// Opens the connection editor for a service.
    ///
    /// Opening an already open editor returns its current state.
    pub async fn open_editor(&self, path: impl Into<String>) -> Result<EditorSnapshot> {
        let path = path.into();
        self.request(move |s| s.open_editor(&path).map(|e| (e, Vec::new())))
            .await
    }

    /// Applies one edit to an open editor.
    pub async fn edit(&self, path: impl Into<String>, input: EditorInput) -> Result<EditorSnapshot> {
        let path = path.into();
        self.request(move |s| s.edit(&path, input).map(|e| (e, Vec::new())))
            .await
    }

    /// Forces groups to be submitted on apply.
    pub async fn mark_dirty(
        &self,
        path: impl Into<String>,
        groups: DirtyGroups,
    ) -> Result<EditorSnapshot> {
        let path = path.into();
        self.request(move |s| s.mark_dirty(&path, groups).map(|e| (e, Vec::new())))
            .await
    }

    /// Submits the editor's dirty groups and closes it.
    pub async fn apply_editor(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request_actions(move |s| s.apply_editor(&path))
            .await
    }

    /// Closes an editor without submitting anything.
    pub async fn cancel_editor(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request_actions(move |s| s.cancel_editor(&path))
            .await
    }

    /// Forgets a service's saved configuration.
    pub async fn forget_service(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request_actions(move |s| s.forget_service(&path))
            .await
    }

    /// Stops the background task. Later requests fail with
    /// [`ConnectionError::PanelClosed`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for NetworkPanel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
