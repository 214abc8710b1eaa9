//! The panel's state machine.
//!
//! [`PanelState`] owns the service registry, the technology controllers and
//! every open connection editor. It performs no I/O: events go in through
//! [`PanelState::handle`], user requests through the request methods, and
//! the work to do comes back as a list of [`Action`]s.

use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::Result;
use crate::api::config::PanelConfig;
use crate::api::models::{
    CallError, ConnectionError, EditorDone, GlobalState, ServiceRow, ServiceState,
    TechnologyKind, TechnologyStatus, TimerId,
};
use crate::core::editor::{ConnectionEditor, DirtyGroups, EditorInput, EditorSnapshot};
use crate::core::events::{
    Action, CallId, CallMethod, CallTarget, DbusCall, Event, ManagerEvent, ManagerProperty,
    PropertyValue, ServiceEvent, ServiceProperty, TechnologyEvent, TechnologyProperty,
};
use crate::core::registry::{ServiceRegistry, apply_property};
use crate::core::technology::Technologies;
use crate::types::constants::{display, property};

/// Point-in-time copy of everything a panel displays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelSnapshot {
    /// `true` while `net.connman` is on the bus and its properties are loaded.
    pub available: bool,
    /// Status shown in the panel header.
    pub status: GlobalState,
    pub offline_mode: bool,
    pub technologies: Vec<TechnologyStatus>,
    /// Service rows in manager order.
    pub services: Vec<ServiceRow>,
    pub editors: Vec<EditorSnapshot>,
    /// Calls sent to ConnMan that have not completed yet.
    pub pending_calls: usize,
}

/// Continuation of an in-flight call.
#[derive(Debug, Clone, PartialEq)]
enum PendingCall {
    OfflineMode { previous: bool },
    Powered { kind: TechnologyKind, previous: bool },
    Tethering { kind: TechnologyKind, previous: bool },
    TetheringIdentifier { previous: bool },
    TetheringPassphrase { previous: bool },
    Scan,
    Connect { path: String },
    Disconnect { path: String },
    ServiceConfig { path: String, property: &'static str },
    Forget { path: String },
}

impl PendingCall {
    /// Technology whose switches the call's outcome touches.
    fn technology(&self) -> Option<TechnologyKind> {
        match self {
            Self::Powered { kind, .. } | Self::Tethering { kind, .. } => Some(*kind),
            Self::TetheringIdentifier { .. } | Self::TetheringPassphrase { .. } | Self::Scan => {
                Some(TechnologyKind::Wifi)
            }
            _ => None,
        }
    }
}

/// Sans-IO state of one network panel.
#[derive(Debug)]
pub struct PanelState {
    config: PanelConfig,
    available: bool,
    global: GlobalState,
    status: GlobalState,
    offline_mode: bool,
    shown_offline_mode: bool,
    registry: ServiceRegistry,
    technologies: Technologies,
    editors: BTreeMap<String, ConnectionEditor>,
    forgetting: HashSet<String>,
    pending: HashMap<CallId, PendingCall>,
    next_call: CallId,
    next_timer: u64,
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new(PanelConfig::default())
    }
}

impl PanelState {
    pub fn new(config: PanelConfig) -> Self {
        Self {
            config,
            available: false,
            global: GlobalState::Unavailable,
            status: GlobalState::Unavailable,
            offline_mode: false,
            shown_offline_mode: false,
            registry: ServiceRegistry::new(),
            technologies: Technologies::new(),
            editors: BTreeMap::new(),
            forgetting: HashSet::new(),
            pending: HashMap::new(),
            next_call: 0,
            next_timer: 0,
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Displayed status: the manager state, or `Connecting` while a service
    /// is associating.
    pub fn status(&self) -> GlobalState {
        self.status
    }

    pub fn service(&self, path: &str) -> Option<&ServiceRow> {
        self.registry.get(path)
    }

    pub fn services(&self) -> &[ServiceRow] {
        self.registry.rows()
    }

    pub fn technology(&self, kind: TechnologyKind) -> TechnologyStatus {
        self.technologies.get(kind).status()
    }

    pub fn editor(&self, path: &str) -> Option<&ConnectionEditor> {
        self.editors.get(path)
    }

    /// Number of calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            available: self.available,
            status: self.status,
            offline_mode: self.shown_offline_mode,
            technologies: self.technologies.iter().map(|t| t.status()).collect(),
            services: self.registry.rows().to_vec(),
            editors: self.editors.values().map(|e| e.snapshot()).collect(),
            pending_calls: self.pending.len(),
        }
    }

    fn call(&mut self, call: DbusCall, pending: PendingCall) -> Action {
        let id = self.next_call;
        self.next_call += 1;
        self.pending.insert(id, pending);
        Action::Call { id, call }
    }

    /// Processes one event.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Manager(event) => self.on_manager_event(event),
            Event::Technology { path, event } => self.on_technology_event(&path, event),
            Event::Service { path, event } => self.on_service_event(&path, event),
            Event::PulseTick { path, timer } => {
                self.on_pulse_tick(&path, timer);
                Vec::new()
            }
            Event::CallFinished { id, result } => self.on_call_finished(id, result),
            Event::Vanished => self.on_vanished(),
        }
    }

    fn on_manager_event(&mut self, event: ManagerEvent) -> Vec<Action> {
        match event {
            ManagerEvent::Properties(properties) => {
                info!("ConnMan manager is available");
                self.available = true;
                for p in properties {
                    self.apply_manager_property(p);
                }
                Vec::new()
            }
            ManagerEvent::PropertyChanged(p) => {
                self.apply_manager_property(p);
                Vec::new()
            }
            ManagerEvent::TechnologyAdded { path, properties } => {
                self.add_technology(&path, properties)
            }
            ManagerEvent::TechnologyRemoved { path } => self.remove_technology(&path),
            ManagerEvent::Services(services) => {
                let mut actions = self.services_changed(services, Vec::new());
                if self.registry.len() < display::MIN_SERVICES_BEFORE_SCAN {
                    actions.extend(self.scan_if_possible());
                }
                actions
            }
            ManagerEvent::ServicesChanged { added, removed } => {
                let mut actions = self.services_changed(added, removed);
                if self.config.rescan_on_services_changed {
                    actions.extend(self.scan_if_possible());
                }
                actions
            }
        }
    }

    fn apply_manager_property(&mut self, p: ManagerProperty) {
        match p {
            ManagerProperty::State(state) => {
                self.global = GlobalState::from_manager_state(&state);
                self.status = self.global;
                debug!("Manager state is now {state}");
            }
            ManagerProperty::OfflineMode(offline) => {
                self.offline_mode = offline;
                self.shown_offline_mode = offline;
            }
            ManagerProperty::Other(name) => debug!("Ignoring manager property {name}"),
        }
    }

    fn add_technology(&mut self, path: &str, properties: Vec<TechnologyProperty>) -> Vec<Action> {
        let kind = properties.iter().find_map(|p| match p {
            TechnologyProperty::Type(t) => Some(t.as_str()),
            _ => None,
        });

        let Some(kind) = kind.and_then(TechnologyKind::from_type) else {
            warn!("Unknown technology type at {path}: {kind:?}");
            return Vec::new();
        };

        let mut actions = Vec::new();
        let controller = self.technologies.get_mut(kind);
        let was_present = controller.is_present();

        if let Some(old) = controller.present(path) {
            actions.push(Action::UnwatchTechnology(old));
            actions.push(Action::WatchTechnology(path.to_string()));
        } else if !was_present {
            actions.push(Action::WatchTechnology(path.to_string()));
        }

        for p in &properties {
            controller.apply(p);
        }

        debug!("Technology {kind} present at {path}");
        actions
    }

    fn remove_technology(&mut self, path: &str) -> Vec<Action> {
        match self.technologies.by_path_mut(path) {
            Some(controller) => {
                let kind = controller.kind();
                controller.absent();
                // Late replies must not touch the reset switches.
                self.pending.retain(|_, p| p.technology() != Some(kind));
                debug!("Technology {kind} removed");
                vec![Action::UnwatchTechnology(path.to_string())]
            }
            None => {
                warn!("Removed technology {path} was not tracked");
                Vec::new()
            }
        }
    }

    fn on_technology_event(&mut self, path: &str, event: TechnologyEvent) -> Vec<Action> {
        let TechnologyEvent::PropertyChanged(p) = event;
        match self.technologies.by_path_mut(path) {
            Some(controller) => controller.apply(&p),
            None => debug!("Dropping property change for untracked technology {path}"),
        }
        Vec::new()
    }

    fn services_changed(
        &mut self,
        added: Vec<(String, Vec<ServiceProperty>)>,
        removed: Vec<String>,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        let removed: HashSet<String> = removed.into_iter().collect();

        for path in &removed {
            actions.extend(self.remove_service(path));
        }

        let mut order = Vec::with_capacity(added.len());
        for (path, properties) in added {
            if removed.contains(&path) {
                continue;
            }
            if !self.registry.contains(&path) {
                actions.extend(self.add_service(&path, properties));
            }
            order.push(path);
        }

        self.registry.reorder(order.iter().map(String::as_str));
        actions
    }

    fn add_service(&mut self, path: &str, properties: Vec<ServiceProperty>) -> Vec<Action> {
        let mut row = ServiceRow::new(path);
        for p in properties {
            apply_property(&mut row, p);
        }
        debug!("Adding service {path} ({})", row.name);
        self.registry.insert(row);

        let mut actions = vec![Action::WatchService(path.to_string())];
        actions.extend(self.sync_pulse(path));
        actions
    }

    fn remove_service(&mut self, path: &str) -> Vec<Action> {
        let Some(row) = self.registry.remove(path) else {
            debug!("Removed service {path} was not tracked");
            return Vec::new();
        };

        debug!("Removing service {path}");
        let mut actions = vec![Action::UnwatchService(path.to_string())];

        if let Some(timer) = row.pulse_timer {
            actions.push(Action::StopPulse(timer));
        }
        if row.state.is_connecting() {
            self.status = self.global;
        }
        if self.editors.remove(path).is_some() {
            let success = !self.forgetting.remove(path);
            actions.push(Action::EditorDone(EditorDone {
                path: path.to_string(),
                success,
            }));
        }

        actions
    }

    fn on_service_event(&mut self, path: &str, event: ServiceEvent) -> Vec<Action> {
        let ServiceEvent::PropertyChanged(p) = event;
        let group = DirtyGroups::for_property(&p);

        let Some(row) = self.registry.get_mut(path) else {
            debug!("Dropping property change for untracked service {path}");
            return Vec::new();
        };
        apply_property(row, p);

        if let (Some(group), Some(editor)) = (group, self.editors.get_mut(path)) {
            editor.refresh(group, row);
        }

        self.sync_pulse(path)
    }

    /// Starts or stops the row's spinner to match its state.
    fn sync_pulse(&mut self, path: &str) -> Vec<Action> {
        let next_timer = self.next_timer;
        let Some(row) = self.registry.get_mut(path) else {
            return Vec::new();
        };

        match (row.state.is_connecting(), row.pulse_timer) {
            (true, None) => {
                let timer = TimerId(next_timer);
                self.next_timer += 1;
                row.pulse_timer = Some(timer);
                row.pulse = 0;
                self.status = GlobalState::Connecting;
                vec![Action::StartPulse {
                    path: path.to_string(),
                    timer,
                }]
            }
            (false, Some(timer)) => {
                row.pulse_timer = None;
                row.pulse = 0;
                self.status = self.global;
                vec![Action::StopPulse(timer)]
            }
            _ => Vec::new(),
        }
    }

    fn on_pulse_tick(&mut self, path: &str, timer: TimerId) {
        if let Some(row) = self.registry.get_mut(path)
            && row.pulse_timer == Some(timer)
        {
            row.pulse = row.pulse.wrapping_add(1);
        }
    }

    fn on_vanished(&mut self) -> Vec<Action> {
        info!("ConnMan manager vanished");
        let mut actions = Vec::new();

        for row in self.registry.drain() {
            actions.push(Action::UnwatchService(row.path.clone()));
            if let Some(timer) = row.pulse_timer {
                actions.push(Action::StopPulse(timer));
            }
        }
        for controller in self.technologies.iter_mut() {
            if let Some(path) = controller.absent() {
                actions.push(Action::UnwatchTechnology(path));
            }
        }
        for path in std::mem::take(&mut self.editors).into_keys() {
            actions.push(Action::EditorDone(EditorDone {
                path,
                success: false,
            }));
        }

        if !self.pending.is_empty() {
            debug!("Dropping {} calls of the vanished manager", self.pending.len());
            self.pending.clear();
        }
        self.forgetting.clear();
        self.available = false;
        self.global = GlobalState::Unavailable;
        self.status = GlobalState::Unavailable;
        self.offline_mode = false;
        self.shown_offline_mode = false;
        actions
    }

    fn on_call_finished(&mut self, id: CallId, result: std::result::Result<(), CallError>) -> Vec<Action> {
        let Some(pending) = self.pending.remove(&id) else {
            debug!("Reply for unknown call {id}");
            return Vec::new();
        };

        let error = match result {
            Ok(()) => return self.on_call_succeeded(pending),
            Err(e) => e,
        };
        let already = error.is_already_in_state();

        match pending {
            PendingCall::OfflineMode { previous } => {
                if !already {
                    warn!("Could not set OfflineMode property: {error}");
                    self.shown_offline_mode = previous;
                }
            }
            PendingCall::Powered { kind, previous } => {
                if !already {
                    warn!("Could not set {} Powered property: {error}", kind.as_str());
                    self.technologies.get_mut(kind).revert_powered(previous);
                }
            }
            PendingCall::Tethering { kind, previous } => {
                if !already {
                    warn!("Could not set {} Tethering property: {error}", kind.as_str());
                    self.technologies.get_mut(kind).revert_tethering(previous);
                }
            }
            PendingCall::TetheringIdentifier { previous } => {
                warn!("Could not set wifi TetheringIdentifier property: {error}");
                self.technologies
                    .get_mut(TechnologyKind::Wifi)
                    .revert_tethering(previous);
            }
            PendingCall::TetheringPassphrase { previous } => {
                warn!("Could not set wifi TetheringPassphrase property: {error}");
                self.technologies
                    .get_mut(TechnologyKind::Wifi)
                    .revert_tethering(previous);
            }
            PendingCall::Scan => warn!("Could not scan wifi: {error}"),
            PendingCall::Connect { path } => warn!("Couldn't connect to service {path}: {error}"),
            PendingCall::Disconnect { path } => {
                warn!("Couldn't disconnect from service {path}: {error}")
            }
            PendingCall::ServiceConfig { path, property } => {
                warn!("Could not set {property} property on {path}: {error}")
            }
            PendingCall::Forget { path } => {
                warn!("Could not remove service {path}: {error}");
                return self.finish_forget(&path);
            }
        }

        Vec::new()
    }

    fn on_call_succeeded(&mut self, pending: PendingCall) -> Vec<Action> {
        match pending {
            PendingCall::TetheringIdentifier { previous } => {
                let wifi = self.technologies.get(TechnologyKind::Wifi);
                match (wifi.path(), wifi.passphrase()) {
                    (Some(path), Some(passphrase)) => {
                        let call = DbusCall::set_property(
                            CallTarget::Technology(path.to_string()),
                            property::TETHERING_PASSPHRASE,
                            PropertyValue::Str(passphrase.to_string()),
                        );
                        vec![self.call(call, PendingCall::TetheringPassphrase { previous })]
                    }
                    _ => {
                        debug!("Wifi went away while enabling tethering");
                        Vec::new()
                    }
                }
            }
            PendingCall::TetheringPassphrase { previous } => {
                let wifi = self.technologies.get(TechnologyKind::Wifi);
                match wifi.path() {
                    Some(path) if !wifi.is_tethering() => {
                        let call = DbusCall::set_property(
                            CallTarget::Technology(path.to_string()),
                            property::TETHERING,
                            PropertyValue::Bool(true),
                        );
                        vec![self.call(
                            call,
                            PendingCall::Tethering {
                                kind: TechnologyKind::Wifi,
                                previous,
                            },
                        )]
                    }
                    _ => Vec::new(),
                }
            }
            PendingCall::Forget { path } => self.finish_forget(&path),
            PendingCall::ServiceConfig { path, property } => {
                debug!("Set {property} on {path}");
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn finish_forget(&mut self, path: &str) -> Vec<Action> {
        self.forgetting.remove(path);
        match self.editors.remove(path) {
            Some(_) => vec![Action::EditorDone(EditorDone {
                path: path.to_string(),
                success: false,
            })],
            None => Vec::new(),
        }
    }

    fn scan_if_possible(&mut self) -> Vec<Action> {
        match self.technologies.get(TechnologyKind::Wifi).path() {
            Some(path) => {
                let call = DbusCall {
                    target: CallTarget::Technology(path.to_string()),
                    method: CallMethod::Scan,
                };
                vec![self.call(call, PendingCall::Scan)]
            }
            None => {
                debug!("No wifi technology to scan with");
                Vec::new()
            }
        }
    }

    fn require_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(ConnectionError::ServiceUnavailable)
        }
    }

    /// Toggles offline (flight) mode.
    pub fn set_offline_mode(&mut self, offline: bool) -> Result<Vec<Action>> {
        self.require_available()?;

        let previous = self.shown_offline_mode;
        self.shown_offline_mode = offline;
        if offline == self.offline_mode || offline == previous {
            return Ok(Vec::new());
        }

        let call = DbusCall::set_property(
            CallTarget::Manager,
            property::OFFLINE_MODE,
            PropertyValue::Bool(offline),
        );
        Ok(vec![self.call(call, PendingCall::OfflineMode { previous })])
    }

    /// Toggles a technology's `Powered` switch.
    pub fn set_powered(&mut self, kind: TechnologyKind, powered: bool) -> Result<Vec<Action>> {
        let controller = self.technologies.get_mut(kind);
        let Some(path) = controller.path().map(str::to_string) else {
            return Err(ConnectionError::TechnologyUnavailable(kind));
        };

        match controller.request_powered(powered) {
            Some(previous) => {
                let call = DbusCall::set_property(
                    CallTarget::Technology(path),
                    property::POWERED,
                    PropertyValue::Bool(powered),
                );
                Ok(vec![self.call(call, PendingCall::Powered { kind, previous })])
            }
            None => Ok(Vec::new()),
        }
    }

    /// Toggles a technology's `Tethering` switch.
    ///
    /// Enabling wifi tethering first sends the stored identifier and
    /// passphrase, then `Tethering` itself, each step waiting for the
    /// previous one to succeed.
    pub fn set_tethering(&mut self, kind: TechnologyKind, tethering: bool) -> Result<Vec<Action>> {
        if !kind.supports_tethering() {
            return Err(ConnectionError::InvalidTethering(format!(
                "{kind} does not support tethering"
            )));
        }

        let controller = self.technologies.get_mut(kind);
        let Some(path) = controller.path().map(str::to_string) else {
            return Err(ConnectionError::TechnologyUnavailable(kind));
        };

        let wifi_enable = kind == TechnologyKind::Wifi && tethering;
        if wifi_enable {
            controller
                .check_credentials()
                .map_err(ConnectionError::InvalidTethering)?;
        }

        let Some(previous) = controller.request_tethering(tethering) else {
            return Ok(Vec::new());
        };

        if wifi_enable {
            let identifier = controller.identifier().unwrap_or_default().to_string();
            let call = DbusCall::set_property(
                CallTarget::Technology(path),
                property::TETHERING_IDENTIFIER,
                PropertyValue::Str(identifier),
            );
            return Ok(vec![
                self.call(call, PendingCall::TetheringIdentifier { previous }),
            ]);
        }

        let call = DbusCall::set_property(
            CallTarget::Technology(path),
            property::TETHERING,
            PropertyValue::Bool(tethering),
        );
        Ok(vec![self.call(call, PendingCall::Tethering { kind, previous })])
    }

    /// Stores the wifi hotspot name and passphrase.
    ///
    /// While wifi is already tethering, the new credentials are pushed to
    /// ConnMan right away.
    pub fn set_tethering_credentials(
        &mut self,
        identifier: &str,
        passphrase: &str,
    ) -> Result<Vec<Action>> {
        let wifi = self.technologies.get_mut(TechnologyKind::Wifi);
        wifi.set_credentials(identifier, passphrase)
            .map_err(ConnectionError::InvalidTethering)?;

        match wifi.path().map(str::to_string) {
            Some(path) if wifi.is_tethering() => {
                let call = DbusCall::set_property(
                    CallTarget::Technology(path),
                    property::TETHERING_IDENTIFIER,
                    PropertyValue::Str(identifier.to_string()),
                );
                Ok(vec![
                    self.call(call, PendingCall::TetheringIdentifier { previous: true }),
                ])
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Asks the wifi technology to scan.
    pub fn scan(&mut self) -> Result<Vec<Action>> {
        if !self.technologies.get(TechnologyKind::Wifi).is_present() {
            return Err(ConnectionError::TechnologyUnavailable(TechnologyKind::Wifi));
        }
        Ok(self.scan_if_possible())
    }

    /// Connects or disconnects a service depending on its state.
    ///
    /// Connected services are disconnected; idle and failed ones are
    /// connected. A failed service also triggers a wifi scan.
    pub fn activate_service(&mut self, path: &str) -> Result<Vec<Action>> {
        let state = self
            .registry
            .get(path)
            .map(|row| row.state)
            .ok_or_else(|| ConnectionError::ServiceNotFound(path.to_string()))?;

        let target = CallTarget::Service(path.to_string());
        let mut actions = Vec::new();

        match state {
            ServiceState::Ready | ServiceState::Online => {
                let call = DbusCall {
                    target,
                    method: CallMethod::Disconnect,
                };
                let pending = PendingCall::Disconnect {
                    path: path.to_string(),
                };
                actions.push(self.call(call, pending));
            }
            ServiceState::Idle | ServiceState::Failure | ServiceState::Disconnect => {
                let call = DbusCall {
                    target,
                    method: CallMethod::Connect,
                };
                let pending = PendingCall::Connect {
                    path: path.to_string(),
                };
                actions.push(self.call(call, pending));
            }
            ServiceState::Association | ServiceState::Configuration | ServiceState::Unknown => {
                debug!("Not activating {path} in state {state}");
            }
        }

        if state == ServiceState::Failure {
            actions.extend(self.scan_if_possible());
        }

        Ok(actions)
    }

    /// Opens (or returns the already open) editor for a service.
    pub fn open_editor(&mut self, path: &str) -> Result<EditorSnapshot> {
        let row = self
            .registry
            .get(path)
            .ok_or_else(|| ConnectionError::ServiceNotFound(path.to_string()))?;

        let editor = self
            .editors
            .entry(path.to_string())
            .or_insert_with(|| ConnectionEditor::open(row));
        Ok(editor.snapshot())
    }

    fn editor_mut(&mut self, path: &str) -> Result<&mut ConnectionEditor> {
        self.editors
            .get_mut(path)
            .ok_or_else(|| ConnectionError::EditorNotOpen(path.to_string()))
    }

    /// Records one edit in an open editor.
    pub fn edit(&mut self, path: &str, input: EditorInput) -> Result<EditorSnapshot> {
        let editor = self.editor_mut(path)?;
        editor.input(input);
        Ok(editor.snapshot())
    }

    pub fn mark_dirty(&mut self, path: &str, groups: DirtyGroups) -> Result<EditorSnapshot> {
        let editor = self.editor_mut(path)?;
        editor.mark_dirty(groups);
        Ok(editor.snapshot())
    }

    /// Submits every dirty group and closes the editor.
    ///
    /// The editor reports `done(true)` straight away; replies are only
    /// logged.
    pub fn apply_editor(&mut self, path: &str) -> Result<Vec<Action>> {
        let mut editor = self
            .editors
            .remove(path)
            .ok_or_else(|| ConnectionError::EditorNotOpen(path.to_string()))?;

        let mut actions = Vec::new();
        for change in editor.apply() {
            let call = DbusCall::set_property(
                CallTarget::Service(path.to_string()),
                change.property,
                change.value,
            );
            let pending = PendingCall::ServiceConfig {
                path: path.to_string(),
                property: change.property,
            };
            actions.push(self.call(call, pending));
        }

        actions.push(Action::EditorDone(EditorDone {
            path: path.to_string(),
            success: true,
        }));
        Ok(actions)
    }

    /// Discards an editor's edits.
    pub fn cancel_editor(&mut self, path: &str) -> Result<Vec<Action>> {
        self.editors
            .remove(path)
            .ok_or_else(|| ConnectionError::EditorNotOpen(path.to_string()))?;
        self.forgetting.remove(path);

        Ok(vec![Action::EditorDone(EditorDone {
            path: path.to_string(),
            success: false,
        })])
    }

    /// Removes a service's saved configuration.
    ///
    /// An open editor for the service closes with `done(false)` once the
    /// call completes.
    pub fn forget_service(&mut self, path: &str) -> Result<Vec<Action>> {
        if !self.registry.contains(path) {
            return Err(ConnectionError::ServiceNotFound(path.to_string()));
        }
        if self.editors.contains_key(path) {
            self.forgetting.insert(path.to_string());
        }

        let call = DbusCall {
            target: CallTarget::Service(path.to_string()),
            method: CallMethod::Remove,
        };
        Ok(vec![self.call(
            call,
            PendingCall::Forget {
                path: path.to_string(),
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIFI: &str = "/net/connman/technology/wifi";

    fn available() -> PanelState {
        let mut state = PanelState::default();
        state.handle(Event::Manager(ManagerEvent::Properties(vec![
            ManagerProperty::State("idle".into()),
            ManagerProperty::OfflineMode(false),
        ])));
        state
    }

    fn with_wifi() -> PanelState {
        let mut state = available();
        state.handle(Event::Manager(ManagerEvent::TechnologyAdded {
            path: WIFI.into(),
            properties: vec![
                TechnologyProperty::Type("wifi".into()),
                TechnologyProperty::Powered(false),
            ],
        }));
        state
    }

    fn call_ids(actions: &[Action]) -> Vec<CallId> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Call { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn service(path: &str, state: ServiceState) -> (String, Vec<ServiceProperty>) {
        (
            path.to_string(),
            vec![
                ServiceProperty::Name(path.trim_start_matches('/').to_string()),
                ServiceProperty::State(state),
            ],
        )
    }

    #[test]
    fn properties_make_panel_available() {
        let state = available();
        assert!(state.is_available());
        assert_eq!(state.status(), GlobalState::Idle);
    }

    #[test]
    fn technology_added_is_watched() {
        let mut state = available();
        let actions = state.handle(Event::Manager(ManagerEvent::TechnologyAdded {
            path: WIFI.into(),
            properties: vec![
                TechnologyProperty::Type("wifi".into()),
                TechnologyProperty::Powered(true),
            ],
        }));
        assert_eq!(actions, vec![Action::WatchTechnology(WIFI.into())]);
        assert!(state.technology(TechnologyKind::Wifi).powered);
    }

    #[test]
    fn unknown_technology_is_ignored() {
        let mut state = available();
        let actions = state.handle(Event::Manager(ManagerEvent::TechnologyAdded {
            path: "/net/connman/technology/p2p".into(),
            properties: vec![TechnologyProperty::Type("p2p".into())],
        }));
        assert!(actions.is_empty());
    }

    #[test]
    fn technology_removed_resets_switches() {
        let mut state = with_wifi();
        state.handle(Event::Technology {
            path: WIFI.into(),
            event: TechnologyEvent::PropertyChanged(TechnologyProperty::Powered(true)),
        });
        let actions = state.handle(Event::Manager(ManagerEvent::TechnologyRemoved {
            path: WIFI.into(),
        }));
        assert_eq!(actions, vec![Action::UnwatchTechnology(WIFI.into())]);
        let wifi = state.technology(TechnologyKind::Wifi);
        assert!(!wifi.present);
        assert!(!wifi.powered);
    }

    fn unknown_object() -> CallError {
        CallError::new(
            Some("org.freedesktop.DBus.Error.UnknownObject".into()),
            "Method \"SetProperty\" doesn't exist",
        )
    }

    #[test]
    fn late_failure_after_technology_removal_keeps_switch_off() {
        let mut state = with_wifi();
        let actions = state.set_powered(TechnologyKind::Wifi, true).unwrap();
        let id = call_ids(&actions)[0];
        assert_eq!(state.pending_calls(), 1);

        state.handle(Event::Manager(ManagerEvent::TechnologyRemoved {
            path: WIFI.into(),
        }));
        assert_eq!(state.pending_calls(), 0);

        let actions = state.handle(Event::CallFinished {
            id,
            result: Err(unknown_object()),
        });
        assert!(actions.is_empty());
        let wifi = state.technology(TechnologyKind::Wifi);
        assert!(!wifi.present);
        assert!(!wifi.powered);
    }

    #[test]
    fn technology_removal_keeps_other_calls() {
        let mut state = with_wifi();
        let actions = state.set_offline_mode(true).unwrap();
        let id = call_ids(&actions)[0];

        state.handle(Event::Manager(ManagerEvent::TechnologyRemoved {
            path: WIFI.into(),
        }));
        assert_eq!(state.pending_calls(), 1);

        state.handle(Event::CallFinished {
            id,
            result: Err(unknown_object()),
        });
        assert!(!state.snapshot().offline_mode);
    }

    #[test]
    fn late_failures_after_vanish_are_ignored() {
        let mut state = with_wifi();
        state.handle(Event::Technology {
            path: WIFI.into(),
            event: TechnologyEvent::PropertyChanged(TechnologyProperty::Powered(true)),
        });
        let power = call_ids(&state.set_powered(TechnologyKind::Wifi, false).unwrap())[0];
        let offline = call_ids(&state.set_offline_mode(true).unwrap())[0];
        assert_eq!(state.pending_calls(), 2);

        state.handle(Event::Vanished);
        assert_eq!(state.pending_calls(), 0);

        for id in [power, offline] {
            let actions = state.handle(Event::CallFinished {
                id,
                result: Err(CallError::new(
                    Some("org.freedesktop.DBus.Error.ServiceUnknown".into()),
                    "The name net.connman was not provided by any .service files",
                )),
            });
            assert!(actions.is_empty());
        }

        let snapshot = state.snapshot();
        assert!(!snapshot.offline_mode);
        let wifi = state.technology(TechnologyKind::Wifi);
        assert!(!wifi.present);
        assert!(!wifi.powered);
    }

    #[test]
    fn initial_services_scan_when_few() {
        let mut state = with_wifi();
        let actions = state.handle(Event::Manager(ManagerEvent::Services(vec![service(
            "/a",
            ServiceState::Idle,
        )])));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Call {
                call: DbusCall {
                    method: CallMethod::Scan,
                    ..
                },
                ..
            }
        )));
    }

    #[test]
    fn initial_services_no_scan_when_enough() {
        let mut state = with_wifi();
        let actions = state.handle(Event::Manager(ManagerEvent::Services(vec![
            service("/a", ServiceState::Idle),
            service("/b", ServiceState::Idle),
        ])));
        assert!(call_ids(&actions).is_empty());
        assert_eq!(state.services().len(), 2);
    }

    #[test]
    fn properties_only_applied_to_new_rows() {
        let mut state = available();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Ready)],
            removed: vec![],
        }));
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Idle)],
            removed: vec![],
        }));
        assert_eq!(state.service("/a").map(|r| r.state), Some(ServiceState::Ready));
    }

    #[test]
    fn property_change_for_unknown_service_is_dropped() {
        let mut state = available();
        let actions = state.handle(Event::Service {
            path: "/ghost".into(),
            event: ServiceEvent::PropertyChanged(ServiceProperty::Strength(50)),
        });
        assert!(actions.is_empty());
        assert!(state.service("/ghost").is_none());
    }

    #[test]
    fn connecting_row_drives_status_and_pulse() {
        let mut state = available();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Idle)],
            removed: vec![],
        }));

        let actions = state.handle(Event::Service {
            path: "/a".into(),
            event: ServiceEvent::PropertyChanged(ServiceProperty::State(
                ServiceState::Association,
            )),
        });
        let timer = state.service("/a").and_then(|r| r.pulse_timer);
        assert!(timer.is_some());
        assert_eq!(state.status(), GlobalState::Connecting);
        assert!(matches!(actions.as_slice(), [Action::StartPulse { .. }]));

        if let Some(timer) = timer {
            state.handle(Event::PulseTick {
                path: "/a".into(),
                timer,
            });
            state.handle(Event::PulseTick {
                path: "/a".into(),
                timer: TimerId(999),
            });
        }
        assert_eq!(state.service("/a").map(|r| r.pulse), Some(1));

        let actions = state.handle(Event::Service {
            path: "/a".into(),
            event: ServiceEvent::PropertyChanged(ServiceProperty::State(ServiceState::Ready)),
        });
        assert!(matches!(actions.as_slice(), [Action::StopPulse(_)]));
        assert_eq!(state.service("/a").map(|r| r.pulse), Some(0));
        assert_eq!(state.status(), GlobalState::Idle);
    }

    #[test]
    fn pulse_wraps_around() {
        let mut state = available();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Configuration)],
            removed: vec![],
        }));
        let timer = state.service("/a").and_then(|r| r.pulse_timer);
        if let Some(row) = state.registry.get_mut("/a") {
            row.pulse = u32::MAX;
        }
        if let Some(timer) = timer {
            state.handle(Event::PulseTick {
                path: "/a".into(),
                timer,
            });
        }
        assert_eq!(state.service("/a").map(|r| r.pulse), Some(0));
    }

    #[test]
    fn offline_mode_reverts_on_failure() {
        let mut state = available();
        let actions = state.set_offline_mode(true).unwrap_or_default();
        let ids = call_ids(&actions);
        assert_eq!(ids.len(), 1);
        assert!(state.snapshot().offline_mode);

        state.handle(Event::CallFinished {
            id: ids[0],
            result: Err(CallError::new(Some("net.connman.Error.Failed".into()), "no")),
        });
        assert!(!state.snapshot().offline_mode);
    }

    #[test]
    fn offline_mode_keeps_value_when_already_set() {
        let mut state = available();
        let ids = call_ids(&state.set_offline_mode(true).unwrap_or_default());
        state.handle(Event::CallFinished {
            id: ids[0],
            result: Err(CallError::new(
                Some("net.connman.Error.AlreadyEnabled".into()),
                "",
            )),
        });
        assert!(state.snapshot().offline_mode);
    }

    #[test]
    fn requests_fail_while_unavailable() {
        let mut state = PanelState::default();
        assert!(matches!(
            state.set_offline_mode(true),
            Err(ConnectionError::ServiceUnavailable)
        ));
        assert!(matches!(
            state.set_powered(TechnologyKind::Wifi, true),
            Err(ConnectionError::TechnologyUnavailable(TechnologyKind::Wifi))
        ));
        assert!(matches!(
            state.activate_service("/nope"),
            Err(ConnectionError::ServiceNotFound(_))
        ));
    }

    #[test]
    fn cellular_cannot_tether() {
        let mut state = available();
        assert!(matches!(
            state.set_tethering(TechnologyKind::Cellular, true),
            Err(ConnectionError::InvalidTethering(_))
        ));
    }

    #[test]
    fn wifi_tethering_runs_in_sequence() {
        let mut state = with_wifi();
        assert!(matches!(
            state.set_tethering(TechnologyKind::Wifi, true),
            Err(ConnectionError::InvalidTethering(_))
        ));
        assert!(
            state
                .set_tethering_credentials("hotspot", "secret-pass")
                .unwrap_or_default()
                .is_empty()
        );

        let step = |actions: &[Action]| -> Option<(CallId, &'static str)> {
            actions.iter().find_map(|a| match a {
                Action::Call {
                    id,
                    call:
                        DbusCall {
                            method: CallMethod::SetProperty { name, .. },
                            ..
                        },
                } => Some((*id, *name)),
                _ => None,
            })
        };

        let actions = state.set_tethering(TechnologyKind::Wifi, true).unwrap_or_default();
        let (id, name) = step(&actions).unwrap_or((0, ""));
        assert_eq!(name, "TetheringIdentifier");

        let actions = state.handle(Event::CallFinished { id, result: Ok(()) });
        let (id, name) = step(&actions).unwrap_or((0, ""));
        assert_eq!(name, "TetheringPassphrase");

        let actions = state.handle(Event::CallFinished { id, result: Ok(()) });
        let (_, name) = step(&actions).unwrap_or((0, ""));
        assert_eq!(name, "Tethering");
    }

    #[test]
    fn wifi_tethering_aborts_on_failure() {
        let mut state = with_wifi();
        let _ = state.set_tethering_credentials("hotspot", "secret-pass");
        let ids = call_ids(&state.set_tethering(TechnologyKind::Wifi, true).unwrap_or_default());
        assert!(state.technology(TechnologyKind::Wifi).tethering);

        let actions = state.handle(Event::CallFinished {
            id: ids[0],
            result: Err(CallError::new(None, "denied")),
        });
        assert!(actions.is_empty());
        assert!(!state.technology(TechnologyKind::Wifi).tethering);
        assert_eq!(state.pending_calls(), 0);
    }

    #[test]
    fn activate_picks_connect_or_disconnect() {
        let mut state = with_wifi();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![
                service("/on", ServiceState::Online),
                service("/idle", ServiceState::Idle),
                service("/fail", ServiceState::Failure),
                service("/busy", ServiceState::Association),
            ],
            removed: vec![],
        }));

        let method = |actions: &[Action]| -> Vec<CallMethod> {
            actions
                .iter()
                .filter_map(|a| match a {
                    Action::Call { call, .. } => Some(call.method.clone()),
                    _ => None,
                })
                .collect()
        };

        assert_eq!(
            method(&state.activate_service("/on").unwrap_or_default()),
            vec![CallMethod::Disconnect]
        );
        assert_eq!(
            method(&state.activate_service("/idle").unwrap_or_default()),
            vec![CallMethod::Connect]
        );
        assert_eq!(
            method(&state.activate_service("/fail").unwrap_or_default()),
            vec![CallMethod::Connect, CallMethod::Scan]
        );
        assert!(method(&state.activate_service("/busy").unwrap_or_default()).is_empty());
    }

    #[test]
    fn editor_refreshes_from_property_echo() {
        let mut state = available();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Ready)],
            removed: vec![],
        }));
        assert!(state.open_editor("/a").is_ok());
        assert!(
            state
                .edit("/a", EditorInput::SetNameservers("9.9.9.9".into()))
                .is_ok()
        );

        state.handle(Event::Service {
            path: "/a".into(),
            event: ServiceEvent::PropertyChanged(ServiceProperty::Nameservers(vec![
                "1.1.1.1".into(),
            ])),
        });

        let editor = state.editor("/a");
        assert_eq!(editor.map(|e| e.dirty()), Some(DirtyGroups::empty()));
        assert_eq!(
            editor.map(|e| e.buffer().nameservers.clone()).as_deref(),
            Some("1.1.1.1")
        );
    }

    #[test]
    fn forget_closes_editor_unsuccessfully() {
        let mut state = available();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Idle)],
            removed: vec![],
        }));
        let _ = state.open_editor("/a");
        let ids = call_ids(&state.forget_service("/a").unwrap_or_default());

        let actions = state.handle(Event::CallFinished {
            id: ids[0],
            result: Ok(()),
        });
        assert_eq!(
            actions,
            vec![Action::EditorDone(EditorDone {
                path: "/a".into(),
                success: false,
            })]
        );
        assert!(state.editor("/a").is_none());
    }

    #[test]
    fn cancel_emits_done_false() {
        let mut state = available();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Idle)],
            removed: vec![],
        }));
        let _ = state.open_editor("/a");
        let actions = state.cancel_editor("/a").unwrap_or_default();
        assert_eq!(
            actions,
            vec![Action::EditorDone(EditorDone {
                path: "/a".into(),
                success: false,
            })]
        );
        assert!(matches!(
            state.cancel_editor("/a"),
            Err(ConnectionError::EditorNotOpen(_))
        ));
    }

    #[test]
    fn vanished_clears_everything() {
        let mut state = with_wifi();
        state.handle(Event::Manager(ManagerEvent::ServicesChanged {
            added: vec![service("/a", ServiceState::Configuration)],
            removed: vec![],
        }));
        let _ = state.open_editor("/a");

        let actions = state.handle(Event::Vanished);
        assert!(actions.contains(&Action::UnwatchService("/a".into())));
        assert!(actions.contains(&Action::UnwatchTechnology(WIFI.into())));
        assert!(actions.iter().any(|a| matches!(a, Action::StopPulse(_))));
        assert!(actions.contains(&Action::EditorDone(EditorDone {
            path: "/a".into(),
            success: false,
        })));

        let snapshot = state.snapshot();
        assert!(!snapshot.available);
        assert_eq!(snapshot.status, GlobalState::Unavailable);
        assert!(snapshot.services.is_empty());
        assert!(snapshot.editors.is_empty());
    }
}
