//! Per-technology switch state.
//!
//! A controller tracks the value ConnMan last confirmed for `Powered` and
//! `Tethering` separately from the value currently shown, so a failed
//! `SetProperty` can put the shown value back.

use log::debug;

use crate::api::models::{TechnologyKind, TechnologyStatus};
use crate::core::events::TechnologyProperty;
use crate::types::constants::display;

#[derive(Debug, Clone)]
pub(crate) struct TechnologyController {
    kind: TechnologyKind,
    path: Option<String>,
    powered: bool,
    tethering: bool,
    shown_powered: bool,
    shown_tethering: bool,
    identifier: Option<String>,
    passphrase: Option<String>,
}

impl TechnologyController {
    pub(crate) fn new(kind: TechnologyKind) -> Self {
        Self {
            kind,
            path: None,
            powered: false,
            tethering: false,
            shown_powered: false,
            shown_tethering: false,
            identifier: None,
            passphrase: None,
        }
    }

    pub(crate) fn kind(&self) -> TechnologyKind {
        self.kind
    }

    pub(crate) fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub(crate) fn is_present(&self) -> bool {
        self.path.is_some()
    }

    /// Confirmed tethering state.
    pub(crate) fn is_tethering(&self) -> bool {
        self.tethering
    }

    pub(crate) fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub(crate) fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    /// Marks the technology as advertised at `path`.
    ///
    /// Returns the previous path when the technology moved to a new object.
    pub(crate) fn present(&mut self, path: &str) -> Option<String> {
        match self.path.replace(path.to_string()) {
            Some(old) if old != path => Some(old),
            _ => None,
        }
    }

    /// Forgets the technology and resets the switches. Returns its old path.
    pub(crate) fn absent(&mut self) -> Option<String> {
        let path = self.path.take();
        *self = Self::new(self.kind);
        path
    }

    pub(crate) fn apply(&mut self, property: &TechnologyProperty) {
        match property {
            TechnologyProperty::Powered(powered) => {
                self.powered = *powered;
                self.shown_powered = *powered;
            }
            TechnologyProperty::Tethering(tethering) => {
                self.tethering = *tethering;
                self.shown_tethering = *tethering;
            }
            TechnologyProperty::TetheringIdentifier(id) => self.identifier = Some(id.clone()),
            TechnologyProperty::TetheringPassphrase(pass) => self.passphrase = Some(pass.clone()),
            TechnologyProperty::Type(_) => {}
            TechnologyProperty::Other(name) => {
                debug!("Ignoring {} technology property {name}", self.kind.as_str());
            }
        }
    }

    /// Shows `desired` on the powered switch.
    ///
    /// Returns the previously shown value when a `SetProperty` call is
    /// needed, or `None` when ConnMan already has that value or a call for
    /// it is already in flight.
    pub(crate) fn request_powered(&mut self, desired: bool) -> Option<bool> {
        let previous = self.shown_powered;
        self.shown_powered = desired;
        (desired != self.powered && desired != previous).then_some(previous)
    }

    pub(crate) fn revert_powered(&mut self, previous: bool) {
        self.shown_powered = previous;
    }

    /// Same as [`request_powered`](Self::request_powered) for tethering.
    pub(crate) fn request_tethering(&mut self, desired: bool) -> Option<bool> {
        let previous = self.shown_tethering;
        self.shown_tethering = desired;
        (desired != self.tethering && desired != previous).then_some(previous)
    }

    pub(crate) fn revert_tethering(&mut self, previous: bool) {
        self.shown_tethering = previous;
    }

    /// Stores new hotspot credentials after checking them.
    pub(crate) fn set_credentials(&mut self, identifier: &str, passphrase: &str) -> Result<(), String> {
        validate_credentials(identifier, passphrase)?;
        self.identifier = Some(identifier.to_string());
        self.passphrase = Some(passphrase.to_string());
        Ok(())
    }

    /// Checks the stored credentials are usable for a hotspot.
    pub(crate) fn check_credentials(&self) -> Result<(), String> {
        validate_credentials(
            self.identifier.as_deref().unwrap_or_default(),
            self.passphrase.as_deref().unwrap_or_default(),
        )
    }

    pub(crate) fn status(&self) -> TechnologyStatus {
        TechnologyStatus {
            kind: self.kind,
            present: self.is_present(),
            powered: self.shown_powered,
            tethering: self.shown_tethering,
            tethering_identifier: self.identifier.clone(),
            tethering_passphrase: self.passphrase.clone(),
        }
    }
}

fn validate_credentials(identifier: &str, passphrase: &str) -> Result<(), String> {
    if identifier.is_empty() {
        return Err("network name must not be empty".into());
    }
    if passphrase.chars().count() < display::MIN_TETHERING_PASSPHRASE_LEN {
        return Err(format!(
            "passphrase must be at least {} characters",
            display::MIN_TETHERING_PASSPHRASE_LEN
        ));
    }
    Ok(())
}

/// The four controllers of a panel.
#[derive(Debug, Clone)]
pub(crate) struct Technologies {
    controllers: [TechnologyController; 4],
}

impl Technologies {
    pub(crate) fn new() -> Self {
        Self {
            controllers: TechnologyKind::ALL.map(TechnologyController::new),
        }
    }

    fn slot(kind: TechnologyKind) -> usize {
        match kind {
            TechnologyKind::Ethernet => 0,
            TechnologyKind::Wifi => 1,
            TechnologyKind::Bluetooth => 2,
            TechnologyKind::Cellular => 3,
        }
    }

    pub(crate) fn get(&self, kind: TechnologyKind) -> &TechnologyController {
        &self.controllers[Self::slot(kind)]
    }

    pub(crate) fn get_mut(&mut self, kind: TechnologyKind) -> &mut TechnologyController {
        &mut self.controllers[Self::slot(kind)]
    }

    /// Finds the controller currently bound to `path`.
    pub(crate) fn by_path_mut(&mut self, path: &str) -> Option<&mut TechnologyController> {
        self.controllers.iter_mut().find(|c| c.path() == Some(path))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TechnologyController> {
        self.controllers.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TechnologyController> {
        self.controllers.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present_wifi() -> TechnologyController {
        let mut wifi = TechnologyController::new(TechnologyKind::Wifi);
        wifi.present("/net/connman/technology/wifi");
        wifi
    }

    #[test]
    fn starts_absent() {
        let wifi = TechnologyController::new(TechnologyKind::Wifi);
        let status = wifi.status();
        assert!(!status.present);
        assert!(!status.powered);
    }

    #[test]
    fn property_updates_confirmed_and_shown() {
        let mut wifi = present_wifi();
        wifi.apply(&TechnologyProperty::Powered(true));
        assert!(wifi.status().powered);
        assert_eq!(wifi.request_powered(true), None);
    }

    #[test]
    fn toggle_needs_call_only_when_different() {
        let mut wifi = present_wifi();
        assert_eq!(wifi.request_powered(true), Some(false));
        assert!(wifi.status().powered);
        // back to the confirmed value: nothing to send
        assert_eq!(wifi.request_powered(false), None);
        assert!(!wifi.status().powered);
    }

    #[test]
    fn repeated_request_does_not_resend() {
        let mut wifi = present_wifi();
        assert_eq!(wifi.request_tethering(true), Some(false));
        assert_eq!(wifi.request_tethering(true), None);
    }

    #[test]
    fn revert_restores_prior_value() {
        let mut wifi = present_wifi();
        let previous = wifi.request_powered(true);
        assert_eq!(previous, Some(false));
        wifi.revert_powered(false);
        assert!(!wifi.status().powered);
    }

    #[test]
    fn absent_resets_everything() {
        let mut wifi = present_wifi();
        wifi.apply(&TechnologyProperty::Powered(true));
        wifi.apply(&TechnologyProperty::TetheringIdentifier("hotspot".into()));
        assert_eq!(
            wifi.absent().as_deref(),
            Some("/net/connman/technology/wifi")
        );
        let status = wifi.status();
        assert!(!status.present);
        assert!(!status.powered);
        assert_eq!(status.tethering_identifier, None);
    }

    #[test]
    fn moving_path_reports_old_one() {
        let mut wifi = present_wifi();
        assert_eq!(wifi.present("/net/connman/technology/wifi"), None);
        assert_eq!(
            wifi.present("/net/connman/technology/wifi2").as_deref(),
            Some("/net/connman/technology/wifi")
        );
    }

    #[test]
    fn credentials_are_validated() {
        let mut wifi = present_wifi();
        assert!(wifi.set_credentials("", "longenough").is_err());
        assert!(wifi.set_credentials("hotspot", "short").is_err());
        assert!(wifi.check_credentials().is_err());
        assert!(wifi.set_credentials("hotspot", "12345678").is_ok());
        assert!(wifi.check_credentials().is_ok());
    }

    #[test]
    fn lookup_by_kind_and_path() {
        let mut techs = Technologies::new();
        techs
            .get_mut(TechnologyKind::Bluetooth)
            .present("/net/connman/technology/bluetooth");
        assert!(techs.get(TechnologyKind::Bluetooth).is_present());
        assert!(!techs.get(TechnologyKind::Wifi).is_present());
        assert_eq!(
            techs
                .by_path_mut("/net/connman/technology/bluetooth")
                .map(|c| c.kind()),
            Some(TechnologyKind::Bluetooth)
        );
        assert!(techs.by_path_mut("/net/connman/technology/p2p").is_none());
    }
}
