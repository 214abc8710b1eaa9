//! Panel configuration.

use std::time::Duration;

use crate::types::constants::timeouts;

/// Tunables for a [`NetworkPanel`](crate::NetworkPanel).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use cmrs::PanelConfig;
///
/// let config = PanelConfig::new()
///     .with_pulse_interval(Duration::from_millis(120))
///     .with_rescan_on_services_changed(true);
///
/// assert_eq!(config.pulse_interval, Duration::from_millis(120));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelConfig {
    /// Interval between spinner pulses of a connecting service.
    pub pulse_interval: Duration,
    /// Request a wifi scan after every `ServicesChanged` signal.
    pub rescan_on_services_changed: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            pulse_interval: timeouts::pulse_interval(),
            rescan_on_services_changed: false,
        }
    }
}

impl PanelConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pulse_interval(mut self, interval: Duration) -> Self {
        self.pulse_interval = interval;
        self
    }

    pub fn with_rescan_on_services_changed(mut self, rescan: bool) -> Self {
        self.rescan_on_services_changed = rescan;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PanelConfig::new();
        assert_eq!(config.pulse_interval, Duration::from_millis(80));
        assert!(!config.rescan_on_services_changed);
    }

    #[test]
    fn builder_overrides() {
        let config = PanelConfig::new()
            .with_pulse_interval(Duration::from_millis(10))
            .with_rescan_on_services_changed(true);
        assert_eq!(config.pulse_interval, Duration::from_millis(10));
        assert!(config.rescan_on_services_changed);
    }
}
