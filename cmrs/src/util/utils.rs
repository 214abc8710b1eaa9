//! Display and text helpers.
//!
//! Converts service attributes into labels and icon names, and splits the
//! free-form text an editor collects into the lists ConnMan expects.

use crate::api::models::{Security, ServiceType};
use crate::types::constants::signal_strength;

/// Converts signal strength into a quality label.
///
/// Wired and bluetooth services always report "Excellent":
/// - above 80: `Excellent`
/// - above 55: `Good`
/// - above 30: `ok`
/// - above 5:  `weak`
/// - otherwise `n/a`
pub(crate) fn strength_label(service_type: ServiceType, strength: u8) -> &'static str {
    if matches!(service_type, ServiceType::Ethernet | ServiceType::Bluetooth) {
        return "Excellent";
    }

    match strength {
        s if s > signal_strength::EXCELLENT_ABOVE => "Excellent",
        s if s > signal_strength::GOOD_ABOVE => "Good",
        s if s > signal_strength::OK_ABOVE => "ok",
        s if s > signal_strength::WEAK_ABOVE => "weak",
        _ => "n/a",
    }
}

fn strength_suffix(strength: u8) -> &'static str {
    match strength {
        s if s > signal_strength::EXCELLENT_ABOVE => "excellent",
        s if s > signal_strength::GOOD_ABOVE => "good",
        s if s > signal_strength::OK_ABOVE => "ok",
        _ => "weak",
    }
}

/// Icon name for a service's technology.
pub(crate) fn type_icon_name(service_type: ServiceType, strength: u8) -> Option<&'static str> {
    match service_type {
        ServiceType::Ethernet => Some("network-wired-symbolic"),
        ServiceType::Bluetooth => Some("bluetooth-active-symbolic"),
        ServiceType::Wifi => Some(match strength_suffix(strength) {
            "excellent" => "network-wireless-signal-excellent-symbolic",
            "good" => "network-wireless-signal-good-symbolic",
            "ok" => "network-wireless-signal-ok-symbolic",
            _ => "network-wireless-signal-weak-symbolic",
        }),
        ServiceType::Cellular => Some(match strength_suffix(strength) {
            "excellent" => "network-cellular-signal-excellent-symbolic",
            "good" => "network-cellular-signal-good-symbolic",
            "ok" => "network-cellular-signal-ok-symbolic",
            _ => "network-cellular-signal-weak-symbolic",
        }),
        ServiceType::Unknown => None,
    }
}

/// Lock icon for a secured service. Open and unknown networks get none.
pub(crate) fn security_icon_name(security: Security) -> Option<&'static str> {
    match security {
        Security::Wep | Security::Wps | Security::Psk => {
            Some("network-wireless-encrypted-symbolic")
        }
        Security::Ieee8021x => Some("connman_corporate"),
        Security::None | Security::Unknown => None,
    }
}

/// Splits `text` on any of `separators`, trimming pieces and dropping empties.
pub(crate) fn split_list(text: &str, separators: &[char]) -> Vec<String> {
    text.split(|c: char| separators.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Splits a nameserver entry such as `"1.1.1.1, 1.0.0.1; 9.9.9.9"`.
///
/// Colons are not separators so IPv6 addresses survive.
pub(crate) fn split_nameservers(text: &str) -> Vec<String> {
    split_list(text, &[',', ';', ' ', '\t', '\n'])
}

/// Splits a comma separated list (domains, proxy excludes).
pub(crate) fn split_commas(text: &str) -> Vec<String> {
    split_list(text, &[','])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_labels() {
        assert_eq!(strength_label(ServiceType::Wifi, 81), "Excellent");
        assert_eq!(strength_label(ServiceType::Wifi, 80), "Good");
        assert_eq!(strength_label(ServiceType::Wifi, 56), "Good");
        assert_eq!(strength_label(ServiceType::Wifi, 31), "ok");
        assert_eq!(strength_label(ServiceType::Wifi, 6), "weak");
        assert_eq!(strength_label(ServiceType::Wifi, 5), "n/a");
        assert_eq!(strength_label(ServiceType::Ethernet, 0), "Excellent");
        assert_eq!(strength_label(ServiceType::Bluetooth, 0), "Excellent");
    }

    #[test]
    fn type_icons() {
        assert_eq!(
            type_icon_name(ServiceType::Ethernet, 0),
            Some("network-wired-symbolic")
        );
        assert_eq!(
            type_icon_name(ServiceType::Wifi, 90),
            Some("network-wireless-signal-excellent-symbolic")
        );
        assert_eq!(
            type_icon_name(ServiceType::Cellular, 40),
            Some("network-cellular-signal-ok-symbolic")
        );
        assert_eq!(
            type_icon_name(ServiceType::Wifi, 10),
            Some("network-wireless-signal-weak-symbolic")
        );
        assert_eq!(type_icon_name(ServiceType::Unknown, 100), None);
    }

    #[test]
    fn security_icons() {
        assert_eq!(security_icon_name(Security::None), None);
        assert_eq!(
            security_icon_name(Security::Psk),
            Some("network-wireless-encrypted-symbolic")
        );
        assert_eq!(
            security_icon_name(Security::Ieee8021x),
            Some("connman_corporate")
        );
    }

    #[test]
    fn nameserver_splitting() {
        assert_eq!(
            split_nameservers("1.1.1.1,1.0.0.1"),
            vec!["1.1.1.1", "1.0.0.1"]
        );
        assert_eq!(
            split_nameservers(" 8.8.8.8 ; 2001:4860:4860::8888 ,, "),
            vec!["8.8.8.8", "2001:4860:4860::8888"]
        );
        assert!(split_nameservers("   ").is_empty());
    }

    #[test]
    fn comma_splitting() {
        assert_eq!(
            split_commas("example.com, corp.example.com"),
            vec!["example.com", "corp.example.com"]
        );
        assert!(split_commas("").is_empty());
    }
}
