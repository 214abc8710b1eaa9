//! Constants for ConnMan's D-Bus API.
//!
//! Names, object paths, property keys and error names used when talking to
//! `net.connman` on the system bus.

/// Well-known bus name.
pub mod bus {
    /// Bus name owned by the ConnMan daemon.
    pub const SERVICE: &str = "net.connman";
}

/// Property keys used on the Manager, Technology and Service interfaces.
pub mod property {
    pub const STATE: &str = "State";
    pub const OFFLINE_MODE: &str = "OfflineMode";

    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const POWERED: &str = "Powered";
    pub const TETHERING: &str = "Tethering";
    pub const TETHERING_IDENTIFIER: &str = "TetheringIdentifier";
    pub const TETHERING_PASSPHRASE: &str = "TetheringPassphrase";

    pub const SECURITY: &str = "Security";
    pub const STRENGTH: &str = "Strength";
    pub const FAVORITE: &str = "Favorite";
    pub const AUTOCONNECT: &str = "AutoConnect";
    pub const ETHERNET: &str = "Ethernet";
    pub const IPV4: &str = "IPv4";
    pub const IPV6: &str = "IPv6";
    pub const NAMESERVERS: &str = "Nameservers";
    pub const DOMAINS: &str = "Domains";
    pub const PROXY: &str = "Proxy";

    pub const IPV4_CONFIGURATION: &str = "IPv4.Configuration";
    pub const IPV6_CONFIGURATION: &str = "IPv6.Configuration";
    pub const NAMESERVERS_CONFIGURATION: &str = "Nameservers.Configuration";
    pub const DOMAINS_CONFIGURATION: &str = "Domains.Configuration";
    pub const PROXY_CONFIGURATION: &str = "Proxy.Configuration";
}

/// Keys inside the IPv4/IPv6/Proxy/Ethernet dictionaries.
pub mod config_key {
    pub const METHOD: &str = "Method";
    pub const ADDRESS: &str = "Address";
    pub const NETMASK: &str = "Netmask";
    pub const GATEWAY: &str = "Gateway";
    pub const PREFIX_LENGTH: &str = "PrefixLength";
    pub const PRIVACY: &str = "Privacy";
    pub const URL: &str = "URL";
    pub const SERVERS: &str = "Servers";
    pub const EXCLUDES: &str = "Excludes";
    pub const INTERFACE: &str = "Interface";
    pub const MTU: &str = "MTU";
}

/// Remote error names returned by ConnMan.
pub mod error_name {
    pub const ALREADY_ENABLED: &str = "net.connman.Error.AlreadyEnabled";
    pub const ALREADY_DISABLED: &str = "net.connman.Error.AlreadyDisabled";
}

/// Display defaults.
pub mod display {
    /// Name shown for services that do not advertise one.
    pub const HIDDEN_NETWORK_NAME: &str = "Connect to a Hidden Network";

    /// Minimum passphrase length accepted for a wifi hotspot.
    pub const MIN_TETHERING_PASSPHRASE_LEN: usize = 8;

    /// Below this many known services, the initial load asks for a wifi scan.
    pub const MIN_SERVICES_BEFORE_SCAN: usize = 2;
}

/// Signal strength thresholds used for labels and icons.
pub mod signal_strength {
    pub const EXCELLENT_ABOVE: u8 = 80;
    pub const GOOD_ABOVE: u8 = 55;
    pub const OK_ABOVE: u8 = 30;
    pub const WEAK_ABOVE: u8 = 5;
}

/// Timing constants.
pub mod timeouts {
    use std::time::Duration;

    /// Interval between spinner pulses of a connecting service (80 ms).
    const PULSE_INTERVAL_MS: u64 = 80;

    /// Returns the default spinner pulse interval.
    pub fn pulse_interval() -> Duration {
        Duration::from_millis(PULSE_INTERVAL_MS)
    }
}
