//! ConnMan Service proxy.

use zbus::{Result, proxy};
use zvariant::{OwnedValue, Value};

/// Proxy for a `net.connman.Service` object.
///
/// Services are reached through paths like
/// `/net/connman/service/wifi_0011223344_4d794e6574_managed_psk`.
#[proxy(interface = "net.connman.Service", default_service = "net.connman")]
pub trait ConnmanService {
    fn connect(&self) -> Result<()>;

    fn disconnect(&self) -> Result<()>;

    /// Forgets the service's saved configuration.
    fn remove(&self) -> Result<()>;

    /// Sets one of the `*.Configuration` properties or `AutoConnect`.
    fn set_property(&self, name: &str, value: &Value<'_>) -> Result<()>;

    #[zbus(signal, name = "PropertyChanged")]
    fn property_changed(&self, name: String, value: OwnedValue) -> Result<()>;
}
