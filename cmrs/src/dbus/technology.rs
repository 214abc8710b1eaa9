//! ConnMan Technology proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{OwnedValue, Value};

/// Proxy for a `net.connman.Technology` object such as
/// `/net/connman/technology/wifi`.
#[proxy(interface = "net.connman.Technology", default_service = "net.connman")]
pub trait ConnmanTechnology {
    fn get_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    /// Sets `Powered`, `Tethering` or one of the tethering credentials.
    fn set_property(&self, name: &str, value: &Value<'_>) -> Result<()>;

    /// Requests a scan. Only wifi supports this.
    fn scan(&self) -> Result<()>;

    #[zbus(signal, name = "PropertyChanged")]
    fn property_changed(&self, name: String, value: OwnedValue) -> Result<()>;
}
