//! ConnMan Manager proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{OwnedObjectPath, OwnedValue, Value};

/// Objects returned by `GetTechnologies` and `GetServices`.
pub(crate) type ObjectProperties = Vec<(OwnedObjectPath, HashMap<String, OwnedValue>)>;

/// Proxy for the root `net.connman.Manager` object.
///
/// # Signals
///
/// `ServicesChanged` carries the complete, ordered service list: every
/// service appears in `changed`, with properties only for those that are new
/// or changed. `removed` lists services that went away.
#[proxy(
    interface = "net.connman.Manager",
    default_service = "net.connman",
    default_path = "/"
)]
pub trait ConnmanManager {
    /// Global properties such as `State` and `OfflineMode`.
    fn get_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    fn set_property(&self, name: &str, value: &Value<'_>) -> Result<()>;

    fn get_technologies(&self) -> Result<ObjectProperties>;

    /// Services in the manager's display order.
    fn get_services(&self) -> Result<ObjectProperties>;

    #[zbus(signal, name = "PropertyChanged")]
    fn property_changed(&self, name: String, value: OwnedValue) -> Result<()>;

    #[zbus(signal, name = "TechnologyAdded")]
    fn technology_added(
        &self,
        path: OwnedObjectPath,
        properties: HashMap<String, OwnedValue>,
    ) -> Result<()>;

    #[zbus(signal, name = "TechnologyRemoved")]
    fn technology_removed(&self, path: OwnedObjectPath) -> Result<()>;

    #[zbus(signal, name = "ServicesChanged")]
    fn services_changed(
        &self,
        changed: ObjectProperties,
        removed: Vec<OwnedObjectPath>,
    ) -> Result<()>;
}
