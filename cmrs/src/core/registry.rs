//! Ordered store of service rows keyed by object path.

use std::collections::HashMap;

use crate::api::models::ServiceRow;
use crate::core::events::ServiceProperty;

/// Owns every [`ServiceRow`] of a panel.
///
/// Rows keep the order the manager last reported; `index` maps a path to
/// its position and is rebuilt after every structural change.
#[derive(Debug, Default)]
pub(crate) struct ServiceRegistry {
    rows: Vec<ServiceRow>,
    index: HashMap<String, usize>,
}

impl ServiceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub(crate) fn get(&self, path: &str) -> Option<&ServiceRow> {
        self.index.get(path).map(|&i| &self.rows[i])
    }

    pub(crate) fn get_mut(&mut self, path: &str) -> Option<&mut ServiceRow> {
        match self.index.get(path) {
            Some(&i) => self.rows.get_mut(i),
            None => None,
        }
    }

    pub(crate) fn rows(&self) -> &[ServiceRow] {
        &self.rows
    }

    /// Appends a new row. The caller checks the path is not yet present.
    pub(crate) fn insert(&mut self, row: ServiceRow) {
        self.index.insert(row.path.clone(), self.rows.len());
        self.rows.push(row);
    }

    pub(crate) fn remove(&mut self, path: &str) -> Option<ServiceRow> {
        let i = self.index.remove(path)?;
        let row = self.rows.remove(i);
        self.reindex();
        Some(row)
    }

    /// Removes every row, returning them in order.
    pub(crate) fn drain(&mut self) -> Vec<ServiceRow> {
        self.index.clear();
        std::mem::take(&mut self.rows)
    }

    /// Moves the rows named in `order` to the front, in that order.
    ///
    /// Unknown and repeated paths are skipped. Rows not named keep their
    /// relative order behind the named ones.
    pub(crate) fn reorder<'a, I>(&mut self, order: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut old: Vec<Option<ServiceRow>> = self.rows.drain(..).map(Some).collect();
        let mut rows = Vec::with_capacity(old.len());

        for path in order {
            if let Some(row) = self.index.get(path).and_then(|&i| old[i].take()) {
                rows.push(row);
            }
        }
        rows.extend(old.into_iter().flatten());

        self.rows = rows;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.path.clone(), i))
            .collect();
    }
}

/// Writes one decoded property into a row.
pub(crate) fn apply_property(row: &mut ServiceRow, property: ServiceProperty) {
    match property {
        ServiceProperty::Name(name) => row.name = name,
        ServiceProperty::Type(t) => row.service_type = t,
        ServiceProperty::State(state) => row.state = state,
        ServiceProperty::Security(security) => row.security = security,
        ServiceProperty::Strength(strength) => row.strength = strength,
        ServiceProperty::Favorite(favorite) => row.favorite = favorite,
        ServiceProperty::AutoConnect(autoconnect) => row.autoconnect = autoconnect,
        ServiceProperty::Ethernet(ethernet) => row.ethernet = ethernet,
        ServiceProperty::Ipv4(ipv4) => row.ipv4 = ipv4,
        ServiceProperty::Ipv6(ipv6) => row.ipv6 = ipv6,
        ServiceProperty::Nameservers(list) => row.nameservers = list,
        ServiceProperty::Domains(list) => row.domains = list,
        ServiceProperty::Proxy(proxy) => row.proxy = proxy,
        ServiceProperty::Other(_) => {}
    }
}
