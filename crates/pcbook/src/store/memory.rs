use crate::{CancellationMonitor, Error, Filter, InventoryStore, Laptop, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, hash_map::Entry};
use uuid::Uuid;

/// An [`InventoryStore`] backed by a `HashMap` behind a single reader/writer
/// lock.
///
/// - `create` takes the write lock.
/// - `get` and the entirety of `search` take the read lock.
///
/// Writers block for the full duration of a scan. Iteration order is the
/// map's and is otherwise unspecified.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    data: RwLock<HashMap<String, Laptop>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

/// Validates a caller-supplied ID or mints a new one.
fn assign_id(id: &str) -> Result<String> {
    if id.is_empty() {
        return Ok(Uuid::new_v4().to_string());
    }
    match Uuid::parse_str(id) {
        Ok(_) => Ok(id.to_string()),
        Err(e) => Err(Error::InvalidId {
            id: id.to_string(),
            reason: e.to_string(),
        }),
    }
}

impl InventoryStore for InMemoryInventoryStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(id = %laptop.id)))]
    fn create(&self, mut laptop: Laptop) -> Result<String> {
        let id = assign_id(&laptop.id)?;

        let mut data = self.data.write();
        match data.entry(id) {
            Entry::Occupied(entry) => Err(Error::AlreadyExists {
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                laptop.id.clone_from(entry.key());
                let id = entry.key().clone();
                entry.insert(laptop);
                Ok(id)
            }
        }
    }

    fn get(&self, id: &str) -> Option<Laptop> {
        self.data.read().get(id).cloned()
    }

    fn contains(&self, id: &str) -> bool {
        self.data.read().contains_key(id)
    }

    fn search<E, F>(
        &self,
        filter: &Filter,
        monitor: &CancellationMonitor,
        mut found: F,
    ) -> core::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(Laptop) -> core::result::Result<(), E>,
    {
        let data = self.data.read();

        for laptop in data.values() {
            #[cfg(feature = "tracing")]
            tracing::trace!("Checking laptop {}", laptop.id);

            if let Err(e) = monitor.check() {
                #[cfg(feature = "tracing")]
                tracing::debug!("Search stopped: {e}");
                return Err(e.into());
            }

            if filter.matches(laptop) {
                found(laptop.clone())?;
            }
        }

        Ok(())
    }
}
