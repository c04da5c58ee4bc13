use crate::{CancellationMonitor, Error, Filter, Laptop, Result};

/// Keyed storage for [`Laptop`] records.
///
/// Implementations own the records they hold. Every read returns an
/// independent clone, so mutating a returned value never affects the store.
pub trait InventoryStore: Send + Sync {
    /// Inserts `laptop` and returns its ID.
    ///
    /// An empty `laptop.id` gets a freshly minted UUID. A non-empty ID must
    /// already be a well-formed UUID.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidId`] if a supplied ID is malformed. Nothing is stored.
    /// - [`Error::AlreadyExists`] if the ID is taken. The existing record is
    ///   kept.
    ///
    /// [`Error::InvalidId`]: crate::Error::InvalidId
    /// [`Error::AlreadyExists`]: crate::Error::AlreadyExists
    fn create(&self, laptop: Laptop) -> Result<String>;

    /// Returns a copy of the stored laptop, or `None` if there is none.
    fn get(&self, id: &str) -> Option<Laptop>;

    /// Whether a laptop with `id` is stored. Cheaper than [`get`](Self::get)
    /// when the record itself isn't needed.
    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Scans every record and hands a copy of each one matching `filter` to
    /// `found`.
    ///
    /// `monitor` is checked once per candidate record, before the predicate
    /// runs. Shared access is held for the whole scan, including the time
    /// spent inside `found`, so concurrent [`create`](Self::create) calls wait
    /// until the scan ends.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] / [`Error::DeadlineExceeded`] as soon as the
    ///   monitor trips. No record is emitted after that.
    /// - Any error returned by `found`, unchanged. Callers pick `E` so that a
    ///   failing sink stays distinguishable from cancellation.
    ///
    /// [`Error::Cancelled`]: crate::Error::Cancelled
    /// [`Error::DeadlineExceeded`]: crate::Error::DeadlineExceeded
    fn search<E, F>(
        &self,
        filter: &Filter,
        monitor: &CancellationMonitor,
        found: F,
    ) -> core::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(Laptop) -> core::result::Result<(), E>;
}
