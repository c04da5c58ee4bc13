//! Streams search matches to the client from a blocking worker.
//!
//! The inventory scan holds the store's read lock for its whole duration, so
//! it runs on the blocking pool and pushes each match with `blocking_send`. A
//! full response buffer therefore pauses the scan (and keeps creates waiting)
//! until the client catches up.

use crate::server::telemetry::increment_laptops_found;
use pcbook_tonic_core::{
    Error, Result,
    pcbook::{CancellationMonitor, Filter, InventoryStore},
    proto::SearchLaptopResponse,
};
use tokio::sync::mpsc;
use tonic::Status;

pub type SearchSender = mpsc::Sender<core::result::Result<SearchLaptopResponse, Status>>;

/// Runs `filter` over `store`, sending every match on `resp_tx` in scan order.
///
/// Returns the number of laptops sent. Any failure other than a closed
/// response channel is also sent to the client as the terminal status.
///
/// Must not be called from an async context.
pub fn stream_search<S>(
    store: &S,
    filter: &Filter,
    monitor: &CancellationMonitor,
    resp_tx: &SearchSender,
) -> Result<usize>
where
    S: InventoryStore + ?Sized,
{
    let mut found = 0usize;

    let outcome = store.search(filter, monitor, |laptop| -> Result<()> {
        let response = SearchLaptopResponse {
            laptop: Some(laptop.into()),
        };
        resp_tx
            .blocking_send(Ok(response))
            .map_err(|_| Error::ChannelError {
                context: "search response stream closed".to_string(),
            })?;
        found += 1;
        Ok(())
    });

    increment_laptops_found(found as u64);

    match outcome {
        Ok(()) => Ok(found),
        Err(err) => {
            if !matches!(err, Error::ChannelError { .. }) {
                let _ = resp_tx.blocking_send(Err(err.clone().into()));
            }
            Err(err)
        }
    }
}
