//! The bodies of the streaming calls, kept apart from the gRPC plumbing so
//! they can be driven by plain streams and channels.

pub mod rate;
pub mod search;
pub mod upload;

use futures::{Stream, StreamExt};
use pcbook_tonic_core::{Error, Result, pcbook::CancellationMonitor};
use tonic::Status;

/// Receives the next inbound message, or `None` once the client half-closes.
///
/// This is the per-message cancellation checkpoint for client streams: the
/// monitor is checked before waiting, and a cancel or deadline that fires while
/// waiting ends the wait. An error status from the stream becomes
/// [`Error::Transport`].
pub async fn next_message<St, T>(inbound: &mut St, monitor: &CancellationMonitor) -> Result<Option<T>>
where
    St: Stream<Item = core::result::Result<T, Status>> + Unpin,
{
    monitor.check()?;

    let deadline = async {
        match monitor.deadline() {
            Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
            None => core::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        () = monitor.token().cancelled() => Err(pcbook_tonic_core::pcbook::Error::Cancelled.into()),
        () = deadline => Err(pcbook_tonic_core::pcbook::Error::DeadlineExceeded.into()),
        item = inbound.next() => match item {
            None => Ok(None),
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(status)) => Err(Error::Transport(status)),
        },
    }
}
