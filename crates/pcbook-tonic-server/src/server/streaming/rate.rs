//! Bidirectional rating: scores in, running averages out.
//!
//! The call runs as two futures joined on one task. The receive path reads
//! requests, validates the laptop, applies the score and queues the response.
//! The send path forwards queued responses to the client in order. The first
//! error from either path decides the call. Responses already delivered stand
//! even if a later request fails.

use super::next_message;
use crate::server::telemetry::increment_ratings_applied;
use futures::Stream;
use pcbook_tonic_core::{
    Error, Result,
    convert::rate_response,
    pcbook::{self, CancellationMonitor, InventoryStore, RatingStore},
    proto::{RateLaptopRequest, RateLaptopResponse},
};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tonic::Status;

pub type RateSender = mpsc::Sender<core::result::Result<RateLaptopResponse, Status>>;

/// Rates every inbound request and streams one response per request.
///
/// Returns the number of responses delivered. On failure the error is also
/// sent as the terminal status, after every response produced before it.
pub async fn rate_stream<St, S, R>(
    mut inbound: St,
    store: &S,
    ratings: &R,
    monitor: &CancellationMonitor,
    resp_tx: &RateSender,
) -> Result<usize>
where
    St: Stream<Item = core::result::Result<RateLaptopRequest, Status>> + Unpin,
    S: InventoryStore + ?Sized,
    R: RatingStore + ?Sized,
{
    let first_error = OnceLock::<Error>::new();
    let (ready_tx, ready_rx) = mpsc::channel::<RateLaptopResponse>(resp_tx.max_capacity());

    let receive = async {
        // Dropped when this path ends, which lets the send path drain and stop.
        let ready_tx = ready_tx;
        let outcome: Result<()> = async {
            while let Some(req) = next_message(&mut inbound, monitor).await? {
                if !store.contains(&req.laptop_id) {
                    return Err(pcbook::Error::NotFound { id: req.laptop_id }.into());
                }

                let rating = ratings.add(&req.laptop_id, req.score);
                increment_ratings_applied();

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    laptop_id = %req.laptop_id,
                    score = req.score,
                    count = rating.count,
                    "Applied rating"
                );

                ready_tx
                    .send(rate_response(req.laptop_id, rating))
                    .await
                    .map_err(|_| Error::ChannelError {
                        context: "rating send path stopped".to_string(),
                    })?;
            }
            Ok(())
        }
        .await;

        if let Err(err) = outcome {
            let _ = first_error.set(err);
        }
    };

    let send = async {
        // Dropped when this path ends, which unblocks a receive path waiting
        // on a full queue.
        let mut ready_rx = ready_rx;
        let mut delivered = 0usize;
        while let Some(response) = ready_rx.recv().await {
            if resp_tx.send(Ok(response)).await.is_err() {
                let _ = first_error.set(Error::ChannelError {
                    context: "rating response stream closed".to_string(),
                });
                // Wakes the receive path if it is waiting on the client.
                monitor.token().cancel();
                break;
            }
            delivered += 1;
        }
        delivered
    };

    let ((), delivered) = tokio::join!(receive, send);

    match first_error.into_inner() {
        None => Ok(delivered),
        Some(err) => {
            if !matches!(err, Error::ChannelError { .. }) {
                let _ = resp_tx.send(Err(err.clone().into())).await;
            }
            Err(err)
        }
    }
}
