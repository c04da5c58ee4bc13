//! gRPC service implementation for the laptop inventory.
//!
//! This module defines [`InventoryService`], the concrete implementation of the
//! [`LaptopService`] defined in the protobuf schema. Each call is admitted
//! through the service [`Lifecycle`], given its own cancellation context and
//! then handed to the store or to one of the streaming bodies in
//! [`crate::server::streaming`].
//!
//! ## Call surface
//!
//! - `CreateLaptop` (unary): stores a laptop and returns its ID.
//! - `SearchLaptop` (server stream): streams every laptop matching a filter.
//! - `UploadImage` (client stream): stores an image for an existing laptop.
//! - `RateLaptop` (bidirectional): applies scores and streams running averages.

use crate::server::{
    config::ServerConfig,
    service::{
        context::{call_monitor, cancel_on_close},
        lifecycle::Lifecycle,
    },
    streaming::{rate::rate_stream, search::stream_search, upload::receive_image},
};
use core::pin::Pin;
use pcbook_tonic_core::{
    Error,
    pcbook::{BlobStore, Filter, InventoryStore, RatingStore},
    proto::{
        CreateLaptopRequest, CreateLaptopResponse, RateLaptopRequest, RateLaptopResponse,
        SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest, UploadImageResponse,
        laptop_service_server::LaptopService,
    },
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming};

const CREATE_LAPTOP: &str = "CreateLaptop";
const SEARCH_LAPTOP: &str = "SearchLaptop";
const UPLOAD_IMAGE: &str = "UploadImage";
const RATE_LAPTOP: &str = "RateLaptop";

/// The laptop inventory gRPC service.
///
/// Laptops and ratings live in the stores passed to [`InventoryService::new`];
/// images go to the configured [`BlobStore`]. Clones share all state.
pub struct InventoryService<S, R> {
    store: Arc<S>,
    ratings: Arc<R>,
    blobs: Arc<dyn BlobStore>,
    config: ServerConfig,
    lifecycle: Arc<Lifecycle>,
}

impl<S, R> Clone for InventoryService<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ratings: Arc::clone(&self.ratings),
            blobs: Arc::clone(&self.blobs),
            config: self.config.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }
}

impl<S, R> InventoryService<S, R>
where
    S: InventoryStore + 'static,
    R: RatingStore + 'static,
{
    pub fn new(store: Arc<S>, ratings: Arc<R>, blobs: Arc<dyn BlobStore>, config: ServerConfig) -> Self {
        let lifecycle = Arc::new(Lifecycle::new(config.shutdown_timeout));
        Self {
            store,
            ratings,
            blobs,
            config,
            lifecycle,
        }
    }

    /// Refuses new calls, waits for in-flight calls to finish (up to the
    /// configured timeout) and cancels whatever is still running.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }
}

#[tonic::async_trait]
impl<S, R> LaptopService for InventoryService<S, R>
where
    S: InventoryStore + 'static,
    R: RatingStore + 'static,
{
    type SearchLaptopStream =
        Pin<Box<dyn Stream<Item = Result<SearchLaptopResponse, Status>> + Send>>;
    type RateLaptopStream = Pin<Box<dyn Stream<Item = Result<RateLaptopResponse, Status>> + Send>>;

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn create_laptop(
        &self,
        req: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let call = self.lifecycle.begin_call(CREATE_LAPTOP)?;
        let monitor = call_monitor(&req, self.lifecycle.call_token());

        let result = monitor.check().map_err(Error::from).and_then(|()| {
            let laptop = req.into_inner().laptop.ok_or_else(|| Error::InvalidRequest {
                reason: "laptop is required".to_string(),
            })?;
            Ok(self.store.create(laptop.into())?)
        });
        call.observe(&result);
        let id = result?;

        #[cfg(feature = "tracing")]
        tracing::info!(laptop_id = %id, "Created laptop");

        Ok(Response::new(CreateLaptopResponse { id }))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn search_laptop(
        &self,
        req: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let call = self.lifecycle.begin_call(SEARCH_LAPTOP)?;
        let monitor = call_monitor(&req, self.lifecycle.call_token());
        let filter = req.into_inner().filter.map(Filter::from).unwrap_or_default();

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        cancel_on_close(&resp_tx, monitor.token().clone());

        let store = Arc::clone(&self.store);
        let scan = move || {
            let _finished = monitor.token().clone().drop_guard();
            let result = stream_search(store.as_ref(), &filter, &monitor, &resp_tx);
            call.observe(&result);

            #[cfg(feature = "tracing")]
            {
                if let Ok(found) = result {
                    tracing::info!(found, "Search finished");
                }
            }
        };

        #[cfg(feature = "tracing")]
        let scan = {
            let span = tracing::info_span!("scan");
            move || span.in_scope(scan)
        };

        tokio::task::spawn_blocking(scan);

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn upload_image(
        &self,
        req: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let call = self.lifecycle.begin_call(UPLOAD_IMAGE)?;
        let monitor = call_monitor(&req, self.lifecycle.call_token());

        let result = receive_image(
            req.into_inner(),
            self.store.as_ref(),
            self.blobs.as_ref(),
            &monitor,
            self.config.max_image_bytes,
        )
        .await;
        call.observe(&result);

        Ok(Response::new(result?))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn rate_laptop(
        &self,
        req: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        let call = self.lifecycle.begin_call(RATE_LAPTOP)?;
        let monitor = call_monitor(&req, self.lifecycle.call_token());
        let inbound = req.into_inner();

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        cancel_on_close(&resp_tx, monitor.token().clone());

        let store = Arc::clone(&self.store);
        let ratings = Arc::clone(&self.ratings);
        let fut = async move {
            let _finished = monitor.token().clone().drop_guard();
            let result = rate_stream(inbound, store.as_ref(), ratings.as_ref(), &monitor, &resp_tx).await;
            call.observe(&result);

            #[cfg(feature = "tracing")]
            {
                if let Ok(delivered) = result {
                    tracing::info!(delivered, "Rating stream finished");
                }
            }
        };

        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            fut.instrument(tracing::info_span!("rating"))
        };

        tokio::spawn(fut);

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }
}

#[cfg(test)]
mod tests;
