//! Assembles a client-streamed image and persists it once complete.
//!
//! The first message must carry [`ImageInfo`] naming an existing laptop;
//! every later message carries a chunk. Nothing is written until the client
//! half-closes, so a rejected or cancelled upload leaves no blob behind.

use super::next_message;
use crate::server::telemetry::increment_image_bytes;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use pcbook_tonic_core::{
    Error, Result,
    pcbook::{self, BlobStore, CancellationMonitor, InventoryStore},
    proto::{ImageInfo, UploadImageRequest, UploadImageResponse, upload_image_request::Data},
};
use tonic::Status;

/// Image bytes received so far, bounded by a fixed ceiling.
#[derive(Debug)]
struct ImageBuffer {
    data: BytesMut,
    limit: usize,
}

impl ImageBuffer {
    fn new(limit: usize) -> Self {
        Self {
            data: BytesMut::new(),
            limit,
        }
    }

    /// Appends `chunk`, refusing it if the total would pass the ceiling.
    fn push(&mut self, chunk: &[u8]) -> pcbook::Result<()> {
        let size = self.data.len().saturating_add(chunk.len());
        if size > self.limit {
            return Err(pcbook::Error::TooLarge {
                size,
                limit: self.limit,
            });
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}

async fn receive_info<St>(inbound: &mut St, monitor: &CancellationMonitor) -> Result<ImageInfo>
where
    St: Stream<Item = core::result::Result<UploadImageRequest, Status>> + Unpin,
{
    match next_message(inbound, monitor).await? {
        Some(UploadImageRequest {
            data: Some(Data::Info(info)),
        }) => Ok(info),
        Some(_) => Err(Error::InvalidRequest {
            reason: "first upload message must carry image info".to_string(),
        }),
        None => Err(Error::InvalidRequest {
            reason: "upload ended before image info was sent".to_string(),
        }),
    }
}

/// Runs one upload to completion and returns the stored blob's ID and size.
///
/// # Errors
///
/// - [`Error::InvalidRequest`] if the stream does not start with image info,
///   or sends it twice.
/// - [`pcbook::Error::UnknownLaptop`] if the owner is not stored. No chunk is
///   read after the info message.
/// - [`pcbook::Error::TooLarge`] as soon as the running total passes
///   `max_image_bytes`.
/// - Cancellation, deadline, transport and storage failures as they occur.
pub async fn receive_image<St, S>(
    mut inbound: St,
    store: &S,
    blobs: &dyn BlobStore,
    monitor: &CancellationMonitor,
    max_image_bytes: usize,
) -> Result<UploadImageResponse>
where
    St: Stream<Item = core::result::Result<UploadImageRequest, Status>> + Unpin,
    S: InventoryStore + ?Sized,
{
    let info = receive_info(&mut inbound, monitor).await?;
    if !store.contains(&info.laptop_id) {
        return Err(pcbook::Error::UnknownLaptop { id: info.laptop_id }.into());
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        laptop_id = %info.laptop_id,
        image_type = %info.image_type,
        "Receiving image"
    );

    let mut image = ImageBuffer::new(max_image_bytes);
    while let Some(message) = next_message(&mut inbound, monitor).await? {
        match message.data {
            Some(Data::ChunkData(chunk)) => image.push(&chunk)?,
            Some(Data::Info(_)) => {
                return Err(Error::InvalidRequest {
                    reason: "image info may only be sent once".to_string(),
                });
            }
            None => {}
        }
    }

    monitor.check()?;

    let size = image.len();
    let reported_size = u32::try_from(size).map_err(|_| pcbook::Error::TooLarge {
        size,
        limit: u32::MAX as usize,
    })?;
    let id = blobs
        .save(&info.laptop_id, &info.image_type, image.freeze())
        .await?;
    increment_image_bytes(size as u64);

    #[cfg(feature = "tracing")]
    tracing::info!(blob_id = %id, size, "Stored image");

    Ok(UploadImageResponse {
        id,
        size: reported_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pcbook_tonic_core::pcbook::{InMemoryBlobStore, InMemoryInventoryStore, Laptop};
    use tonic::Code;

    fn info(laptop_id: &str) -> core::result::Result<UploadImageRequest, Status> {
        Ok(UploadImageRequest {
            data: Some(Data::Info(ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type: ".jpg".to_string(),
            })),
        })
    }

    fn chunk(bytes: &[u8]) -> core::result::Result<UploadImageRequest, Status> {
        Ok(UploadImageRequest {
            data: Some(Data::ChunkData(Bytes::copy_from_slice(bytes))),
        })
    }

    fn store_with_laptop() -> (InMemoryInventoryStore, String) {
        let store = InMemoryInventoryStore::new();
        let id = store.create(Laptop::default()).unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn assembles_chunks_in_order() {
        let (store, id) = store_with_laptop();
        let blobs = InMemoryBlobStore::new();
        let inbound = futures::stream::iter(vec![
            info(&id),
            chunk(b"hello "),
            chunk(b""),
            chunk(b"world"),
        ]);

        let response = receive_image(
            inbound,
            &store,
            &blobs,
            &CancellationMonitor::unbounded(),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(response.size, 11);
        let blob = blobs.get(&response.id).unwrap();
        assert_eq!(blob.laptop_id, id);
        assert_eq!(blob.image_type, ".jpg");
        assert_eq!(blob.data.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn exactly_the_ceiling_is_accepted() {
        let (store, id) = store_with_laptop();
        let blobs = InMemoryBlobStore::new();
        let inbound = futures::stream::iter(vec![info(&id), chunk(&[7; 512]), chunk(&[9; 512])]);

        let response = receive_image(inbound, &store, &blobs, &CancellationMonitor::unbounded(), 1024)
            .await
            .unwrap();

        assert_eq!(response.size, 1024);
        assert_eq!(blobs.len(), 1);
    }

    #[tokio::test]
    async fn oversize_upload_stores_nothing() {
        let (store, id) = store_with_laptop();
        let blobs = InMemoryBlobStore::new();
        let mut inbound = futures::stream::iter(vec![
            info(&id),
            chunk(&[0; 600]),
            chunk(&[0; 600]),
            chunk(&[0; 1]),
        ]);

        let err = receive_image(
            &mut inbound,
            &store,
            &blobs,
            &CancellationMonitor::unbounded(),
            1024,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Store(pcbook::Error::TooLarge { size: 1200, limit: 1024 })
        ));
        assert_eq!(Status::from(err).code(), Code::InvalidArgument);
        assert!(blobs.is_empty());
        // The chunk after the one that broke the ceiling was never read.
        assert!(inbound.next().await.is_some());
    }

    #[tokio::test]
    async fn unknown_owner_reads_no_chunks() {
        let store = InMemoryInventoryStore::new();
        let blobs = InMemoryBlobStore::new();
        let mut inbound = futures::stream::iter(vec![info("missing"), chunk(b"a"), chunk(b"b")]);

        let err = receive_image(
            &mut inbound,
            &store,
            &blobs,
            &CancellationMonitor::unbounded(),
            1024,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Store(pcbook::Error::UnknownLaptop { .. })));
        assert_eq!(Status::from(err).code(), Code::InvalidArgument);
        assert_eq!(inbound.count().await, 2);
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn stream_must_start_with_info() {
        let (store, _) = store_with_laptop();
        let blobs = InMemoryBlobStore::new();

        for inbound in [vec![chunk(b"early")], vec![]] {
            let err = receive_image(
                futures::stream::iter(inbound),
                &store,
                &blobs,
                &CancellationMonitor::unbounded(),
                1024,
            )
            .await
            .unwrap_err();
            assert!(matches!(err, Error::InvalidRequest { .. }));
        }
    }

    #[tokio::test]
    async fn second_info_is_rejected() {
        let (store, id) = store_with_laptop();
        let blobs = InMemoryBlobStore::new();
        let inbound = futures::stream::iter(vec![info(&id), chunk(b"a"), info(&id)]);

        let err = receive_image(inbound, &store, &blobs, &CancellationMonitor::unbounded(), 1024)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRequest { .. }));
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn cancelled_upload_stores_nothing() {
        let (store, id) = store_with_laptop();
        let blobs = InMemoryBlobStore::new();
        let monitor = CancellationMonitor::unbounded();
        let token = monitor.token().clone();
        let inbound = futures::stream::iter(vec![info(&id), chunk(b"a")])
            .chain(futures::stream::once(async move {
                token.cancel();
                chunk(b"b")
            }))
            .chain(futures::stream::iter(vec![chunk(b"c")]));

        let err = receive_image(Box::pin(inbound), &store, &blobs, &monitor, 1024)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Store(pcbook::Error::Cancelled)));
        assert!(blobs.is_empty());
    }

    struct FailingBlobStore;

    #[tonic::async_trait]
    impl BlobStore for FailingBlobStore {
        async fn save(&self, _: &str, _: &str, _: Bytes) -> pcbook::Result<String> {
            Err(pcbook::Error::Storage {
                context: "disk full".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn persistence_failure_is_internal() {
        let (store, id) = store_with_laptop();
        let inbound = futures::stream::iter(vec![info(&id), chunk(b"a")]);

        let err = receive_image(
            inbound,
            &store,
            &FailingBlobStore,
            &CancellationMonitor::unbounded(),
            1024,
        )
        .await
        .unwrap_err();

        assert_eq!(Status::from(err).code(), Code::Internal);
    }
}
