use super::interface::new_blob_id;
use crate::{Blob, BlobStore, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A [`BlobStore`] that keeps every payload in memory.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Blob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Blob> {
        self.blobs.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn save(&self, laptop_id: &str, image_type: &str, data: Bytes) -> Result<String> {
        let blob = Blob {
            id: new_blob_id(),
            laptop_id: laptop_id.to_string(),
            image_type: image_type.to_string(),
            data,
        };
        let id = blob.id.clone();
        self.blobs.write().insert(id.clone(), blob);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saved_blob_is_byte_identical() {
        let store = InMemoryBlobStore::new();
        let payload = Bytes::from_static(b"\x89PNG\r\n\x1a\nrest-of-image");

        let id = store.save("laptop", ".png", payload.clone()).await.unwrap();
        let blob = store.get(&id).unwrap();

        assert_eq!(blob.data, payload);
        assert_eq!(blob.laptop_id, "laptop");
        assert_eq!(blob.image_type, ".png");
        assert_eq!(blob.len(), payload.len());
    }

    #[tokio::test]
    async fn each_save_gets_a_new_id() {
        let store = InMemoryBlobStore::new();
        let a = store.save("laptop", ".jpg", Bytes::new()).await.unwrap();
        let b = store.save("laptop", ".jpg", Bytes::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }
}
