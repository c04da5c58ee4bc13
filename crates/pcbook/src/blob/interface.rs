use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// An immutable image payload owned by a laptop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub id: String,
    pub laptop_id: String,
    pub image_type: String,
    pub data: Bytes,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What a store remembers about a blob besides its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobInfo {
    pub id: String,
    pub laptop_id: String,
    pub image_type: String,
    pub size: usize,
}

/// Write-once storage for fully assembled image payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists `data` for `laptop_id` and returns a newly assigned blob ID.
    ///
    /// The write is all-or-nothing: on error no blob is visible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if persistence fails.
    ///
    /// [`Error::Storage`]: crate::Error::Storage
    async fn save(&self, laptop_id: &str, image_type: &str, data: Bytes) -> Result<String>;
}

pub(crate) fn new_blob_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
