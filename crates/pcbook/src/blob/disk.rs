use super::interface::new_blob_id;
use crate::{Blob, BlobInfo, BlobStore, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const TMP_DIR: &str = ".tmp";
const MAX_EXTENSION_LEN: usize = 16;

/// A [`BlobStore`] writing each payload to `<dir>/<blob id><image type>`.
///
/// Payloads are staged under `<dir>/.tmp/` and renamed into place, so a
/// failed write never leaves a partial file where a reader could find it.
///
/// The owner and type of each blob are kept in an in-process index keyed by
/// blob ID; the index starts empty on every open.
#[derive(Debug)]
pub struct DiskBlobStore {
    dir: PathBuf,
    index: RwLock<HashMap<String, BlobInfo>>,
}

impl DiskBlobStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the directories can't be created.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(TMP_DIR)).await?;
        Ok(Self {
            dir,
            index: RwLock::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Metadata for a blob saved through this store.
    pub fn info(&self, id: &str) -> Option<BlobInfo> {
        self.index.read().get(id).cloned()
    }

    /// Reads a saved blob back from disk, or `None` if this store never saved
    /// `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file can't be read.
    pub async fn get(&self, id: &str) -> Result<Option<Blob>> {
        let Some(info) = self.info(id) else {
            return Ok(None);
        };
        let data = fs::read(self.blob_path(&info.id, &info.image_type)).await?;
        Ok(Some(Blob {
            id: info.id,
            laptop_id: info.laptop_id,
            image_type: info.image_type,
            data: Bytes::from(data),
        }))
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Final location of a blob.
    ///
    /// `image_type` comes from the client; anything other than a short
    /// `.alnum` extension is dropped.
    pub fn blob_path(&self, id: &str, image_type: &str) -> PathBuf {
        self.dir.join(format!("{id}{}", sanitize_extension(image_type)))
    }

    fn temp_path(&self, id: &str) -> PathBuf {
        self.dir.join(TMP_DIR).join(id)
    }
}

fn sanitize_extension(image_type: &str) -> &str {
    match image_type.strip_prefix('.') {
        Some(ext)
            if !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.bytes().all(|b| b.is_ascii_alphanumeric()) =>
        {
            image_type
        }
        _ => "",
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn save(&self, laptop_id: &str, image_type: &str, data: Bytes) -> Result<String> {
        let id = new_blob_id();
        let temp_path = self.temp_path(&id);
        let blob_path = self.blob_path(&id, image_type);

        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Storage {
                context: format!("cannot write image {}: {e}", temp_path.display()),
            });
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Storage {
                context: format!("cannot move image to {}: {e}", blob_path.display()),
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Saved image {} ({} bytes)", blob_path.display(), data.len());

        self.index.write().insert(
            id.clone(),
            BlobInfo {
                id: id.clone(),
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
                size: data.len(),
            },
        );

        Ok(id)
    }
}
