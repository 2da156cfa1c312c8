use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

/// Remote blob storage addressed by opaque references.
///
/// References are stored verbatim in the catalog and handed back unchanged
/// when a page or cover is displayed.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, caption: &str)
    -> anyhow::Result<String>;
    async fn download(&self, reference: &str) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub reference: String,
    pub filename: String,
    pub caption: String,
}

#[derive(Debug, Default)]
struct MemoryObjects {
    next_id: u64,
    blobs: BTreeMap<String, Vec<u8>>,
    uploads: Vec<UploadRecord>,
    failing_filenames: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    inner: Mutex<MemoryObjects>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryObjects> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a blob under a caller-chosen reference (an inbound attachment).
    pub fn put(&self, reference: &str, bytes: Vec<u8>) {
        self.lock().blobs.insert(reference.to_owned(), bytes);
    }

    /// Makes every upload of `filename` fail.
    pub fn fail_uploads_named(&self, filename: &str) {
        self.lock().failing_filenames.insert(filename.to_owned());
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.lock().uploads.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        caption: &str,
    ) -> anyhow::Result<String> {
        let mut inner = self.lock();
        if inner.failing_filenames.contains(filename) {
            anyhow::bail!("upload rejected: {filename}");
        }
        inner.next_id += 1;
        let reference = format!("obj-{}", inner.next_id);
        inner.blobs.insert(reference.clone(), bytes);
        inner.uploads.push(UploadRecord {
            reference: reference.clone(),
            filename: filename.to_owned(),
            caption: caption.to_owned(),
        });
        Ok(reference)
    }

    async fn download(&self, reference: &str) -> anyhow::Result<Vec<u8>> {
        self.lock()
            .blobs
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("object not found: {reference}"))
    }
}
