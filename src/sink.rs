use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

/// Identifier of a remote document (a channel message id for Telegram).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentHandle(pub i64);

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedDocument {
    pub handle: DocumentHandle,
    pub text: String,
}

/// A remote place that can hold one pinned text document.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn create_document(&self, text: &str) -> anyhow::Result<DocumentHandle>;
    async fn update_document(&self, handle: DocumentHandle, text: &str) -> anyhow::Result<()>;
    async fn pin(&self, handle: DocumentHandle) -> anyhow::Result<()>;
    async fn unpin(&self, handle: DocumentHandle) -> anyhow::Result<()>;
    async fn delete_document(&self, handle: DocumentHandle) -> anyhow::Result<()>;
    async fn get_pinned_document(&self) -> anyhow::Result<Option<PinnedDocument>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    documents: BTreeMap<DocumentHandle, String>,
    /// Oldest first; the last entry is the one a reader sees.
    pinned: Vec<DocumentHandle>,
    max_chars: Option<usize>,
    fail_updates: bool,
    fail_creates: bool,
}

/// In-process sink. Mirrors the failure modes of a chat channel: editing or
/// deleting a missing message fails, and an optional character ceiling
/// rejects oversized text.
#[derive(Debug, Default)]
pub struct MemoryDocumentSink {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chars(max_chars: usize) -> Self {
        let sink = Self::default();
        sink.lock().max_chars = Some(max_chars);
        sink
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.lock().fail_updates = fail;
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.lock().fail_creates = fail;
    }

    /// Seeds a pinned document, as if left behind by a previous process.
    pub fn seed_pinned(&self, text: &str) -> DocumentHandle {
        let mut state = self.lock();
        state.next_id += 1;
        let handle = DocumentHandle(state.next_id);
        state.documents.insert(handle, text.to_owned());
        state.pinned.push(handle);
        handle
    }

    /// Drops a document behind the store's back.
    pub fn remove_externally(&self, handle: DocumentHandle) {
        let mut state = self.lock();
        state.documents.remove(&handle);
        state.pinned.retain(|pinned| *pinned != handle);
    }

    pub fn document(&self, handle: DocumentHandle) -> Option<String> {
        self.lock().documents.get(&handle).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn pinned_handle(&self) -> Option<DocumentHandle> {
        self.lock().pinned.last().copied()
    }

    /// Every pinned document, oldest first.
    pub fn pinned_handles(&self) -> Vec<DocumentHandle> {
        self.lock().pinned.clone()
    }

    fn check_size(state: &MemoryState, text: &str) -> anyhow::Result<()> {
        if let Some(max) = state.max_chars {
            let len = text.chars().count();
            if len > max {
                anyhow::bail!("message is too long ({len} > {max})");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for MemoryDocumentSink {
    async fn create_document(&self, text: &str) -> anyhow::Result<DocumentHandle> {
        let mut state = self.lock();
        if state.fail_creates {
            anyhow::bail!("create rejected");
        }
        Self::check_size(&state, text)?;
        state.next_id += 1;
        let handle = DocumentHandle(state.next_id);
        state.documents.insert(handle, text.to_owned());
        Ok(handle)
    }

    async fn update_document(&self, handle: DocumentHandle, text: &str) -> anyhow::Result<()> {
        let mut state = self.lock();
        if state.fail_updates {
            anyhow::bail!("update rejected");
        }
        Self::check_size(&state, text)?;
        let Some(existing) = state.documents.get_mut(&handle) else {
            anyhow::bail!("message to edit not found: {handle}");
        };
        *existing = text.to_owned();
        Ok(())
    }

    async fn pin(&self, handle: DocumentHandle) -> anyhow::Result<()> {
        let mut state = self.lock();
        if !state.documents.contains_key(&handle) {
            anyhow::bail!("message to pin not found: {handle}");
        }
        state.pinned.retain(|pinned| *pinned != handle);
        state.pinned.push(handle);
        Ok(())
    }

    async fn unpin(&self, handle: DocumentHandle) -> anyhow::Result<()> {
        let mut state = self.lock();
        if !state.pinned.contains(&handle) {
            anyhow::bail!("message is not pinned: {handle}");
        }
        state.pinned.retain(|pinned| *pinned != handle);
        Ok(())
    }

    async fn delete_document(&self, handle: DocumentHandle) -> anyhow::Result<()> {
        let mut state = self.lock();
        if state.documents.remove(&handle).is_none() {
            anyhow::bail!("message to delete not found: {handle}");
        }
        state.pinned.retain(|pinned| *pinned != handle);
        Ok(())
    }

    async fn get_pinned_document(&self) -> anyhow::Result<Option<PinnedDocument>> {
        let state = self.lock();
        Ok(state.pinned.last().and_then(|&handle| {
            state.documents.get(&handle).map(|text| PinnedDocument {
                handle,
                text: text.clone(),
            })
        }))
    }
}
