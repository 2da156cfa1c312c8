//! Authoritative in-memory catalog kept in sync with a single remote document.
//!
//! All catalog access goes through one `std::sync::Mutex`. The guard is
//! never held across an `.await`: reads clone what they need, and `flush`
//! serializes under the lock, releases it, then talks to the sink.
//! Flushes themselves are serialized by a separate async lock that owns the
//! persistence handle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;

use crate::catalog::{self, Catalog, Work};
use crate::notify::AdminNotifier;
use crate::sink::{DocumentHandle, DocumentSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub warn_chars: usize,
    pub critical_chars: usize,
    pub ceiling_chars: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            warn_chars: 3500,
            critical_chars: 4000,
            ceiling_chars: 4096,
        }
    }
}

impl StoreLimits {
    pub fn level(&self, chars: usize) -> SizeLevel {
        if chars > self.critical_chars {
            SizeLevel::Critical
        } else if chars > self.warn_chars {
            SizeLevel::Warning
        } else {
            SizeLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLevel {
    Normal,
    Warning,
    Critical,
}

/// Which path a successful flush took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Catalog empty and no document exists.
    Empty,
    Created {
        handle: DocumentHandle,
    },
    Updated {
        handle: DocumentHandle,
    },
    /// In-place update failed; a fresh document was created and pinned.
    Recreated {
        previous: DocumentHandle,
        handle: DocumentHandle,
    },
    /// Catalog became empty; the document was unpinned and deleted.
    TornDown {
        previous: DocumentHandle,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub outcome: FlushOutcome,
    pub chars: usize,
    pub level: SizeLevel,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("catalog write failed (update: {update:?}, create: {create})")]
    WriteFailure {
        update: Option<String>,
        create: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("work not found: {slug}")]
    WorkNotFound { slug: String },
    #[error("chapter {chapter} not found in {slug}")]
    ChapterNotFound { slug: String, chapter: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkSummary {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub cover_reference: Option<String>,
    pub chapter_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub works: usize,
    pub chapters: usize,
    pub pages: usize,
    /// Title and chapter count of the work with the most chapters.
    pub largest: Option<(String, usize)>,
    pub document_chars: usize,
    pub ceiling_chars: usize,
}

#[derive(Debug, Default)]
struct FlushState {
    handle: Option<DocumentHandle>,
    last_updated: f64,
}

pub struct ContentStore {
    catalog: Mutex<Catalog>,
    flush_state: tokio::sync::Mutex<FlushState>,
    sink: Arc<dyn DocumentSink>,
    notifier: Arc<dyn AdminNotifier>,
    limits: StoreLimits,
}

impl ContentStore {
    pub fn new(
        sink: Arc<dyn DocumentSink>,
        notifier: Arc<dyn AdminNotifier>,
        limits: StoreLimits,
    ) -> Self {
        Self {
            catalog: Mutex::new(Catalog::new()),
            flush_state: tokio::sync::Mutex::new(FlushState::default()),
            sink,
            notifier,
            limits,
        }
    }

    /// Builds a store from whatever document is currently pinned.
    ///
    /// Never fails: an unreadable or unparseable document leaves the catalog
    /// empty. The pinned handle is adopted either way, so the next flush
    /// overwrites it in place.
    pub async fn load(
        sink: Arc<dyn DocumentSink>,
        notifier: Arc<dyn AdminNotifier>,
        limits: StoreLimits,
    ) -> Self {
        let mut store = Self::new(sink, notifier, limits);
        let pinned = store.sink.get_pinned_document().await;
        match pinned {
            Ok(Some(pinned)) => {
                store.flush_state.get_mut().handle = Some(pinned.handle);
                match catalog::decode(&pinned.text) {
                    Ok(loaded) => {
                        tracing::info!(
                            handle = %pinned.handle,
                            works = loaded.len(),
                            "loaded catalog from pinned document"
                        );
                        *store
                            .catalog
                            .get_mut()
                            .unwrap_or_else(PoisonError::into_inner) = loaded;
                    }
                    Err(err) => {
                        tracing::error!(handle = %pinned.handle, ?err, "failed to parse pinned catalog; starting empty");
                    }
                }
            }
            Ok(None) => tracing::info!("no pinned catalog document; starting empty"),
            Err(err) => tracing::error!(?err, "failed to read pinned catalog; starting empty"),
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    pub async fn persistence_handle(&self) -> Option<DocumentHandle> {
        self.flush_state.lock().await.handle
    }

    pub fn get(&self, slug: &str) -> Option<Work> {
        self.lock().get(slug).cloned()
    }

    /// Snapshot of all works, sorted by title.
    pub fn list(&self) -> Vec<(String, Work)> {
        self.lock()
            .sorted_by_title()
            .into_iter()
            .map(|(slug, work)| (slug.clone(), work.clone()))
            .collect()
    }

    pub fn snapshot(&self) -> Catalog {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn find_by_title(&self, title: &str) -> Option<String> {
        self.lock().find_by_title(title).map(str::to_owned)
    }

    pub fn list_works(&self) -> Vec<WorkSummary> {
        self.lock()
            .sorted_by_title()
            .into_iter()
            .map(|(slug, work)| WorkSummary {
                slug: slug.clone(),
                title: work.title.clone(),
                description: work.description.clone(),
                cover_reference: work.cover_reference.clone(),
                chapter_count: work.chapters.len(),
            })
            .collect()
    }

    pub fn get_work(&self, slug: &str) -> Option<Work> {
        self.get(slug)
    }

    pub fn get_chapter(&self, slug: &str, chapter: &str) -> Option<Vec<String>> {
        self.lock()
            .get(slug)
            .and_then(|work| work.chapters.get(chapter))
            .cloned()
    }

    pub fn references_image(&self, reference: &str) -> bool {
        self.lock().references(reference)
    }

    pub fn stats(&self) -> CatalogStats {
        let catalog = self.lock();
        let largest = catalog
            .iter()
            .max_by_key(|(_, work)| work.chapters.len())
            .map(|(_, work)| (work.title.clone(), work.chapters.len()));
        let document_chars = catalog::encode(&catalog, 0.0)
            .map(|text| catalog::char_len(&text))
            .unwrap_or_default();
        CatalogStats {
            works: catalog.len(),
            chapters: catalog.total_chapters(),
            pages: catalog.total_pages(),
            largest,
            document_chars,
            ceiling_chars: self.limits.ceiling_chars,
        }
    }

    pub fn upsert(&self, slug: &str, work: Work) -> Option<Work> {
        self.lock().insert(slug, work)
    }

    pub fn delete(&self, slug: &str) -> Option<Work> {
        self.lock().remove(slug)
    }

    pub fn update_work<F>(&self, slug: &str, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Work),
    {
        let mut catalog = self.lock();
        let work = catalog
            .get_mut(slug)
            .ok_or_else(|| StoreError::WorkNotFound {
                slug: slug.to_owned(),
            })?;
        edit(work);
        Ok(())
    }

    /// Replaces (or creates) one chapter. Last write wins.
    pub fn put_chapter(
        &self,
        slug: &str,
        chapter: &str,
        pages: Vec<String>,
    ) -> Result<Option<Vec<String>>, StoreError> {
        let mut previous = None;
        self.update_work(slug, |work| {
            previous = work.chapters.insert(chapter.to_owned(), pages);
        })?;
        Ok(previous)
    }

    pub fn merge_chapters(
        &self,
        slug: &str,
        chapters: BTreeMap<String, Vec<String>>,
    ) -> Result<(), StoreError> {
        self.update_work(slug, |work| work.chapters.extend(chapters))
    }

    pub fn remove_chapter(&self, slug: &str, chapter: &str) -> Result<Vec<String>, StoreError> {
        let mut catalog = self.lock();
        let work = catalog
            .get_mut(slug)
            .ok_or_else(|| StoreError::WorkNotFound {
                slug: slug.to_owned(),
            })?;
        work.chapters
            .remove(chapter)
            .ok_or_else(|| StoreError::ChapterNotFound {
                slug: slug.to_owned(),
                chapter: chapter.to_owned(),
            })
    }

    /// Writes the current catalog to the document sink.
    ///
    /// The in-memory catalog is never rolled back: if both the in-place
    /// update and the fallback create fail, the edit stays in memory and the
    /// next successful flush carries it.
    pub async fn flush(&self) -> Result<FlushReport, PersistenceError> {
        let mut state = self.flush_state.lock().await;

        let now = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        let last_updated = now.max(state.last_updated);

        let text = {
            let catalog = self.lock();
            if catalog.is_empty() {
                None
            } else {
                Some(catalog::encode(&catalog, last_updated)?)
            }
        };

        let Some(text) = text else {
            return Ok(self.tear_down(&mut state).await);
        };
        state.last_updated = last_updated;

        let chars = catalog::char_len(&text);
        let level = self.limits.level(chars);
        self.report_size(chars, level).await;

        let outcome = match state.handle {
            Some(current) => match self.sink.update_document(current, &text).await {
                Ok(()) => FlushOutcome::Updated { handle: current },
                Err(update_err) => {
                    tracing::error!(handle = %current, ?update_err, "failed to update catalog document; recreating");
                    match self.create_and_pin(&text).await {
                        Ok(handle) => {
                            tracing::info!(previous = %current, %handle, "recreated catalog document");
                            if let Err(err) = self.sink.unpin(current).await {
                                tracing::warn!(handle = %current, ?err, "failed to unpin replaced catalog document");
                            }
                            FlushOutcome::Recreated {
                                previous: current,
                                handle,
                            }
                        }
                        Err(create_err) => {
                            return Err(self
                                .write_failure(Some(format!("{update_err:#}")), create_err)
                                .await);
                        }
                    }
                }
            },
            None => match self.create_and_pin(&text).await {
                Ok(handle) => {
                    tracing::info!(%handle, "created catalog document");
                    FlushOutcome::Created { handle }
                }
                Err(create_err) => return Err(self.write_failure(None, create_err).await),
            },
        };

        if let FlushOutcome::Updated { handle } = outcome {
            tracing::info!(%handle, chars, "updated catalog document");
        }
        state.handle = match outcome {
            FlushOutcome::Created { handle }
            | FlushOutcome::Updated { handle }
            | FlushOutcome::Recreated { handle, .. } => Some(handle),
            FlushOutcome::Empty | FlushOutcome::TornDown { .. } => None,
        };

        Ok(FlushReport {
            outcome,
            chars,
            level,
        })
    }

    async fn tear_down(&self, state: &mut FlushState) -> FlushReport {
        let outcome = match state.handle.take() {
            None => FlushOutcome::Empty,
            Some(previous) => {
                if let Err(err) = self.sink.unpin(previous).await {
                    tracing::warn!(handle = %previous, ?err, "failed to unpin catalog document (may already be gone)");
                }
                if let Err(err) = self.sink.delete_document(previous).await {
                    tracing::warn!(handle = %previous, ?err, "failed to delete catalog document (may already be gone)");
                }
                tracing::info!(handle = %previous, "catalog is empty; tore down document");
                FlushOutcome::TornDown { previous }
            }
        };
        FlushReport {
            outcome,
            chars: 0,
            level: SizeLevel::Normal,
        }
    }

    async fn create_and_pin(&self, text: &str) -> anyhow::Result<DocumentHandle> {
        let handle = self.sink.create_document(text).await?;
        if let Err(err) = self.sink.pin(handle).await {
            tracing::warn!(%handle, ?err, "created catalog document but failed to pin it");
        }
        Ok(handle)
    }

    /// A critical size also sends the warning first, so the admin sees both.
    async fn report_size(&self, chars: usize, level: SizeLevel) {
        let ceiling = self.limits.ceiling_chars;
        if level == SizeLevel::Normal {
            return;
        }
        tracing::warn!(chars, ceiling, "catalog document approaching size limit");
        self.notify(&format!(
            "⚠️ Database size warning\n\nCurrent size: {chars}/{ceiling} characters.\nConsider archiving old works before the limit is reached."
        ))
        .await;
        if level == SizeLevel::Critical {
            tracing::error!(chars, ceiling, "catalog document size critical");
            self.notify(&format!(
                "🚨 Critical database size\n\nSize: {chars}/{ceiling} characters.\nAction required: delete some works or chapters to prevent data loss."
            ))
            .await;
        }
    }

    async fn write_failure(
        &self,
        update: Option<String>,
        create_err: anyhow::Error,
    ) -> PersistenceError {
        let create = format!("{create_err:#}");
        tracing::error!(
            critical = true,
            update = update.as_deref().unwrap_or("not attempted"),
            create = %create,
            "unable to persist catalog; in-memory state kept"
        );
        self.notify(
            "🚨 CRITICAL ERROR\n\nUnable to save data to the channel.\nPlease check bot permissions and channel access.",
        )
        .await;
        PersistenceError::WriteFailure { update, create }
    }

    async fn notify(&self, text: &str) {
        if let Err(err) = self.notifier.notify(text).await {
            tracing::warn!(?err, "failed to notify administrator");
        }
    }
}
