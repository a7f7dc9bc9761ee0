//! Ranked model cache: in-process mirror over a disk record, refreshed from the catalog.
//!
//! Read path: mirror, then a fresh and valid disk record, then a refresh. Refreshes are
//! single-flight: concurrent callers (forced or miss-triggered) share one fetch+rank task.
//!
//! ```ignore
//! let cache = ModelCache::new(Arc::new(catalog), CacheStore::new(path), Some("roleplay".into()));
//! let ranked = cache.models().await?;
//! cache.refresh().await?; // forced, e.g. from the daily refresher
//! ```

mod store;

pub use store::{CacheRecord, CacheStore, InvalidRecord, CACHE_TTL};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{rank_models, CatalogError, CatalogSource, RankError};

/// Why a refresh produced no ranked list.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// The unfiltered catalog query failed.
    #[error(transparent)]
    Fetch(#[from] CatalogError),
    #[error(transparent)]
    Rank(#[from] RankError),
    /// The refresh task panicked or was cancelled.
    #[error("refresh task failed: {0}")]
    Task(String),
}

type RefreshResult = Result<Arc<Vec<String>>, RefreshError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshResult>>;

/// Cache of the ranked model list. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ModelCache {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn CatalogSource>,
    store: CacheStore,
    category: Option<String>,
    mirror: RwLock<Option<Arc<Vec<String>>>>,
    pending: Mutex<Option<PendingRefresh>>,
}

impl ModelCache {
    /// `category` is the tag for the narrow catalog query; `None` skips it.
    pub fn new(source: Arc<dyn CatalogSource>, store: CacheStore, category: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                category,
                mirror: RwLock::new(None),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    /// Ranked ids: mirror, else fresh disk record, else a (shared) refresh.
    pub async fn models(&self) -> Result<Vec<String>, RefreshError> {
        if let Some(models) = self.inner.mirror() {
            return Ok(models.to_vec());
        }

        if let Some(record) = self.inner.store.load().await {
            if record.is_fresh() {
                debug!(count = record.models.len(), "model cache loaded from disk");
                let models = Arc::new(record.models);
                self.inner.set_mirror(models.clone());
                return Ok(models.to_vec());
            }
            debug!(fetched_at = record.fetched_at, "model cache on disk is stale");
        }

        self.join_or_start(false).await.map(|m| m.to_vec())
    }

    /// Forces a refresh, joining one already in flight.
    pub async fn refresh(&self) -> Result<Vec<String>, RefreshError> {
        self.join_or_start(true).await.map(|m| m.to_vec())
    }

    /// Drops the in-process mirror only; the next read re-validates the disk record.
    pub fn clear(&self) {
        *self.inner.mirror.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    async fn join_or_start(&self, force: bool) -> RefreshResult {
        let pending = {
            let mut slot = self.inner.pending.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    // A refresh may have settled while this caller was reading disk.
                    if !force {
                        if let Some(models) = self.inner.mirror() {
                            return Ok(models);
                        }
                    }
                    let shared = self.spawn_refresh();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };
        pending.await
    }

    /// Runs fetch+rank+persist on the runtime so a dropped caller does not cancel it.
    fn spawn_refresh(&self) -> PendingRefresh {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let _settled = ClearPending(inner.clone());
            let result = inner.fetch_and_rank().await.map(Arc::new);
            if let Ok(models) = &result {
                inner.set_mirror(models.clone());
                inner.persist(models).await;
            }
            result
        });
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(RefreshError::Task(e.to_string())))
        }
        .boxed()
        .shared()
    }
}

/// Empties the pending slot when the refresh task ends, including by panic.
struct ClearPending(Arc<Inner>);

impl Drop for ClearPending {
    fn drop(&mut self) {
        *self.0.pending.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl Inner {
    fn mirror(&self) -> Option<Arc<Vec<String>>> {
        self.mirror.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_mirror(&self, models: Arc<Vec<String>>) {
        *self.mirror.write().unwrap_or_else(|e| e.into_inner()) = Some(models);
    }

    async fn fetch_and_rank(&self) -> Result<Vec<String>, RefreshError> {
        let tagged = match self.category.as_deref() {
            Some(tag) => match self.source.list_models(Some(tag)).await {
                Ok(models) => models,
                Err(CatalogError::MissingCredential) => {
                    return Err(CatalogError::MissingCredential.into())
                }
                Err(e) => {
                    warn!(category = tag, error = %e, "category catalog fetch failed, using unfiltered list only");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let all = self.source.list_models(None).await?;

        let category_ids: HashSet<String> = tagged.iter().map(|m| m.id.clone()).collect();
        let tagged_count = tagged.len();
        let all_count = all.len();
        // Category entries go first so deduplication keeps the tagged copy.
        let mut candidates = tagged;
        candidates.extend(all);

        let ranked = rank_models(&candidates, &category_ids)?;
        info!(
            tagged = tagged_count,
            total = all_count,
            ranked = ?ranked,
            "model cache refreshed"
        );
        Ok(ranked)
    }

    async fn persist(&self, models: &[String]) {
        let record = CacheRecord::now(models.to_vec());
        if let Err(e) = self.store.save(&record).await {
            warn!(path = %self.store.path().display(), error = %e, "failed to persist model cache");
        }
    }
}
