//! Cache engine: the public cache contract.
//!
//! Orchestrates the entry store, pending-write tracker and tag manifest
//! into four operations: `get`, `set`, `expire_tags` and
//! `receive_expired_tags`. Writes never raise past this boundary; failures
//! are recorded on the stored record instead.

use std::future::Future;

use metrics::counter;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::entry::{CacheEntry, EntryDraft, RecordStatus, StoredRecord, now_ms};
use crate::error::{CacheError, StreamError};
use crate::manifest::TagManifest;
use crate::pending::PendingWrites;
use crate::store::EntryStore;
use crate::telemetry::{
    self, METRIC_READ_HIT_TOTAL, METRIC_READ_MISS_TOTAL, METRIC_TAG_INVALIDATION_TOTAL,
    METRIC_WRITE_ERROR_TOTAL, METRIC_WRITE_TOTAL,
};

/// Per-operation diagnostics: `debug` by default, elevated to `info` when
/// the config asks for operation logging.
macro_rules! op_event {
    ($engine:expr, $($arg:tt)*) => {
        if $engine.config.log_operations {
            tracing::info!($($arg)*);
        } else {
            tracing::debug!($($arg)*);
        }
    };
}

/// In-process cache engine for computed artifacts.
///
/// Shared across callers via `Arc`; every operation takes `&self` and the
/// three underlying structures each carry their own synchronization.
pub struct CacheEngine {
    config: CacheConfig,
    store: EntryStore,
    pending: PendingWrites,
    manifest: TagManifest,
}

impl CacheEngine {
    pub fn new(config: CacheConfig) -> Self {
        telemetry::describe_metrics();
        Self {
            config,
            store: EntryStore::new(),
            pending: PendingWrites::new(),
            manifest: TagManifest::new(),
        }
    }

    /// Look up `key`, waiting first for any in-flight write to it.
    ///
    /// `soft_tags` are checked for staleness in addition to the entry's own
    /// tags, against the entry's timestamp. Every negative outcome is a
    /// uniform miss: absent, errored, past the TTL window, or tag-stale.
    /// A miss never mutates the store.
    pub async fn get(&self, key: &str, soft_tags: &[String]) -> Option<CacheEntry> {
        if !self.config.enabled {
            op_event!(self, key, outcome = "disabled", "Cache read");
            return None;
        }

        self.pending.wait(key).await;

        let Some(record) = self.store.get(key) else {
            return self.miss(key, "absent");
        };
        if record.is_errored() {
            return self.miss(key, "errored");
        }
        if !record.is_fresh(now_ms()) {
            return self.miss(key, "expired");
        }
        if self.manifest.is_stale(record.tags(), record.timestamp())
            || self.manifest.is_stale(soft_tags, record.timestamp())
        {
            return self.miss(key, "stale_tag");
        }

        let value = record.split_value();
        counter!(METRIC_READ_HIT_TOTAL).increment(1);
        op_event!(self, key, outcome = "hit", size = record.size(), "Cache read");

        Some(CacheEntry {
            value,
            tags: record.tags().to_vec(),
            timestamp: record.timestamp(),
            expire: record.expire(),
            revalidate: record.revalidate(),
        })
    }

    /// Commit `draft` under `key` once it resolves.
    ///
    /// The pending marker is registered before the draft is awaited, so
    /// concurrent readers observe the write as soon as it logically begins,
    /// and is released on every exit path. Validation or stream failures
    /// are recorded on the stored record; `set` itself never fails.
    pub async fn set(&self, key: impl Into<String>, draft: impl Future<Output = EntryDraft>) {
        let key = key.into();

        if !self.config.enabled {
            drop(draft.await);
            op_event!(self, key = key.as_str(), outcome = "disabled", "Cache write");
            return;
        }

        let _pending = self.pending.begin(key.clone());
        op_event!(self, key = key.as_str(), "Cache write started");

        let draft = draft.await;
        let (record, outcome) = self.commit(&key, draft).await;
        match &outcome {
            Ok(size) => {
                counter!(METRIC_WRITE_TOTAL).increment(1);
                op_event!(
                    self,
                    key = key.as_str(),
                    size = *size,
                    outcome = "success",
                    "Cache write"
                );
            }
            Err(error) => {
                counter!(METRIC_WRITE_ERROR_TOTAL).increment(1);
                warn!(
                    key = key.as_str(),
                    %error,
                    retry_count = record.error_retry_count(),
                    "Cache write failed; errored record retained"
                );
            }
        }
        self.store.put(key, record);
        // The pending guard drops here, waking readers only after the new
        // record is visible in the store.
    }

    /// Stamp the named tags as invalidated at the current wall-clock time.
    pub fn expire_tags<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        counter!(METRIC_TAG_INVALIDATION_TOTAL).increment(tags.len() as u64);
        op_event!(self, tags = ?tags, count = tags.len(), "Tags expired");
        self.manifest.invalidate(tags);
    }

    /// Apply tag invalidations that originated elsewhere.
    ///
    /// Same bookkeeping as [`expire_tags`](Self::expire_tags); a separate
    /// entry point because it is driven by propagation, not by a local
    /// trigger.
    pub fn receive_expired_tags<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        debug!(origin = "propagated", "Received expired tags");
        self.expire_tags(tags);
    }

    /// Bookkeeping snapshot for `key`, if a record was ever committed.
    pub fn status(&self, key: &str) -> Option<RecordStatus> {
        self.store.get(key).map(|record| record.status())
    }

    /// Number of committed records, errored ones included.
    pub fn entry_count(&self) -> usize {
        self.store.len()
    }

    /// Drop every record and tag stamp (test teardown).
    pub fn clear(&self) {
        self.store.clear();
        self.manifest.clear();
    }

    fn miss(&self, key: &str, reason: &'static str) -> Option<CacheEntry> {
        counter!(METRIC_READ_MISS_TOTAL).increment(1);
        op_event!(self, key, outcome = "miss", reason, "Cache read");
        None
    }

    /// Duplicate, account, validate and build the record to store.
    async fn commit(&self, key: &str, draft: EntryDraft) -> (StoredRecord, Result<u64, CacheError>) {
        let EntryDraft {
            value,
            tags,
            timestamp,
            expire,
            revalidate,
        } = draft;

        // One tee side becomes the stored value; the other is drained
        // purely to measure the payload.
        let (kept, accounting) = value.tee();
        let (size, fault) = accounting.measure().await;
        let timestamp = timestamp.unwrap_or_else(now_ms);

        match Self::validate_draft(fault, &tags, expire, revalidate) {
            Ok((expire, revalidate)) => {
                let record = StoredRecord::committed(
                    tags.unwrap_or_default(),
                    timestamp,
                    expire,
                    revalidate,
                    kept,
                    size,
                );
                (record, Ok(size))
            }
            Err(error) => {
                let retry_count = self
                    .store
                    .get(key)
                    .map(|prior| prior.error_retry_count())
                    .unwrap_or(0)
                    + 1;
                let record = StoredRecord::errored(
                    tags.unwrap_or_default(),
                    timestamp,
                    expire.unwrap_or(0.0),
                    revalidate.unwrap_or(0.0),
                    kept,
                    size,
                    retry_count,
                );
                (record, Err(error))
            }
        }
    }

    /// A stream fault takes precedence; field checks run in declaration
    /// order: tags, expire, revalidate.
    fn validate_draft(
        fault: Option<StreamError>,
        tags: &Option<Vec<String>>,
        expire: Option<f64>,
        revalidate: Option<f64>,
    ) -> Result<(f64, f64), CacheError> {
        if let Some(fault) = fault {
            return Err(CacheError::Stream(fault));
        }
        if tags.is_none() {
            return Err(CacheError::MissingTags);
        }
        let expire = expire
            .filter(|seconds| *seconds > 0.0)
            .ok_or(CacheError::NonPositiveExpire)?;
        let revalidate = revalidate
            .filter(|seconds| *seconds > 0.0)
            .ok_or(CacheError::NonPositiveRevalidate)?;
        Ok((expire, revalidate))
    }
}

impl Default for CacheEngine {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
