//! Cache entry data model.
//!
//! A writer hands the engine an [`EntryDraft`]; validation happens at
//! commit time, and the store keeps a [`StoredRecord`]. A reader receives a
//! [`CacheEntry`]: the validated metadata plus a duplicate of the stored
//! stream.

use std::sync::Mutex;

use time::OffsetDateTime;

use crate::lock::lock_guard;
use crate::stream::ArtifactStream;

const SOURCE: &str = "fresco::entry";

/// Milliseconds since the Unix epoch.
pub type EpochMillis = u64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> EpochMillis {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as EpochMillis
}

/// Writer-supplied entry, not yet validated.
///
/// `tags`, `expire` and `revalidate` are required at commit time but kept
/// optional here: an invalid draft is still committed, as an errored
/// record, so the failure leaves a queryable marker.
#[derive(Debug)]
pub struct EntryDraft {
    pub value: ArtifactStream,
    pub tags: Option<Vec<String>>,
    pub timestamp: Option<EpochMillis>,
    pub expire: Option<f64>,
    pub revalidate: Option<f64>,
}

impl EntryDraft {
    pub fn new(value: ArtifactStream) -> Self {
        Self {
            value,
            tags: None,
            timestamp: None,
            expire: None,
            revalidate: None,
        }
    }

    /// Declare the entry's tags. An empty list is valid.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Override the commit timestamp (defaults to "now" at commit).
    pub fn timestamp(mut self, timestamp: EpochMillis) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Declare the host-facing hard-eviction lifetime, in seconds.
    pub fn expire(mut self, seconds: f64) -> Self {
        self.expire = Some(seconds);
        self
    }

    /// Declare the TTL freshness window, in seconds after the timestamp.
    pub fn revalidate(mut self, seconds: f64) -> Self {
        self.revalidate = Some(seconds);
        self
    }
}

/// A cache hit: validated metadata plus a duplicated payload stream.
#[derive(Debug)]
pub struct CacheEntry {
    pub value: ArtifactStream,
    pub tags: Vec<String>,
    pub timestamp: EpochMillis,
    pub expire: f64,
    pub revalidate: f64,
}

/// The unit held by the entry store.
///
/// Metadata is immutable after commit. The stored stream lives in an
/// interior slot so a read can swap in a fresh duplicate without a write
/// lock on the whole store.
pub struct StoredRecord {
    tags: Vec<String>,
    timestamp: EpochMillis,
    expire: f64,
    revalidate: f64,
    slot: Mutex<ArtifactStream>,
    is_errored: bool,
    error_retry_count: u32,
    size: u64,
}

impl StoredRecord {
    /// A successfully committed record. Resets the retry counter.
    pub fn committed(
        tags: Vec<String>,
        timestamp: EpochMillis,
        expire: f64,
        revalidate: f64,
        value: ArtifactStream,
        size: u64,
    ) -> Self {
        Self {
            tags,
            timestamp,
            expire,
            revalidate,
            slot: Mutex::new(value),
            is_errored: false,
            error_retry_count: 0,
            size,
        }
    }

    /// A record for a failed write: retained for bookkeeping, never served.
    pub fn errored(
        tags: Vec<String>,
        timestamp: EpochMillis,
        expire: f64,
        revalidate: f64,
        value: ArtifactStream,
        size: u64,
        error_retry_count: u32,
    ) -> Self {
        Self {
            tags,
            timestamp,
            expire,
            revalidate,
            slot: Mutex::new(value),
            is_errored: true,
            error_retry_count,
            size,
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn timestamp(&self) -> EpochMillis {
        self.timestamp
    }

    pub fn expire(&self) -> f64 {
        self.expire
    }

    pub fn revalidate(&self) -> f64 {
        self.revalidate
    }

    pub fn is_errored(&self) -> bool {
        self.is_errored
    }

    pub fn error_retry_count(&self) -> u32 {
        self.error_retry_count
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// TTL freshness at `now`: the deadline itself still counts as fresh,
    /// one millisecond past it is expired.
    pub fn is_fresh(&self, now: EpochMillis) -> bool {
        now as f64 <= self.timestamp as f64 + self.revalidate * 1000.0
    }

    /// Duplicate the stored stream: one side replaces the stored value, the
    /// other is returned. The slot always holds a viable stream afterwards,
    /// so the record stays readable for the next caller.
    pub fn split_value(&self) -> ArtifactStream {
        let mut slot = lock_guard(&self.slot, SOURCE, "split_value");
        let stored = std::mem::replace(&mut *slot, ArtifactStream::empty());
        let (kept, returned) = stored.tee();
        *slot = kept;
        returned
    }

    /// Point-in-time bookkeeping snapshot.
    pub fn status(&self) -> RecordStatus {
        RecordStatus {
            is_errored: self.is_errored,
            error_retry_count: self.error_retry_count,
            size: self.size,
            timestamp: self.timestamp,
        }
    }
}

/// Bookkeeping snapshot of a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStatus {
    pub is_errored: bool,
    pub error_retry_count: u32,
    pub size: u64,
    pub timestamp: EpochMillis,
}
