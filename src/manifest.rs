//! Tag invalidation manifest.
//!
//! Maps tag names to the wall-clock time they were last invalidated.
//! Staleness is monotonic: tags are stamped, never removed, and only the
//! latest stamp matters, so concurrent invalidations are last-writer-wins
//! per tag without affecting correctness.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::entry::{EpochMillis, now_ms};
use crate::lock::{read_guard, write_guard};

const SOURCE: &str = "fresco::manifest";

/// Per-tag invalidation stamps.
#[derive(Default)]
pub struct TagManifest {
    revalidated_at: RwLock<HashMap<String, EpochMillis>>,
}

impl TagManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp every named tag with the current wall-clock time, creating
    /// state as needed.
    pub fn invalidate<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stamped_at = now_ms();
        let mut guard = write_guard(&self.revalidated_at, SOURCE, "invalidate");
        for tag in tags {
            let tag = tag.into();
            debug!(tag = tag.as_str(), stamped_at, "Tag invalidated");
            guard.insert(tag, stamped_at);
        }
    }

    /// Whether any named tag was invalidated strictly after `since`.
    ///
    /// An empty tag list is never stale, and neither is a tag that was
    /// never invalidated.
    pub fn is_stale(&self, tags: &[String], since: EpochMillis) -> bool {
        if tags.is_empty() {
            return false;
        }
        let guard = read_guard(&self.revalidated_at, SOURCE, "is_stale");
        tags.iter()
            .any(|tag| guard.get(tag).is_some_and(|&stamped_at| stamped_at > since))
    }

    /// Number of tags ever invalidated.
    pub fn len(&self) -> usize {
        read_guard(&self.revalidated_at, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every stamp (test teardown).
    pub fn clear(&self) {
        write_guard(&self.revalidated_at, SOURCE, "clear").clear();
    }
}
