//! Fresco: an in-process cache for computed artifacts.
//!
//! Cached values are byte streams plus metadata. Three properties set the
//! engine apart from a plain map:
//!
//! - **Dual expiry**: entries go stale by TTL and by external tag
//!   invalidation, whichever comes first.
//! - **Write coalescing**: one write is in flight per key; readers suspend
//!   on it instead of racing it.
//! - **Re-readable streams**: every read returns a duplicate of the stored
//!   stream and leaves an independently viable copy behind, so reading an
//!   entry never consumes it.
//!
//! ## Configuration
//!
//! Engine behavior is controlled via [`CacheConfig`], loadable from a TOML
//! file and `FRESCO_*` environment variables:
//!
//! ```toml
//! enabled = true
//! log_operations = false
//! ```

mod config;
mod engine;
mod entry;
mod error;
mod lock;
mod manifest;
mod pending;
mod store;
mod stream;
mod telemetry;

pub use config::{CacheConfig, ConfigLoadError};
pub use engine::CacheEngine;
pub use entry::{CacheEntry, EntryDraft, EpochMillis, RecordStatus, StoredRecord, now_ms};
pub use error::{CacheError, StreamError};
pub use manifest::TagManifest;
pub use pending::{PendingGuard, PendingWrites};
pub use store::EntryStore;
pub use stream::ArtifactStream;
