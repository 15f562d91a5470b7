//! Metric registration for the cache engine.

use std::sync::Once;

use metrics::{Unit, describe_counter};

static METRIC_DESCRIPTIONS: Once = Once::new();

pub(crate) const METRIC_READ_HIT_TOTAL: &str = "fresco_read_hit_total";
pub(crate) const METRIC_READ_MISS_TOTAL: &str = "fresco_read_miss_total";
pub(crate) const METRIC_WRITE_TOTAL: &str = "fresco_write_total";
pub(crate) const METRIC_WRITE_ERROR_TOTAL: &str = "fresco_write_error_total";
pub(crate) const METRIC_TAG_INVALIDATION_TOTAL: &str = "fresco_tag_invalidation_total";

/// Describe engine metrics once per process.
pub(crate) fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_READ_HIT_TOTAL,
            Unit::Count,
            "Total number of cache reads served from a stored record."
        );
        describe_counter!(
            METRIC_READ_MISS_TOTAL,
            Unit::Count,
            "Total number of cache reads that missed (absent, errored, expired, or tag-stale)."
        );
        describe_counter!(
            METRIC_WRITE_TOTAL,
            Unit::Count,
            "Total number of successfully committed cache writes."
        );
        describe_counter!(
            METRIC_WRITE_ERROR_TOTAL,
            Unit::Count,
            "Total number of cache writes recorded as errored."
        );
        describe_counter!(
            METRIC_TAG_INVALIDATION_TOTAL,
            Unit::Count,
            "Total number of tag invalidation stamps applied."
        );
    });
}
