//! The metric catalog
//!
//! A [`MetricCatalog`] resolves metric ids to [`crate::Metric`]s, routes data requests to the
//! provider each metric names, and caches the resulting [`crate::MetricData`] per
//! `(region id, metric id)`.
//!
//! # Implementation Model
//!
//! Each cache key is in one of four states: absent (no entry), pending, resolved or failed. All
//! check-then-act sequences on a key happen under a single mutex that is never held across an
//! `.await`, which gives the de-duplication guarantee: at most one provider call per key is in
//! flight, and every caller asking for that key meanwhile attaches to it.
//!
//! A provider call runs on its own tokio task and is exposed to callers as a shared future. The
//! task itself records the outcome in the cache, tagged with the generation number it was started
//! under, so:
//!
//! - a caller that gives up does not cancel the call, and the result is still cached
//! - a result that raced with an invalidation is discarded rather than resurrected
//!
//! Failures are recorded as failed entries so that subscribers can see them, but
//! [`MetricCatalog::fetch_data`] never serves a failure as an answer and retries the provider.
//!
//! Every state change is broadcast as a [`CacheEvent`] for consumers that re-render on change.

mod builder;
mod cache;
mod metric_catalog;

pub use builder::MetricCatalogBuilder;
pub use cache::{CacheEvent, CacheEventKind, CacheKey, CacheStatus};
pub use metric_catalog::MetricCatalog;
