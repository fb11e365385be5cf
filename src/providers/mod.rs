//! Data providers
//!
//! A [`MetricDataProvider`] asynchronously produces the [`MetricData`] of one metric for one region.
//! The catalog routes each fetch to the provider a metric names and treats every implementation
//! the same way; providers only ever see shared, immutable regions and metrics.
//!
//! Three providers are built in:
//!
//! - [`MockProvider`] generates deterministic synthetic series, for demos and tests.
//! - [`StaticTableProvider`] serves values from an in-memory table, optionally loaded from CSV.
//! - [`RemoteProvider`] fetches JSON documents over HTTP, optionally through a [`DiskCache`].

use crate::data::MetricData;
use crate::metrics::Metric;
use crate::regions::Region;
use async_trait::async_trait;
use core::fmt::Debug;
use std::sync::Arc;

mod disk_cache;
mod mock;
mod remote;
mod static_table;

pub use disk_cache::{Cached, DiskCache, sanitize_path_component};
pub use mock::MockProvider;
pub use remote::{RemoteProvider, RemoteResponse};
pub use static_table::StaticTableProvider;

/// A pluggable source of metric data.
#[async_trait]
pub trait MetricDataProvider: Send + Sync + Debug {
    /// Produce the data of `metric` for `region`.
    ///
    /// Returning a `MetricData` without a value is the way to say "nothing known for this pair";
    /// an error means the fetch itself failed.
    async fn fetch_data_for_region_and_metric(&self, region: &Arc<Region>, metric: &Arc<Metric>) -> crate::Result<MetricData>;
}

#[async_trait]
impl<P: MetricDataProvider + ?Sized> MetricDataProvider for Arc<P> {
    async fn fetch_data_for_region_and_metric(&self, region: &Arc<Region>, metric: &Arc<Metric>) -> crate::Result<MetricData> {
        (**self).fetch_data_for_region_and_metric(region, metric).await
    }
}
