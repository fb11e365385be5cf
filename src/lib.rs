//! metric-catalog crate
//!
//! A registry that resolves metric identifiers to metric definitions, fetches the current value and
//! history of a metric for a region from pluggable data providers, caches the results, and maps raw
//! values onto presentable categories (label + color).
//!
//! # Module Organization
//!
//! - [`regions`]: Regions and the indexed, read-only region database
//! - [`metrics`]: Metric definitions, categories, colors and value categorization
//! - [`data`]: Timeseries and the immutable `MetricData` snapshot
//! - [`providers`]: The provider trait and the built-in providers
//! - [`catalog`]: The catalog itself: resolution, fetching, caching and de-duplication
//! - [`config`]: Declarative catalog configuration

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod catalog;
pub mod config;
pub mod data;
mod error;
pub mod metrics;
pub mod providers;
pub mod regions;

pub use catalog::{CacheEvent, CacheEventKind, CacheKey, CacheStatus, MetricCatalog, MetricCatalogBuilder};
pub use data::{MetricData, NonEmptyTimeseries, Timeseries, TimeseriesError, TimeseriesPoint};
pub use error::{CatalogError, ErrorKind};
pub use metrics::{Color, Metric, MetricCategory, MetricDefinition, MetricKind, MetricRef, MetricValue, ThresholdOrder};
pub use providers::MetricDataProvider;
pub use regions::{Region, RegionDb, RegionMatch, RegionRecord};
