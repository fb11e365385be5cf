use crate::data::MetricData;
use crate::error::CatalogError;
use crate::metrics::Metric;
use crate::regions::Region;
use core::fmt::{Debug, Display, Formatter, Result as FmtResult};
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;

/// The result every caller attached to a fetch observes.
pub(crate) type FetchResult = Result<Arc<MetricData>, CatalogError>;

/// A provider call in progress, awaitable by any number of callers.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Identifies a cache entry: a region id and a metric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    region_id: Arc<str>,
    metric_id: Arc<str>,
}

impl CacheKey {
    #[must_use]
    pub fn new(region: &Region, metric: &Metric) -> Self {
        Self {
            region_id: region.region_id_arc(),
            metric_id: metric.id_arc(),
        }
    }

    #[must_use]
    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    #[must_use]
    pub fn metric_id(&self) -> &str {
        &self.metric_id
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.region_id, self.metric_id)
    }
}

/// State of a present cache entry. A key without an entry is absent.
pub(crate) enum CacheEntry {
    Pending { generation: u64, fetch: SharedFetch },
    Resolved(Arc<MetricData>),
    Failed(CatalogError),
}

impl Debug for CacheEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Pending { generation, .. } => f.debug_struct("Pending").field("generation", generation).finish_non_exhaustive(),
            Self::Resolved(data) => f.debug_tuple("Resolved").field(data).finish(),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

/// The state of a (region, metric) pair as seen by a consumer.
#[derive(Debug, Clone)]
pub enum CacheStatus {
    Absent,
    Pending,
    Resolved(Arc<MetricData>),
    Failed(CatalogError),
}

impl CacheStatus {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    #[must_use]
    pub const fn data(&self) -> Option<&Arc<MetricData>> {
        match self {
            Self::Resolved(data) => Some(data),
            _ => None,
        }
    }
}

impl From<&CacheEntry> for CacheStatus {
    fn from(entry: &CacheEntry) -> Self {
        match entry {
            CacheEntry::Pending { .. } => Self::Pending,
            CacheEntry::Resolved(data) => Self::Resolved(Arc::clone(data)),
            CacheEntry::Failed(e) => Self::Failed(e.clone()),
        }
    }
}

/// What happened to a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// A provider call started.
    Pending,

    /// A provider call succeeded and its data is cached.
    Resolved,

    /// A provider call failed.
    Failed,

    /// The entry was dropped by an invalidation.
    Invalidated,
}

/// A state change of one cache entry, broadcast to every subscriber of [`crate::MetricCatalog::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: CacheKey,
    pub kind: CacheEventKind,
}
