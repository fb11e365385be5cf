use super::{NonEmptyTimeseries, Timeseries};
use crate::metrics::{Metric, MetricValue};
use crate::regions::Region;
use std::sync::Arc;

/// An immutable snapshot of a metric's value for one region.
///
/// Created by a provider's fetch and shared as `Arc<MetricData>` once cached.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricData {
    metric: Arc<Metric>,
    region: Arc<Region>,
    current_value: Option<MetricValue>,
    timeseries: Option<Timeseries<MetricValue>>,
}

impl MetricData {
    #[must_use]
    pub const fn new(
        metric: Arc<Metric>,
        region: Arc<Region>,
        current_value: Option<MetricValue>,
        timeseries: Option<Timeseries<MetricValue>>,
    ) -> Self {
        Self {
            metric,
            region,
            current_value,
            timeseries,
        }
    }

    /// A snapshot whose current value is the last point of `timeseries`.
    #[must_use]
    pub fn from_timeseries(metric: Arc<Metric>, region: Arc<Region>, timeseries: Timeseries<MetricValue>) -> Self {
        let current_value = timeseries.last().and_then(|p| p.value.clone());
        Self::new(metric, region, current_value, Some(timeseries))
    }

    /// A snapshot with neither a value nor a history.
    #[must_use]
    pub const fn empty(metric: Arc<Metric>, region: Arc<Region>) -> Self {
        Self::new(metric, region, None, None)
    }

    #[must_use]
    pub const fn metric(&self) -> &Arc<Metric> {
        &self.metric
    }

    #[must_use]
    pub const fn region(&self) -> &Arc<Region> {
        &self.region
    }

    #[must_use]
    pub const fn current_value(&self) -> Option<&MetricValue> {
        self.current_value.as_ref()
    }

    #[must_use]
    pub const fn timeseries(&self) -> Option<&Timeseries<MetricValue>> {
        self.timeseries.as_ref()
    }

    #[must_use]
    pub const fn has_value(&self) -> bool {
        self.current_value.is_some()
    }

    /// The history, when there is at least one point.
    #[must_use]
    pub fn non_empty_timeseries(&self) -> Option<NonEmptyTimeseries<MetricValue>> {
        self.timeseries.clone().and_then(|ts| ts.into_non_empty().ok())
    }

    /// Whether the current value agrees with the last point of the history, when both exist.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.timeseries.as_ref().and_then(Timeseries::last) {
            Some(last) => last.value == self.current_value,
            None => true,
        }
    }
}
