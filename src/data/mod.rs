//! Timeseries and metric data snapshots

mod metric_data;
mod timeseries;

pub use metric_data::MetricData;
pub use timeseries::{NonEmptyTimeseries, Timeseries, TimeseriesError, TimeseriesPoint};
