//! Metric definitions and value categorization
//!
//! A [`Metric`] is static metadata describing a measurable quantity: its display names, whether its
//! values are numbers or labels, the provider that populates it, and an ordered list of
//! [`MetricCategory`] buckets used to turn a raw [`MetricValue`] into a label and a [`Color`].
//!
//! # Implementation Model
//!
//! Metrics are declared through a serializable [`MetricDefinition`] and validated into a
//! [`Metric`] when registered with a catalog. Validation fixes the category matching policy once,
//! so categorization never has to re-check the shape of the definition:
//!
//! - **Numeric** metrics carry strictly monotonic thresholds. Ascending thresholds are inclusive
//!   upper bounds, descending thresholds are inclusive lower bounds, and the first category whose
//!   bound holds wins. A final category without a threshold is the open-ended bucket.
//! - **Categorical** metrics match the first category whose value equals the given one. A final
//!   category without a value is the fallback.
//!
//! Consumers can refer to a metric either by id or by an already-resolved instance through
//! [`MetricRef`].

mod color;
mod metric;
mod metric_category;
mod metric_value;

pub use color::Color;
pub use metric::{Metric, MetricDefinition, MetricKind, MetricRef, ThresholdOrder};
pub use metric_category::MetricCategory;
pub use metric_value::MetricValue;
