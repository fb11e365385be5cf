use super::{Color, MetricValue};
use serde::{Deserialize, Serialize};

/// A discrete presentation bucket a raw metric value maps onto.
///
/// For numeric metrics `value` is a threshold boundary, for categorical metrics it is the exact
/// value that selects this category. `None` marks the open-ended (numeric) or fallback
/// (categorical) category, which may only be declared last.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricCategory {
    pub label: String,
    pub color: Color,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<MetricValue>,
}

impl MetricCategory {
    #[must_use]
    pub fn new(label: impl Into<String>, color: Color, value: Option<MetricValue>) -> Self {
        Self {
            label: label.into(),
            color,
            value,
        }
    }

    /// A numeric category bounded by `threshold`.
    #[must_use]
    pub fn threshold(label: impl Into<String>, color: Color, threshold: f64) -> Self {
        Self::new(label, color, Some(MetricValue::Number(threshold)))
    }

    /// A categorical category selected by `value`.
    #[must_use]
    pub fn exact(label: impl Into<String>, color: Color, value: impl Into<String>) -> Self {
        Self::new(label, color, Some(MetricValue::Text(value.into())))
    }

    /// The open-ended or fallback category.
    #[must_use]
    pub fn catch_all(label: impl Into<String>, color: Color) -> Self {
        Self::new(label, color, None)
    }
}
