use super::{Color, MetricCategory, MetricValue};
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;

/// Value semantics of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Numeric,
    Categorical,
}

/// Direction of the thresholds of a numeric metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdOrder {
    /// Thresholds are inclusive upper bounds: the first category with `value <= bound` wins.
    Ascending,

    /// Thresholds are inclusive lower bounds: the first category with `value >= bound` wins.
    Descending,
}

/// Declarative description of a metric, as supplied by a definitions source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDefinition {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_name: Option<String>,

    #[serde(default)]
    pub kind: MetricKind,

    /// Id of the provider responsible for populating this metric.
    pub provider: String,

    #[serde(default)]
    pub categories: Vec<MetricCategory>,

    /// Unit suffix used when formatting values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    /// Number of decimals used when formatting numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

impl MetricDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: MetricKind, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extended_name: None,
            kind,
            provider: provider.into(),
            categories: Vec::new(),
            units: None,
            decimals: None,
        }
    }

    #[must_use]
    pub fn with_extended_name(mut self, extended_name: impl Into<String>) -> Self {
        self.extended_name = Some(extended_name.into());
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = MetricCategory>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    #[must_use]
    pub const fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }
}

/// A validated, immutable metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    id: Arc<str>,
    name: String,
    extended_name: Option<String>,
    kind: MetricKind,
    provider: String,
    categories: Vec<MetricCategory>,
    order: ThresholdOrder,
    units: Option<String>,
    decimals: Option<u8>,
}

impl Metric {
    /// Validate a definition into a metric.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidDefinition`] if the id or provider is empty, if a catch-all
    /// category is not declared last, if category values do not match the metric kind, if numeric
    /// thresholds are not strictly monotonic, or if categorical values repeat.
    pub fn new(def: MetricDefinition) -> Result<Self, CatalogError> {
        if def.id.trim().is_empty() {
            return Err(CatalogError::invalid(&def.name, "metric id must not be empty"));
        }

        if def.provider.trim().is_empty() {
            return Err(CatalogError::invalid(&def.id, "metric must name a provider"));
        }

        if let Some(pos) = def.categories.iter().position(|c| c.value.is_none())
            && pos + 1 != def.categories.len()
        {
            return Err(CatalogError::invalid(
                &def.id,
                format!("category '{}' has no value but is not the last category", def.categories[pos].label),
            ));
        }

        let order = match def.kind {
            MetricKind::Numeric => threshold_order(&def)?,
            MetricKind::Categorical => {
                check_categorical(&def)?;
                ThresholdOrder::Ascending
            }
        };

        Ok(Self {
            id: Arc::from(def.id),
            name: def.name,
            extended_name: def.extended_name,
            kind: def.kind,
            provider: def.provider,
            categories: def.categories,
            order,
            units: def.units,
            decimals: def.decimals,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get a clone of the id Arc
    #[must_use]
    pub fn id_arc(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The extended name, falling back to the name when none was declared.
    #[must_use]
    pub fn extended_name(&self) -> &str {
        self.extended_name.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        self.kind
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[must_use]
    pub fn categories(&self) -> &[MetricCategory] {
        &self.categories
    }

    #[must_use]
    pub const fn threshold_order(&self) -> ThresholdOrder {
        self.order
    }

    #[must_use]
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    #[must_use]
    pub const fn decimals(&self) -> Option<u8> {
        self.decimals
    }

    /// Whether the last category has no bound (open-ended bucket or fallback).
    #[must_use]
    pub fn has_catch_all(&self) -> bool {
        self.categories.last().is_some_and(|c| c.value.is_none())
    }

    /// The numeric thresholds, in declaration order.
    pub fn thresholds(&self) -> impl Iterator<Item = f64> + '_ {
        self.categories.iter().filter_map(|c| c.value.as_ref().and_then(MetricValue::as_number))
    }

    /// Resolve the category a present value belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnmappedValue`] if no category matches, including when the value has
    /// the wrong kind for this metric or is NaN.
    pub fn category_for(&self, value: &MetricValue) -> Result<&MetricCategory, CatalogError> {
        let found = match (self.kind, value) {
            (MetricKind::Numeric, MetricValue::Number(n)) if !n.is_nan() => self.numeric_category(*n),
            (MetricKind::Categorical, MetricValue::Text(text)) => self.categorical_category(text),
            _ => None,
        };

        found.ok_or_else(|| CatalogError::UnmappedValue {
            metric: self.id.to_string(),
            value: value.clone(),
        })
    }

    /// Resolve the color of a present value.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::category_for`].
    pub fn color_for(&self, value: &MetricValue) -> Result<Color, CatalogError> {
        self.category_for(value).map(|c| c.color)
    }

    /// Format a value using the metric's decimals and units.
    #[must_use]
    pub fn format_value(&self, value: &MetricValue) -> String {
        let text = match (value, self.decimals) {
            (MetricValue::Number(n), Some(decimals)) => format!("{n:.prec$}", prec = usize::from(decimals)),
            _ => value.to_string(),
        };

        match &self.units {
            Some(units) if value.is_number() => format!("{text} {units}"),
            _ => text,
        }
    }

    fn numeric_category(&self, n: f64) -> Option<&MetricCategory> {
        self.categories.iter().find(|category| match category.value {
            Some(MetricValue::Number(bound)) => match self.order {
                ThresholdOrder::Ascending => n <= bound,
                ThresholdOrder::Descending => n >= bound,
            },
            None => true,
            Some(MetricValue::Text(_)) => false,
        })
    }

    fn categorical_category(&self, text: &str) -> Option<&MetricCategory> {
        self.categories.iter().find(|category| match &category.value {
            Some(MetricValue::Text(expected)) => expected == text,
            None => true,
            Some(MetricValue::Number(_)) => false,
        })
    }
}

/// Check numeric thresholds and derive their direction.
fn threshold_order(def: &MetricDefinition) -> Result<ThresholdOrder, CatalogError> {
    let mut bounds = Vec::with_capacity(def.categories.len());
    for category in &def.categories {
        match &category.value {
            Some(MetricValue::Number(n)) if n.is_finite() => bounds.push(*n),
            Some(MetricValue::Number(_)) => {
                return Err(CatalogError::invalid(
                    &def.id,
                    format!("category '{}' has a non-finite threshold", category.label),
                ));
            }
            Some(MetricValue::Text(t)) => {
                return Err(CatalogError::invalid(
                    &def.id,
                    format!("category '{}' of a numeric metric has the non-numeric value '{t}'", category.label),
                ));
            }
            None => {}
        }
    }

    let order = match bounds.as_slice() {
        [first, second, ..] if second < first => ThresholdOrder::Descending,
        _ => ThresholdOrder::Ascending,
    };

    let monotonic = bounds.windows(2).all(|pair| match order {
        ThresholdOrder::Ascending => pair[0] < pair[1],
        ThresholdOrder::Descending => pair[0] > pair[1],
    });

    if !monotonic {
        return Err(CatalogError::invalid(&def.id, "category thresholds must be strictly increasing or strictly decreasing"));
    }

    Ok(order)
}

fn check_categorical(def: &MetricDefinition) -> Result<(), CatalogError> {
    let mut seen = Vec::with_capacity(def.categories.len());
    for category in &def.categories {
        match &category.value {
            Some(MetricValue::Text(t)) => {
                if seen.contains(&t.as_str()) {
                    return Err(CatalogError::invalid(&def.id, format!("category value '{t}' is declared more than once")));
                }
                seen.push(t.as_str());
            }
            Some(MetricValue::Number(n)) => {
                return Err(CatalogError::invalid(
                    &def.id,
                    format!("category '{}' of a categorical metric has the numeric value {n}", category.label),
                ));
            }
            None => {}
        }
    }

    Ok(())
}

/// A metric given either as an already-resolved instance or as an id.
///
/// Every consumer-facing catalog operation accepts `impl Into<MetricRef>`, so callers holding a
/// resolved metric skip the registry lookup.
#[derive(Debug, Clone)]
pub enum MetricRef {
    Metric(Arc<Metric>),
    Id(String),
}

impl From<Arc<Metric>> for MetricRef {
    fn from(value: Arc<Metric>) -> Self {
        Self::Metric(value)
    }
}

impl From<&Arc<Metric>> for MetricRef {
    fn from(value: &Arc<Metric>) -> Self {
        Self::Metric(Arc::clone(value))
    }
}

impl From<&str> for MetricRef {
    fn from(value: &str) -> Self {
        Self::Id(value.to_string())
    }
}

impl From<String> for MetricRef {
    fn from(value: String) -> Self {
        Self::Id(value)
    }
}

impl From<&String> for MetricRef {
    fn from(value: &String) -> Self {
        Self::Id(value.clone())
    }
}
