use super::MetricCatalog;
use crate::error::CatalogError;
use crate::metrics::{Color, Metric, MetricDefinition};
use crate::providers::MetricDataProvider;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Collects providers and metric definitions, then validates them into a [`MetricCatalog`].
#[derive(Debug, Default)]
pub struct MetricCatalogBuilder {
    providers: Vec<(String, Arc<dyn MetricDataProvider>)>,
    definitions: Vec<MetricDefinition>,
    placeholder_color: Option<Color>,
}

impl MetricCatalogBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(self, id: impl Into<String>, provider: impl MetricDataProvider + 'static) -> Self {
        self.shared_provider(id, Arc::new(provider))
    }

    /// Register a provider that is also used elsewhere.
    #[must_use]
    pub fn shared_provider(mut self, id: impl Into<String>, provider: Arc<dyn MetricDataProvider>) -> Self {
        self.providers.push((id.into(), provider));
        self
    }

    /// Register a metric definition. It is validated by [`Self::build`].
    #[must_use]
    pub fn metric(mut self, definition: MetricDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    #[must_use]
    pub fn metrics(mut self, definitions: impl IntoIterator<Item = MetricDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Color returned for missing values. Defaults to [`Color::PLACEHOLDER`].
    #[must_use]
    pub const fn placeholder_color(mut self, color: Color) -> Self {
        self.placeholder_color = Some(color);
        self
    }

    /// Validate everything registered and build the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidDefinition`] on a duplicate provider or metric id, on a
    /// metric naming an unregistered provider, or on a malformed metric definition.
    pub fn build(self) -> Result<MetricCatalog, CatalogError> {
        let mut providers = HashMap::with_capacity(self.providers.len());
        for (id, provider) in self.providers {
            if id.trim().is_empty() {
                return Err(CatalogError::invalid("<provider>", "provider id must not be empty"));
            }
            if providers.contains_key(&id) {
                return Err(CatalogError::invalid(&id, "provider is registered more than once"));
            }
            let _ = providers.insert(id, provider);
        }

        let mut seen = HashSet::with_capacity(self.definitions.len());
        let mut metrics = Vec::with_capacity(self.definitions.len());
        for definition in self.definitions {
            if !seen.insert(definition.id.clone()) {
                return Err(CatalogError::invalid(&definition.id, "metric is registered more than once"));
            }
            if !providers.contains_key(&definition.provider) {
                return Err(CatalogError::invalid(
                    &definition.id,
                    format!("metric names the unknown provider '{}'", definition.provider),
                ));
            }
            metrics.push(Arc::new(Metric::new(definition)?));
        }

        Ok(MetricCatalog::from_parts(
            metrics,
            providers,
            self.placeholder_color.unwrap_or(Color::PLACEHOLDER),
        ))
    }
}
