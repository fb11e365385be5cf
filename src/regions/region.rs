use super::slugify;
use core::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

/// An immutable geographic or administrative entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    region_id: Arc<str>,
    full_name: String,
    short_name: String,
    abbreviation: String,
    slug: String,
    parent: Option<Arc<str>>,
    population: Option<u64>,
}

impl Region {
    /// Create a region whose short name is its full name, whose abbreviation is its id, and whose
    /// slug is derived from its full name.
    #[must_use]
    pub fn new(region_id: impl AsRef<str>, full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        Self {
            region_id: Arc::from(region_id.as_ref()),
            short_name: full_name.clone(),
            abbreviation: region_id.as_ref().to_string(),
            slug: slugify(&full_name),
            full_name,
            parent: None,
            population: None,
        }
    }

    #[must_use]
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = short_name.into();
        self
    }

    #[must_use]
    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = abbreviation.into();
        self
    }

    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl AsRef<str>) -> Self {
        self.parent = Some(Arc::from(parent.as_ref()));
        self
    }

    #[must_use]
    pub const fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    #[must_use]
    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    /// Get a clone of the id Arc
    #[must_use]
    pub fn region_id_arc(&self) -> Arc<str> {
        Arc::clone(&self.region_id)
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    #[must_use]
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Id of the enclosing region, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    #[must_use]
    pub const fn population(&self) -> Option<u64> {
        self.population
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({})", self.full_name, self.region_id)
    }
}
