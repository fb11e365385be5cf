use serde::{Deserialize, Serialize};

/// One row of a region dataset, as read from CSV or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegionRecord {
    pub id: String,
    pub full_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,

    /// Explicit slug. When absent, one is derived from the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl RegionRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            short_name: None,
            abbreviation: None,
            parent_id: None,
            population: None,
            slug: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    #[must_use]
    pub const fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }
}

/// Lowercase `name` and collapse every run of non-alphanumeric characters into a single `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("United States"), "united-states");
        assert_eq!(slugify("  St. John's -- Parish "), "st-john-s-parish");
        assert_eq!(slugify("Île-de-France"), "île-de-france");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_record_from_json_with_defaults() {
        let record: RegionRecord = serde_json::from_str(r#"{"id":"NY","full_name":"New York","parent_id":"US"}"#).unwrap();
        assert_eq!(record, RegionRecord::new("NY", "New York").with_parent("US"));
    }
}
