use super::{Region, RegionRecord, slugify};
use crate::Result;
use crate::error::CatalogError;
use camino::Utf8Path;
use core::cmp::Ordering;
use ohno::{EnrichableExt, IntoAppError, bail};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::sync::Arc;
use strsim::normalized_damerau_levenshtein;

const LOG_TARGET: &str = "   regions";

/// Minimum name similarity for a fuzzy search hit.
const MIN_SEARCH_SCORE: f64 = 0.7;

/// A fuzzy search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMatch {
    pub region: Arc<Region>,

    /// Similarity in `[0, 1]`; exact id, abbreviation or slug matches score 1.
    pub score: f64,
}

/// An indexed, read-only collection of regions.
///
/// Built once from an ordered list. When ids or slugs repeat, the first occurrence is the one that
/// gets indexed.
#[derive(Debug, Clone, Default)]
pub struct RegionDb {
    regions: Vec<Arc<Region>>,
    by_id: HashMap<Arc<str>, usize>,
    by_slug: HashMap<String, usize>,
}

impl RegionDb {
    #[must_use]
    pub fn new(regions: impl IntoIterator<Item = Region>) -> Self {
        Self::from_shared(regions.into_iter().map(Arc::new))
    }

    /// Build from regions that are already shared elsewhere.
    #[must_use]
    pub fn from_shared(regions: impl IntoIterator<Item = Arc<Region>>) -> Self {
        let regions: Vec<_> = regions.into_iter().collect();
        let mut by_id = HashMap::with_capacity(regions.len());
        let mut by_slug = HashMap::with_capacity(regions.len());

        for (index, region) in regions.iter().enumerate() {
            let _ = by_id.entry(region.region_id_arc()).or_insert(index);
            let _ = by_slug.entry(region.slug().to_string()).or_insert(index);
        }

        Self { regions, by_id, by_slug }
    }

    /// Build from dataset records, deriving slugs where a record has none.
    ///
    /// A derived slug of a region with a parent gets the parent's abbreviation appended, so
    /// "Kings County" under "NY" becomes `kings-county-ny`.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = RegionRecord>) -> Self {
        let records: Vec<_> = records.into_iter().collect();

        let mut abbreviations: HashMap<&str, &str> = HashMap::with_capacity(records.len());
        for record in &records {
            let abbreviation = non_empty(record.abbreviation.as_deref()).unwrap_or(record.id.as_str());
            let _ = abbreviations.entry(record.id.as_str()).or_insert(abbreviation);
        }

        let regions: Vec<_> = records
            .iter()
            .map(|record| {
                let slug = non_empty(record.slug.as_deref()).map_or_else(
                    || {
                        let base = slugify(&record.full_name);
                        match non_empty(record.parent_id.as_deref()).and_then(|p| abbreviations.get(p)) {
                            Some(parent_abbreviation) => format!("{base}-{}", slugify(parent_abbreviation)),
                            None => base,
                        }
                    },
                    str::to_string,
                );

                let mut region = Region::new(&record.id, record.full_name.clone()).with_slug(slug);
                if let Some(short_name) = non_empty(record.short_name.as_deref()) {
                    region = region.with_short_name(short_name);
                }
                if let Some(abbreviation) = non_empty(record.abbreviation.as_deref()) {
                    region = region.with_abbreviation(abbreviation);
                }
                if let Some(parent) = non_empty(record.parent_id.as_deref()) {
                    region = region.with_parent(parent);
                }
                if let Some(population) = record.population {
                    region = region.with_population(population);
                }
                region
            })
            .collect();

        Self::new(regions)
    }

    /// Load a region dataset from a CSV (with a header row) or JSON array file.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).into_app_err_with(|| format!("opening region dataset '{path}'"))?;
        let reader = BufReader::new(file);

        let db = match path.extension() {
            Some("csv") => Self::from_csv(reader),
            Some("json") => Self::from_json(reader),
            _ => bail!("unsupported region dataset format '{path}' (expected .csv or .json)"),
        }
        .map_err(|e| e.enrich_with(|| format!("loading region dataset '{path}'")))?;

        log::info!(target: LOG_TARGET, "Loaded {} regions from '{path}'", db.len());
        Ok(db)
    }

    /// Read dataset records from CSV with a header row.
    pub fn from_csv(reader: impl Read) -> Result<Self> {
        let records = csv::Reader::from_reader(reader)
            .deserialize::<RegionRecord>()
            .collect::<core::result::Result<Vec<_>, _>>()
            .into_app_err("parsing CSV region records")?;
        Ok(Self::from_records(records))
    }

    /// Read dataset records from a JSON array.
    pub fn from_json(reader: impl Read) -> Result<Self> {
        let records: Vec<RegionRecord> = serde_json::from_reader(reader).into_app_err("parsing JSON region records")?;
        Ok(Self::from_records(records))
    }

    /// Look up a region by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RegionNotFound`] if no region has this id.
    pub fn find_by_region_id_strict(&self, region_id: &str) -> core::result::Result<Arc<Region>, CatalogError> {
        self.find_by_region_id(region_id).ok_or_else(|| CatalogError::RegionNotFound {
            id: region_id.to_string(),
        })
    }

    #[must_use]
    pub fn find_by_region_id(&self, region_id: &str) -> Option<Arc<Region>> {
        self.by_id.get(region_id).map(|&index| Arc::clone(&self.regions[index]))
    }

    #[must_use]
    pub fn find_by_slug(&self, slug: &str) -> Option<Arc<Region>> {
        self.by_slug.get(slug).map(|&index| Arc::clone(&self.regions[index]))
    }

    #[must_use]
    pub fn parent_of(&self, region: &Region) -> Option<Arc<Region>> {
        region.parent().and_then(|parent| self.find_by_region_id(parent))
    }

    /// The chain of enclosing regions, nearest first.
    ///
    /// Stops at a region whose parent is missing from the database or at the first repeated region.
    #[must_use]
    pub fn ancestors(&self, region: &Region) -> Vec<Arc<Region>> {
        let mut seen: HashSet<&str> = HashSet::new();
        let _ = seen.insert(region.region_id());

        let mut chain = Vec::new();
        let mut current = self.parent_of(region);
        while let Some(parent) = current {
            if !seen.insert(self.interned_id(&parent)) {
                break;
            }
            current = self.parent_of(&parent);
            chain.push(parent);
        }

        chain
    }

    /// The regions whose parent is `region`, in dataset order.
    #[must_use]
    pub fn children_of(&self, region: &Region) -> Vec<Arc<Region>> {
        self.regions
            .iter()
            .filter(|r| r.parent() == Some(region.region_id()))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Region>> {
        self.regions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Fuzzy lookup by id, abbreviation, slug or name, best matches first.
    ///
    /// Exact (case-insensitive) id, abbreviation or slug matches score 1. Other regions are scored
    /// by normalized Damerau-Levenshtein similarity of the query against their names and kept when
    /// the score reaches 0.7. Ties are ordered by population, largest first, then by id.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<RegionMatch> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let query_slug = slugify(&query);
        let mut matches: Vec<_> = self
            .regions
            .iter()
            .filter_map(|region| {
                let exact = region.region_id().to_lowercase() == query
                    || region.abbreviation().to_lowercase() == query
                    || region.slug() == query_slug;

                let score = if exact {
                    1.0
                } else {
                    normalized_damerau_levenshtein(&query, &region.full_name().to_lowercase())
                        .max(normalized_damerau_levenshtein(&query, &region.short_name().to_lowercase()))
                };

                (score >= MIN_SEARCH_SCORE).then(|| RegionMatch {
                    region: Arc::clone(region),
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.region.population().cmp(&a.region.population()))
                .then_with(|| a.region.region_id().cmp(b.region.region_id()))
        });
        matches.truncate(limit);
        matches
    }

    /// Resolve user input to a region: by id, then by slug, then by the best fuzzy match.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RegionNotFound`] if nothing matches.
    pub fn resolve(&self, query: &str) -> core::result::Result<Arc<Region>, CatalogError> {
        if let Some(region) = self.find_by_region_id(query).or_else(|| self.find_by_slug(query)) {
            return Ok(region);
        }

        self.search(query, 1)
            .into_iter()
            .next()
            .map(|m| m.region)
            .ok_or_else(|| CatalogError::RegionNotFound { id: query.to_string() })
    }

    fn interned_id(&self, region: &Region) -> &str {
        self.by_id.get_key_value(region.region_id()).map_or("", |(id, _)| id)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_from_csv_reader() {
        let db = RegionDb::from_csv("id,full_name,abbreviation,parent_id\nUS,United States,,\n36,New York,NY,US\n".as_bytes()).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.find_by_slug("new-york-us").unwrap().abbreviation(), "NY");
        assert!(RegionDb::from_csv("id,full_name,bogus\nUS,United States,1\n".as_bytes()).is_err());
    }

    fn sample() -> RegionDb {
        RegionDb::from_records(vec![
            RegionRecord::new("US", "United States").with_population(331_000_000),
            RegionRecord::new("36", "New York").with_parent("US").with_abbreviation("NY").with_population(19_000_000),
            RegionRecord::new("36047", "Kings County").with_parent("36").with_population(2_500_000),
            RegionRecord::new("36061", "New York County").with_parent("36").with_population(1_600_000),
            RegionRecord::new("06", "California").with_parent("US").with_abbreviation("CA").with_population(39_000_000),
        ])
    }

    #[test]
    fn test_strict_and_lenient_lookup() {
        let db = sample();

        assert_eq!(db.find_by_region_id("36").unwrap().full_name(), "New York");
        assert!(db.find_by_region_id("99").is_none());

        let err = db.find_by_region_id_strict("99").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_strict_lookup_of_country() {
        let db = sample();

        let us = db.find_by_region_id_strict("US").unwrap();
        assert_eq!(us.full_name(), "United States");
        assert!(Arc::ptr_eq(&us, &db.find_by_region_id("US").unwrap()));

        let err = db.find_by_region_id_strict("ZZ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, CatalogError::RegionNotFound { ref id } if id == "ZZ"));
    }

    #[test]
    fn test_lookup_returns_shared_instance() {
        let db = sample();
        let a = db.find_by_region_id("36047").unwrap();
        let b = db.find_by_slug("kings-county-ny").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_derived_slugs() {
        let db = sample();
        assert_eq!(db.find_by_region_id("US").unwrap().slug(), "united-states");
        assert_eq!(db.find_by_region_id("36").unwrap().slug(), "new-york-us");
        assert_eq!(db.find_by_region_id("36047").unwrap().slug(), "kings-county-ny");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let db = RegionDb::new(vec![
            Region::new("A", "First").with_slug("same"),
            Region::new("A", "Second").with_slug("other"),
            Region::new("B", "Third").with_slug("same"),
        ]);

        assert_eq!(db.len(), 3);
        assert_eq!(db.find_by_region_id("A").unwrap().full_name(), "First");
        assert_eq!(db.find_by_slug("same").unwrap().full_name(), "First");
        assert_eq!(db.find_by_slug("other").unwrap().full_name(), "Second");
    }

    #[test]
    fn test_hierarchy() {
        let db = sample();
        let kings = db.find_by_region_id("36047").unwrap();

        assert_eq!(db.parent_of(&kings).unwrap().region_id(), "36");
        assert_eq!(
            db.ancestors(&kings).iter().map(|r| r.region_id()).collect::<Vec<_>>(),
            vec!["36", "US"]
        );

        let ny = db.find_by_region_id("36").unwrap();
        assert_eq!(
            db.children_of(&ny).iter().map(|r| r.region_id()).collect::<Vec<_>>(),
            vec!["36047", "36061"]
        );

        let us = db.find_by_region_id("US").unwrap();
        assert!(db.parent_of(&us).is_none());
        assert!(db.ancestors(&us).is_empty());
    }

    #[test]
    fn test_ancestors_stop_on_cycle_and_missing_parent() {
        let db = RegionDb::new(vec![
            Region::new("A", "Alpha").with_parent("B"),
            Region::new("B", "Beta").with_parent("A"),
            Region::new("C", "Gamma").with_parent("missing"),
        ]);

        let a = db.find_by_region_id("A").unwrap();
        assert_eq!(db.ancestors(&a).iter().map(|r| r.region_id()).collect::<Vec<_>>(), vec!["B"]);

        let c = db.find_by_region_id("C").unwrap();
        assert!(db.ancestors(&c).is_empty());
    }

    #[test]
    fn test_search() {
        let db = sample();

        let hits = db.search("ny", 5);
        assert_eq!(hits[0].region.region_id(), "36");
        assert!((hits[0].score - 1.0).abs() < f64::EPSILON);

        let hits = db.search("californa", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].region.region_id(), "06");
        assert!(hits[0].score >= MIN_SEARCH_SCORE && hits[0].score < 1.0);

        assert!(db.search("zzzzzz", 5).is_empty());
        assert!(db.search("  ", 5).is_empty());
        assert!(db.search("new york", 0).is_empty());
    }

    #[test]
    fn test_search_orders_ties_by_population() {
        let db = RegionDb::new(vec![
            Region::new("small", "Springfield").with_population(10),
            Region::new("big", "Springfield").with_population(1000),
            Region::new("unknown", "Springfield"),
        ]);

        let ids: Vec<_> = db.search("Springfield", 10).into_iter().map(|m| m.region.region_id().to_string()).collect();
        assert_eq!(ids, vec!["big", "small", "unknown"]);
    }

    #[test]
    fn test_resolve() {
        let db = sample();
        assert_eq!(db.resolve("36047").unwrap().region_id(), "36047");
        assert_eq!(db.resolve("kings-county-ny").unwrap().region_id(), "36047");
        assert_eq!(db.resolve("Kings Cunty").unwrap().region_id(), "36047");
        assert!(db.resolve("Atlantis").is_err());
    }

    #[test]
    fn test_load_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("regions.csv");
        let mut file = File::create(&csv_path).unwrap();
        writeln!(file, "id,full_name,short_name,abbreviation,parent_id,population,slug").unwrap();
        writeln!(file, "US,United States,USA,US,,331000000,").unwrap();
        writeln!(file, "36,New York,,NY,US,,").unwrap();
        drop(file);

        let db = RegionDb::load(Utf8Path::from_path(&csv_path).unwrap()).unwrap();
        assert_eq!(db.len(), 2);
        let us = db.find_by_region_id("US").unwrap();
        assert_eq!(us.short_name(), "USA");
        assert_eq!(us.population(), Some(331_000_000));
        assert_eq!(db.find_by_region_id("36").unwrap().parent(), Some("US"));

        let json_path = dir.path().join("regions.json");
        std::fs::write(&json_path, r#"[{"id":"FR","full_name":"France","slug":"fr"}]"#).unwrap();
        let db = RegionDb::load(Utf8Path::from_path(&json_path).unwrap()).unwrap();
        assert_eq!(db.find_by_slug("fr").unwrap().region_id(), "FR");

        let txt_path = dir.path().join("regions.txt");
        std::fs::write(&txt_path, "").unwrap();
        assert!(RegionDb::load(Utf8Path::from_path(&txt_path).unwrap()).is_err());
    }
}
