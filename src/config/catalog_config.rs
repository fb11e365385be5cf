use super::provider_config::{ProviderConfig, resolve};
use crate::Result;
use crate::catalog::MetricCatalog;
use crate::metrics::{Color, Metric, MetricDefinition, MetricKind, MetricValue, ThresholdOrder};
use crate::regions::RegionDb;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;

const LOG_TARGET: &str = "    config";

/// The default configuration, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// The built-in region dataset used when no `regions` file is configured
pub const DEFAULT_REGIONS_CSV: &str = include_str!("../../default_regions.csv");

/// File names searched for, in order, when no configuration path is given.
pub const CONFIG_FILE_NAMES: [&str; 4] = ["catalog.toml", "catalog.yml", "catalog.yaml", "catalog.json"];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Color returned for regions without a value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_color: Option<Color>,

    /// Region dataset, CSV or JSON [default: the built-in dataset]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Utf8PathBuf>,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: Utf8PathBuf,
}

impl Config {
    /// The embedded default configuration, rooted at `base_dir`.
    pub fn default_config(base_dir: &Utf8Path) -> Result<Self> {
        let mut config: Self = toml::from_str(DEFAULT_CONFIG_TOML).into_app_err("parsing the built-in default configuration")?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `base_dir` is searched for one of [`CONFIG_FILE_NAMES`] and the
    /// default configuration is used when none exists. Returns the configuration together with
    /// the warnings produced by [`Self::validate`].
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8Path>) -> Result<(Self, Vec<String>)> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration from {path}"))?;
            (path.to_path_buf(), text)
        } else {
            let mut found = None;
            for name in CONFIG_FILE_NAMES {
                let path = base_dir.join(name);
                match fs::read_to_string(&path) {
                    Ok(text) => {
                        found = Some((path, text));
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration from {path}")),
                }
            }

            let Some(result) = found else {
                log::info!(target: LOG_TARGET, "No configuration file in '{base_dir}', using the default configuration");
                let config = Self::default_config(base_dir)?;
                let warnings = config.validate();
                return Ok((config, warnings));
            };
            result
        };

        let mut config = Self::parse(&final_path, &text)?;
        config.base_dir = final_path.parent().map(Utf8Path::to_path_buf).unwrap_or_default();

        log::info!(
            target: LOG_TARGET,
            "Loaded {} provider(s) and {} metric(s) from '{final_path}'",
            config.providers.len(),
            config.metrics.len()
        );

        let warnings = config.validate();
        Ok((config, warnings))
    }

    fn parse(path: &Utf8Path, text: &str) -> Result<Self> {
        let extension = path.extension().unwrap_or_default();
        let config = match extension {
            "toml" => toml::from_str(text).into_app_err_with(|| format!("parsing TOML configuration from {path}"))?,
            "yml" | "yaml" => serde_yaml::from_str(text).into_app_err_with(|| format!("parsing YAML configuration from {path}"))?,
            "json" => serde_json::from_str(text).into_app_err_with(|| format!("parsing JSON configuration from {path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };
        Ok(config)
    }

    /// Save configuration to a file, in the format implied by its extension
    pub fn save(&self, output_path: &Utf8Path) -> Result<()> {
        let extension = output_path.extension().unwrap_or_default();
        let text = match extension {
            "toml" => toml::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to TOML for saving to {output_path}"))?,
            "yml" | "yaml" => serde_yaml::to_string(self)
                .into_app_err_with(|| format!("serializing configuration to YAML for saving to {output_path}"))?,
            "json" => serde_json::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to JSON for saving to {output_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        fs::write(output_path, text).into_app_err_with(|| format!("writing configuration to {output_path}"))?;
        Ok(())
    }

    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Resolve a path from the configuration against its base directory.
    #[must_use]
    pub fn resolve_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        resolve(&self.base_dir, path)
    }

    /// Instantiate every provider and register every metric.
    pub fn build_catalog(&self) -> Result<MetricCatalog> {
        let mut builder = MetricCatalog::builder().metrics(self.metrics.iter().cloned());
        for provider in &self.providers {
            builder = builder.shared_provider(provider.id(), provider.build(&self.base_dir)?);
        }
        if let Some(color) = self.placeholder_color {
            builder = builder.placeholder_color(color);
        }

        builder.build().into_app_err("building the metric catalog")
    }

    /// Load the region dataset: `path` if given, else the configured file, else the built-in one.
    pub fn load_regions(&self, path: Option<&Utf8Path>) -> Result<RegionDb> {
        if let Some(path) = path {
            return RegionDb::load(path);
        }

        match &self.regions {
            Some(path) => RegionDb::load(self.resolve_path(path)),
            None => RegionDb::from_csv(DEFAULT_REGIONS_CSV.as_bytes()),
        }
    }

    /// Detect definitions that cannot work or are likely mistakes.
    ///
    /// Problems that make [`Self::build_catalog`] fail are reported here as well, so that a
    /// configuration can be checked without instantiating its providers.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut provider_ids = HashSet::new();
        for provider in &self.providers {
            if !provider_ids.insert(provider.id()) {
                warnings.push(format!("Provider '{}' is defined more than once", provider.id()));
            }
        }

        let mut used = HashSet::new();
        let mut metric_ids = HashSet::new();
        for def in &self.metrics {
            let _ = used.insert(def.provider.as_str());

            if !metric_ids.insert(def.id.as_str()) {
                warnings.push(format!("Metric '{}' is defined more than once", def.id));
            }
            if !provider_ids.contains(def.provider.as_str()) {
                warnings.push(format!("Metric '{}' uses the undefined provider '{}'", def.id, def.provider));
            }
            if def.categories.is_empty() {
                warnings.push(format!("Metric '{}' has no categories, none of its values can be colored", def.id));
            }

            match Metric::new(def.clone()) {
                Ok(metric) => Self::validate_metric(&metric, &mut warnings),
                Err(e) => warnings.push(format!("Metric '{}' is invalid: {e}", def.id)),
            }
        }

        for provider in &self.providers {
            if !used.contains(provider.id()) {
                warnings.push(format!("Provider '{}' is not used by any metric", provider.id()));
            }
        }

        warnings
    }

    fn validate_metric(metric: &Metric, warnings: &mut Vec<String>) {
        if metric.kind() != MetricKind::Numeric || metric.categories().is_empty() || metric.has_catch_all() {
            return;
        }

        if let Some(last) = metric.thresholds().last() {
            let side = match metric.threshold_order() {
                ThresholdOrder::Ascending => "above",
                ThresholdOrder::Descending => "below",
            };
            warnings.push(format!(
                "Metric '{}' has no open-ended category, values {side} {} have no color",
                metric.id(),
                metric.format_value(&MetricValue::Number(last))
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricCategory;

    fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, path)
    }

    fn mock(id: &str) -> ProviderConfig {
        ProviderConfig::Mock {
            id: id.into(),
            seed: 1,
            points: 5,
            end_date: None,
            delay_ms: 0,
        }
    }

    fn config(providers: Vec<ProviderConfig>, metrics: Vec<MetricDefinition>) -> Config {
        Config {
            placeholder_color: None,
            regions: None,
            providers,
            metrics,
            base_dir: Utf8PathBuf::new(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config(Utf8Path::new(".")).unwrap();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.placeholder_color, Some(Color::PLACEHOLDER));

        let catalog = config.build_catalog().unwrap();
        assert_eq!(catalog.metrics().count(), config.metrics.len());
    }

    #[test]
    fn test_default_regions_load() {
        let config = Config::default_config(Utf8Path::new(".")).unwrap();
        let db = config.load_regions(None).unwrap();
        assert!(db.find_by_region_id("US").is_some());
        assert_eq!(db.find_by_slug("kings-county-ny").unwrap().region_id(), "36047");
    }

    #[test]
    fn test_load_without_file_uses_default() {
        let (_tmp, dir) = utf8_tempdir();
        let (config, warnings) = Config::load(&dir, None).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.base_dir(), dir);
        assert!(!config.metrics.is_empty());
    }

    #[test]
    fn test_load_searches_candidates() {
        let (_tmp, dir) = utf8_tempdir();
        fs::write(dir.join("catalog.yaml"), "providers:\n  - id: m\n    kind: mock\n").unwrap();

        let (config, warnings) = Config::load(&dir, None).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert!(config.metrics.is_empty());
        assert_eq!(warnings, vec!["Provider 'm' is not used by any metric".to_string()]);
    }

    #[test]
    fn test_load_explicit_path_sets_base_dir() {
        let (_tmp, dir) = utf8_tempdir();
        fs::create_dir(dir.join("conf")).unwrap();
        let path = dir.join("conf").join("mine.json");
        fs::write(&path, r#"{"regions": "regions.csv"}"#).unwrap();

        let (config, _) = Config::load(Utf8Path::new("."), Some(&path)).unwrap();
        assert_eq!(config.resolve_path(Utf8Path::new("regions.csv")), dir.join("conf").join("regions.csv"));
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let (_tmp, dir) = utf8_tempdir();
        let path = dir.join("catalog.toml");
        fs::write(&path, "colour = \"#000000\"\n").unwrap();
        assert!(Config::load(&dir, Some(&path)).is_err());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let (_tmp, dir) = utf8_tempdir();
        let path = dir.join("catalog.ini");
        fs::write(&path, "").unwrap();
        let err = Config::load(&dir, Some(&path)).unwrap_err();
        assert!(err.to_string().contains("unsupported configuration file extension"));
    }

    #[test]
    fn test_save_and_reload_each_format() {
        let (_tmp, dir) = utf8_tempdir();
        let original = Config::default_config(&dir).unwrap();

        for name in ["out.toml", "out.yaml", "out.json"] {
            let path = dir.join(name);
            original.save(&path).unwrap();
            let (loaded, _) = Config::load(&dir, Some(&path)).unwrap();
            assert_eq!(loaded, original, "{name}");
        }
    }

    #[test]
    fn test_validate_reports_problems() {
        let metrics = vec![
            MetricDefinition::new("bare", "Bare", MetricKind::Numeric, "mock"),
            MetricDefinition::new("lost", "Lost", MetricKind::Numeric, "nowhere")
                .with_categories(vec![MetricCategory::catch_all("Any", Color::default())]),
            MetricDefinition::new("capped", "Capped", MetricKind::Numeric, "mock").with_categories(vec![
                MetricCategory::threshold("Low", Color::default(), 10.0),
                MetricCategory::threshold("High", Color::default(), 50.0),
            ]),
            MetricDefinition::new("bad", "Bad", MetricKind::Numeric, "mock").with_categories(vec![
                MetricCategory::catch_all("Any", Color::default()),
                MetricCategory::threshold("Low", Color::default(), 10.0),
            ]),
        ];
        let warnings = config(vec![mock("mock"), mock("spare")], metrics).validate();

        assert!(warnings.iter().any(|w| w.contains("'bare' has no categories")));
        assert!(warnings.iter().any(|w| w.contains("undefined provider 'nowhere'")));
        assert!(warnings.iter().any(|w| w.contains("'capped' has no open-ended category, values above 50")));
        assert!(warnings.iter().any(|w| w.starts_with("Metric 'bad' is invalid")));
        assert!(warnings.iter().any(|w| w == "Provider 'spare' is not used by any metric"));
    }

    #[test]
    fn test_build_catalog_fails_on_unknown_provider() {
        let metrics = vec![MetricDefinition::new("m", "M", MetricKind::Numeric, "nowhere")];
        let err = config(vec![mock("mock")], metrics).build_catalog().unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_load_regions_from_configured_file() {
        let (_tmp, dir) = utf8_tempdir();
        fs::write(dir.join("regions.csv"), "id,full_name\nX,Xanadu\n").unwrap();

        let mut config = config(Vec::new(), Vec::new());
        config.regions = Some("regions.csv".into());
        config.base_dir = dir;

        let db = config.load_regions(None).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.find_by_region_id("X").unwrap().full_name(), "Xanadu");
    }
}
