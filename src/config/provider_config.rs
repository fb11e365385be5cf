use crate::Result;
use crate::providers::{DiskCache, MetricDataProvider, MockProvider, RemoteProvider, StaticTableProvider, sanitize_path_component};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use core::time::Duration;
use directories::BaseDirs;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

const LOG_TARGET: &str = "    config";

const fn default_points() -> u32 {
    30
}

const fn default_cache_ttl_hours() -> u64 {
    24
}

#[expect(clippy::trivially_copy_pass_by_ref, reason = "Signature required by serde's skip_serializing_if")]
const fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// A data provider entry of the configuration, selected by its `kind` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Deterministic synthetic data.
    Mock {
        id: String,

        #[serde(default)]
        seed: u64,

        /// Number of daily points per series
        #[serde(default = "default_points")]
        points: u32,

        /// Last date of every series [default: today]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_date: Option<NaiveDate>,

        /// Artificial latency added to every fetch
        #[serde(default, skip_serializing_if = "is_zero")]
        delay_ms: u64,
    },

    /// Values read from a CSV file with the columns `region_id,metric_id,date,value`.
    Static { id: String, path: Utf8PathBuf },

    /// JSON documents served at `{base_url}/{region_id}/{metric_id}.json`.
    Remote {
        id: String,
        base_url: Url,

        /// Directory for cached responses [default: the platform cache directory]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_dir: Option<Utf8PathBuf>,

        /// Hours a cached response stays fresh, 0 disables the cache
        #[serde(default = "default_cache_ttl_hours")]
        cache_ttl_hours: u64,
    },
}

impl ProviderConfig {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Mock { id, .. } | Self::Static { id, .. } | Self::Remote { id, .. } => id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Mock { .. } => "mock",
            Self::Static { .. } => "static",
            Self::Remote { .. } => "remote",
        }
    }

    /// Instantiate the provider. Relative paths are resolved against `base_dir`.
    pub fn build(&self, base_dir: &Utf8Path) -> Result<Arc<dyn MetricDataProvider>> {
        log::debug!(target: LOG_TARGET, "Creating {} provider '{}'", self.kind(), self.id());

        match self {
            Self::Mock {
                seed,
                points,
                end_date,
                delay_ms,
                ..
            } => {
                let mut provider = MockProvider::new(*seed).with_points(*points).with_delay(Duration::from_millis(*delay_ms));
                if let Some(end_date) = end_date {
                    provider = provider.with_end_date(*end_date);
                }
                Ok(Arc::new(provider))
            }

            Self::Static { path, .. } => Ok(Arc::new(StaticTableProvider::load(resolve(base_dir, path))?)),

            Self::Remote {
                id,
                base_url,
                cache_dir,
                cache_ttl_hours,
            } => {
                let mut provider = RemoteProvider::new(base_url.clone())?;
                if *cache_ttl_hours > 0 {
                    let dir = match cache_dir {
                        Some(dir) => resolve(base_dir, dir),
                        None => default_cache_dir()?,
                    };
                    let ttl = Duration::from_secs(cache_ttl_hours.saturating_mul(60 * 60));
                    provider = provider.with_cache(DiskCache::new(dir.join(sanitize_path_component(id)), ttl));
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

/// Join `path` onto `base_dir` unless it is absolute.
pub(crate) fn resolve(base_dir: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
}

fn default_cache_dir() -> Result<Utf8PathBuf> {
    let dir = BaseDirs::new()
        .into_app_err("unable to determine the cache directory")?
        .cache_dir()
        .join("metric-catalog");

    Utf8PathBuf::try_from(dir).into_app_err("the cache directory is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mock_with_defaults() {
        let config: ProviderConfig = toml::from_str("id = \"m\"\nkind = \"mock\"\n").unwrap();
        assert_eq!(
            config,
            ProviderConfig::Mock {
                id: "m".into(),
                seed: 0,
                points: 30,
                end_date: None,
                delay_ms: 0,
            }
        );
        assert_eq!(config.id(), "m");
        assert_eq!(config.kind(), "mock");
    }

    #[test]
    fn test_parse_remote() {
        let config: ProviderConfig =
            toml::from_str("id = \"api\"\nkind = \"remote\"\nbase_url = \"https://example.org/data\"\n").unwrap();
        let ProviderConfig::Remote {
            base_url, cache_ttl_hours, ..
        } = &config
        else {
            panic!("expected a remote provider");
        };
        assert_eq!(base_url.as_str(), "https://example.org/data");
        assert_eq!(*cache_ttl_hours, 24);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = toml::from_str::<ProviderConfig>("id = \"x\"\nkind = \"carrier-pigeon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve() {
        let base = Utf8Path::new("/etc/catalog");
        assert_eq!(resolve(base, Utf8Path::new("values.csv")), Utf8PathBuf::from("/etc/catalog/values.csv"));
        assert_eq!(resolve(base, Utf8Path::new("/data/values.csv")), Utf8PathBuf::from("/data/values.csv"));
    }

    #[test]
    fn test_build_static_resolves_relative_path() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        std::fs::write(base.join("values.csv"), "region_id,metric_id,date,value\nUS,cases,2024-01-01,3\n").unwrap();

        let config = ProviderConfig::Static {
            id: "archive".into(),
            path: "values.csv".into(),
        };
        let _provider = config.build(&base).unwrap();

        let missing = ProviderConfig::Static {
            id: "archive".into(),
            path: "nope.csv".into(),
        };
        assert!(missing.build(&base).is_err());
    }

    #[test]
    fn test_build_remote_without_cache() {
        let config = ProviderConfig::Remote {
            id: "api".into(),
            base_url: Url::parse("https://example.org/data").unwrap(),
            cache_dir: None,
            cache_ttl_hours: 0,
        };
        let _provider = config.build(Utf8Path::new(".")).unwrap();
    }
}
