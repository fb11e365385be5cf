use super::disk_cache::{Cached, DiskCache};
use super::MetricDataProvider;
use crate::Result;
use crate::data::{MetricData, Timeseries, TimeseriesPoint};
use crate::metrics::{Metric, MetricValue};
use crate::regions::Region;
use async_trait::async_trait;
use ohno::{EnrichableExt, IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

const LOG_TARGET: &str = "    remote";

/// The JSON document served for one (region, metric) pair.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RemoteResponse {
    /// Current value. When absent it is taken from the last point of `timeseries`.
    #[serde(default)]
    pub current: Option<MetricValue>,

    #[serde(default)]
    pub timeseries: Vec<TimeseriesPoint<MetricValue>>,
}

/// Fetches `{base_url}/{region_id}/{metric_id}.json` over HTTP.
///
/// A 404 means the source has nothing for the pair and yields data without a value. Any other
/// unsuccessful status, a transport error or a malformed body is a fetch failure.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: Url,
    cache: Option<DiskCache>,
}

impl RemoteProvider {
    pub fn new(base_url: Url) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(app_err!("'{base_url}' cannot be used as a base URL"));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("metric-catalog/", env!("CARGO_PKG_VERSION")))
            .build()
            .into_app_err("creating HTTP client")?;

        Ok(Self {
            client,
            base_url,
            cache: None,
        })
    }

    /// Serve responses from `cache` while fresh and store new ones in it.
    #[must_use]
    pub fn with_cache(mut self, cache: DiskCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The document URL of a pair. Ids are percent-encoded as path segments.
    pub fn url_for(&self, region_id: &str, metric_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        let _ = url
            .path_segments_mut()
            .map_err(|()| app_err!("'{}' cannot be used as a base URL", self.base_url))?
            .pop_if_empty()
            .push(region_id)
            .push(&format!("{metric_id}.json"));
        Ok(url)
    }

    /// Fetch the document of a pair, or `None` on 404.
    async fn fetch_response(&self, region_id: &str, metric_id: &str) -> Result<Option<RemoteResponse>> {
        if let Some(cache) = &self.cache {
            match cache.load::<RemoteResponse>(region_id, metric_id) {
                Cached::Hit(response) => return Ok(Some(response)),
                Cached::Missing => return Ok(None),
                Cached::Miss => {}
            }
        }

        let url = self.url_for(region_id, metric_id)?;
        log::info!(target: LOG_TARGET, "Querying '{url}'");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .into_app_err_with(|| format!("sending HTTP request to '{url}'"))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            log::debug!(target: LOG_TARGET, "No data at '{url}'");
            if let Some(cache) = &self.cache
                && let Err(e) = cache.store_missing(region_id, metric_id)
            {
                log::debug!(target: LOG_TARGET, "Could not cache missing entry for '{url}': {e:#}");
            }
            return Ok(None);
        }

        if !status.is_success() {
            return Err(app_err!("unexpected HTTP status {status} from '{url}'"));
        }

        let body: RemoteResponse = response.json().await.into_app_err_with(|| format!("decoding response from '{url}'"))?;

        if let Some(cache) = &self.cache
            && let Err(e) = cache.store(region_id, metric_id, &body)
        {
            log::debug!(target: LOG_TARGET, "Could not cache response from '{url}': {e:#}");
        }

        Ok(Some(body))
    }
}

#[async_trait]
impl MetricDataProvider for RemoteProvider {
    async fn fetch_data_for_region_and_metric(&self, region: &Arc<Region>, metric: &Arc<Metric>) -> Result<MetricData> {
        let Some(response) = self
            .fetch_response(region.region_id(), metric.id())
            .await
            .map_err(|e| e.enrich_with(|| format!("fetching '{}' for region '{}'", metric.id(), region.region_id())))?
        else {
            return Ok(MetricData::empty(Arc::clone(metric), Arc::clone(region)));
        };

        let timeseries = Timeseries::new(response.timeseries)
            .into_app_err_with(|| format!("invalid timeseries for '{}' in region '{}'", metric.id(), region.region_id()))?;

        let data = match response.current {
            Some(current) => MetricData::new(Arc::clone(metric), Arc::clone(region), Some(current), Some(timeseries)),
            None => MetricData::from_timeseries(Arc::clone(metric), Arc::clone(region), timeseries),
        };

        if !data.is_consistent() {
            log::warn!(
                target: LOG_TARGET,
                "Current value of '{}' for '{}' differs from its latest point",
                metric.id(),
                region.region_id()
            );
        }

        Ok(data)
    }
}
