use super::MetricDataProvider;
use crate::Result;
use crate::data::{MetricData, Timeseries, TimeseriesPoint};
use crate::metrics::{Metric, MetricValue};
use crate::regions::Region;
use async_trait::async_trait;
use camino::Utf8Path;
use chrono::NaiveDate;
use ohno::IntoAppError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

const LOG_TARGET: &str = "    static";

type Series = BTreeMap<NaiveDate, Option<MetricValue>>;

/// Serves values from an in-memory table keyed by region id and metric id.
///
/// A pair with no rows yields data with neither a value nor a history.
#[derive(Debug, Clone, Default)]
pub struct StaticTableProvider {
    table: HashMap<(String, String), Series>,
}

#[derive(Debug, Deserialize)]
struct Row {
    region_id: String,
    metric_id: String,
    date: NaiveDate,
    #[serde(default)]
    value: Option<String>,
}

impl StaticTableProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a CSV file with the header `region_id,metric_id,date,value`.
    ///
    /// Numeric cells become numbers, other non-empty cells text, empty cells gaps.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).into_app_err_with(|| format!("opening value table '{path}'"))?;

        let mut provider = Self::new();
        let mut rows = 0_usize;
        for row in csv::Reader::from_reader(BufReader::new(file)).deserialize::<Row>() {
            let row = row.into_app_err_with(|| format!("parsing value table '{path}'"))?;
            let value = row.value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(MetricValue::parse_lenient);
            provider.insert(row.region_id, row.metric_id, row.date, value);
            rows += 1;
        }

        log::info!(target: LOG_TARGET, "Loaded {rows} rows for {} series from '{path}'", provider.table.len());
        Ok(provider)
    }

    /// Set the value of a pair at a date, replacing any earlier value for that date.
    pub fn insert(&mut self, region_id: impl Into<String>, metric_id: impl Into<String>, date: NaiveDate, value: Option<MetricValue>) {
        let _ = self
            .table
            .entry((region_id.into(), metric_id.into()))
            .or_default()
            .insert(date, value);
    }

    #[must_use]
    pub fn with_value(mut self, region_id: impl Into<String>, metric_id: impl Into<String>, date: NaiveDate, value: impl Into<MetricValue>) -> Self {
        self.insert(region_id, metric_id, date, Some(value.into()));
        self
    }

    /// Number of (region, metric) pairs with at least one row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn series(&self, region_id: &str, metric_id: &str) -> Option<&Series> {
        self.table.get(&(region_id.to_string(), metric_id.to_string()))
    }
}

#[async_trait]
impl MetricDataProvider for StaticTableProvider {
    async fn fetch_data_for_region_and_metric(&self, region: &Arc<Region>, metric: &Arc<Metric>) -> Result<MetricData> {
        let Some(series) = self.series(region.region_id(), metric.id()) else {
            log::debug!(target: LOG_TARGET, "No rows for '{}' in '{}'", metric.id(), region.region_id());
            return Ok(MetricData::empty(Arc::clone(metric), Arc::clone(region)));
        };

        // BTreeMap iteration is already in date order.
        let points: Vec<_> = series.iter().map(|(date, value)| TimeseriesPoint::new(*date, value.clone())).collect();
        let timeseries = Timeseries::new(points).into_app_err("building timeseries from value table")?;

        Ok(MetricData::from_timeseries(Arc::clone(metric), Arc::clone(region), timeseries))
    }
}
