use super::MetricDataProvider;
use crate::Result;
use crate::data::{MetricData, Timeseries, TimeseriesPoint};
use crate::metrics::{Metric, MetricKind, MetricValue, ThresholdOrder};
use crate::regions::Region;
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use core::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const LOG_TARGET: &str = "      mock";

/// Number of daily points generated when not configured otherwise.
pub const DEFAULT_POINTS: u32 = 30;

/// Generates deterministic synthetic data.
///
/// The series for a given seed, region id and metric id is always the same: a daily random walk
/// ending at the configured end date. Numeric values stay within the span of the metric's
/// thresholds, on the side of a lone threshold that maps to a category; categorical values are
/// drawn from the metric's declared category values.
#[derive(Debug, Clone)]
pub struct MockProvider {
    seed: u64,
    points: u32,
    end_date: Option<NaiveDate>,
    delay: Duration,
}

impl MockProvider {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            points: DEFAULT_POINTS,
            end_date: None,
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn with_points(mut self, points: u32) -> Self {
        self.points = points;
        self
    }

    /// Date of the last generated point. Defaults to today.
    #[must_use]
    pub const fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Simulated latency of each fetch.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Generate the series for a pair without any delay.
    #[must_use]
    pub fn generate(&self, region: &Region, metric: &Metric) -> Timeseries<MetricValue> {
        let end = self.end_date.unwrap_or_else(|| Utc::now().date_naive());
        let mut rng = StdRng::seed_from_u64(pair_seed(self.seed, region.region_id(), metric.id()));

        let values: Vec<MetricValue> = match metric.kind() {
            MetricKind::Numeric => numeric_walk(&mut rng, metric, self.points),
            MetricKind::Categorical => categorical_draws(&mut rng, metric, self.points),
        };

        let count = values.len();
        Timeseries::from_unsorted(
            values
                .into_iter()
                .enumerate()
                .filter_map(|(i, value)| {
                    let back = u64::try_from(count - 1 - i).ok()?;
                    end.checked_sub_days(Days::new(back)).map(|date| TimeseriesPoint::new(date, Some(value)))
                })
                .collect::<Vec<_>>(),
        )
    }
}

#[async_trait]
impl MetricDataProvider for MockProvider {
    async fn fetch_data_for_region_and_metric(&self, region: &Arc<Region>, metric: &Arc<Metric>) -> Result<MetricData> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        log::debug!(target: LOG_TARGET, "Generating {} points of '{}' for '{}'", self.points, metric.id(), region.region_id());
        let timeseries = self.generate(region, metric);
        Ok(MetricData::from_timeseries(Arc::clone(metric), Arc::clone(region), timeseries))
    }
}

fn numeric_walk(rng: &mut StdRng, metric: &Metric, points: u32) -> Vec<MetricValue> {
    let (lo, hi) = value_span(metric);
    let max_step = (hi - lo) * 0.1;

    let mut value = rng.random_range(lo..=hi);
    (0..points)
        .map(|_| {
            value = (value + rng.random_range(-max_step..=max_step)).clamp(lo, hi);
            MetricValue::Number(((value * 100.0).round() / 100.0).clamp(lo, hi))
        })
        .collect()
}

fn categorical_draws(rng: &mut StdRng, metric: &Metric, points: u32) -> Vec<MetricValue> {
    let choices: Vec<&str> = metric
        .categories()
        .iter()
        .map(|c| c.value.as_ref().and_then(MetricValue::as_text).unwrap_or(c.label.as_str()))
        .collect();

    if choices.is_empty() {
        return Vec::new();
    }

    (0..points)
        .map(|_| MetricValue::from(choices[rng.random_range(0..choices.len())]))
        .collect()
}

/// The range numeric values are drawn from.
///
/// Without a catch-all category, values past the last bound have no category, so a lone
/// threshold only spans its mappable side.
fn value_span(metric: &Metric) -> (f64, f64) {
    let Some((lo, hi)) = metric.thresholds().fold(None, |span: Option<(f64, f64)>, t| match span {
        Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        None => Some((t, t)),
    }) else {
        return (0.0, 100.0);
    };

    if hi > lo {
        return (lo, hi);
    }

    let half = if lo.abs() < f64::EPSILON { 1.0 } else { lo.abs() * 0.5 };
    if metric.has_catch_all() {
        (lo - half, lo + half)
    } else {
        match metric.threshold_order() {
            ThresholdOrder::Ascending => (lo - half, lo),
            ThresholdOrder::Descending => (lo, lo + half),
        }
    }
}

/// Seed for a pair, from an FNV-1a hash of the provider seed and both ids.
fn pair_seed(seed: u64, region_id: &str, metric_id: &str) -> u64 {
    seed.to_le_bytes()
        .iter()
        .chain(region_id.as_bytes())
        .chain(&[0xff])
        .chain(metric_id.as_bytes())
        .fold(0xcbf2_9ce4_8422_2325, |hash: u64, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Color, MetricCategory, MetricDefinition};

    fn numeric_metric() -> Arc<Metric> {
        Arc::new(
            Metric::new(MetricDefinition::new("cases", "Cases", MetricKind::Numeric, "mock").with_categories(vec![
                MetricCategory::threshold("Low", Color::new(0, 255, 0), 10.0),
                MetricCategory::threshold("Medium", Color::new(255, 255, 0), 50.0),
                MetricCategory::threshold("High", Color::new(255, 0, 0), 100.0),
            ]))
            .unwrap(),
        )
    }

    fn categorical_metric() -> Arc<Metric> {
        Arc::new(
            Metric::new(MetricDefinition::new("level", "Level", MetricKind::Categorical, "mock").with_categories(vec![
                MetricCategory::exact("Open", Color::new(0, 255, 0), "open"),
                MetricCategory::exact("Closed", Color::new(255, 0, 0), "closed"),
            ]))
            .unwrap(),
        )
    }

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn test_numeric_series_is_deterministic_and_in_range() {
        let provider = MockProvider::new(42).with_points(20).with_end_date(end());
        let region = Arc::new(Region::new("US", "United States"));
        let metric = numeric_metric();

        let a = provider.fetch_data_for_region_and_metric(&region, &metric).await.unwrap();
        let b = provider.fetch_data_for_region_and_metric(&region, &metric).await.unwrap();
        assert_eq!(a, b);

        let ts = a.timeseries().unwrap();
        assert_eq!(ts.len(), 20);
        assert_eq!(ts.last().unwrap().date, end());
        assert_eq!(ts.first().unwrap().date, NaiveDate::from_ymd_opt(2024, 2, 11).unwrap());
        for point in ts {
            let n = point.value.as_ref().and_then(MetricValue::as_number).unwrap();
            assert!((10.0..=100.0).contains(&n), "{n} out of range");
            assert!(metric.category_for(point.value.as_ref().unwrap()).is_ok());
        }

        assert!(a.is_consistent());
        assert!(a.has_value());
    }

    #[test]
    fn test_series_differ_by_seed_and_region() {
        let metric = numeric_metric();
        let us = Region::new("US", "United States");
        let fr = Region::new("FR", "France");

        let base = MockProvider::new(1).with_end_date(end());
        let other_seed = MockProvider::new(2).with_end_date(end());

        assert_ne!(base.generate(&us, &metric), other_seed.generate(&us, &metric));
        assert_ne!(base.generate(&us, &metric), base.generate(&fr, &metric));
    }

    #[tokio::test]
    async fn test_categorical_values_come_from_categories() {
        let provider = MockProvider::new(7).with_points(50).with_end_date(end());
        let region = Arc::new(Region::new("US", "United States"));
        let metric = categorical_metric();

        let data = provider.fetch_data_for_region_and_metric(&region, &metric).await.unwrap();
        for point in data.timeseries().unwrap() {
            let text = point.value.as_ref().and_then(MetricValue::as_text).unwrap();
            assert!(text == "open" || text == "closed");
        }
        assert!(data.is_consistent());
    }

    #[tokio::test]
    async fn test_zero_points_yields_no_value() {
        let provider = MockProvider::new(7).with_points(0).with_end_date(end());
        let data = provider
            .fetch_data_for_region_and_metric(&Arc::new(Region::new("US", "United States")), &numeric_metric())
            .await
            .unwrap();

        assert!(!data.has_value());
        assert!(data.timeseries().unwrap().is_empty());
    }

    #[test]
    fn test_value_span_without_bounds() {
        let metric = Metric::new(MetricDefinition::new("x", "X", MetricKind::Numeric, "mock")).unwrap();
        assert_eq!(value_span(&metric), (0.0, 100.0));
    }

    fn single_threshold_metric(catch_all: bool) -> Arc<Metric> {
        let mut categories = vec![MetricCategory::threshold("A", Color::default(), 20.0)];
        if catch_all {
            categories.push(MetricCategory::catch_all("B", Color::default()));
        }
        Arc::new(Metric::new(MetricDefinition::new("x", "X", MetricKind::Numeric, "mock").with_categories(categories)).unwrap())
    }

    #[test]
    fn test_value_span_single_threshold() {
        assert_eq!(value_span(&single_threshold_metric(false)), (10.0, 20.0));
        assert_eq!(value_span(&single_threshold_metric(true)), (10.0, 30.0));
    }

    #[test]
    fn test_single_threshold_values_all_categorize() {
        let provider = MockProvider::new(42).with_end_date(end());

        for catch_all in [false, true] {
            let metric = single_threshold_metric(catch_all);
            for id in ["01", "02", "03", "04", "05"] {
                let series = provider.generate(&Region::new(id, id), &metric);
                assert_eq!(series.len(), 30);
                for point in &series {
                    let value = point.value.as_ref().unwrap();
                    assert!(metric.category_for(value).is_ok(), "{value:?} has no category");
                }
            }
        }
    }

    #[test]
    fn test_pair_seed_separates_ids() {
        assert_eq!(pair_seed(1, "US", "cases"), pair_seed(1, "US", "cases"));
        assert_ne!(pair_seed(1, "US", "cases"), pair_seed(1, "USc", "ases"));
        assert_ne!(pair_seed(1, "US", "cases"), pair_seed(2, "US", "cases"));
    }
}
