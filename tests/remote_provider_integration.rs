//! Integration tests for the remote provider using wiremock

use camino::Utf8PathBuf;
use core::time::Duration;
use futures::future::join_all;
use metric_catalog::providers::{DiskCache, RemoteProvider};
use metric_catalog::{ErrorKind, Metric, MetricCatalog, MetricDataProvider, MetricDefinition, MetricKind, MetricValue, Region};
use serde_json::json;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> RemoteProvider {
    RemoteProvider::new(Url::parse(&format!("{}/data", server.uri())).unwrap()).unwrap()
}

fn pair() -> (Arc<Region>, Arc<Metric>) {
    let region = Arc::new(Region::new("US", "United States"));
    let metric = Arc::new(Metric::new(MetricDefinition::new("cases", "Cases", MetricKind::Numeric, "api")).unwrap());
    (region, metric)
}

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
    (tmp, path)
}

#[tokio::test]
async fn test_fetch_with_current_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/US/cases.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": 12.5,
            "timeseries": [
                {"date": "2024-03-01", "value": 10.0},
                {"date": "2024-03-02", "value": null},
                {"date": "2024-03-03", "value": 12.5},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (region, metric) = pair();
    let data = provider(&server).fetch_data_for_region_and_metric(&region, &metric).await.unwrap();

    assert_eq!(data.current_value(), Some(&MetricValue::Number(12.5)));
    let timeseries = data.timeseries().unwrap();
    assert_eq!(timeseries.len(), 3);
    assert_eq!(timeseries.remove_nulls().len(), 2);
    assert!(data.is_consistent());
}

#[tokio::test]
async fn test_current_value_defaults_to_last_point() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/US/cases.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeseries": [
                {"date": "2024-03-01", "value": "low"},
                {"date": "2024-03-02", "value": "high"},
            ],
        })))
        .mount(&server)
        .await;

    let (region, metric) = pair();
    let data = provider(&server).fetch_data_for_region_and_metric(&region, &metric).await.unwrap();
    assert_eq!(data.current_value(), Some(&MetricValue::from("high")));
}

#[tokio::test]
async fn test_not_found_yields_no_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/US/cases.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (region, metric) = pair();
    let data = provider(&server).fetch_data_for_region_and_metric(&region, &metric).await.unwrap();
    assert!(!data.has_value());
    assert!(data.timeseries().is_none());
}

#[tokio::test]
async fn test_server_error_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (region, metric) = pair();
    let err = provider(&server).fetch_data_for_region_and_metric(&region, &metric).await.unwrap_err();
    assert!(err.to_string().contains("503"), "{err}");
}

#[tokio::test]
async fn test_malformed_body_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let (region, metric) = pair();
    assert!(provider(&server).fetch_data_for_region_and_metric(&region, &metric).await.is_err());
}

#[tokio::test]
async fn test_out_of_order_timeseries_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeseries": [
                {"date": "2024-03-02", "value": 1.0},
                {"date": "2024-03-01", "value": 2.0},
            ],
        })))
        .mount(&server)
        .await;

    let (region, metric) = pair();
    assert!(provider(&server).fetch_data_for_region_and_metric(&region, &metric).await.is_err());
}

#[tokio::test]
async fn test_disk_cache_serves_repeated_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/US/cases.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"current": 3.0, "timeseries": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/US/deaths.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let (_tmp, dir) = utf8_tempdir();
    let (region, cases) = pair();
    let deaths = Arc::new(Metric::new(MetricDefinition::new("deaths", "Deaths", MetricKind::Numeric, "api")).unwrap());

    for _ in 0..2 {
        // a fresh provider each time, so only the disk cache can remember
        let provider = provider(&server).with_cache(DiskCache::new(dir.clone(), Duration::from_secs(3600)));

        let data = provider.fetch_data_for_region_and_metric(&region, &cases).await.unwrap();
        assert_eq!(data.current_value(), Some(&MetricValue::Number(3.0)));

        let data = provider.fetch_data_for_region_and_metric(&region, &deaths).await.unwrap();
        assert!(!data.has_value());
    }

    assert!(dir.join("US").join("cases.json").exists());
}

#[tokio::test]
async fn test_expired_cache_entries_are_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/US/cases.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"current": 3.0})))
        .expect(2)
        .mount(&server)
        .await;

    let (_tmp, dir) = utf8_tempdir();
    let (region, metric) = pair();
    let stored_at = chrono::Utc::now() - chrono::TimeDelta::hours(2);

    let stale = provider(&server).with_cache(DiskCache::new(dir.clone(), Duration::from_secs(3600)).with_now(stored_at));
    let _ = stale.fetch_data_for_region_and_metric(&region, &metric).await.unwrap();

    let current = provider(&server).with_cache(DiskCache::new(dir, Duration::from_secs(3600)));
    let _ = current.fetch_data_for_region_and_metric(&region, &metric).await.unwrap();
}

#[tokio::test]
async fn test_catalog_deduplicates_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/US/cases.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"current": 7.0}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/US/deaths.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let catalog = MetricCatalog::builder()
        .provider("api", provider(&server))
        .metric(MetricDefinition::new("cases", "Cases", MetricKind::Numeric, "api"))
        .metric(MetricDefinition::new("deaths", "Deaths", MetricKind::Numeric, "api"))
        .build()
        .unwrap();
    let (region, _) = pair();

    let results = join_all((0..10).map(|_| catalog.fetch_data(&region, "cases"))).await;
    for result in results {
        assert_eq!(result.unwrap().current_value(), Some(&MetricValue::Number(7.0)));
    }

    let err = catalog.fetch_data(&region, "deaths").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderFailure);
}
