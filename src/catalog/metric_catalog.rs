use super::MetricCatalogBuilder;
use super::cache::{CacheEntry, CacheEvent, CacheEventKind, CacheKey, CacheStatus, FetchResult, SharedFetch};
use crate::data::MetricData;
use crate::error::CatalogError;
use crate::metrics::{Color, Metric, MetricCategory, MetricRef, MetricValue};
use crate::providers::MetricDataProvider;
use crate::regions::Region;
use core::panic::AssertUnwindSafe;
use core::sync::atomic::{AtomicU64, Ordering};
use futures::FutureExt;
use futures::future::join_all;
use ohno::app_err;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use strsim::normalized_damerau_levenshtein;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

const LOG_TARGET: &str = "   catalog";

/// Minimum similarity for an id to be suggested when a metric lookup fails.
const MIN_SUGGESTION_SCORE: f64 = 0.8;

/// Maximum number of ids suggested when a metric lookup fails.
const MAX_SUGGESTIONS: usize = 3;

/// Capacity of the event channel. Subscribers lagging further behind miss events.
const EVENT_CAPACITY: usize = 256;

/// Registry of metrics and providers with a de-duplicating, per-(region, metric) data cache.
///
/// Cloning is cheap and clones share the same registry and cache.
#[derive(Clone)]
pub struct MetricCatalog {
    inner: Arc<Inner>,
}

struct Inner {
    metrics: Vec<Arc<Metric>>,
    metric_index: HashMap<Arc<str>, usize>,
    providers: HashMap<String, Arc<dyn MetricDataProvider>>,
    placeholder_color: Color,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
    next_generation: AtomicU64,
    events: broadcast::Sender<CacheEvent>,
}

/// Outcome of a cache lookup.
enum Lookup {
    Ready(Arc<MetricData>),
    InFlight(SharedFetch),
    Failed(CatalogError),
    Started(SharedFetch),
}

impl core::fmt::Debug for MetricCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut provider_ids: Vec<_> = self.inner.providers.keys().collect();
        provider_ids.sort();

        f.debug_struct("MetricCatalog")
            .field("metrics", &self.inner.metrics.iter().map(|m| m.id()).collect::<Vec<_>>())
            .field("providers", &provider_ids)
            .field("placeholder_color", &self.inner.placeholder_color)
            .field("cache", &*self.inner.lock_cache())
            .finish_non_exhaustive()
    }
}

impl MetricCatalog {
    #[must_use]
    pub fn builder() -> MetricCatalogBuilder {
        MetricCatalogBuilder::new()
    }

    pub(super) fn from_parts(
        metrics: Vec<Arc<Metric>>,
        providers: HashMap<String, Arc<dyn MetricDataProvider>>,
        placeholder_color: Color,
    ) -> Self {
        let metric_index = metrics.iter().enumerate().map(|(index, m)| (m.id_arc(), index)).collect();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                metrics,
                metric_index,
                providers,
                placeholder_color,
                cache: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// The registered metrics, in registration order.
    pub fn metrics(&self) -> impl Iterator<Item = &Arc<Metric>> {
        self.inner.metrics.iter()
    }

    /// Ids of the registered providers, sorted.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.inner.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn placeholder_color(&self) -> Color {
        self.inner.placeholder_color
    }

    /// Resolve a metric reference.
    ///
    /// An instance is returned as is, without consulting the registry. An id is looked up.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MetricNotFound`], with up to three similar registered ids, if the id
    /// is not registered.
    pub fn get_metric(&self, metric: impl Into<MetricRef>) -> Result<Arc<Metric>, CatalogError> {
        match metric.into() {
            MetricRef::Metric(metric) => Ok(metric),
            MetricRef::Id(id) => self.inner.metric_index.get(id.as_str()).map_or_else(
                || {
                    let suggestions = self.suggest(&id);
                    Err(CatalogError::MetricNotFound { id, suggestions })
                },
                |&index| Ok(Arc::clone(&self.inner.metrics[index])),
            ),
        }
    }

    /// The category a present value belongs to.
    ///
    /// # Errors
    ///
    /// Fails with [`CatalogError::MetricNotFound`] for an unknown id and with
    /// [`CatalogError::UnmappedValue`] when no category matches.
    pub fn get_category(&self, metric: impl Into<MetricRef>, value: &MetricValue) -> Result<MetricCategory, CatalogError> {
        let metric = self.get_metric(metric)?;
        metric.category_for(value).cloned()
    }

    /// The color of a present value.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::get_category`].
    pub fn get_color(&self, metric: impl Into<MetricRef>, value: &MetricValue) -> Result<Color, CatalogError> {
        let metric = self.get_metric(metric)?;
        metric.color_for(value)
    }

    /// The color of a possibly missing value: missing values get the placeholder color.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::get_category`]; a present value without a category is still an
    /// error.
    pub fn get_color_or_placeholder(&self, metric: impl Into<MetricRef>, value: Option<&MetricValue>) -> Result<Color, CatalogError> {
        let metric = self.get_metric(metric)?;
        value.map_or(Ok(self.inner.placeholder_color), |value| metric.color_for(value))
    }

    /// The category of a snapshot's current value, or `None` when it has no value.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnmappedValue`] when the value has no category.
    pub fn categorize(&self, data: &MetricData) -> Result<Option<MetricCategory>, CatalogError> {
        data.current_value()
            .map(|value| data.metric().category_for(value).cloned())
            .transpose()
    }

    /// Fetch the data of a metric for a region.
    ///
    /// Cached data is returned without suspending. While a fetch for the same pair is in flight,
    /// callers attach to it instead of calling the provider again, and all of them observe its
    /// result. A failed fetch is not served as an answer: the next call retries it.
    ///
    /// The provider runs on its own task, so dropping the returned future does not cancel it and
    /// its result still lands in the cache.
    ///
    /// # Errors
    ///
    /// Fails with [`CatalogError::MetricNotFound`] for an unknown id,
    /// [`CatalogError::ProviderNotFound`] if the metric's provider is not registered, and
    /// [`CatalogError::ProviderFailure`] when the provider fails.
    pub async fn fetch_data(&self, region: &Arc<Region>, metric: impl Into<MetricRef>) -> Result<Arc<MetricData>, CatalogError> {
        let metric = self.get_metric(metric)?;
        match self.lookup(region, &metric, true)? {
            Lookup::Ready(data) => Ok(data),
            Lookup::InFlight(fetch) | Lookup::Started(fetch) => fetch.await,
            Lookup::Failed(e) => Err(e),
        }
    }

    /// Fetch several pairs concurrently. Results are in input order.
    pub async fn fetch_many<I, M>(&self, pairs: I) -> Vec<Result<Arc<MetricData>, CatalogError>>
    where
        I: IntoIterator<Item = (Arc<Region>, M)>,
        M: Into<MetricRef>,
    {
        let requests: Vec<_> = pairs.into_iter().map(|(region, metric)| (region, metric.into())).collect();
        join_all(requests.iter().map(|(region, metric)| self.fetch_data(region, metric.clone()))).await
    }

    /// The state of a pair, without triggering anything.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MetricNotFound`] for an unknown id.
    pub fn status(&self, region: &Region, metric: impl Into<MetricRef>) -> Result<CacheStatus, CatalogError> {
        let metric = self.get_metric(metric)?;
        let key = CacheKey::new(region, &metric);
        Ok(self.inner.lock_cache().get(&key).map_or(CacheStatus::Absent, CacheStatus::from))
    }

    /// The state of a pair as observed on entry; an absent pair gets a background fetch started.
    ///
    /// A failed pair is reported as failed and is not retried here; use [`Self::fetch_data`] or
    /// [`Self::refresh`] to retry. State changes are announced on [`Self::events`].
    ///
    /// # Errors
    ///
    /// Fails with [`CatalogError::MetricNotFound`] for an unknown id,
    /// [`CatalogError::ProviderNotFound`] if the metric's provider is not registered, and
    /// [`CatalogError::NoRuntime`] if a fetch must be started on a thread without a Tokio runtime.
    /// Cached and in-flight states are reported from any thread.
    pub fn subscribe(&self, region: &Arc<Region>, metric: impl Into<MetricRef>) -> Result<CacheStatus, CatalogError> {
        let metric = self.get_metric(metric)?;
        Ok(match self.lookup(region, &metric, false)? {
            Lookup::Ready(data) => CacheStatus::Resolved(data),
            Lookup::InFlight(_) => CacheStatus::Pending,
            Lookup::Failed(e) => CacheStatus::Failed(e),
            Lookup::Started(_) => CacheStatus::Absent,
        })
    }

    /// A receiver of every subsequent cache state change.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Drop the entry of a pair so the next fetch calls the provider again.
    ///
    /// Callers already attached to an in-flight fetch still receive its result, but that result is
    /// not cached. Returns whether there was an entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MetricNotFound`] for an unknown id.
    pub fn invalidate(&self, region: &Region, metric: impl Into<MetricRef>) -> Result<bool, CatalogError> {
        let metric = self.get_metric(metric)?;
        let key = CacheKey::new(region, &metric);

        let removed = self.inner.lock_cache().remove(&key).is_some();
        if removed {
            log::debug!(target: LOG_TARGET, "Invalidated '{key}'");
            self.inner.emit(key, CacheEventKind::Invalidated);
        }

        Ok(removed)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let keys: Vec<_> = self.inner.lock_cache().drain().map(|(key, _)| key).collect();
        log::debug!(target: LOG_TARGET, "Cleared {} cache entries", keys.len());
        for key in keys {
            self.inner.emit(key, CacheEventKind::Invalidated);
        }
    }

    /// Invalidate a pair and fetch it again.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::fetch_data`].
    pub async fn refresh(&self, region: &Arc<Region>, metric: impl Into<MetricRef>) -> Result<Arc<MetricData>, CatalogError> {
        let metric = self.get_metric(metric)?;
        let _ = self.invalidate(region, &metric)?;
        self.fetch_data(region, metric).await
    }

    /// Check the cache for a pair and start a fetch if needed, all under one lock.
    fn lookup(&self, region: &Arc<Region>, metric: &Arc<Metric>, retry_failed: bool) -> Result<Lookup, CatalogError> {
        let key = CacheKey::new(region, metric);
        let mut cache = self.inner.lock_cache();

        match cache.get(&key) {
            Some(CacheEntry::Resolved(data)) => {
                log::debug!(target: LOG_TARGET, "Cache hit for '{key}'");
                return Ok(Lookup::Ready(Arc::clone(data)));
            }
            Some(CacheEntry::Pending { fetch, .. }) => {
                log::debug!(target: LOG_TARGET, "Joining in-flight fetch for '{key}'");
                return Ok(Lookup::InFlight(fetch.clone()));
            }
            Some(CacheEntry::Failed(e)) if !retry_failed => return Ok(Lookup::Failed(e.clone())),
            Some(CacheEntry::Failed(_)) => log::debug!(target: LOG_TARGET, "Retrying failed fetch for '{key}'"),
            None => log::debug!(target: LOG_TARGET, "Cache miss for '{key}'"),
        }

        let provider = self
            .inner
            .providers
            .get(metric.provider())
            .cloned()
            .ok_or_else(|| CatalogError::ProviderNotFound {
                id: metric.provider().to_string(),
            })?;

        let Ok(runtime) = Handle::try_current() else {
            return Err(CatalogError::NoRuntime {
                region: key.region_id().to_string(),
                metric: key.metric_id().to_string(),
            });
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let fetch = spawn_fetch(
            &runtime,
            &self.inner,
            key.clone(),
            generation,
            provider,
            Arc::clone(region),
            Arc::clone(metric),
        );

        let _ = cache.insert(
            key.clone(),
            CacheEntry::Pending {
                generation,
                fetch: fetch.clone(),
            },
        );
        drop(cache);

        self.inner.emit(key, CacheEventKind::Pending);
        Ok(Lookup::Started(fetch))
    }

    fn suggest(&self, id: &str) -> Vec<String> {
        let mut scored: Vec<_> = self
            .inner
            .metrics
            .iter()
            .map(|m| (normalized_damerau_levenshtein(id, m.id()), m.id()))
            .filter(|(score, _)| *score >= MIN_SUGGESTION_SCORE)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(core::cmp::Ordering::Equal).then_with(|| a.1.cmp(b.1)));
        scored.into_iter().take(MAX_SUGGESTIONS).map(|(_, id)| id.to_string()).collect()
    }
}

impl Inner {
    fn lock_cache(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, key: CacheKey, kind: CacheEventKind) {
        // Sending only fails when nobody is listening.
        let _ = self.events.send(CacheEvent { key, kind });
    }

    /// Record the outcome of a fetch, unless its entry was invalidated or replaced meanwhile.
    fn complete(&self, key: &CacheKey, generation: u64, result: &FetchResult) {
        let mut cache = self.lock_cache();
        let current = matches!(cache.get(key), Some(CacheEntry::Pending { generation: g, .. }) if *g == generation);
        if !current {
            log::debug!(target: LOG_TARGET, "Discarding stale result for '{key}'");
            return;
        }

        let kind = match result {
            Ok(data) => {
                let _ = cache.insert(key.clone(), CacheEntry::Resolved(Arc::clone(data)));
                CacheEventKind::Resolved
            }
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Fetch for '{key}' failed: {e}");
                let _ = cache.insert(key.clone(), CacheEntry::Failed(e.clone()));
                CacheEventKind::Failed
            }
        };
        drop(cache);

        self.emit(key.clone(), kind);
    }
}

/// Run the provider on its own task and return a future any number of callers can await.
fn spawn_fetch(
    runtime: &Handle,
    inner: &Arc<Inner>,
    key: CacheKey,
    generation: u64,
    provider: Arc<dyn MetricDataProvider>,
    region: Arc<Region>,
    metric: Arc<Metric>,
) -> SharedFetch {
    let task_inner = Arc::downgrade(inner);
    let task_key = key.clone();

    let handle = runtime.spawn(async move {
        let outcome = AssertUnwindSafe(provider.fetch_data_for_region_and_metric(&region, &metric))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(data)) => Ok(Arc::new(data)),
            Ok(Err(e)) => Err(provider_failure(&task_key, e)),
            Err(_panic) => Err(provider_failure(&task_key, app_err!("data provider panicked"))),
        };

        complete(&task_inner, &task_key, generation, &result);
        result
    });

    let join_inner: Weak<Inner> = Arc::downgrade(inner);
    async move {
        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                let result = Err(provider_failure(&key, app_err!("fetch task did not complete: {join_error}")));
                complete(&join_inner, &key, generation, &result);
                result
            }
        }
    }
    .boxed()
    .shared()
}

fn complete(inner: &Weak<Inner>, key: &CacheKey, generation: u64, result: &FetchResult) {
    if let Some(inner) = inner.upgrade() {
        inner.complete(key, generation, result);
    }
}

fn provider_failure(key: &CacheKey, cause: ohno::AppError) -> CatalogError {
    CatalogError::ProviderFailure {
        region: key.region_id().to_string(),
        metric: key.metric_id().to_string(),
        cause: Arc::new(cause),
    }
}
