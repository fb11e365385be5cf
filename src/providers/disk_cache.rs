//! A TTL-aware JSON response cache keyed by region and metric.

use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};

const LOG_TARGET: &str = "disk_cache";

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached<T> {
    /// A fresh response.
    Hit(T),

    /// A fresh record that the source had nothing for this pair.
    Missing,

    /// No entry, an expired one, or one that could not be read.
    Miss,
}

#[derive(Debug, Deserialize, Serialize)]
struct Entry<T> {
    stored_at: DateTime<Utc>,
    body: Option<T>,
}

/// Directory-backed cache storing one JSON file per `(region, metric)` pair.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: Utf8PathBuf,
    ttl: Duration,
    now: Option<DateTime<Utc>>,
}

impl DiskCache {
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            now: None,
        }
    }

    /// Pin the clock used for freshness checks and timestamps.
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn load<T>(&self, region_id: &str, metric_id: &str) -> Cached<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let path = self.entry_path(region_id, metric_id);

        let entry: Entry<T> = match File::open(&path)
            .map_err(|e| e.to_string())
            .and_then(|file| serde_json::from_reader(BufReader::new(file)).map_err(|e| e.to_string()))
        {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Cache miss for '{path}': {e}");
                return Cached::Miss;
            }
        };

        // A timestamp from the future (clock skew) counts as fresh.
        if let Ok(age) = self.now().signed_duration_since(entry.stored_at).to_std()
            && age >= self.ttl
        {
            log::debug!(target: LOG_TARGET, "Cache entry '{path}' expired ({:.1} hours old)", age.as_secs_f64() / 3600.0);
            return Cached::Miss;
        }

        log::debug!(target: LOG_TARGET, "Cache hit for '{path}'");
        entry.body.map_or(Cached::Missing, Cached::Hit)
    }

    pub fn store<T: Serialize>(&self, region_id: &str, metric_id: &str, body: &T) -> Result<()> {
        self.write(region_id, metric_id, Some(body))
    }

    /// Record that the source has nothing for this pair.
    pub fn store_missing(&self, region_id: &str, metric_id: &str) -> Result<()> {
        self.write::<()>(region_id, metric_id, None)
    }

    fn write<T: Serialize>(&self, region_id: &str, metric_id: &str, body: Option<&T>) -> Result<()> {
        let path = self.entry_path(region_id, metric_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating cache directory '{parent}'"))?;
        }

        let entry = Entry {
            stored_at: self.now(),
            body,
        };

        let file = File::create(&path).into_app_err_with(|| format!("creating cache file '{path}'"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &entry).into_app_err_with(|| format!("writing cache file '{path}'"))?;
        writer.flush().into_app_err_with(|| format!("flushing cache file '{path}'"))
    }

    fn entry_path(&self, region_id: &str, metric_id: &str) -> Utf8PathBuf {
        self.dir
            .join(sanitize_path_component(region_id))
            .join(format!("{}.json", sanitize_path_component(metric_id)))
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// Make an id safe to use as a single path component.
#[must_use]
pub fn sanitize_path_component(s: &str) -> String {
    s.replace("..", "__").replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}
