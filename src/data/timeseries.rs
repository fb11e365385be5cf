use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A single dated sample. A `None` value marks a date with no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint<T> {
    pub date: NaiveDate,
    pub value: Option<T>,
}

impl<T> TimeseriesPoint<T> {
    #[must_use]
    pub const fn new(date: NaiveDate, value: Option<T>) -> Self {
        Self { date, value }
    }
}

/// Reasons a sequence of points is rejected as a timeseries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeseriesError {
    #[error("a non-empty timeseries needs at least one point")]
    Empty,

    #[error("point {index} is dated {date}, before the preceding point dated {previous}")]
    OutOfOrder {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },
}

/// An immutable, chronologically non-decreasing sequence of dated values.
///
/// Cloning is cheap: the points are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeseries<T> {
    points: Arc<[TimeseriesPoint<T>]>,
}

impl<T> Timeseries<T> {
    /// Build a timeseries, rejecting points that go back in time.
    pub fn new(points: impl Into<Vec<TimeseriesPoint<T>>>) -> Result<Self, TimeseriesError> {
        let points: Vec<_> = points.into();
        check_order(&points)?;
        Ok(Self { points: points.into() })
    }

    /// Build a timeseries from points in any order.
    #[must_use]
    pub fn from_unsorted(points: impl Into<Vec<TimeseriesPoint<T>>>) -> Self {
        let mut points: Vec<_> = points.into();
        points.sort_by_key(|p| p.date);
        Self { points: points.into() }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            points: Arc::from(Vec::new()),
        }
    }

    #[must_use]
    pub fn points(&self) -> &[TimeseriesPoint<T>] {
        &self.points
    }

    pub fn iter(&self) -> core::slice::Iter<'_, TimeseriesPoint<T>> {
        self.points.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&TimeseriesPoint<T>> {
        self.points.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TimeseriesPoint<T>> {
        self.points.last()
    }

    /// Whether any point carries a value.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.points.iter().any(|p| p.value.is_some())
    }

    /// The most recent present value, skipping trailing gaps.
    #[must_use]
    pub fn last_value(&self) -> Option<&T> {
        self.points.iter().rev().find_map(|p| p.value.as_ref())
    }

    /// The point whose date is closest to `date`. Ties go to the earlier point.
    #[must_use]
    pub fn find_nearest_date(&self, date: NaiveDate) -> Option<&TimeseriesPoint<T>> {
        self.points.iter().min_by_key(|p| (p.date - date).num_days().abs())
    }

    /// Convert into the non-empty variant.
    pub fn into_non_empty(self) -> Result<NonEmptyTimeseries<T>, TimeseriesError> {
        NonEmptyTimeseries::try_from(self)
    }
}

impl<T: Clone> Timeseries<T> {
    /// Drop the points that carry no value.
    #[must_use]
    pub fn remove_nulls(&self) -> Self {
        Self {
            points: self.points.iter().filter(|p| p.value.is_some()).cloned().collect(),
        }
    }

    /// Keep the points dated within `[start, end]`.
    #[must_use]
    pub fn filter_to_range(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            points: self.points.iter().filter(|p| p.date >= start && p.date <= end).cloned().collect(),
        }
    }

    /// The last `n` points.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.points.len().saturating_sub(n);
        Self {
            points: self.points.iter().skip(skip).cloned().collect(),
        }
    }

    #[must_use]
    pub fn map_values<U>(&self, mut f: impl FnMut(&T) -> Option<U>) -> Timeseries<U> {
        Timeseries {
            points: self
                .points
                .iter()
                .map(|p| TimeseriesPoint::new(p.date, p.value.as_ref().and_then(&mut f)))
                .collect(),
        }
    }
}

impl<T: PartialOrd> Timeseries<T> {
    #[must_use]
    pub fn min_value(&self) -> Option<&T> {
        self.values().reduce(|a, b| if b < a { b } else { a })
    }

    #[must_use]
    pub fn max_value(&self) -> Option<&T> {
        self.values().reduce(|a, b| if b > a { b } else { a })
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.points.iter().filter_map(|p| p.value.as_ref())
    }
}

impl<T> Default for Timeseries<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, T> IntoIterator for &'a Timeseries<T> {
    type Item = &'a TimeseriesPoint<T>;
    type IntoIter = core::slice::Iter<'a, TimeseriesPoint<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<T: Serialize> Serialize for Timeseries<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.points.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Timeseries<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let points = Vec::<TimeseriesPoint<T>>::deserialize(deserializer)?;
        Self::new(points).map_err(serde::de::Error::custom)
    }
}

/// A timeseries guaranteed to hold at least one point.
#[derive(Debug, Clone, PartialEq)]
pub struct NonEmptyTimeseries<T> {
    inner: Timeseries<T>,
}

impl<T> NonEmptyTimeseries<T> {
    pub fn new(points: impl Into<Vec<TimeseriesPoint<T>>>) -> Result<Self, TimeseriesError> {
        Timeseries::new(points)?.into_non_empty()
    }

    /// The most recent point.
    #[must_use]
    pub fn last(&self) -> &TimeseriesPoint<T> {
        match self.inner.last() {
            Some(point) => point,
            None => unreachable!("NonEmptyTimeseries is never empty"),
        }
    }

    /// The oldest point.
    #[must_use]
    pub fn first(&self) -> &TimeseriesPoint<T> {
        match self.inner.first() {
            Some(point) => point,
            None => unreachable!("NonEmptyTimeseries is never empty"),
        }
    }

    #[must_use]
    pub const fn as_timeseries(&self) -> &Timeseries<T> {
        &self.inner
    }

    #[must_use]
    pub fn into_timeseries(self) -> Timeseries<T> {
        self.inner
    }
}

impl<T> TryFrom<Timeseries<T>> for NonEmptyTimeseries<T> {
    type Error = TimeseriesError;

    fn try_from(value: Timeseries<T>) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(TimeseriesError::Empty)
        } else {
            Ok(Self { inner: value })
        }
    }
}

impl<T> core::ops::Deref for NonEmptyTimeseries<T> {
    type Target = Timeseries<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

fn check_order<T>(points: &[TimeseriesPoint<T>]) -> Result<(), TimeseriesError> {
    for (index, pair) in points.windows(2).enumerate() {
        if pair[1].date < pair[0].date {
            return Err(TimeseriesError::OutOfOrder {
                index: index + 1,
                date: pair[1].date,
                previous: pair[0].date,
            });
        }
    }

    Ok(())
}
