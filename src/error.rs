//! Errors surfaced by the catalog core.
//!
//! Callers of the catalog need to tell "unknown id" apart from "the provider failed" and from
//! "this value has no category", so these are typed rather than folded into an `ohno::AppError`.
//! Errors are `Clone` because a single in-flight fetch hands the same failure to every waiter.

use crate::metrics::MetricValue;
use std::sync::Arc;
use strum::Display;
use thiserror::Error;

/// Coarse classification of a [`CatalogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// An unknown metric, region or provider id was passed to a strict lookup.
    NotFound,

    /// A data provider failed to produce data.
    ProviderFailure,

    /// A present value has no matching category.
    UnmappedValue,

    /// A metric or provider definition was rejected at registration.
    InvalidDefinition,

    /// A fetch had to be started outside of a Tokio runtime.
    NoRuntime,
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("unknown metric '{id}'{}", suggestion_suffix(.suggestions))]
    MetricNotFound { id: String, suggestions: Vec<String> },

    #[error("unknown region '{id}'")]
    RegionNotFound { id: String },

    #[error("unknown data provider '{id}'")]
    ProviderNotFound { id: String },

    #[error("could not fetch metric '{metric}' for region '{region}': {cause}")]
    ProviderFailure {
        region: String,
        metric: String,
        cause: Arc<ohno::AppError>,
    },

    #[error("value '{value}' has no matching category in metric '{metric}'")]
    UnmappedValue { metric: String, value: MetricValue },

    #[error("invalid definition for '{subject}': {reason}")]
    InvalidDefinition { subject: String, reason: String },

    #[error("cannot fetch metric '{metric}' for region '{region}' outside of a Tokio runtime")]
    NoRuntime { region: String, metric: String },
}

impl CatalogError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MetricNotFound { .. } | Self::RegionNotFound { .. } | Self::ProviderNotFound { .. } => ErrorKind::NotFound,
            Self::ProviderFailure { .. } => ErrorKind::ProviderFailure,
            Self::UnmappedValue { .. } => ErrorKind::UnmappedValue,
            Self::InvalidDefinition { .. } => ErrorKind::InvalidDefinition,
            Self::NoRuntime { .. } => ErrorKind::NoRuntime,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }

    pub(crate) fn invalid(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohno::app_err;

    #[test]
    fn test_kind_classification() {
        let not_found = CatalogError::RegionNotFound { id: "ZZ".into() };
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert!(not_found.is_not_found());

        let failure = CatalogError::ProviderFailure {
            region: "US".into(),
            metric: "cases".into(),
            cause: Arc::new(app_err!("connection reset")),
        };
        assert_eq!(failure.kind(), ErrorKind::ProviderFailure);
        assert!(!failure.is_not_found());

        let unmapped = CatalogError::UnmappedValue {
            metric: "cases".into(),
            value: MetricValue::Number(150.0),
        };
        assert_eq!(unmapped.kind(), ErrorKind::UnmappedValue);

        assert_eq!(CatalogError::invalid("cases", "bad").kind(), ErrorKind::InvalidDefinition);

        let no_runtime = CatalogError::NoRuntime {
            region: "US".into(),
            metric: "cases".into(),
        };
        assert_eq!(no_runtime.kind(), ErrorKind::NoRuntime);
    }

    #[test]
    fn test_metric_not_found_message_lists_suggestions() {
        let err = CatalogError::MetricNotFound {
            id: "case_density".into(),
            suggestions: vec!["case_density_100k".into(), "cases_density".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown metric 'case_density' (did you mean 'case_density_100k', 'cases_density'?)"
        );

        let err = CatalogError::MetricNotFound {
            id: "zzz".into(),
            suggestions: Vec::new(),
        };
        assert_eq!(err.to_string(), "unknown metric 'zzz'");
    }

    #[test]
    fn test_clone_shares_provider_failure_cause() {
        let err = CatalogError::ProviderFailure {
            region: "US".into(),
            metric: "cases".into(),
            cause: Arc::new(app_err!("timeout")),
        };
        let cloned = err.clone();

        match (&err, &cloned) {
            (CatalogError::ProviderFailure { cause: a, .. }, CatalogError::ProviderFailure { cause: b, .. }) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("Expected ProviderFailure"),
        }
    }
}
