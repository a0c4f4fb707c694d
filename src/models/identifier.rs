use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Key of one scalar time series (values or uncertainties) in the storage service.
///
/// Identifiers are immutable and totally ordered so that ordered sets of them produce
/// the same read batches on every run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeriesId(Arc<str>);

impl TimeSeriesId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Build a path-style identifier from its components, e.g. `/cal/pixels/2/1/100:200`
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: fmt::Display,
    {
        let mut path = String::new();
        for part in parts {
            path.push('/');
            path.push_str(&part.to_string());
        }
        Self::new(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeSeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TimeSeriesId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("Time series id must not be empty".to_string());
        }
        Ok(Self::new(s))
    }
}

impl From<&str> for TimeSeriesId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of the upstream pipeline task that wrote a stored series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProducerId(pub i64);

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProducerId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}
