use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{report::ClusterHealthReport, transport::TransportError};

/// Outward-facing health state of a probed cluster.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The cluster answered and is usable.
    Up,

    /// The cluster could not be observed at all.
    Down,

    /// The cluster answered, but reported itself unusable.
    OutOfService,
}

impl HealthStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Up => "up",
            HealthStatus::Down => "down",
            HealthStatus::OutOfService => "out_of_service",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folds one completed fetch attempt into a health state.
///
/// A transport-level failure always classifies as [`HealthStatus::Down`],
/// regardless of what a report would have said; everything else is decided
/// by the report itself. The same outcome always classifies the same way.
pub fn classify(outcome: &Result<ClusterHealthReport, TransportError>) -> HealthStatus {
    match outcome {
        Ok(report) => report.classify(),
        Err(_) => HealthStatus::Down,
    }
}

/// A classified health outcome plus supporting evidence.
///
/// Details carry whatever the check observed: the cluster document fields
/// when a body was retrieved, the offending status code or the error string
/// otherwise.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Health {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl Health {
    pub const fn new(status: HealthStatus) -> Self {
        Self {
            status,
            details: BTreeMap::new(),
        }
    }

    pub const fn up() -> Self {
        Self::new(HealthStatus::Up)
    }

    pub const fn down() -> Self {
        Self::new(HealthStatus::Down)
    }

    pub const fn out_of_service() -> Self {
        Self::new(HealthStatus::OutOfService)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}
