use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::health::HealthStatus;

/// Coarse shard-allocation state reported by the cluster.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Green,
    Yellow,
    Red,
}

impl ClusterStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Green => "green",
            ClusterStatus::Yellow => "yellow",
            ClusterStatus::Red => "red",
        }
    }
}

impl TryFrom<&str> for ClusterStatus {
    type Error = String;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        match input {
            "green" => Ok(ClusterStatus::Green),
            "yellow" => Ok(ClusterStatus::Yellow),
            "red" => Ok(ClusterStatus::Red),
            _ => Err(format!("Invalid cluster status: {}", input)),
        }
    }
}

/// Body of the cluster health API, as the cluster reports it.
///
/// Only `status` participates in classification; the remaining fields are
/// carried through into health details. Fields absent from older clusters
/// are defaulted so their responses still parse.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ClusterHealthDocument {
    pub cluster_name: String,
    pub status: String,
    pub timed_out: bool,
    pub number_of_nodes: u64,
    pub number_of_data_nodes: u64,
    pub active_primary_shards: u64,
    pub active_shards: u64,
    pub relocating_shards: u64,
    pub initializing_shards: u64,
    pub unassigned_shards: u64,
    #[serde(default)]
    pub delayed_unassigned_shards: u64,
    #[serde(default)]
    pub number_of_pending_tasks: u64,
    #[serde(default)]
    pub number_of_in_flight_fetch: u64,
    #[serde(default)]
    pub task_max_waiting_in_queue_millis: u64,
    #[serde(default)]
    pub active_shards_percent_as_number: f64,
}

/// Read-only snapshot of one completed health fetch.
///
/// Constructed by the transport for every exchange that produced an HTTP
/// response, consumed once by classification, then discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterHealthReport {
    /// Status label carried by the body ("green", "yellow" or "red"), empty
    /// when the response carried none.
    pub status_label: String,
    /// HTTP status code of the exchange.
    pub response_code: u16,
    /// Whether the call completed and reported success.
    pub succeeded: bool,
    /// Parsed body, when one was present and well formed.
    pub document: Option<ClusterHealthDocument>,
}

impl ClusterHealthReport {
    /// Report for a successful exchange, with the label lifted out of the
    /// body.
    pub fn from_document(response_code: u16, document: ClusterHealthDocument) -> Self {
        Self {
            status_label: document.status.clone(),
            response_code,
            succeeded: true,
            document: Some(document),
        }
    }

    /// Report for an exchange the cluster answered unsuccessfully. No body
    /// is attached; the status code is all classification needs.
    pub const fn unsuccessful(response_code: u16) -> Self {
        Self {
            status_label: String::new(),
            response_code,
            succeeded: false,
            document: None,
        }
    }

    /// Classification rule, first match wins: anything but a 200 is out of
    /// service, as is an unsuccessful call or a "red" label. Everything
    /// else that got this far is up, so "green" and "yellow" both count as
    /// usable.
    pub fn classify(&self) -> HealthStatus {
        if self.response_code != 200 {
            return HealthStatus::OutOfService;
        }
        if !self.succeeded {
            return HealthStatus::OutOfService;
        }
        if self.status_label == ClusterStatus::Red.as_str() {
            return HealthStatus::OutOfService;
        }
        HealthStatus::Up
    }
}
