//! Elasticsearch cluster health probing and classification.
//!
//! This library issues a single `GET /_cluster/health` request against a
//! cluster and folds the outcome into a three-valued health state. A
//! [`report::ClusterHealthReport`] captures one completed exchange with the
//! cluster. The capability to produce reports lives behind
//! [`transport::ClusterHealthTransport`], so checks run against stub
//! transports in tests and the HTTP transport in production, while a
//! [`checker::ElasticsearchHealthcheck`] turns reports into
//! [`health::Health`] outcomes. Classification itself is a pure function and
//! never errors; transport failures of any kind come out as down.

pub mod checker;
pub mod config;
pub mod health;
pub mod http;
pub mod report;
pub mod tls;
pub mod transport;

pub use checker::ElasticsearchHealthcheck;
pub use config::ElasticsearchHealthConfig;
pub use health::{classify, Health, HealthStatus};
pub use report::{ClusterHealthDocument, ClusterHealthReport, ClusterStatus};
pub use self::http::Auth;
pub use tls::TlsOptions;
pub use transport::{ClusterHealthTransport, HttpClusterHealthTransport, TransportError};

#[macro_use]
extern crate tracing;

/// Basic error type, dynamically dispatched and safe to send across
/// threads.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Basic result type, defined in terms of [`Error`] and generic over `T`.
pub type Result<T> = std::result::Result<T, Error>;
