use serde_json::Value;

use crate::{
    config::ElasticsearchHealthConfig,
    health::{classify, Health, HealthStatus},
    report::ClusterHealthDocument,
    transport::{ClusterHealthTransport, HttpClusterHealthTransport},
};

/// Drives a transport through one health check and folds the outcome into
/// a [`Health`] value.
pub struct ElasticsearchHealthcheck<T> {
    transport: T,
}

impl<T: ClusterHealthTransport> ElasticsearchHealthcheck<T> {
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Runs one health check.
    ///
    /// Transport failures never escape: they come back as a down outcome
    /// with the error string attached. An answering cluster contributes
    /// its health document to the details, an unusable one additionally
    /// records the offending status code.
    pub async fn check(&self) -> Health {
        let outcome = self.transport.fetch_cluster_health().await;
        let status = classify(&outcome);

        let mut health = Health::new(status);
        match &outcome {
            Ok(report) => {
                if status == HealthStatus::Up {
                    debug!(message = "Cluster health check passed.", status_label = %report.status_label);
                } else {
                    warn!(
                        message = "Cluster reported itself unusable.",
                        response_code = report.response_code,
                        status_label = %report.status_label
                    );
                    health = health.with_detail("status_code", report.response_code);
                }
                if let Some(document) = &report.document {
                    health = with_document_details(health, document);
                }
            }
            Err(error) => {
                warn!(message = "Cluster could not be observed.", %error);
                health = health.with_detail("error", error.to_string());
            }
        }

        health
    }
}

impl ElasticsearchHealthcheck<HttpClusterHealthTransport> {
    /// Builds a checker backed by the HTTP transport for `config`.
    pub fn from_config(config: &ElasticsearchHealthConfig) -> crate::Result<Self> {
        Ok(Self::new(config.build_transport()?))
    }
}

/// Copies every field of the cluster document into the detail map, the
/// same shape the health API answered with.
fn with_document_details(health: Health, document: &ClusterHealthDocument) -> Health {
    match serde_json::to_value(document) {
        Ok(Value::Object(fields)) => fields
            .into_iter()
            .fold(health, |health, (key, value)| health.with_detail(key, value)),
        _ => health,
    }
}
