use std::time::Duration;

use http::Uri;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::{
    http::{Auth, HttpClient},
    report::ClusterStatus,
    tls::{TlsOptions, TlsSettings},
    transport::HttpClusterHealthTransport,
};

#[derive(Debug, Snafu)]
pub enum ParseError {
    #[snafu(display("Invalid endpoint {:?}: {}", endpoint, source))]
    InvalidEndpoint {
        endpoint: String,
        source: http::uri::InvalidUri,
    },
    #[snafu(display("Endpoint {:?} must include a hostname", endpoint))]
    EndpointMustIncludeHostname { endpoint: String },
}

const fn default_request_timeout_secs() -> u64 {
    10
}

/// Configuration for one Elasticsearch health check target.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElasticsearchHealthConfig {
    /// Base URI of the cluster, e.g. "http://localhost:9200".
    pub endpoint: String,

    #[serde(default)]
    pub auth: Option<Auth>,

    /// Hard deadline for one health request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Ask the cluster to hold the request until it reaches this status
    /// instead of answering immediately. The server-side wait shares the
    /// request deadline, so an unreached status answers as a timeout.
    #[serde(default)]
    pub wait_for_status: Option<ClusterStatus>,

    #[serde(default)]
    pub tls: Option<TlsOptions>,
}

impl ElasticsearchHealthConfig {
    /// Validates the endpoint and renders the health API URI for it.
    pub fn health_uri(&self) -> crate::Result<Uri> {
        let mut uri = format!(
            "{}/_cluster/health",
            self.endpoint.trim_end_matches('/')
        );
        if let Some(status) = self.wait_for_status {
            uri = format!(
                "{}?wait_for_status={}&timeout={}s",
                uri,
                status.as_str(),
                self.request_timeout_secs
            );
        }

        let uri = uri.parse::<Uri>().with_context(|_| InvalidEndpointSnafu {
            endpoint: self.endpoint.clone(),
        })?;
        if uri.host().is_none() {
            return Err(ParseError::EndpointMustIncludeHostname {
                endpoint: self.endpoint.clone(),
            }
            .into());
        }

        Ok(uri)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn build_client(&self) -> crate::Result<HttpClient> {
        let tls_settings = TlsSettings::from_options(&self.tls)?;
        Ok(HttpClient::new(tls_settings)?)
    }

    /// Builds the production HTTP transport for this configuration.
    pub fn build_transport(&self) -> crate::Result<HttpClusterHealthTransport> {
        let uri = self.health_uri()?;
        let client = self.build_client()?;

        Ok(HttpClusterHealthTransport::new(
            uri,
            self.auth.clone(),
            self.request_timeout(),
            client,
        ))
    }
}
