//! The capability seam between classification and the cluster.

use std::time::Duration;

use async_trait::async_trait;
use http::{Request, Uri};
use hyper::Body;
use snafu::{ResultExt, Snafu};

use crate::{
    http::{Auth, HttpClient, HttpError},
    report::{ClusterHealthDocument, ClusterHealthReport},
};

/// Errors raised while trying to observe cluster health.
///
/// Every variant means the same thing to classification: the cluster could
/// not be observed, so the check comes out down.
#[derive(Debug, Snafu)]
pub enum TransportError {
    #[snafu(display("Failed to build cluster health request: {}", source))]
    BuildRequest { source: http::Error },
    #[snafu(display("Failed to reach the cluster: {}", source))]
    Connect { source: HttpError },
    #[snafu(display("Cluster health request timed out after {:?}", timeout))]
    RequestTimeout { timeout: Duration },
    #[snafu(display("Failed to read the cluster health response: {}", source))]
    ReadResponse { source: hyper::Error },
    #[snafu(display("Cluster health response was malformed: {}", source))]
    MalformedResponse { source: serde_json::Error },
}

/// Capability to retrieve one cluster health snapshot.
///
/// The production implementation talks HTTP; tests substitute stubs that
/// return canned reports or errors without any network.
#[async_trait]
pub trait ClusterHealthTransport: Send + Sync {
    async fn fetch_cluster_health(&self) -> Result<ClusterHealthReport, TransportError>;
}

/// HTTP implementation of [`ClusterHealthTransport`] against the cluster
/// health API.
#[derive(Clone, Debug)]
pub struct HttpClusterHealthTransport {
    uri: Uri,
    auth: Option<Auth>,
    request_timeout: Duration,
    client: HttpClient,
}

impl HttpClusterHealthTransport {
    pub(crate) const fn new(
        uri: Uri,
        auth: Option<Auth>,
        request_timeout: Duration,
        client: HttpClient,
    ) -> Self {
        Self {
            uri,
            auth,
            request_timeout,
            client,
        }
    }

    fn build_request(&self) -> Result<Request<Body>, TransportError> {
        let mut builder = Request::get(&self.uri);
        if let Some(auth) = &self.auth {
            builder = auth.apply_builder(builder);
        }
        builder.body(Body::empty()).context(BuildRequestSnafu)
    }
}

#[async_trait]
impl ClusterHealthTransport for HttpClusterHealthTransport {
    async fn fetch_cluster_health(&self) -> Result<ClusterHealthReport, TransportError> {
        let request = self.build_request()?;

        let response = match tokio::time::timeout(self.request_timeout, self.client.send(request))
            .await
        {
            Ok(result) => result.context(ConnectSnafu)?,
            Err(_) => {
                return RequestTimeoutSnafu {
                    timeout: self.request_timeout,
                }
                .fail()
            }
        };

        let (parts, body) = response.into_parts();
        if !parts.status.is_success() {
            debug!(message = "Cluster answered the health request unsuccessfully.", status = %parts.status);
            return Ok(ClusterHealthReport::unsuccessful(parts.status.as_u16()));
        }

        let body = hyper::body::to_bytes(body).await.context(ReadResponseSnafu)?;
        let document: ClusterHealthDocument =
            serde_json::from_slice(&body).context(MalformedResponseSnafu)?;

        Ok(ClusterHealthReport::from_document(
            parts.status.as_u16(),
            document,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{
        config::ElasticsearchHealthConfig, health::classify, health::HealthStatus,
        report::ClusterStatus, tls::TlsSettings,
    };

    fn config(endpoint: String) -> ElasticsearchHealthConfig {
        toml::from_str(&format!("endpoint = {:?}", endpoint)).unwrap()
    }

    fn cluster_health_json(status: &str) -> serde_json::Value {
        json!({
            "cluster_name": "docker-cluster",
            "status": status,
            "timed_out": false,
            "number_of_nodes": 1,
            "number_of_data_nodes": 1,
            "active_primary_shards": 0,
            "active_shards": 0,
            "relocating_shards": 0,
            "initializing_shards": 0,
            "unassigned_shards": 0,
            "delayed_unassigned_shards": 0,
            "number_of_pending_tasks": 0,
            "number_of_in_flight_fetch": 0,
            "task_max_waiting_in_queue_millis": 0,
            "active_shards_percent_as_number": 100.0,
        })
    }

    #[tokio::test]
    async fn fetches_a_green_cluster() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cluster_health_json("green")))
            .mount(&mock_server)
            .await;

        let transport = config(mock_server.uri()).build_transport().unwrap();
        let report = transport.fetch_cluster_health().await.unwrap();

        assert_eq!(report.response_code, 200);
        assert!(report.succeeded);
        assert_eq!(report.status_label, "green");
        assert_eq!(
            report.document.as_ref().unwrap().cluster_name,
            "docker-cluster"
        );
        assert_eq!(report.classify(), HealthStatus::Up);
    }

    #[tokio::test]
    async fn unsuccessful_answer_still_produces_a_report() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let transport = config(mock_server.uri()).build_transport().unwrap();
        let report = transport.fetch_cluster_health().await.unwrap();

        assert_eq!(report.response_code, 503);
        assert!(!report.succeeded);
        assert!(report.document.is_none());
        assert_eq!(report.classify(), HealthStatus::OutOfService);
    }

    #[tokio::test]
    async fn applies_basic_auth() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cluster_health_json("green")))
            .mount(&mock_server)
            .await;

        let mut config = config(mock_server.uri());
        config.auth = Some(crate::http::Auth::Basic {
            user: "user".to_owned(),
            password: "pass".to_owned(),
        });

        let transport = config.build_transport().unwrap();
        let report = transport.fetch_cluster_health().await.unwrap();
        assert_eq!(report.classify(), HealthStatus::Up);
    }

    #[tokio::test]
    async fn asks_the_cluster_to_wait_for_a_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .and(query_param("wait_for_status", "yellow"))
            .and(query_param("timeout", "10s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cluster_health_json("yellow")))
            .mount(&mock_server)
            .await;

        let mut config = config(mock_server.uri());
        config.wait_for_status = Some(ClusterStatus::Yellow);

        let transport = config.build_transport().unwrap();
        let report = transport.fetch_cluster_health().await.unwrap();
        assert_eq!(report.status_label, "yellow");
        assert_eq!(report.classify(), HealthStatus::Up);
    }

    #[tokio::test]
    async fn unreachable_cluster_classifies_down() {
        // Grab a port the OS considers free, then release it so nothing is
        // listening when the transport connects.
        let endpoint = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let transport = config(endpoint).build_transport().unwrap();
        let outcome = transport.fetch_cluster_health().await;

        assert!(matches!(outcome, Err(TransportError::Connect { .. })));
        assert_eq!(classify(&outcome), HealthStatus::Down);
    }

    #[tokio::test]
    async fn malformed_body_classifies_down() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let transport = config(mock_server.uri()).build_transport().unwrap();
        let outcome = transport.fetch_cluster_health().await;

        assert!(matches!(
            outcome,
            Err(TransportError::MalformedResponse { .. })
        ));
        assert_eq!(classify(&outcome), HealthStatus::Down);
    }

    #[tokio::test]
    async fn slow_cluster_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(cluster_health_json("green"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new(TlsSettings::from_options(&None).unwrap()).unwrap();
        let uri = format!("{}/_cluster/health", mock_server.uri())
            .parse::<Uri>()
            .unwrap();
        let transport =
            HttpClusterHealthTransport::new(uri, None, Duration::from_millis(50), client);

        let outcome = transport.fetch_cluster_health().await;
        assert!(matches!(outcome, Err(TransportError::RequestTimeout { .. })));
        assert_eq!(classify(&outcome), HealthStatus::Down);
    }
}
