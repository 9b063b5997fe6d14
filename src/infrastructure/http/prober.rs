//! reqwest-backed health prober

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ports::{HealthProber, ProbeOutcome};

/// Redirect hops followed before a probe gives up
const MAX_REDIRECTS: usize = 5;

/// HTTP method used for probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    #[default]
    Get,
    Head,
}

/// Issues one GET (or HEAD) per probe. A 2xx response is `Reachable`;
/// everything else is `Unreachable`.
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
    method: ProbeMethod,
}

impl HttpProber {
    pub fn new(method: ProbeMethod) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("uptime-watch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, method })
    }
}

#[async_trait]
impl HealthProber for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let request = match self.method {
            ProbeMethod::Get => self.client.get(url),
            ProbeMethod::Head => self.client.head(url),
        }
        .timeout(timeout);

        let started = Instant::now();

        // reqwest's own timeout covers the request; the outer one guards
        // against anything that slips past it (e.g. a stalled resolver).
        let outcome = match tokio::time::timeout(timeout, request.send()).await {
            Ok(Ok(response)) if response.status().is_success() => ProbeOutcome::Reachable,
            Ok(Ok(response)) => {
                debug!(url, status = %response.status(), "Probe got non-success status");
                ProbeOutcome::Unreachable
            }
            Ok(Err(e)) => {
                debug!(url, error = %e, "Probe request failed");
                ProbeOutcome::Unreachable
            }
            Err(_) => {
                debug!(url, timeout_ms = timeout.as_millis() as u64, "Probe timed out");
                ProbeOutcome::Unreachable
            }
        };

        debug!(
            url,
            outcome = outcome.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Probe finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober(method: ProbeMethod) -> HttpProber {
        HttpProber::new(method).expect("build client")
    }

    #[tokio::test]
    async fn success_status_is_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = prober(ProbeMethod::Get)
            .probe(&server.uri(), Duration::from_secs(2))
            .await;
        assert_eq!(outcome, ProbeOutcome::Reachable);
    }

    #[tokio::test]
    async fn server_error_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = prober(ProbeMethod::Get)
            .probe(&format!("{}/health", server.uri()), Duration::from_secs(2))
            .await;
        assert_eq!(outcome, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn head_method_is_used_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = prober(ProbeMethod::Head)
            .probe(&server.uri(), Duration::from_secs(2))
            .await;
        assert_eq!(outcome, ProbeOutcome::Reachable);
    }

    #[tokio::test]
    async fn redirect_to_success_is_reachable() {
        let server = MockServer::start().await;
        Mock::given(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("Location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let outcome = prober(ProbeMethod::Get)
            .probe(&format!("{}/old", server.uri()), Duration::from_secs(2))
            .await;
        assert_eq!(outcome, ProbeOutcome::Reachable);
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = prober(ProbeMethod::Get)
            .probe(&format!("http://{}", addr), Duration::from_secs(2))
            .await;
        assert_eq!(outcome, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn hung_endpoint_is_cut_off_at_the_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let started = Instant::now();
        let outcome = prober(ProbeMethod::Get)
            .probe(&server.uri(), Duration::from_millis(200))
            .await;

        assert_eq!(outcome, ProbeOutcome::Unreachable);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
