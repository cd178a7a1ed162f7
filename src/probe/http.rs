//! HTTP health probe.
//!
//! # Responsibilities
//! - GET a health URL on the dependency
//! - Map the response status to a health classification
//!
//! # Design Decisions
//! - 2xx is Healthy; any other status is Degraded (the dependency is
//!   reachable but not behaving)
//! - Connection errors are probe failures, coerced to Unhealthy
//! - The engine enforces the timeout; the probe does not

use reqwest::Client;
use url::Url;

use crate::probe::types::{HealthCheckResult, ProbeError, ServiceIdentity, Status};
use crate::probe::HealthProbe;
use async_trait::async_trait;

/// Probes a dependency by issuing a GET to its health endpoint.
pub struct HttpProbe {
    service: ServiceIdentity,
    url: Url,
    client: Client,
}

impl HttpProbe {
    pub fn new(service: impl Into<ServiceIdentity>, url: Url) -> Self {
        Self {
            service: service.into(),
            url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self) -> Result<HealthCheckResult, ProbeError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| ProbeError::Failed(format!("connection error: {e}")))?;

        let http_status = response.status();
        let status = if http_status.is_success() {
            Status::Healthy
        } else {
            Status::Degraded
        };

        Ok(HealthCheckResult::new(self.service.clone(), status)
            .with_detail("http_status", http_status.as_u16())
            .with_detail("url", self.url.as_str()))
    }
}
