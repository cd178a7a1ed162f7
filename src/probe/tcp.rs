//! TCP connect probe.
//!
//! Cheapest possible liveness signal: can we open a connection to the
//! dependency at all. Useful for databases and push channels whose
//! wire protocol the engine does not speak.

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::probe::types::{HealthCheckResult, ProbeError, ServiceIdentity, Status};
use crate::probe::HealthProbe;
use async_trait::async_trait;

/// Probes a dependency by opening (and immediately dropping) a TCP
/// connection. The engine enforces the deadline around the connect.
pub struct TcpProbe {
    service: ServiceIdentity,
    addr: SocketAddr,
}

impl TcpProbe {
    pub fn new(service: impl Into<ServiceIdentity>, addr: SocketAddr) -> Self {
        Self {
            service: service.into(),
            addr,
        }
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    async fn check(&self) -> Result<HealthCheckResult, ProbeError> {
        TcpStream::connect(self.addr)
            .await
            .map_err(|e| ProbeError::Failed(format!("connect {} failed: {e}", self.addr)))?;

        Ok(HealthCheckResult::new(self.service.clone(), Status::Healthy)
            .with_detail("addr", self.addr.to_string()))
    }
}
