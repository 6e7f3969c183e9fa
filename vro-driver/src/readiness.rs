// ============================================================================
// READINESS PROBING
// ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};
use vro_common::ProvisioningState;

/// Blocks until the freshly created server is usable, or fails.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn wait_until_ready(&self, state: &ProvisioningState) -> Result<()>;
}

/// Waits for a TCP port (SSH by default) on the server's hostname to accept connections.
#[derive(Debug, Clone)]
pub struct TcpReadinessProbe {
    pub port: u16,
    pub connect_timeout: Duration,
    pub retry_interval: Duration,
    pub max_wait: Duration,
}

impl Default for TcpReadinessProbe {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(3),
            retry_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl TcpReadinessProbe {
    async fn check_once(&self, addr: &str) -> bool {
        matches!(
            timeout(self.connect_timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }
}

/// Strip a CIDR suffix if present (e.g. "1.2.3.4/32" -> "1.2.3.4").
pub fn clean_host(hostname: &str) -> &str {
    hostname.split('/').next().unwrap_or(hostname).trim()
}

#[async_trait]
impl ReadinessProbe for TcpReadinessProbe {
    async fn wait_until_ready(&self, state: &ProvisioningState) -> Result<()> {
        let host = state
            .hostname
            .as_deref()
            .map(clean_host)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow!("server {} has no hostname to probe", state.describe()))?;
        let addr = format!("{}:{}", host, self.port);

        // None: the wait is too long to represent, so there is no deadline.
        let deadline = Instant::now().checked_add(self.max_wait);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if self.check_once(&addr).await {
                info!("{} accepting connections (attempt {})", addr, attempt);
                return Ok(());
            }
            let next_attempt = Instant::now().checked_add(self.retry_interval);
            let out_of_time = match (deadline, next_attempt) {
                (Some(deadline), Some(next)) => next > deadline,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if out_of_time {
                return Err(anyhow!(
                    "{} not reachable after {} attempts ({}s)",
                    addr,
                    attempt,
                    self.max_wait.as_secs()
                ));
            }
            debug!("{} not reachable yet (attempt {})", addr, attempt);
            sleep(self.retry_interval).await;
        }
    }
}
