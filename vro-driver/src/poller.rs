use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};
use vro_client::WorkflowClient;
use vro_common::ExecutionToken;

use crate::error::{DriverError, Result};

/// Fixed delay between two reads of a running execution.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Waits for an execution token to leave its running states.
#[derive(Debug, Clone)]
pub struct CompletionPoller {
    timeout: Duration,
    interval: Duration,
}

impl CompletionPoller {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Re-read `token` until it is no longer alive and return the last snapshot.
    ///
    /// The returned token is the one callers hand to `ensure_successful` and
    /// `extract_create_outputs`; its state is not re-fetched afterwards.
    ///
    /// Query errors propagate as-is. If the deadline passes first, polling is
    /// abandoned and `DriverError::Timeout` is returned.
    pub async fn wait(
        &self,
        client: &dyn WorkflowClient,
        token: &ExecutionToken,
    ) -> Result<ExecutionToken> {
        match tokio::time::timeout(self.timeout, self.poll_until_done(client, token)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                let err = DriverError::Timeout {
                    seconds: self.timeout.as_secs(),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }

    async fn poll_until_done(
        &self,
        client: &dyn WorkflowClient,
        token: &ExecutionToken,
    ) -> Result<ExecutionToken> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let latest = client
                .fetch_token(token)
                .await
                .map_err(DriverError::Query)?;
            if !latest.state.is_alive() {
                debug!(
                    "Execution {} finished with state '{}' (attempt {})",
                    token.id, latest.state, attempt
                );
                return Ok(latest);
            }
            debug!(
                "Execution {} still {} (attempt {}), checking again in {:?}",
                token.id, latest.state, attempt, self.interval
            );
            sleep(self.interval).await;
        }
    }
}
