use std::sync::Arc;
use tracing::{debug, error, info};
use vro_client::WorkflowClient;
use vro_common::{ExecutionToken, ProvisioningState, WorkflowInvocationSpec, PARAM_SERVER_ID};

use crate::binder::bind_parameters;
use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::invoker::execute_workflow;
use crate::outputs::{ensure_successful, extract_create_outputs};
use crate::poller::CompletionPoller;
use crate::readiness::ReadinessProbe;

/// Creates and destroys one server through the create/destroy workflows.
///
/// Callers must serialize `create`/`destroy` on the same state; there is no
/// internal locking.
pub struct LifecycleController {
    config: DriverConfig,
    client: Arc<dyn WorkflowClient>,
    probe: Arc<dyn ReadinessProbe>,
    poller: CompletionPoller,
}

impl LifecycleController {
    pub fn new(
        config: DriverConfig,
        client: Arc<dyn WorkflowClient>,
        probe: Arc<dyn ReadinessProbe>,
    ) -> Self {
        let poller = CompletionPoller::new(config.request_timeout());
        Self {
            config,
            client,
            probe,
            poller,
        }
    }

    pub fn with_poller(mut self, poller: CompletionPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Run the create workflow, record the server and wait for it to be ready.
    ///
    /// No-op when `state` is already provisioned. If the server never becomes
    /// ready it is destroyed again and `DriverError::Readiness` is returned.
    pub async fn create(&self, state: &mut ProvisioningState) -> Result<()> {
        if state.is_provisioned() {
            debug!("Server {} already exists, skipping create", state.describe());
            return Ok(());
        }

        info!("Executing the create-server workflow...");
        self.execute_create_workflow(state).await?;

        info!(
            "Server {} created.  Waiting for it to be ready...",
            state.describe()
        );
        self.wait_for_server(state).await?;
        info!("Server {} ready.", state.describe());
        Ok(())
    }

    /// Run the destroy workflow for the recorded server and clear the state.
    ///
    /// No-op when nothing was provisioned.
    pub async fn destroy(&self, state: &mut ProvisioningState) -> Result<()> {
        if !state.is_provisioned() {
            debug!("No server recorded, skipping destroy");
            return Ok(());
        }

        info!(
            "Executing the destroy-server workflow for {}...",
            state.describe()
        );
        self.execute_destroy_workflow(state).await?;
        info!("Server {} destroyed.", state.describe());
        state.clear();
        Ok(())
    }

    /// Submit, wait, and require the success state.
    async fn run_workflow(&self, spec: &WorkflowInvocationSpec) -> Result<ExecutionToken> {
        let token = execute_workflow(self.client.as_ref(), spec).await?;
        let done = self.poller.wait(self.client.as_ref(), &token).await?;
        if let Err(e) = ensure_successful(&done) {
            error!("Workflow {} ended in state '{}'", spec, done.state);
            return Err(e);
        }
        Ok(done)
    }

    async fn execute_create_workflow(&self, state: &mut ProvisioningState) -> Result<()> {
        let mut spec = self.config.create_spec();
        bind_parameters(&mut spec, &self.config.create_workflow_parameters)?;

        let token = self.run_workflow(&spec).await?;
        let (server_id, ip_address) = extract_create_outputs(&token)?;

        state.server_id = Some(server_id);
        state.hostname = Some(ip_address);
        Ok(())
    }

    async fn execute_destroy_workflow(&self, state: &ProvisioningState) -> Result<()> {
        let mut spec = self.config.destroy_spec();
        bind_parameters(&mut spec, &self.config.destroy_workflow_parameters)?;
        let spec = spec.with_parameter(
            PARAM_SERVER_ID,
            state.server_id.clone().unwrap_or_default(),
        );

        self.run_workflow(&spec).await?;
        Ok(())
    }

    /// Probe the new server; on failure destroy it and report the probe error.
    ///
    /// A failing destroy is logged and attached as `compensation`, the probe
    /// error stays the primary cause.
    async fn wait_for_server(&self, state: &mut ProvisioningState) -> Result<()> {
        let source = match self.probe.wait_until_ready(state).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let server = state.describe();
        error!(
            "Server {} not reachable ({:#}). Destroying server...",
            server, source
        );

        let compensation = match self.destroy(state).await {
            Ok(()) => None,
            Err(e) => {
                error!(
                    "Destroying unreachable server {} failed, it may need manual cleanup: {}",
                    server, e
                );
                Some(Box::new(e))
            }
        };

        Err(DriverError::Readiness {
            server,
            source,
            compensation,
        })
    }
}
