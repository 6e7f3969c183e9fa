// Shared fixtures for driver integration tests.
// All workflow calls go to the in-memory mock client; nothing touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vro_client::mock::{MockWorkflowClient, ScriptedWorkflow};
use vro_common::{ExecutionState, ProvisioningState};
use vro_driver::{DriverConfig, LifecycleController, ReadinessProbe};

pub const CREATE_WORKFLOW_ID: &str = "workflow-1";
pub const DESTROY_WORKFLOW_ID: &str = "workflow-2";

pub fn test_config() -> DriverConfig {
    serde_json::from_value(serde_json::json!({
        "vro_base_url": "https://vra.corp.local:8281",
        "vro_username": "myuser",
        "vro_password": "mypassword",
        "create_workflow_name": "Create Workflow",
        "create_workflow_id": CREATE_WORKFLOW_ID,
        "destroy_workflow_name": "Destroy Workflow",
        "destroy_workflow_id": DESTROY_WORKFLOW_ID
    }))
    .unwrap()
}

/// Create workflow that runs once, then completes with the given outputs.
pub fn create_workflow(server_id: &str, ip_address: &str) -> ScriptedWorkflow {
    ScriptedWorkflow::completed()
        .with_states(vec![ExecutionState::Running, ExecutionState::Completed])
        .with_output("server_id", server_id)
        .with_output("ip_address", ip_address)
}

pub fn provisioned_state() -> ProvisioningState {
    ProvisioningState {
        server_id: Some("server-12345".to_string()),
        hostname: Some("host1".to_string()),
    }
}

/// Probe with a fixed answer that counts its calls.
pub struct StaticProbe {
    ready: bool,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn ready() -> Arc<Self> {
        Arc::new(Self {
            ready: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            ready: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadinessProbe for StaticProbe {
    async fn wait_until_ready(&self, state: &ProvisioningState) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.ready {
            Ok(())
        } else {
            Err(anyhow::anyhow!("connection refused by {}", state.describe()))
        }
    }
}

pub fn controller(
    config: DriverConfig,
    client: &Arc<MockWorkflowClient>,
    probe: &Arc<StaticProbe>,
) -> LifecycleController {
    LifecycleController::new(config, client.clone(), probe.clone())
}
