use std::env;
use vro_client::WorkflowClient;

use crate::config::DriverConfig;
use crate::error::Result;

pub struct ClientManager;

impl ClientManager {
    pub fn current_backend_name() -> String {
        env::var("WORKFLOW_BACKEND").unwrap_or_else(|_| "vro".to_string())
    }

    /// `Ok(None)` when the backend is unknown or compiled out.
    pub fn get_client(
        backend: &str,
        config: &DriverConfig,
    ) -> Result<Option<Box<dyn WorkflowClient>>> {
        match backend.trim().to_lowercase().as_str() {
            #[cfg(feature = "client-vro")]
            "vro" => {
                let settings = vro_client::vro::VroSettings {
                    base_url: config.vro_base_url.clone(),
                    username: config.vro_username.clone(),
                    password: config.vro_password.clone(),
                    verify_ssl: config.verify_ssl(),
                };
                let client = vro_client::vro::VroClient::new(settings).map_err(|source| {
                    tracing::error!("Failed to build vRO client: {}", source);
                    crate::error::DriverError::ClientSetup {
                        backend: "vro".to_string(),
                        source,
                    }
                })?;
                Ok(Some(Box::new(client)))
            }
            #[cfg(feature = "client-mock")]
            "mock" => Ok(Some(Box::new(mock::dry_run_client(config)))),
            _ => {
                let _ = config;
                Ok(None)
            }
        }
    }
}

#[cfg(feature = "client-mock")]
mod mock {
    use vro_client::mock::{MockWorkflowClient, ScriptedWorkflow};
    use vro_common::{ExecutionState, OUTPUT_IP_ADDRESS, OUTPUT_SERVER_ID};

    use crate::config::DriverConfig;

    /// Mock engine where create hands out a loopback server and destroy always succeeds.
    pub fn dry_run_client(config: &DriverConfig) -> MockWorkflowClient {
        let server_id = format!(
            "mock-{}",
            uuid::Uuid::new_v4().simple().to_string().chars().take(12).collect::<String>()
        );
        let create = ScriptedWorkflow::completed()
            .with_states(vec![ExecutionState::Running, ExecutionState::Completed])
            .with_output(OUTPUT_SERVER_ID, &server_id)
            .with_output(OUTPUT_IP_ADDRESS, "127.0.0.1");

        let create_key = config
            .create_spec()
            .workflow_id
            .unwrap_or_else(|| config.create_workflow_name.clone());
        let destroy_key = config
            .destroy_spec()
            .workflow_id
            .unwrap_or_else(|| config.destroy_workflow_name.clone());

        MockWorkflowClient::new()
            .with_workflow(create_key, create)
            .with_workflow(destroy_key, ScriptedWorkflow::completed())
    }
}
