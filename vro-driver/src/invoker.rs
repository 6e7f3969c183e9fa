use tracing::{error, info};
use vro_client::{ClientError, WorkflowClient};
use vro_common::{ExecutionToken, WorkflowAddress, WorkflowInvocationSpec};

use crate::error::{DriverError, Result};

/// Submit `spec` for execution and return the live token.
///
/// Failures are logged and handed back unchanged; nothing is retried here.
pub async fn execute_workflow(
    client: &dyn WorkflowClient,
    spec: &WorkflowInvocationSpec,
) -> Result<ExecutionToken> {
    match spec.address() {
        WorkflowAddress::Id(id) => info!("Executing workflow {} by id {}", spec, id),
        WorkflowAddress::Name(name) => info!("Executing workflow {} by name '{}'", spec, name),
    }

    match client.execute(spec).await {
        Ok(token) => {
            info!(
                "Workflow {} accepted by {} client (execution {})",
                spec,
                client.name(),
                token.id
            );
            Ok(token)
        }
        Err(e) => {
            match &e {
                ClientError::BadRequest { body, .. } => {
                    error!("The workflow execution request failed: {}", body)
                }
                other => error!("The workflow execution request failed: {}", other),
            }
            Err(DriverError::Submission(e))
        }
    }
}
