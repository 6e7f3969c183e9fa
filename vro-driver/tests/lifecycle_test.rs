// Integration tests for the create/destroy lifecycle.
// Poller sleeps run on tokio's paused clock.

mod common;

use common::{
    controller, create_workflow, provisioned_state, test_config, StaticProbe,
    CREATE_WORKFLOW_ID, DESTROY_WORKFLOW_ID,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_ok;
use vro_client::mock::{MockFailure, MockWorkflowClient, ScriptedWorkflow};
use vro_client::ClientError;
use vro_common::{ExecutionState, ProvisioningState};
use vro_driver::{CompletionPoller, DriverError};

#[tokio::test(start_paused = true)]
async fn test_create_skips_when_already_provisioned() {
    let client = Arc::new(MockWorkflowClient::new());
    let probe = StaticProbe::ready();
    let mut state = provisioned_state();

    controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap();

    assert!(client.submissions().is_empty());
    assert_eq!(probe.calls(), 0);
    assert_eq!(state, provisioned_state());
}

#[tokio::test(start_paused = true)]
async fn test_destroy_skips_when_not_provisioned() {
    let client = Arc::new(MockWorkflowClient::new());
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    controller(test_config(), &client, &probe)
        .destroy(&mut state)
        .await
        .unwrap();

    assert!(client.submissions().is_empty());
    assert_eq!(state, ProvisioningState::default());
}

#[tokio::test(start_paused = true)]
async fn test_create_records_server_and_waits_for_it() {
    let client = Arc::new(
        MockWorkflowClient::new()
            .with_workflow(CREATE_WORKFLOW_ID, create_workflow("server-12345", "1.2.3.4")),
    );
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap();

    assert_eq!(state.server_id.as_deref(), Some("server-12345"));
    assert_eq!(state.hostname.as_deref(), Some("1.2.3.4"));
    assert_eq!(probe.calls(), 1);

    let submissions = client.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].workflow_name, "Create Workflow");
    assert_eq!(submissions[0].workflow_id.as_deref(), Some(CREATE_WORKFLOW_ID));
    assert_eq!(client.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_create_binds_configured_parameters() {
    let mut config = test_config();
    config.create_workflow_parameters = serde_json::json!({"cpu": 2, "template": "centos7"})
        .as_object()
        .cloned()
        .unwrap();
    let client = Arc::new(
        MockWorkflowClient::new()
            .with_workflow(CREATE_WORKFLOW_ID, create_workflow("server-12345", "1.2.3.4")),
    );
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    controller(config, &client, &probe)
        .create(&mut state)
        .await
        .unwrap();

    let submissions = client.submissions();
    let spec = &submissions[0];
    assert_eq!(spec.parameter("cpu"), Some("2"));
    assert_eq!(spec.parameter("template"), Some("centos7"));
}

#[tokio::test(start_paused = true)]
async fn test_create_by_name_when_no_id_configured() {
    let mut config = test_config();
    config.create_workflow_id = None;
    let client = Arc::new(
        MockWorkflowClient::new()
            .with_workflow("Create Workflow", create_workflow("server-1", "10.0.0.1")),
    );
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    controller(config, &client, &probe)
        .create(&mut state)
        .await
        .unwrap();

    assert_eq!(state.server_id.as_deref(), Some("server-1"));
    assert_eq!(client.submissions()[0].workflow_id, None);
}

#[tokio::test(start_paused = true)]
async fn test_create_fails_on_unsuccessful_workflow_without_touching_state() {
    let client = Arc::new(MockWorkflowClient::new().with_workflow(
        CREATE_WORKFLOW_ID,
        ScriptedWorkflow::ending_in(ExecutionState::Failed)
            .with_output("server_id", "server-12345")
            .with_output("ip_address", "1.2.3.4"),
    ));
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    let err = controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::Unsuccessful { ref state } if state == "failed"));
    assert_eq!(state, ProvisioningState::default());
    assert_eq!(probe.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_fails_on_missing_ip_address() {
    let client = Arc::new(MockWorkflowClient::new().with_workflow(
        CREATE_WORKFLOW_ID,
        ScriptedWorkflow::completed().with_output("server_id", "server-12345"),
    ));
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    let err = controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::MissingOutputs));
    assert!(!state.is_provisioned());
}

#[tokio::test(start_paused = true)]
async fn test_create_fails_on_empty_server_id() {
    let client = Arc::new(
        MockWorkflowClient::new().with_workflow(CREATE_WORKFLOW_ID, create_workflow("", "1.2.3.4")),
    );
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    let err = controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::EmptyServerId));
    assert!(!state.is_provisioned());
}

#[tokio::test(start_paused = true)]
async fn test_create_propagates_submission_failure() {
    let client = Arc::new(MockWorkflowClient::new().with_workflow(
        CREATE_WORKFLOW_ID,
        ScriptedWorkflow::completed()
            .failing_submit(MockFailure::BadRequest("an HTTP error occurred".into())),
    ));
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    let err = controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DriverError::Submission(ClientError::BadRequest { .. })
    ));
    assert_eq!(client.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_times_out_with_configured_duration() {
    let mut config = test_config();
    config.request_timeout = 30;
    let client = Arc::new(MockWorkflowClient::new().with_workflow(
        CREATE_WORKFLOW_ID,
        ScriptedWorkflow::ending_in(ExecutionState::Running),
    ));
    let probe = StaticProbe::ready();
    let mut state = ProvisioningState::default();

    let err = controller(config, &client, &probe)
        .create(&mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::Timeout { seconds: 30 }));
    assert!(err.to_string().contains("30 seconds"));
    assert!(!state.is_provisioned());
}

#[tokio::test(start_paused = true)]
async fn test_destroy_binds_server_id_and_clears_state() {
    let mut config = test_config();
    config.destroy_workflow_parameters = serde_json::json!({"force": true})
        .as_object()
        .cloned()
        .unwrap();
    let client = Arc::new(
        MockWorkflowClient::new().with_workflow(DESTROY_WORKFLOW_ID, ScriptedWorkflow::completed()),
    );
    let probe = StaticProbe::ready();
    let mut state = provisioned_state();

    controller(config, &client, &probe)
        .destroy(&mut state)
        .await
        .unwrap();

    let submissions = client.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].workflow_name, "Destroy Workflow");
    assert_eq!(submissions[0].parameter("server_id"), Some("server-12345"));
    assert_eq!(submissions[0].parameter("force"), Some("true"));
    assert!(!state.is_provisioned());
    assert_eq!(state.hostname, None);
}

#[tokio::test(start_paused = true)]
async fn test_destroy_failure_keeps_state() {
    let client = Arc::new(MockWorkflowClient::new().with_workflow(
        DESTROY_WORKFLOW_ID,
        ScriptedWorkflow::ending_in(ExecutionState::Canceled),
    ));
    let probe = StaticProbe::ready();
    let mut state = provisioned_state();

    let err = controller(test_config(), &client, &probe)
        .destroy(&mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::Unsuccessful { ref state } if state == "canceled"));
    assert_eq!(state, provisioned_state());
}

#[tokio::test(start_paused = true)]
async fn test_unready_server_is_destroyed_and_probe_error_returned() {
    let client = Arc::new(
        MockWorkflowClient::new()
            .with_workflow(CREATE_WORKFLOW_ID, create_workflow("server-12345", "1.2.3.4"))
            .with_workflow(DESTROY_WORKFLOW_ID, ScriptedWorkflow::completed()),
    );
    let probe = StaticProbe::unreachable();
    let mut state = ProvisioningState::default();

    let err = controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap_err();

    match err {
        DriverError::Readiness {
            source,
            compensation,
            ..
        } => {
            assert!(source.to_string().contains("connection refused"));
            assert!(compensation.is_none());
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let submissions = client.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].workflow_id.as_deref(), Some(DESTROY_WORKFLOW_ID));
    assert_eq!(submissions[1].parameter("server_id"), Some("server-12345"));
    assert!(!state.is_provisioned());
}

#[tokio::test(start_paused = true)]
async fn test_failed_cleanup_is_attached_to_probe_error() {
    let client = Arc::new(
        MockWorkflowClient::new()
            .with_workflow(CREATE_WORKFLOW_ID, create_workflow("server-12345", "1.2.3.4"))
            .with_workflow(
                DESTROY_WORKFLOW_ID,
                ScriptedWorkflow::completed()
                    .failing_submit(MockFailure::Other("destroy rejected".into())),
            ),
    );
    let probe = StaticProbe::unreachable();
    let mut state = ProvisioningState::default();

    let err = controller(test_config(), &client, &probe)
        .create(&mut state)
        .await
        .unwrap_err();

    match err {
        DriverError::Readiness {
            source,
            compensation: Some(cleanup),
            ..
        } => {
            assert!(source.to_string().contains("connection refused"));
            assert_eq!(cleanup.to_string(), "destroy rejected");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The server is still recorded so a later destroy can retry.
    assert_eq!(state.server_id.as_deref(), Some("server-12345"));
    assert_eq!(state.hostname.as_deref(), Some("1.2.3.4"));
}

#[tokio::test(start_paused = true)]
async fn test_create_then_destroy_round_trip() {
    let client = Arc::new(
        MockWorkflowClient::new()
            .with_workflow(CREATE_WORKFLOW_ID, create_workflow("server-777", "10.1.2.3"))
            .with_workflow(DESTROY_WORKFLOW_ID, ScriptedWorkflow::completed()),
    );
    let probe = StaticProbe::ready();
    let driver = controller(test_config(), &client, &probe)
        .with_poller(
            CompletionPoller::new(Duration::from_secs(60)).with_interval(Duration::from_secs(1)),
        );
    assert_eq!(driver.config().request_timeout, 300);
    let mut state = ProvisioningState::default();

    let start = Instant::now();
    assert_ok!(driver.create(&mut state).await);
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert_ok!(driver.create(&mut state).await);
    assert_eq!(client.submissions().len(), 1);

    assert_ok!(driver.destroy(&mut state).await);
    assert_ok!(driver.destroy(&mut state).await);
    let submissions = client.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].parameter("server_id"), Some("server-777"));
    assert_eq!(state, ProvisioningState::default());
}
