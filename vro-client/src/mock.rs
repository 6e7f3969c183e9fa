use crate::{ClientError, Result, WorkflowClient};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use vro_common::{
    ExecutionState, ExecutionToken, OutputParameter, WorkflowAddress, WorkflowInvocationSpec,
};

/// Failure a scripted workflow raises instead of behaving normally.
#[derive(Clone, Debug)]
pub enum MockFailure {
    BadRequest(String),
    Other(String),
}

impl MockFailure {
    fn to_error(&self) -> ClientError {
        match self {
            MockFailure::BadRequest(body) => ClientError::BadRequest {
                status: 400,
                body: body.clone(),
            },
            MockFailure::Other(msg) => ClientError::Other(msg.clone()),
        }
    }
}

/// Scripted behavior of one workflow.
///
/// Each fetch returns the next entry of `states`; the last one repeats.
/// Output parameters are only visible once the state is no longer alive.
#[derive(Clone, Debug, Default)]
pub struct ScriptedWorkflow {
    pub states: Vec<ExecutionState>,
    pub outputs: Vec<OutputParameter>,
    pub submit_failure: Option<MockFailure>,
    pub fetch_failure: Option<MockFailure>,
}

impl ScriptedWorkflow {
    pub fn completed() -> Self {
        Self {
            states: vec![ExecutionState::Completed],
            ..Default::default()
        }
    }

    pub fn ending_in(state: ExecutionState) -> Self {
        Self {
            states: vec![state],
            ..Default::default()
        }
    }

    pub fn with_states(mut self, states: Vec<ExecutionState>) -> Self {
        self.states = states;
        self
    }

    pub fn with_output(mut self, name: &str, value: &str) -> Self {
        self.outputs.push(OutputParameter::string(name, value));
        self
    }

    pub fn with_output_parameter(mut self, param: OutputParameter) -> Self {
        self.outputs.push(param);
        self
    }

    pub fn failing_submit(mut self, failure: MockFailure) -> Self {
        self.submit_failure = Some(failure);
        self
    }

    pub fn failing_fetch(mut self, failure: MockFailure) -> Self {
        self.fetch_failure = Some(failure);
        self
    }
}

struct MockExecution {
    key: String,
    fetches: usize,
}

#[derive(Default)]
struct MockInner {
    workflows: HashMap<String, ScriptedWorkflow>,
    executions: HashMap<String, MockExecution>,
    submissions: Vec<WorkflowInvocationSpec>,
    fetches: usize,
}

/// In-memory workflow engine for tests and dry runs.
///
/// Workflows are scripted by id or by name; a spec is matched by its id first.
#[derive(Default)]
pub struct MockWorkflowClient {
    inner: Mutex<MockInner>,
}

impl MockWorkflowClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(self, key: impl Into<String>, script: ScriptedWorkflow) -> Self {
        self.lock().workflows.insert(key.into(), script);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        // A panicking test thread must not hide the recorded calls from the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every spec submitted so far, in order.
    pub fn submissions(&self) -> Vec<WorkflowInvocationSpec> {
        self.lock().submissions.clone()
    }

    /// Total number of token fetches across all executions.
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    fn resolve_key(inner: &MockInner, spec: &WorkflowInvocationSpec) -> Option<String> {
        if let WorkflowAddress::Id(id) = spec.address() {
            if inner.workflows.contains_key(id) {
                return Some(id.to_string());
            }
        }
        if inner.workflows.contains_key(&spec.workflow_name) {
            return Some(spec.workflow_name.clone());
        }
        None
    }
}

#[async_trait]
impl WorkflowClient for MockWorkflowClient {
    async fn execute(&self, spec: &WorkflowInvocationSpec) -> Result<ExecutionToken> {
        let mut inner = self.lock();
        inner.submissions.push(spec.clone());

        let key = Self::resolve_key(&inner, spec)
            .ok_or_else(|| ClientError::WorkflowNotFound(spec.workflow_name.clone()))?;
        if let Some(failure) = inner
            .workflows
            .get(&key)
            .and_then(|w| w.submit_failure.as_ref())
        {
            return Err(failure.to_error());
        }

        let execution_id = uuid::Uuid::new_v4().to_string();
        inner.executions.insert(
            execution_id.clone(),
            MockExecution {
                key: key.clone(),
                fetches: 0,
            },
        );

        Ok(ExecutionToken {
            id: execution_id,
            workflow_id: spec.workflow_id.clone().unwrap_or(key),
            state: ExecutionState::Running,
            output_parameters: Default::default(),
        })
    }

    async fn fetch_token(&self, token: &ExecutionToken) -> Result<ExecutionToken> {
        let mut inner = self.lock();
        inner.fetches += 1;

        let (key, index) = {
            let execution = inner.executions.get_mut(&token.id).ok_or_else(|| {
                ClientError::InvalidResponse(format!("unknown execution {}", token.id))
            })?;
            let index = execution.fetches;
            execution.fetches += 1;
            (execution.key.clone(), index)
        };
        let script = inner
            .workflows
            .get(&key)
            .ok_or_else(|| ClientError::WorkflowNotFound(key.clone()))?;

        if let Some(failure) = &script.fetch_failure {
            return Err(failure.to_error());
        }

        let state = match script.states.as_slice() {
            [] => ExecutionState::Completed,
            states => states[index.min(states.len() - 1)].clone(),
        };
        let output_parameters = if state.is_alive() {
            Default::default()
        } else {
            script
                .outputs
                .iter()
                .map(|p| (p.name.clone(), p.clone()))
                .collect()
        };

        Ok(ExecutionToken {
            id: token.id.clone(),
            workflow_id: token.workflow_id.clone(),
            state,
            output_parameters,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
