use async_trait::async_trait;
use thiserror::Error;
use vro_common::{ExecutionToken, WorkflowInvocationSpec};

/// Errors raised by a workflow client.
///
/// `BadRequest` is the malformed-request class: the remote service understood
/// the call and rejected its input. Everything else is transport, auth or an
/// unexpected answer.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("bad request (status {status}): {body}")]
    BadRequest { status: u16, body: String },

    #[error("unexpected response (status {status}): {body}")]
    Unexpected { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ClientError::BadRequest { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Submit an execution of the workflow described by `spec`.
    /// Returns the freshly created token (usually still running).
    async fn execute(&self, spec: &WorkflowInvocationSpec) -> Result<ExecutionToken>;

    /// Re-read a token from the remote service (state and output parameters).
    async fn fetch_token(&self, token: &ExecutionToken) -> Result<ExecutionToken>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str {
        "workflow"
    }
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "vro")]
pub mod vro;
