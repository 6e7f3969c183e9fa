use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// --- Output keys produced by the create workflow ---

pub const OUTPUT_SERVER_ID: &str = "server_id";
pub const OUTPUT_IP_ADDRESS: &str = "ip_address";

/// Input parameter bound onto the destroy workflow.
pub const PARAM_SERVER_ID: &str = "server_id";

// --- Provisioning state ---

/// Durable record of one provisioned server across create/destroy.
///
/// Both fields stay `None` until the create workflow succeeds.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl ProvisioningState {
    /// A state with a non-empty server id is provisioned.
    pub fn is_provisioned(&self) -> bool {
        self.server_id
            .as_deref()
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.server_id = None;
        self.hostname = None;
    }

    /// `hostname (server_id)` for log lines.
    pub fn describe(&self) -> String {
        format!(
            "{} ({})",
            self.hostname.as_deref().unwrap_or("<unknown>"),
            self.server_id.as_deref().unwrap_or("<none>")
        )
    }
}

// --- Workflow invocation ---

/// How a workflow is addressed on the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAddress<'a> {
    Id(&'a str),
    Name(&'a str),
}

/// Which remote workflow to run and with which input parameters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WorkflowInvocationSpec {
    pub workflow_name: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl WorkflowInvocationSpec {
    pub fn new(workflow_name: impl Into<String>, workflow_id: Option<String>) -> Self {
        let workflow_id = workflow_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            workflow_name: workflow_name.into(),
            workflow_id,
            parameters: BTreeMap::new(),
        }
    }

    /// Id wins over name when both are set.
    pub fn address(&self) -> WorkflowAddress<'_> {
        match self.workflow_id.as_deref() {
            Some(id) => WorkflowAddress::Id(id),
            None => WorkflowAddress::Name(&self.workflow_name),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(|s| s.as_str())
    }
}

impl fmt::Display for WorkflowInvocationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.workflow_id {
            Some(id) => write!(f, "'{}' ({})", self.workflow_name, id),
            None => write!(f, "'{}'", self.workflow_name),
        }
    }
}

// --- Execution tokens ---

/// Remote execution state as reported by the workflow service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Running,
    Waiting,
    WaitingSignal,
    Completed,
    Failed,
    Canceled,
    Unknown(String),
}

impl ExecutionState {
    /// Exact match on the wire name; any other spelling is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "waiting" => Self::Waiting,
            "waiting-signal" => Self::WaitingSignal,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            _ => Self::Unknown(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::WaitingSignal => "waiting-signal",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unknown(s) => s,
        }
    }

    /// Still executing on the remote side; the poller keeps waiting.
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Running | Self::Waiting | Self::WaitingSignal)
    }

    pub fn is_successful(&self) -> bool {
        *self == Self::Completed
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExecutionState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExecutionState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// One output value on an execution token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputParameter {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl OutputParameter {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some("string".to_string()),
            value: serde_json::Value::String(value.into()),
        }
    }

    /// Stringified payload. Null renders as the empty string.
    pub fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Snapshot of one remote execution, re-read on every poll.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExecutionToken {
    pub id: String,
    pub workflow_id: String,
    pub state: ExecutionState,
    #[serde(default)]
    pub output_parameters: BTreeMap<String, OutputParameter>,
}

impl ExecutionToken {
    pub fn output(&self, key: &str) -> Option<&OutputParameter> {
        self.output_parameters.get(key)
    }
}
