use serde::Deserialize;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use vro_common::WorkflowInvocationSpec;

use crate::error::{DriverError, Result};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Driver settings: orchestrator endpoint, credentials and the two workflows.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    pub vro_base_url: String,
    pub vro_username: String,
    pub vro_password: String,
    #[serde(default)]
    pub vro_disable_ssl_verify: bool,

    pub create_workflow_name: String,
    #[serde(default)]
    pub create_workflow_id: Option<String>,
    pub destroy_workflow_name: String,
    #[serde(default)]
    pub destroy_workflow_id: Option<String>,

    #[serde(default)]
    pub create_workflow_parameters: Map<String, Value>,
    #[serde(default)]
    pub destroy_workflow_parameters: Map<String, Value>,

    /// Seconds to wait for a workflow execution to finish.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_params(var: &str, raw: Option<String>) -> Result<Map<String, Value>> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DriverError::Config(format!("{} must be a JSON object", var))),
        Err(e) => Err(DriverError::Config(format!("{} is not valid JSON: {}", var, e))),
    }
}

impl DriverConfig {
    /// Load from the process environment (after `.env`, if any).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup using the environment variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| DriverError::Config(format!("{} must be set", key)))
        };
        let optional = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        // Prefer *_FILE for secrets (Docker/K8s friendly), fallback to env var.
        let vro_password = match optional("VRO_PASSWORD_FILE") {
            Some(path) => fs::read_to_string(&path)
                .map(|s| s.trim_end_matches(['\r', '\n']).to_string())
                .map_err(|e| {
                    DriverError::Config(format!("cannot read VRO_PASSWORD_FILE {}: {}", path, e))
                })?,
            None => required("VRO_PASSWORD")?,
        };

        let request_timeout = match optional("REQUEST_TIMEOUT") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                DriverError::Config(format!("REQUEST_TIMEOUT must be a number of seconds: {}", e))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let config = Self {
            vro_base_url: required("VRO_BASE_URL")?,
            vro_username: required("VRO_USERNAME")?,
            vro_password,
            vro_disable_ssl_verify: optional("VRO_DISABLE_SSL_VERIFY")
                .map(|s| parse_bool(&s))
                .unwrap_or(false),
            create_workflow_name: required("CREATE_WORKFLOW_NAME")?,
            create_workflow_id: optional("CREATE_WORKFLOW_ID"),
            destroy_workflow_name: required("DESTROY_WORKFLOW_NAME")?,
            destroy_workflow_id: optional("DESTROY_WORKFLOW_ID"),
            create_workflow_parameters: parse_params(
                "CREATE_WORKFLOW_PARAMETERS",
                lookup("CREATE_WORKFLOW_PARAMETERS"),
            )?,
            destroy_workflow_parameters: parse_params(
                "DESTROY_WORKFLOW_PARAMETERS",
                lookup("DESTROY_WORKFLOW_PARAMETERS"),
            )?,
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file using the field names of this struct.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("vro_base_url", &self.vro_base_url),
            ("vro_username", &self.vro_username),
            ("vro_password", &self.vro_password),
            ("create_workflow_name", &self.create_workflow_name),
            ("destroy_workflow_name", &self.destroy_workflow_name),
        ] {
            if value.trim().is_empty() {
                return Err(DriverError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.request_timeout == 0 {
            return Err(DriverError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn verify_ssl(&self) -> bool {
        !self.vro_disable_ssl_verify
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Fresh, unbound spec for the create workflow.
    pub fn create_spec(&self) -> WorkflowInvocationSpec {
        WorkflowInvocationSpec::new(&self.create_workflow_name, self.create_workflow_id.clone())
    }

    /// Fresh, unbound spec for the destroy workflow.
    pub fn destroy_spec(&self) -> WorkflowInvocationSpec {
        WorkflowInvocationSpec::new(&self.destroy_workflow_name, self.destroy_workflow_id.clone())
    }
}
