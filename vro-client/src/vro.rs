use crate::{ClientError, Result, WorkflowClient};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use vro_common::{
    ExecutionState, ExecutionToken, OutputParameter, WorkflowAddress, WorkflowInvocationSpec,
};

/// Connection settings for the remote orchestrator REST API.
#[derive(Clone, Debug)]
pub struct VroSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub verify_ssl: bool,
}

/// REST client for the remote orchestrator (`/vco/api`).
pub struct VroClient {
    client: Client,
    api_root: String,
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct LinkList {
    #[serde(default)]
    link: Vec<Link>,
}

#[derive(Deserialize)]
struct Link {
    #[serde(default)]
    attributes: Vec<Attribute>,
}

#[derive(Deserialize)]
struct Attribute {
    name: String,
    #[serde(default)]
    value: Option<String>,
}

impl Link {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }
}

#[derive(Deserialize)]
struct ExecutionBody {
    #[serde(default)]
    state: Option<String>,
    #[serde(default, rename = "output-parameters")]
    output_parameters: Vec<RawParameter>,
}

#[derive(Deserialize)]
struct RawParameter {
    name: String,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
    #[serde(default)]
    value: serde_json::Value,
}

impl VroClient {
    pub fn new(settings: VroSettings) -> Result<Self> {
        // Default reqwest client has no overall timeout. A stalled orchestrator must not hang a poll.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()?;
        let api_root = format!("{}/vco/api", settings.base_url.trim().trim_end_matches('/'));
        Ok(Self {
            client,
            api_root,
            username: settings.username.trim().to_string(),
            password: settings.password,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST {
            Err(ClientError::BadRequest {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ClientError::Unexpected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Look a workflow up by its display name. Only exact matches count.
    async fn find_workflow_id(&self, name: &str) -> Result<String> {
        let url = format!("{}/workflows", self.api_root);
        let resp = self
            .get(&url)
            .query(&[("conditions", format!("name={}", name))])
            .send()
            .await?;
        let list: LinkList = Self::check(resp).await?.json().await?;
        list.link
            .iter()
            .find(|l| l.attribute("name") == Some(name))
            .and_then(|l| l.attribute("id"))
            .map(|id| id.to_string())
            .ok_or_else(|| ClientError::WorkflowNotFound(name.to_string()))
    }

    async fn resolve_workflow_id(&self, spec: &WorkflowInvocationSpec) -> Result<String> {
        match spec.address() {
            WorkflowAddress::Id(id) => Ok(id.to_string()),
            WorkflowAddress::Name(name) => self.find_workflow_id(name).await,
        }
    }

    fn execution_url(&self, workflow_id: &str, execution_id: &str) -> String {
        format!(
            "{}/workflows/{}/executions/{}",
            self.api_root, workflow_id, execution_id
        )
    }
}

/// Request body for an execution: every parameter is sent as a typed string.
pub fn execution_body(parameters: &BTreeMap<String, String>) -> serde_json::Value {
    let parameters: Vec<serde_json::Value> = parameters
        .iter()
        .map(|(name, value)| {
            json!({
                "name": name,
                "type": "string",
                "scope": "local",
                "value": { "string": { "value": value } }
            })
        })
        .collect();
    json!({ "parameters": parameters })
}

/// Execution id from a `Location` header such as `.../executions/<id>/`.
pub fn execution_id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && *s != "executions")
        .map(|s| s.to_string())
}

/// Unwrap a typed value envelope (`{"string": {"value": "x"}}`) down to its payload.
pub fn unwrap_typed_value(value: &serde_json::Value) -> serde_json::Value {
    match value.as_object() {
        Some(obj) if obj.len() == 1 => obj
            .values()
            .next()
            .and_then(|inner| inner.get("value"))
            .cloned()
            .unwrap_or(serde_json::Value::Null),
        _ => value.clone(),
    }
}

#[async_trait]
impl WorkflowClient for VroClient {
    async fn execute(&self, spec: &WorkflowInvocationSpec) -> Result<ExecutionToken> {
        let workflow_id = self.resolve_workflow_id(spec).await?;
        let url = format!("{}/workflows/{}/executions", self.api_root, workflow_id);

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&execution_body(&spec.parameters))
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                ClientError::InvalidResponse("execution response has no Location header".into())
            })?;
        let execution_id = execution_id_from_location(location).ok_or_else(|| {
            ClientError::InvalidResponse(format!("cannot parse execution id from {}", location))
        })?;

        Ok(ExecutionToken {
            id: execution_id,
            workflow_id,
            state: ExecutionState::Running,
            output_parameters: Default::default(),
        })
    }

    async fn fetch_token(&self, token: &ExecutionToken) -> Result<ExecutionToken> {
        let url = self.execution_url(&token.workflow_id, &token.id);
        let resp = self.get(&url).send().await?;
        let body: ExecutionBody = Self::check(resp).await?.json().await?;

        let state = body
            .state
            .as_deref()
            .map(ExecutionState::parse)
            .ok_or_else(|| ClientError::InvalidResponse(format!("execution {} has no state", token.id)))?;
        let output_parameters = body
            .output_parameters
            .into_iter()
            .map(|p| {
                let param = OutputParameter {
                    name: p.name.clone(),
                    type_name: p.type_name,
                    value: unwrap_typed_value(&p.value),
                };
                (p.name, param)
            })
            .collect();

        Ok(ExecutionToken {
            id: token.id.clone(),
            workflow_id: token.workflow_id.clone(),
            state,
            output_parameters,
        })
    }

    fn name(&self) -> &'static str {
        "vro"
    }
}
