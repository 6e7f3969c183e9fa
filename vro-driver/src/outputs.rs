use vro_common::{ExecutionToken, OUTPUT_IP_ADDRESS, OUTPUT_SERVER_ID};

use crate::error::{DriverError, Result};

/// True only for the exact success state.
pub fn workflow_successful(token: &ExecutionToken) -> bool {
    token.state.is_successful()
}

/// Fail with `Unsuccessful` unless the token completed.
pub fn ensure_successful(token: &ExecutionToken) -> Result<()> {
    if workflow_successful(token) {
        Ok(())
    } else {
        Err(DriverError::Unsuccessful {
            state: token.state.to_string(),
        })
    }
}

/// Stringified value of an output parameter, `None` if the key is absent.
pub fn output_value(token: &ExecutionToken, key: &str) -> Option<String> {
    token.output(key).map(|p| p.value_string())
}

fn output_empty(token: &ExecutionToken, key: &str) -> bool {
    output_value(token, key)
        .map(|v| v.is_empty())
        .unwrap_or(true)
}

/// Both `server_id` and `ip_address` must be present and non-empty.
pub fn validate_create_outputs(token: &ExecutionToken) -> Result<()> {
    if token.output(OUTPUT_SERVER_ID).is_none() || token.output(OUTPUT_IP_ADDRESS).is_none() {
        return Err(DriverError::MissingOutputs);
    }
    if output_empty(token, OUTPUT_SERVER_ID) {
        return Err(DriverError::EmptyServerId);
    }
    if output_empty(token, OUTPUT_IP_ADDRESS) {
        return Err(DriverError::EmptyIpAddress);
    }
    Ok(())
}

/// Validated `(server_id, ip_address)` of a finished create workflow.
pub fn extract_create_outputs(token: &ExecutionToken) -> Result<(String, String)> {
    validate_create_outputs(token)?;
    match (
        output_value(token, OUTPUT_SERVER_ID),
        output_value(token, OUTPUT_IP_ADDRESS),
    ) {
        (Some(server_id), Some(ip)) => Ok((server_id, ip)),
        _ => Err(DriverError::MissingOutputs),
    }
}
