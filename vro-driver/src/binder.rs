use serde_json::{Map, Value};
use std::collections::BTreeMap;
use vro_common::WorkflowInvocationSpec;

use crate::error::{DriverError, Result};

/// Scalar -> string. Null binds as the empty string; arrays and objects are rejected.
fn coerce(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(_) | Value::Object(_) => Err(DriverError::InvalidParameter {
            name: name.to_string(),
            reason: "only scalar values can be bound".to_string(),
        }),
    }
}

/// Bind `params` onto `spec`, every value as a string.
///
/// Unknown keys pass through untouched. The spec is only modified once every
/// value coerced, so a failed bind leaves it as it was.
pub fn bind_parameters(
    spec: &mut WorkflowInvocationSpec,
    params: &Map<String, Value>,
) -> Result<()> {
    let bound = params
        .iter()
        .map(|(name, value)| Ok((name.clone(), coerce(name, value)?)))
        .collect::<Result<BTreeMap<String, String>>>()?;

    spec.parameters.extend(bound);
    Ok(())
}
