use serde::Serialize;

use crate::error::MedMcpError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, MedMcpError> {
    Ok(serde_json::to_string_pretty(value)?)
}
