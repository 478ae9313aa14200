use serde::de::DeserializeOwned;
use serde_json::Value;

use super::CommandError;

/// Default page size when the caller gives no `limit`.
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_GROUP_LIST_LIMIT: u32 = 100;
pub const MAX_SIM_SEARCH_LIMIT: u32 = 100;
pub const MAX_SIM_ID_LENGTH: usize = 100;

/// Deserialize tool arguments; a missing argument object counts as `{}`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, CommandError> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| CommandError::InvalidParameters(e.to_string()))
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), CommandError> {
    if value.trim().is_empty() {
        return Err(CommandError::InvalidParameters(format!("{field} is required")));
    }
    Ok(())
}

pub fn check_sim_id(sim_id: &str) -> Result<(), CommandError> {
    require_non_empty("sim_id", sim_id)?;
    if sim_id.len() > MAX_SIM_ID_LENGTH {
        return Err(CommandError::InvalidParameters(format!(
            "sim_id must be at most {MAX_SIM_ID_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Apply the default page size and enforce `1..=max`.
pub fn page_limit(limit: Option<u32>, max: Option<u32>) -> Result<u32, CommandError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(CommandError::InvalidParameters(
            "limit must be at least 1".to_string(),
        ));
    }
    if let Some(max) = max {
        if limit > max {
            return Err(CommandError::InvalidParameters(format!(
                "limit must be at most {max}"
            )));
        }
    }
    Ok(limit)
}
