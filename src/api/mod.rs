//! Thin per-resource wrappers over [`SoracomClient`](crate::client::SoracomClient).
//!
//! Every call is one HTTP request; parameters go out verbatim and the parsed
//! body comes back untouched.

pub mod billing;
pub mod cell_location;
pub mod group;
pub mod query;
pub mod sim;
pub mod stats;

use serde::Serialize;
use serde_json::Value;

use crate::client::error::ClientError;

/// Flatten a params struct into query pairs, skipping nulls.
pub(crate) fn query_pairs<T: Serialize>(params: &T) -> Result<Vec<(String, String)>, ClientError> {
    let value = serde_json::to_value(params)
        .map_err(|e| ClientError::InvalidResponse(format!("encoding query parameters: {e}")))?;

    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}
