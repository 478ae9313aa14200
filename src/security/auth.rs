use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::error::ClientError;
use crate::client::transport::{ApiRequest, Transport};

/// Long-lived SORACOM auth key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub auth_key_id: String,
    pub auth_key: String,
}

impl Credentials {
    pub fn new(auth_key_id: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self {
            auth_key_id: auth_key_id.into(),
            auth_key: auth_key.into(),
        }
    }

    /// Cache identity for this key. The secret does not take part in it.
    pub fn identity(&self) -> CredentialIdentity {
        CredentialIdentity::from_key_id(&self.auth_key_id)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.auth_key_id.trim().is_empty() || self.auth_key.trim().is_empty() {
            return Err(ClientError::MissingCredentials);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_key_id", &self.auth_key_id)
            .field("auth_key", &"<redacted>")
            .finish()
    }
}

/// Token cache key, `auth:<authKeyId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialIdentity(String);

impl CredentialIdentity {
    pub fn from_key_id(auth_key_id: &str) -> Self {
        Self(format!("auth:{auth_key_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    auth_key_id: &'a str,
    auth_key: &'a str,
}

/// Body of a successful `POST /auth`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub api_key: String,
    pub token: String,
    pub operator_id: String,
}

/// Exchange the long-lived key for a short-lived API key and token.
///
/// Goes out as a single request; an authorization failure here is an
/// authentication error, never a trigger for re-authentication.
pub async fn exchange_credentials(
    transport: &Transport,
    credentials: &Credentials,
) -> Result<AuthResponse, ClientError> {
    let payload = serde_json::to_value(AuthRequest {
        auth_key_id: &credentials.auth_key_id,
        auth_key: &credentials.auth_key,
    })
    .map_err(|e| ClientError::Authentication(e.to_string()))?;

    debug!(
        auth_key_id = %credentials.auth_key_id,
        base_url = %transport.base_url(),
        "exchanging auth key for API token"
    );

    let body = transport
        .send_once(&ApiRequest::post("/auth", Some(payload)), None)
        .await
        .map_err(|err| {
            warn!(
                auth_key_id = %credentials.auth_key_id,
                error = %err,
                "credential exchange rejected"
            );
            ClientError::Authentication(err.remote_message())
        })?;

    serde_json::from_value(body)
        .map_err(|e| ClientError::Authentication(format!("unexpected auth response: {e}")))
}
