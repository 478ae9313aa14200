use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("SORACOM credentials not configured")]
    MissingCredentials,
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Not authenticated. Operator ID is required.")]
    MissingOperatorId,
    #[error("Logout failed: {0}")]
    Logout(String),
    #[error("Request failed with status code {}: {message}", status.as_u16())]
    Status { status: StatusCode, message: String },
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Timeouts and connection failures; never retried by the client.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::Connection(_))
    }

    /// The remote message when there is one, otherwise the rendered error.
    pub fn remote_message(&self) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}
