use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::ClientError;
use super::transport::{ApiRequest, AuthHeaders};
use super::SoracomClient;
use crate::security::auth::{exchange_credentials, Credentials};
use crate::security::token_cache::CachedToken;

impl SoracomClient {
    /// Send `request` and recover once from an authorization failure.
    ///
    /// On a 401 for a request that has not been retried yet, and when the
    /// entry still holds its long-lived credentials, the cached token is
    /// evicted, a live re-authentication is performed and the original
    /// request is resubmitted exactly once. If re-authentication fails the
    /// original 401 is returned.
    pub(crate) async fn execute(&self, mut request: ApiRequest) -> Result<Value, ClientError> {
        let headers = self.auth_headers().await;
        let original = match self.transport.send_once(&request, headers.as_ref()).await {
            Ok(body) => return Ok(body),
            Err(err) => err,
        };

        if !original.is_unauthorized() || request.retried {
            return Err(original);
        }
        let Some(credentials) = self.credentials.read().await.clone() else {
            debug!(client = %self.key, "401 received but no credentials available for re-authentication");
            return Err(original);
        };

        request.retried = true;
        info!(
            client = %self.key,
            method = %request.method,
            url = %request.path,
            "Received 401, re-authenticating before retrying request"
        );

        match self.reauthenticate(&credentials).await {
            Ok(fresh) => self.transport.send_once(&request, Some(&fresh)).await,
            Err(reauth_err) => {
                warn!(
                    client = %self.key,
                    error = %reauth_err,
                    "Re-authentication failed, returning original error"
                );
                Err(original)
            }
        }
    }

    /// Forced re-authentication that never consults the token cache.
    async fn reauthenticate(&self, credentials: &Credentials) -> Result<AuthHeaders, ClientError> {
        let _guard = self.auth_lock.lock().await;
        let identity = credentials.identity();

        self.token_cache.clear(Some(&identity)).await;
        self.clear_session().await;

        let response = exchange_credentials(&self.transport, credentials).await?;
        let record = CachedToken::issued_now(response.api_key, response.token, response.operator_id);
        let headers = AuthHeaders {
            api_key: record.api_key.clone(),
            token: record.token.clone(),
        };

        self.adopt(&record).await;
        self.token_cache.set(&identity, record).await;
        Ok(headers)
    }
}
