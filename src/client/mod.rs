//! Authenticated SORACOM API clients.
//!
//! A [`SoracomClient`] is one registry entry: a region-bound transport, the
//! current short-lived token state and the long-lived credentials needed to
//! re-authenticate. Entries are created and owned by [`ClientRegistry`];
//! callers only ever hold an `Arc` handle.

pub mod error;
pub mod registry;
mod retry;
pub mod transport;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::api::billing::BillingApi;
use crate::api::cell_location::CellLocationApi;
use crate::api::group::GroupApi;
use crate::api::query::QueryApi;
use crate::api::sim::SimApi;
use crate::api::stats::StatsApi;
use crate::security::auth::{exchange_credentials, CredentialIdentity, Credentials};
use crate::security::token_cache::{CachedToken, TokenCache};

pub use error::ClientError;
pub use registry::{ClientRegistry, RegistryConfig};
use transport::{ApiRequest, AuthHeaders, Transport};

/// API coverage area; selects the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Coverage {
    #[default]
    #[serde(rename = "jp")]
    Jp,
    #[serde(rename = "g")]
    Global,
}

impl Coverage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coverage::Jp => "jp",
            Coverage::Global => "g",
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Coverage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jp" => Ok(Coverage::Jp),
            "g" => Ok(Coverage::Global),
            other => Err(format!("unknown coverage type '{other}' (expected 'jp' or 'g')")),
        }
    }
}

/// Registry key: one live client per credential identity and coverage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub identity: CredentialIdentity,
    pub coverage: Coverage,
}

impl ClientKey {
    pub fn new(credentials: &Credentials, coverage: Coverage) -> Self {
        Self {
            identity: credentials.identity(),
            coverage,
        }
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity, self.coverage)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    api_key: Option<String>,
    token: Option<String>,
    operator_id: Option<String>,
}

impl SessionState {
    fn headers(&self) -> Option<AuthHeaders> {
        match (&self.api_key, &self.token) {
            (Some(api_key), Some(token)) => Some(AuthHeaders {
                api_key: api_key.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }
}

pub struct SoracomClient {
    key: ClientKey,
    transport: Transport,
    token_cache: TokenCache,
    session: RwLock<SessionState>,
    credentials: RwLock<Option<Credentials>>,
    // Serialises authentication so concurrent acquisitions share one exchange.
    auth_lock: Mutex<()>,
}

impl fmt::Debug for SoracomClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoracomClient")
            .field("key", &self.key)
            .field("base_url", &self.transport.base_url())
            .finish_non_exhaustive()
    }
}

impl SoracomClient {
    pub(crate) fn new(
        key: ClientKey,
        base_url: &str,
        timeout: Duration,
        token_cache: TokenCache,
    ) -> Result<Self, ClientError> {
        let transport = Transport::new(base_url, timeout)?;
        info!(
            coverage = %key.coverage,
            base_url = %transport.base_url(),
            timeout_ms = timeout.as_millis() as u64,
            "Creating SoracomClient"
        );

        Ok(Self {
            key,
            transport,
            token_cache,
            session: RwLock::new(SessionState::default()),
            credentials: RwLock::new(None),
            auth_lock: Mutex::new(()),
        })
    }

    pub fn key(&self) -> &ClientKey {
        &self.key
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Authenticate with `credentials`, reusing a cached token when one is
    /// still valid. Only a cache miss reaches the remote `/auth` endpoint.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<(), ClientError> {
        let _guard = self.auth_lock.lock().await;
        *self.credentials.write().await = Some(credentials.clone());

        let identity = credentials.identity();
        if let Some(cached) = self.token_cache.get(&identity).await {
            self.adopt(&cached).await;
            return Ok(());
        }

        let response = exchange_credentials(&self.transport, credentials).await?;
        let record = CachedToken::issued_now(response.api_key, response.token, response.operator_id);
        self.adopt(&record).await;
        self.token_cache.set(&identity, record).await;
        Ok(())
    }

    /// Call `POST /auth/logout` and drop the session.
    ///
    /// When `auth_key_id` is given its cached token is evicted as well.
    pub async fn logout(&self, auth_key_id: Option<&str>) -> Result<(), ClientError> {
        if !self.is_authenticated().await {
            return Err(ClientError::NotAuthenticated);
        }

        self.execute(ApiRequest::post("/auth/logout", None))
            .await
            .map_err(|err| ClientError::Logout(err.remote_message()))?;

        self.clear_session().await;
        if let Some(auth_key_id) = auth_key_id {
            self.token_cache
                .clear(Some(&CredentialIdentity::from_key_id(auth_key_id)))
                .await;
        }
        Ok(())
    }

    /// Best-effort logout followed by a full reset of local state. Never fails.
    pub(crate) async fn shutdown(&self) {
        if self.is_authenticated().await {
            let auth_key_id = self
                .credentials
                .read()
                .await
                .as_ref()
                .map(|c| c.auth_key_id.clone());
            if let Err(err) = self.logout(auth_key_id.as_deref()).await {
                warn!(client = %self.key, error = %err, "Error during dispose");
            }
        }

        self.discard().await;
    }

    /// Drop session and credentials locally without contacting the API.
    pub(crate) async fn discard(&self) {
        self.clear_session().await;
        *self.credentials.write().await = None;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.headers().is_some()
    }

    pub async fn operator_id(&self) -> Option<String> {
        self.session.read().await.operator_id.clone()
    }

    pub fn sim(&self) -> SimApi<'_> {
        SimApi::new(self)
    }

    pub fn billing(&self) -> BillingApi<'_> {
        BillingApi::new(self)
    }

    pub fn group(&self) -> GroupApi<'_> {
        GroupApi::new(self)
    }

    pub fn query(&self) -> QueryApi<'_> {
        QueryApi::new(self)
    }

    pub fn stats(&self) -> StatsApi<'_> {
        StatsApi::new(self)
    }

    pub fn cell_location(&self) -> CellLocationApi<'_> {
        CellLocationApi::new(self)
    }

    /// Issue one request through the re-authenticating call path.
    pub async fn request(&self, request: ApiRequest) -> Result<Value, ClientError> {
        self.execute(request).await
    }

    async fn adopt(&self, record: &CachedToken) {
        let mut session = self.session.write().await;
        session.api_key = Some(record.api_key.clone());
        session.token = Some(record.token.clone());
        session.operator_id = Some(record.operator_id.clone());
    }

    async fn clear_session(&self) {
        *self.session.write().await = SessionState::default();
    }

    async fn auth_headers(&self) -> Option<AuthHeaders> {
        self.session.read().await.headers()
    }
}
