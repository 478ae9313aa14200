use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::ClientError;
use super::transport::REQUEST_TIMEOUT;
use super::{ClientKey, Coverage, SoracomClient};
use crate::security::auth::Credentials;
use crate::security::token_cache::TokenCache;

pub const JP_ENDPOINT: &str = "https://api.soracom.io/v1";
pub const GLOBAL_ENDPOINT: &str = "https://g.api.soracom.io/v1";

/// Endpoints and timeout used for every client the registry creates.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub jp_endpoint: String,
    pub global_endpoint: String,
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            jp_endpoint: JP_ENDPOINT.to_string(),
            global_endpoint: GLOBAL_ENDPOINT.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl RegistryConfig {
    pub fn endpoint(&self, coverage: Coverage) -> &str {
        match coverage {
            Coverage::Jp => &self.jp_endpoint,
            Coverage::Global => &self.global_endpoint,
        }
    }
}

/// Owns every live [`SoracomClient`], at most one per identity and coverage.
#[derive(Debug)]
pub struct ClientRegistry {
    config: RegistryConfig,
    token_cache: TokenCache,
    clients: Mutex<HashMap<ClientKey, Arc<SoracomClient>>>,
}

impl ClientRegistry {
    pub fn new(config: RegistryConfig, token_cache: TokenCache) -> Self {
        Self {
            config,
            token_cache,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    /// Get or create the client for `credentials` and `coverage`, then
    /// authenticate it (a cache hit costs no round-trip).
    ///
    /// A client whose authentication fails is removed before the error is
    /// returned. A caller that queued behind such a failure and then
    /// authenticated successfully puts its client back into the empty slot,
    /// so every handle returned here is owned by the registry.
    pub async fn acquire(
        &self,
        credentials: &Credentials,
        coverage: Coverage,
    ) -> Result<Arc<SoracomClient>, ClientError> {
        credentials.validate()?;
        let key = ClientKey::new(credentials, coverage);

        loop {
            let client = self.entry_for(&key, credentials, coverage).await?;

            if let Err(err) = client.authenticate(credentials).await {
                self.evict(&client).await;
                return Err(err);
            }
            if self.retain(&client).await {
                return Ok(client);
            }

            // Another entry took the slot while this one was authenticating.
            debug!(client = %key, "dropping superseded client instance");
            client.discard().await;
        }
    }

    /// Log out (best effort), reset the client and drop it from the registry.
    pub async fn dispose(&self, client: &Arc<SoracomClient>) {
        client.shutdown().await;
        self.evict(client).await;
    }

    /// Dispose every client concurrently, then empty the registry.
    pub async fn dispose_all(&self) {
        let clients: Vec<Arc<SoracomClient>> =
            self.clients.lock().await.values().cloned().collect();
        let count = clients.len();

        join_all(clients.iter().map(|client| self.dispose(client))).await;

        self.clients.lock().await.clear();
        info!(count, "All client instances cleared");
    }

    /// The live client for a key, if any. Does not authenticate.
    pub async fn get(&self, credentials: &Credentials, coverage: Coverage) -> Option<Arc<SoracomClient>> {
        let key = ClientKey::new(credentials, coverage);
        self.clients.lock().await.get(&key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    async fn entry_for(
        &self,
        key: &ClientKey,
        credentials: &Credentials,
        coverage: Coverage,
    ) -> Result<Arc<SoracomClient>, ClientError> {
        let mut clients = self.clients.lock().await;
        if let Some(existing) = clients.get(key) {
            return Ok(Arc::clone(existing));
        }

        debug!(
            auth_key_id = %credentials.auth_key_id,
            coverage = %coverage,
            "Creating new SoracomClient instance"
        );
        let created = Arc::new(SoracomClient::new(
            key.clone(),
            self.config.endpoint(coverage),
            self.config.timeout,
            self.token_cache.clone(),
        )?);
        clients.insert(key.clone(), Arc::clone(&created));
        Ok(created)
    }

    /// True when `client` is (or has just become) the registered entry.
    async fn retain(&self, client: &Arc<SoracomClient>) -> bool {
        let mut clients = self.clients.lock().await;
        match clients.get(client.key()) {
            Some(current) => Arc::ptr_eq(current, client),
            None => {
                clients.insert(client.key().clone(), Arc::clone(client));
                debug!(client = %client.key(), "client restored to registry");
                true
            }
        }
    }

    // Only removes the exact instance; a newer client under the same key stays.
    async fn evict(&self, client: &Arc<SoracomClient>) {
        let mut clients = self.clients.lock().await;
        if clients
            .get(client.key())
            .is_some_and(|current| Arc::ptr_eq(current, client))
        {
            clients.remove(client.key());
            debug!(client = %client.key(), "client removed from registry");
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default(), TokenCache::new())
    }
}
