use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::security::auth::CredentialIdentity;

/// How long a freshly exchanged token is trusted.
pub const AUTH_CACHE_DURATION: Duration = Duration::hours(1);
/// Records are treated as expired this long before their real expiry.
pub const AUTH_TOKEN_EXPIRY_BUFFER: Duration = Duration::minutes(5);

/// Short-lived authentication material returned by `POST /auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub api_key: String,
    pub token: String,
    pub operator_id: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Build a record that expires one cache duration from now.
    pub fn issued_now(api_key: String, token: String, operator_id: String) -> Self {
        Self {
            api_key,
            token,
            operator_id,
            expires_at: Utc::now() + AUTH_CACHE_DURATION,
        }
    }

    fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - AUTH_TOKEN_EXPIRY_BUFFER
    }
}

/// In-memory token store keyed by credential identity.
///
/// Cloning is cheap and every clone shares the same map. Expiry is checked
/// lazily on read; there is no background sweeper.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    entries: Arc<RwLock<HashMap<CredentialIdentity, CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `identity` unless it is inside the expiry buffer,
    /// in which case it is evicted.
    pub async fn get(&self, identity: &CredentialIdentity) -> Option<CachedToken> {
        let mut entries = self.entries.write().await;
        let Some(cached) = entries.get(identity) else {
            debug!(cache_key = %identity, "No cached auth found");
            return None;
        };

        if !cached.is_usable_at(Utc::now()) {
            info!(
                cache_key = %identity,
                expires_at = %cached.expires_at.to_rfc3339(),
                "Cached auth token expired or expiring soon"
            );
            entries.remove(identity);
            return None;
        }

        debug!(
            cache_key = %identity,
            expires_at = %cached.expires_at.to_rfc3339(),
            "Using cached auth token"
        );
        Some(cached.clone())
    }

    /// Store a record, replacing whatever was there.
    pub async fn set(&self, identity: &CredentialIdentity, record: CachedToken) {
        let expires_at = record.expires_at;
        self.entries.write().await.insert(identity.clone(), record);
        info!(
            cache_key = %identity,
            expires_at = %expires_at.to_rfc3339(),
            "Auth token cached"
        );
    }

    /// Remove one record, or every record when `identity` is `None`.
    pub async fn clear(&self, identity: Option<&CredentialIdentity>) {
        match identity {
            Some(identity) => {
                self.entries.write().await.remove(identity);
                debug!(cache_key = %identity, "Cache cleared");
            }
            None => self.clear_all().await,
        }
    }

    pub async fn clear_all(&self) {
        let mut entries = self.entries.write().await;
        let cleared = entries.len();
        entries.clear();
        info!(entries_cleared = cleared, "All auth cache cleared");
    }

    /// Presence check that does not apply the expiry rule.
    pub async fn contains(&self, identity: &CredentialIdentity) -> bool {
        self.entries.read().await.contains_key(identity)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
