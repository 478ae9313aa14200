use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};

use crate::agent::config::Config;
use crate::client::ClientRegistry;
use crate::commands::CommandSet;
use crate::comms::{serve_stdio, ToolServer};
use crate::security::token_cache::TokenCache;

/// Serve the tool protocol on stdio until EOF or a termination signal, then
/// release every client.
pub async fn run(config: Config) -> Result<()> {
    let registry = Arc::new(ClientRegistry::new(config.registry_config(), TokenCache::new()));
    let commands = CommandSet::all();
    let tool_count = commands.len();
    let server = ToolServer::new(commands, Arc::clone(&registry), config.server_config());

    info!(
        coverage = %config.coverage,
        tools = tool_count,
        version = crate::VERSION,
        "SORACOM MCP Server started"
    );

    tokio::select! {
        result = serve_stdio(server) => match result {
            Ok(()) => info!("host disconnected, starting graceful shutdown"),
            Err(e) => error!(error = %e, "stdio transport failed, starting graceful shutdown"),
        },
        result = wait_for_shutdown() => {
            if let Err(e) = result {
                error!(error = %e, "signal handling failed, shutting down");
            }
        }
    }

    shutdown(&registry).await;
    Ok(())
}

/// Log out and discard every client, then drop every cached token.
///
/// Disposal runs first: a logout that hits a 401 re-authenticates and
/// writes a fresh token back into the cache.
pub async fn shutdown(registry: &ClientRegistry) {
    registry.dispose_all().await;
    registry.token_cache().clear_all().await;
    info!("Graceful shutdown completed");
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            info!("Received SIGINT");
        }
        result = wait_sigterm() => {
            result?;
            info!("Received SIGTERM");
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_sigterm() -> Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_sigterm() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Coverage, RegistryConfig};
    use crate::security::auth::{CredentialIdentity, Credentials};
    use crate::security::token_cache::CachedToken;

    #[tokio::test]
    async fn test_shutdown_clears_cache_and_registry() {
        let registry = ClientRegistry::default();
        registry
            .token_cache()
            .set(
                &CredentialIdentity::from_key_id("K1"),
                CachedToken::issued_now("api".into(), "tok".into(), "OP1".into()),
            )
            .await;

        shutdown(&registry).await;

        assert!(registry.token_cache().is_empty().await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_leaves_no_token_after_reauthenticated_logout() {
        let mut server = mockito::Server::new_async().await;
        let auth = server
            .mock("POST", "/v1/auth")
            .with_status(200)
            .with_body(r#"{"apiKey":"api-1","token":"tok-1","operatorId":"OP1"}"#)
            .expect(2)
            .create_async()
            .await;
        let expired = server
            .mock("POST", "/v1/auth/logout")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let failing = server
            .mock("POST", "/v1/auth/logout")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let config = RegistryConfig {
            jp_endpoint: format!("{}/v1", server.url()),
            ..RegistryConfig::default()
        };
        let registry = ClientRegistry::new(config, TokenCache::new());
        registry
            .acquire(&Credentials::new("K1", "S1"), Coverage::Jp)
            .await
            .unwrap();

        shutdown(&registry).await;

        assert!(registry.is_empty().await);
        assert!(registry.token_cache().is_empty().await);
        auth.assert_async().await;
        expired.assert_async().await;
        failing.assert_async().await;
    }
}
