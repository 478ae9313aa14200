use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use soracom_mcp::client::{ClientError, ClientRegistry, Coverage, RegistryConfig};
use soracom_mcp::security::auth::{CredentialIdentity, Credentials};
use soracom_mcp::security::token_cache::{CachedToken, TokenCache};

fn registry_for(server: &ServerGuard) -> ClientRegistry {
    registry_at(&server.url(), Duration::from_secs(5))
}

fn registry_at(base: &str, timeout: Duration) -> ClientRegistry {
    let config = RegistryConfig {
        jp_endpoint: format!("{base}/v1"),
        global_endpoint: format!("{base}/g/v1"),
        timeout,
    };
    ClientRegistry::new(config, TokenCache::new())
}

fn auth_body(token: &str) -> String {
    json!({
        "apiKey": format!("api-{token}"),
        "token": token,
        "operatorId": "OP0123456789"
    })
    .to_string()
}

fn k1() -> Credentials {
    Credentials::new("K1", "S1")
}

#[tokio::test]
async fn acquire_authenticates_and_exposes_operator() {
    let mut server = Server::new_async().await;
    let auth = server
        .mock("POST", "/v1/auth")
        .match_body(Matcher::Json(json!({"authKeyId": "K1", "authKey": "S1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(auth_body("tok-1"))
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    let client = registry.acquire(&k1(), Coverage::Jp).await.unwrap();

    assert!(client.is_authenticated().await);
    assert_eq!(client.operator_id().await.as_deref(), Some("OP0123456789"));
    assert!(registry
        .token_cache()
        .contains(&CredentialIdentity::from_key_id("K1"))
        .await);
    auth.assert_async().await;
}

#[tokio::test]
async fn repeated_acquire_hits_the_cache() {
    let mut server = Server::new_async().await;
    let auth = server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("tok-1"))
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    let first = registry.acquire(&k1(), Coverage::Jp).await.unwrap();
    let second = registry.acquire(&k1(), Coverage::Jp).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len().await, 1);
    auth.assert_async().await;
}

#[tokio::test]
async fn concurrent_first_acquisitions_share_one_entry() {
    let mut server = Server::new_async().await;
    let auth = server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("tok-1"))
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    let credentials = k1();
    let clients = join_all((0..8).map(|_| registry.acquire(&credentials, Coverage::Jp))).await;

    let clients: Vec<_> = clients.into_iter().map(Result::unwrap).collect();
    assert!(clients.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(registry.len().await, 1);
    auth.assert_async().await;
}

#[tokio::test]
async fn coverages_get_independent_entries() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("tok-1"))
        .create_async()
        .await;
    let logout = server
        .mock("POST", "/v1/auth/logout")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    let jp = registry.acquire(&k1(), Coverage::Jp).await.unwrap();
    let global = registry.acquire(&k1(), Coverage::Global).await.unwrap();

    assert!(!Arc::ptr_eq(&jp, &global));
    assert_eq!(registry.len().await, 2);
    assert_eq!(global.base_url(), format!("{}/g/v1", server.url()));

    jp.logout(None).await.unwrap();
    assert!(!jp.is_authenticated().await);
    assert!(global.is_authenticated().await);
    logout.assert_async().await;
}

#[tokio::test]
async fn failed_authentication_removes_the_entry() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/auth")
        .with_status(401)
        .with_body(json!({"code": "AUM0001", "message": "Invalid auth key"}).to_string())
        .create_async()
        .await;

    let registry = registry_for(&server);
    let err = registry.acquire(&k1(), Coverage::Jp).await.unwrap_err();

    assert!(matches!(err, ClientError::Authentication(_)));
    assert_eq!(err.to_string(), "Authentication failed: Invalid auth key");
    assert!(registry.is_empty().await);
    assert!(registry.token_cache().is_empty().await);
}

async fn seed_stale_token(registry: &ClientRegistry) {
    registry
        .token_cache()
        .set(
            &CredentialIdentity::from_key_id("K1"),
            CachedToken::issued_now("api-stale".into(), "stale".into(), "OP0123456789".into()),
        )
        .await;
}

#[tokio::test]
async fn unauthorized_request_reauthenticates_and_retries_once() {
    let mut server = Server::new_async().await;
    let auth = server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("fresh"))
        .expect(1)
        .create_async()
        .await;
    let stale = server
        .mock("GET", "/v1/sims/8942310022000012345")
        .match_header("X-Soracom-Token", "stale")
        .with_status(401)
        .with_body(json!({"message": "Invalid token"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/v1/sims/8942310022000012345")
        .match_header("X-Soracom-Token", "fresh")
        .match_header("X-Soracom-API-Key", "api-fresh")
        .with_status(200)
        .with_body(json!({"simId": "8942310022000012345", "status": "active"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    seed_stale_token(&registry).await;
    let client = registry.acquire(&k1(), Coverage::Jp).await.unwrap();

    let sim = client.sim().get_sim("8942310022000012345").await.unwrap();
    assert_eq!(sim["status"], "active");

    let cached = registry
        .token_cache()
        .get(&CredentialIdentity::from_key_id("K1"))
        .await
        .unwrap();
    assert_eq!(cached.token, "fresh");

    auth.assert_async().await;
    stale.assert_async().await;
    fresh.assert_async().await;
}

#[tokio::test]
async fn second_unauthorized_response_is_not_retried() {
    let mut server = Server::new_async().await;
    let auth = server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("fresh"))
        .expect(1)
        .create_async()
        .await;
    let sims = server
        .mock("GET", "/v1/groups/g-1")
        .with_status(401)
        .with_body(json!({"message": "Forbidden operator"}).to_string())
        .expect(2)
        .create_async()
        .await;

    let registry = registry_for(&server);
    seed_stale_token(&registry).await;
    let client = registry.acquire(&k1(), Coverage::Jp).await.unwrap();

    let err = client.group().get_group("g-1").await.unwrap_err();
    assert!(err.is_unauthorized());

    auth.assert_async().await;
    sims.assert_async().await;
}

#[tokio::test]
async fn failed_reauthentication_surfaces_original_error() {
    let mut server = Server::new_async().await;
    let auth = server
        .mock("POST", "/v1/auth")
        .with_status(500)
        .with_body(json!({"message": "auth backend down"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let bills = server
        .mock("GET", "/v1/bills/latest")
        .with_status(401)
        .with_body(json!({"message": "Invalid token"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    seed_stale_token(&registry).await;
    let client = registry.acquire(&k1(), Coverage::Jp).await.unwrap();

    let err = client.billing().get_latest_billing().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Request failed with status code 401: Invalid token");
    assert!(!client.is_authenticated().await);
    assert!(registry.token_cache().is_empty().await);

    auth.assert_async().await;
    bills.assert_async().await;
}

#[tokio::test]
async fn non_auth_failures_pass_through_untouched() {
    let mut server = Server::new_async().await;
    let auth = server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("tok-1"))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/sims/missing")
        .with_status(404)
        .with_body(json!({"message": "SIM not found"}).to_string())
        .create_async()
        .await;

    let registry = registry_for(&server);
    let client = registry.acquire(&k1(), Coverage::Jp).await.unwrap();
    let err = client.sim().get_sim("missing").await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert!(client.is_authenticated().await);
    auth.assert_async().await;
}

#[tokio::test]
async fn dispose_all_tolerates_failed_logout() {
    let mut server = Server::new_async().await;
    for (key_id, token) in [("K1", "tok-1"), ("K2", "tok-2"), ("K3", "tok-3")] {
        server
            .mock("POST", "/v1/auth")
            .match_body(Matcher::PartialJson(json!({"authKeyId": key_id})))
            .with_status(200)
            .with_body(auth_body(token))
            .create_async()
            .await;
    }
    let ok_logouts = server
        .mock("POST", "/v1/auth/logout")
        .match_header("X-Soracom-Token", Matcher::Regex("^tok-[13]$".into()))
        .with_status(200)
        .expect(2)
        .create_async()
        .await;
    let failing_logout = server
        .mock("POST", "/v1/auth/logout")
        .match_header("X-Soracom-Token", "tok-2")
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    let mut clients = Vec::new();
    for key_id in ["K1", "K2", "K3"] {
        let credentials = Credentials::new(key_id, "secret");
        clients.push(registry.acquire(&credentials, Coverage::Jp).await.unwrap());
    }
    assert_eq!(registry.len().await, 3);

    registry.dispose_all().await;

    assert!(registry.is_empty().await);
    for client in &clients {
        assert!(!client.is_authenticated().await);
    }
    ok_logouts.assert_async().await;
    failing_logout.assert_async().await;
}

#[tokio::test]
async fn dispose_evicts_only_that_client() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("tok-1"))
        .create_async()
        .await;
    server
        .mock("POST", Matcher::Regex("^(/g)?/v1/auth/logout$".into()))
        .with_status(200)
        .create_async()
        .await;

    let registry = registry_for(&server);
    let jp = registry.acquire(&k1(), Coverage::Jp).await.unwrap();
    let global = registry.acquire(&k1(), Coverage::Global).await.unwrap();

    registry.dispose(&jp).await;

    assert!(registry.get(&k1(), Coverage::Jp).await.is_none());
    assert!(registry.get(&k1(), Coverage::Global).await.is_some());
    assert!(global.is_authenticated().await);
}

#[tokio::test]
async fn waiter_behind_failed_authentication_stays_registered() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("POST", "/v1/auth")
        .with_status(500)
        .with_body(json!({"message": "temporarily unavailable"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/v1/auth")
        .with_status(200)
        .with_body(auth_body("tok-1"))
        .expect(1)
        .create_async()
        .await;

    let registry = registry_for(&server);
    let credentials = k1();
    let (first, second) = tokio::join!(
        registry.acquire(&credentials, Coverage::Jp),
        registry.acquire(&credentials, Coverage::Jp)
    );

    assert!(matches!(first, Err(ClientError::Authentication(_))));
    let second = second.unwrap();
    assert!(second.is_authenticated().await);

    let registered = registry.get(&credentials, Coverage::Jp).await.unwrap();
    assert!(Arc::ptr_eq(&registered, &second));
    assert_eq!(registry.len().await, 1);

    rejected.assert_async().await;
    accepted.assert_async().await;
}

/// Accepts connections and never answers; returns the address and an accept counter.
async fn silent_listener() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });
    (format!("http://{addr}"), accepted)
}

async fn refused_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn unreachable_auth_endpoint_fails_acquire_without_entry() {
    let registry = registry_at(&refused_base().await, Duration::from_secs(2));

    let err = registry.acquire(&k1(), Coverage::Jp).await.unwrap_err();

    match err {
        ClientError::Authentication(message) => assert!(message.starts_with("Connection failed")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(registry.is_empty().await);
    assert!(registry.token_cache().is_empty().await);
}

#[tokio::test]
async fn connection_failure_on_request_is_not_retried() {
    let registry = registry_at(&refused_base().await, Duration::from_secs(2));
    seed_stale_token(&registry).await;
    let client = registry.acquire(&k1(), Coverage::Jp).await.unwrap();

    let err = client.sim().get_sim("8942310022000012345").await.unwrap_err();

    assert!(matches!(err, ClientError::Connection(_)), "{err:?}");
    // No re-authentication happened: the seeded token is still cached.
    let cached = registry
        .token_cache()
        .get(&CredentialIdentity::from_key_id("K1"))
        .await
        .unwrap();
    assert_eq!(cached.token, "stale");
    assert!(client.is_authenticated().await);
}

#[tokio::test]
async fn timeout_on_request_is_sent_once() {
    let (base, accepted) = silent_listener().await;
    let registry = registry_at(&base, Duration::from_millis(300));
    seed_stale_token(&registry).await;
    let client = registry.acquire(&k1(), Coverage::Jp).await.unwrap();

    let err = client.billing().get_latest_billing().await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout(_)), "{err:?}");
    assert!(err.is_network());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert!(client.is_authenticated().await);
}
