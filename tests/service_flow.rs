use keel::api::{ApiContext, ServiceInfo};
use keel::application_impl::{DistributedLock, RealTokenService, TokenConfig};
use keel::application_port::{AuthError, LockError, LockOptions, TokenService};
use keel::domain_model::TokenKind;
use keel::infra_jwt::{JwtConfig, JwtHs256Codec};
use keel::infra_memory::MemoryKeyValueStore;
use keel::server::{HttpListener, LifecycleState, ManualTermination, ServiceLifecycle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn token_service(store: Arc<MemoryKeyValueStore>, access_ttl: Duration) -> Arc<RealTokenService> {
    Arc::new(RealTokenService::new(
        Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "keel.it".to_string(),
            signing_key: b"integration-secret".to_vec(),
        })),
        store,
        TokenConfig {
            issuer: "keel.it".to_string(),
            access_ttl,
        },
    ))
}

#[tokio::test]
async fn tokens_and_locks_share_one_store() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let tokens = token_service(store.clone(), Duration::from_secs(60));
    let lock = DistributedLock::new(store.clone(), LockOptions::default());

    let pair = tokens
        .issue_token_pair(11, "it@example.com", &["billing".to_string()])
        .await
        .unwrap();

    // only one logout runs at a time per user
    let fencing = DistributedLock::new_fencing_value();
    lock.with_lock("logout:11", &fencing, Duration::from_secs(5), || {
        let tokens = tokens.clone();
        let pair = pair.clone();
        async move {
            tokens.logout(&pair.access_token, &pair.refresh_token).await?;
            anyhow::Ok(())
        }
    })
    .await
    .unwrap();

    assert!(matches!(
        tokens.validate_access_token(&pair.access_token).await,
        Err(AuthError::TokenRevoked(TokenKind::Access))
    ));
    assert!(matches!(
        tokens.refresh_token_pair(&pair.refresh_token).await,
        Err(AuthError::TokenRevoked(TokenKind::Refresh))
    ));
}

#[tokio::test]
async fn failing_work_still_releases_the_lock() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let lock = DistributedLock::new(store, LockOptions::default());

    let failed = lock
        .with_lock("job:7", "A", Duration::from_secs(5), || async {
            Err::<(), _>(anyhow::anyhow!("payment gateway unavailable"))
        })
        .await;
    assert!(matches!(failed, Err(LockError::Work(_))));

    lock.with_lock("job:7", "B", Duration::from_secs(5), || async { anyhow::Ok(()) })
        .await
        .unwrap();
}

fn free_address() -> SocketAddr {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap()
}

async fn get(address: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(address).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn http_listener_serves_until_terminated() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let context = Arc::new(ApiContext {
        token_service: token_service(store, Duration::from_secs(60)),
        service: ServiceInfo {
            name: "keel-it".to_string(),
            version: "0.1.0".to_string(),
        },
    });
    let address = free_address();
    let termination = ManualTermination::new();
    let lifecycle = ServiceLifecycle::new(
        Arc::new(HttpListener::new(address, context)),
        Arc::new(termination.clone()),
        Duration::from_secs(2),
    );

    lifecycle.start().unwrap();

    let mut response = String::new();
    for _ in 0..50 {
        if let Ok(mut stream) = TcpStream::connect(address).await {
            let _ = stream.shutdown().await;
            response = get(address, "/health").await;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("\"status\":\"healthy\""));
    assert!(response.contains("\"service\":\"keel-it\""));

    termination.trigger();
    tokio::time::timeout(Duration::from_secs(5), lifecycle.wait())
        .await
        .unwrap();
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    assert!(TcpStream::connect(address).await.is_err());
}
