/// Drives the token service and the distributed lock against a live Redis.
///
/// ⚠️ Required for execution:
/// A Redis server reachable at `KEEL_DEMO_REDIS` (default `redis://127.0.0.1:6379`).
/// Every key it writes carries a TTL or is deleted before exit.

use std::sync::Arc;
use std::time::Duration;
use nanoid::nanoid;
use tokio::io;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use keel::application_impl::{DistributedLock, RealTokenService, TokenConfig};
use keel::application_port::{LockError, LockOptions, TokenService};
use keel::domain_port::{KeyValueStore, TokenCodec};
use keel::infra_jwt::{JwtConfig, JwtHs256Codec};
use keel::infra_redis::RedisKeyValueStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("infra_demo=debug,keel=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();


    let alphabet: [char; 16] = [
        '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
    ];
    let run_id = nanoid!(10, &alphabet);


    // region prepare connection

    let redis_dsn = std::env::var("KEEL_DEMO_REDIS")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store: Arc<dyn KeyValueStore> = Arc::new(RedisKeyValueStore::connect(&redis_dsn).await?);
    println!("Redis -> connected ({})", redis_dsn);

    // endregion


    // region initialization

    let key = std::env::var("JWT_SIGNING_KEY")
        .unwrap_or_else(|_| "my-dev-secret-key".to_string())
        .into_bytes();
    let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
        issuer: "keel.demo".to_string(),
        signing_key: key,
    }));
    let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
        token_codec,
        store.clone(),
        TokenConfig {
            issuer: "keel.demo".to_string(),
            access_ttl: Duration::from_secs(2),
        },
    ));
    let lock = Arc::new(DistributedLock::new(
        store.clone(),
        LockOptions {
            min_refresh_interval: Duration::from_millis(200),
            ..LockOptions::default()
        },
    ));

    // endregion


    // region tokens

    let pair = token_service
        .issue_token_pair(42, "demo@example.com", &["orders.read".to_string()])
        .await?;
    let claims = token_service.validate_access_token(&pair.access_token).await?;
    tracing::debug!("access claims: {:?}", claims);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let expired = token_service.validate_access_token(&pair.access_token).await;
    tracing::info!("access token after 3s: {:?}", expired.err());
    let refreshed = token_service.refresh_token_pair(&pair.refresh_token).await?;
    tracing::info!("refreshed, expires_in={}", refreshed.expires_in);

    token_service
        .logout(&refreshed.access_token, &refreshed.refresh_token)
        .await?;
    let revoked = token_service.validate_refresh_token(&refreshed.refresh_token).await;
    tracing::info!("refresh token after logout: {:?}", revoked.err());

    // endregion


    // region lock contention

    let lock_key = format!("job:{}", run_id);
    let mut handles = Vec::new();
    for worker in ["A", "B", "C"] {
        let lock = lock.clone();
        let lock_key = lock_key.clone();
        handles.push(tokio::spawn(async move {
            let label = lock_key.clone();
            let result = lock
                .with_lock(&lock_key, worker, Duration::from_secs(1), || async move {
                    tracing::info!("{} holds {}", worker, label);
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    anyhow::Ok(worker)
                })
                .await;
            match result {
                Ok(worker) => tracing::info!("{} finished its work", worker),
                Err(LockError::NotAcquired { key }) => tracing::info!("{} refused on {}", worker, key),
                Err(e) => tracing::error!("{} failed: {}", worker, e),
            }
        }));
    }
    for handle in handles {
        handle.await?;
    }
    tracing::info!("lock key still present: {}", store.exists(&lock_key).await?);

    // endregion


    let mut reader = BufReader::new(io::stdin()).lines();
    println!(r#"
    **********************************************************************
    ** Press Enter to exit...
    **********************************************************************
    "#);
    let _ = reader.next_line().await;

    Ok(())
}
