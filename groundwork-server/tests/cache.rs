//! Cache integration tests against a live Redis
//!
//! Run with: REDIS_URL=redis://... cargo test -p groundwork-server -- --ignored

use std::time::Duration;

use groundwork_core::{RedisSettings, Secret};
use groundwork_server::CacheManager;
use uuid::Uuid;

fn manager() -> CacheManager {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL required");
    let manager = CacheManager::new(RedisSettings {
        dsn: Some(Secret::new(url)),
        ..RedisSettings::default()
    });
    manager.init().expect("init");
    manager
}

#[tokio::test]
#[ignore = "requires redis"]
async fn set_get_delete() {
    let cache = manager();
    let client = cache.client().unwrap();
    let key = format!("groundwork:test:{}", Uuid::new_v4());

    client.ping().await.expect("ping");
    assert_eq!(client.get(&key).await.unwrap(), None);

    client.set(&key, "value", None).await.unwrap();
    assert_eq!(client.get(&key).await.unwrap().as_deref(), Some("value"));

    assert!(client.delete(&key).await.unwrap());
    assert!(!client.delete(&key).await.unwrap());

    cache.close();
}

#[tokio::test]
#[ignore = "requires redis"]
async fn ttl_expires_value() {
    let cache = manager();
    let client = cache.client().unwrap();
    let key = format!("groundwork:test:{}", Uuid::new_v4());

    client
        .set(&key, "short-lived", Some(Duration::from_millis(200)))
        .await
        .unwrap();
    assert!(client.get(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(client.get(&key).await.unwrap(), None);

    cache.close();
}
