use async_trait::async_trait;
use decksmith_cache::{
    CacheConfig, CacheResult, CacheTier, MemoryTier, TieredCache, card_key, search_key,
};
use decksmith_core::SearchParams;
use decksmith_error::{CacheError, CacheErrorKind};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;

/// Remote tier that fails every call.
struct BrokenTier;

#[async_trait]
impl CacheTier for BrokenTier {
    async fn get(&self, _key: &str) -> CacheResult<Option<JsonValue>> {
        Err(CacheError::new(CacheErrorKind::Unavailable("down".into())))
    }

    async fn set(&self, _key: &str, _value: &JsonValue, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::new(CacheErrorKind::Unavailable("down".into())))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::new(CacheErrorKind::Unavailable("down".into())))
    }

    async fn len(&self) -> CacheResult<usize> {
        Err(CacheError::new(CacheErrorKind::Unavailable("down".into())))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn cache_in(dir: &tempfile::TempDir) -> TieredCache {
    let config = CacheConfig::default().with_cache_dir(dir.path().to_path_buf());
    TieredCache::new(config).unwrap()
}

#[tokio::test]
async fn set_then_get_hits_memory() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir);

    cache.set("k", &json!({"a": 1}), None).await;
    assert_eq!(cache.get("k").await, Some(json!({"a": 1})));

    let stats = cache.stats().await;
    assert_eq!(*stats.memory_entries(), 1);
    assert_eq!(*stats.disk_entries(), Some(1));
    assert!(!*stats.remote_configured());
}

#[tokio::test]
async fn disk_hit_is_promoted_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir);

    cache.set("card:1", &json!("blue-eyes"), None).await;
    cache.memory().remove("card:1");
    assert_eq!(cache.memory().entry_count(), 0);

    assert_eq!(cache.get("card:1").await, Some(json!("blue-eyes")));
    assert_eq!(cache.memory().entry_count(), 1);
}

#[tokio::test]
async fn survives_restart_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    cache_in(&dir).set("persisted", &json!(42), None).await;

    let reopened = cache_in(&dir);
    assert_eq!(reopened.get("persisted").await, Some(json!(42)));
}

#[tokio::test]
async fn remote_hit_is_promoted_to_faster_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MemoryTier::new());
    remote
        .set("shared", &json!("from-remote"), Duration::from_secs(60))
        .await
        .unwrap();

    let cache = cache_in(&dir).with_remote(remote);
    assert_eq!(cache.get("shared").await, Some(json!("from-remote")));
    assert_eq!(cache.memory().entry_count(), 1);
    assert_eq!(cache.disk().len().await.unwrap(), 1);
}

#[tokio::test]
async fn failing_remote_is_a_miss_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir).with_remote(Arc::new(BrokenTier));

    assert_eq!(cache.get("absent").await, None);

    cache.set("k", &json!(1), None).await;
    assert_eq!(cache.get("k").await, Some(json!(1)));

    cache.delete("k").await;
    assert_eq!(cache.get("k").await, None);
}

#[tokio::test]
async fn delete_removes_from_every_tier() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MemoryTier::new());
    let cache = cache_in(&dir).with_remote(remote.clone());

    cache.set("gone", &json!(true), None).await;
    cache.delete("gone").await;

    assert_eq!(cache.get("gone").await, None);
    assert_eq!(remote.entry_count(), 0);
    assert_eq!(cache.disk().len().await.unwrap(), 0);
}

#[tokio::test]
async fn equivalent_searches_share_an_entry() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir);

    let first = SearchParams::new().with("race", "Dragon").with("attribute", "LIGHT");
    let second = SearchParams::new().with("attribute", "LIGHT").with("race", "Dragon");
    assert_eq!(search_key(&first), search_key(&second));
    assert!(search_key(&first).starts_with("card_search:"));

    cache.cache_search_results(&first, &json!([{"id": 89631139}])).await;
    assert_eq!(
        cache.get_search_results(&second).await,
        Some(json!([{"id": 89631139}]))
    );
}

#[tokio::test]
async fn entity_helpers_use_card_keys() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir);

    assert_eq!(card_key(46986414), "card:46986414");
    cache.cache_entity_by_id(46986414, &json!({"name": "Dark Magician"})).await;
    assert_eq!(
        cache.get("card:46986414").await,
        Some(json!({"name": "Dark Magician"}))
    );
    assert_eq!(cache.get_entity_by_id(1).await, None);
}

#[tokio::test]
async fn entries_are_absent_once_every_tier_expires() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir);

    cache
        .set("short", &json!("v"), Some(Duration::from_millis(300)))
        .await;
    assert_eq!(cache.get("short").await, Some(json!("v")));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(cache.get("short").await, None);

    // The expired read removed the disk document
    assert_eq!(*cache.stats().await.disk_entries(), Some(0));
}

#[tokio::test]
async fn disk_promotion_keeps_the_remaining_lifetime() {
    let dir = tempfile::tempdir().unwrap();
    cache_in(&dir)
        .set("brief", &json!("v"), Some(Duration::from_millis(500)))
        .await;

    // A fresh cache over the same directory only sees the disk record
    let restarted = cache_in(&dir);
    assert_eq!(restarted.get("brief").await, Some(json!("v")));
    assert_eq!(restarted.memory().entry_count(), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(restarted.memory().get_value("brief"), None);
    assert_eq!(restarted.get("brief").await, None);
}

#[tokio::test]
async fn zero_ttl_entries_are_never_served() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir);

    cache.set("instant", &json!(1), Some(Duration::ZERO)).await;
    assert_eq!(cache.get("instant").await, None);
}

#[tokio::test]
async fn zero_ttl_write_is_not_served_from_the_remote_tier() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MemoryTier::new());
    let cache = cache_in(&dir).with_remote(remote.clone());

    cache.set("instant", &json!(1), Some(Duration::from_secs(60))).await;
    cache.set("instant", &json!(2), Some(Duration::ZERO)).await;

    assert_eq!(remote.get("instant").await.unwrap(), None);
    assert_eq!(cache.get("instant").await, None);
}
