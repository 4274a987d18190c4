use axum::body::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};

/// 键值缓存抽象：卡片 PNG 与 GitHub 统计共用同一个存储。
///
/// 通过 `Arc<dyn CardStore>` 注入到 `AppState`，测试时可替换实现。
pub trait CardStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Bytes>>;

    /// 写入并设置该条目的 TTL（覆盖写会重置 TTL）
    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Duration) -> BoxFuture<'a, ()>;

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()>;
}

#[derive(Clone)]
struct StoredEntry {
    bytes: Bytes,
    ttl: Duration,
}

/// 按条目 TTL 过期
struct PerEntryTtl;

impl Expiry<String, StoredEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 基于 moka 的进程内缓存（容量按字节数加权）
#[derive(Clone)]
pub struct MokaCardStore {
    inner: Cache<String, StoredEntry>,
}

impl MokaCardStore {
    pub fn new(max_bytes: u64) -> Self {
        let inner = Cache::builder()
            .weigher(|k: &String, v: &StoredEntry| {
                (k.len() + v.bytes.len()).try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_bytes)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }

    /// 当前条目数（近似值，供日志/测试使用）
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl CardStore for MokaCardStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Bytes>> {
        async move { self.inner.get(key).await.map(|e| e.bytes) }.boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Duration) -> BoxFuture<'a, ()> {
        async move {
            self.inner
                .insert(key.to_string(), StoredEntry { bytes: value, ttl })
                .await;
        }
        .boxed()
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        async move { self.inner.invalidate(key).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::{CardStore, MokaCardStore};
    use axum::body::Bytes;
    use std::time::Duration;

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let store = MokaCardStore::new(1024 * 1024);
        assert!(store.get("k").await.is_none());

        store
            .set("k", Bytes::from_static(b"png"), Duration::from_secs(60))
            .await;
        assert_eq!(store.get("k").await, Some(Bytes::from_static(b"png")));

        store.delete("k").await;
        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_their_own_ttl() {
        let store = MokaCardStore::new(1024 * 1024);
        store
            .set("short", Bytes::from_static(b"a"), Duration::from_millis(50))
            .await;
        store
            .set("long", Bytes::from_static(b"b"), Duration::from_secs(60))
            .await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(store.get("short").await.is_none());
        assert!(store.get("long").await.is_some());
    }
}
