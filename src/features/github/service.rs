use axum::body::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::CardStore;
use crate::error::AppError;

use super::client::GitHubClient;
use super::models::GitHubStats;

/// 统计数据缓存键（`nocache=true` 时由卡片接口一并删除）
pub fn stats_cache_key(username: &str) -> String {
    format!("github:stats:{username}")
}

/// GitHub 统计数据来源
pub trait StatsFetcher: Send + Sync {
    /// 获取用户统计；`force_refresh` 为 true 时跳过缓存直接回源
    fn user_stats<'a>(
        &'a self,
        username: &'a str,
        force_refresh: bool,
    ) -> BoxFuture<'a, Result<GitHubStats, AppError>>;
}

/// 带缓存的 GitHub 统计服务：缓存写入共享的 `CardStore`，TTL 独立配置。
pub struct GitHubStatsService {
    client: GitHubClient,
    store: Arc<dyn CardStore>,
    ttl: Duration,
}

impl GitHubStatsService {
    pub fn new(client: GitHubClient, store: Arc<dyn CardStore>, ttl: Duration) -> Self {
        Self { client, store, ttl }
    }

    async fn cached(&self, key: &str) -> Option<GitHubStats> {
        let raw = self.store.get(key).await?;
        match serde_json::from_slice::<GitHubStats>(&raw) {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("统计缓存损坏，按未命中处理 ({}): {}", key, e);
                self.store.delete(key).await;
                None
            }
        }
    }

    async fn load(&self, username: &str, force_refresh: bool) -> Result<GitHubStats, AppError> {
        let key = stats_cache_key(username);
        if !force_refresh && let Some(stats) = self.cached(&key).await {
            tracing::debug!("GitHub 统计缓存命中: {}", key);
            return Ok(stats);
        }

        let t0 = Instant::now();
        let stats = self.client.fetch_user_stats(username).await?;
        tracing::info!(
            "GitHub 统计回源完成: user={}, force_refresh={}, 耗时 {}ms",
            username,
            force_refresh,
            t0.elapsed().as_millis()
        );

        match serde_json::to_vec(&stats) {
            Ok(bytes) => self.store.set(&key, Bytes::from(bytes), self.ttl).await,
            Err(e) => tracing::warn!("统计数据序列化失败，跳过缓存: {}", e),
        }
        Ok(stats)
    }
}

impl StatsFetcher for GitHubStatsService {
    fn user_stats<'a>(
        &'a self,
        username: &'a str,
        force_refresh: bool,
    ) -> BoxFuture<'a, Result<GitHubStats, AppError>> {
        self.load(username, force_refresh).boxed()
    }
}
