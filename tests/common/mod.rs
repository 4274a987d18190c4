#![allow(dead_code)]

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use profile_card::AppError;
use profile_card::cache::{CardStore, MokaCardStore};
use profile_card::config::{CardConfig, FontsConfig};
use profile_card::features::card::{FontLoader, StyleTable};
use profile_card::features::github::{GitHubStats, Rank, StatsFetcher};
use profile_card::features::image::ImageOptimizer;
use profile_card::state::AppState;

/// 记录调用次数与 force_refresh 参数的假统计源，第二次起返回刷新后的统计
pub struct FakeStats {
    pub calls: AtomicUsize,
    pub forced: Mutex<Vec<bool>>,
    fail: bool,
}

impl FakeStats {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            forced: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn sample_stats() -> GitHubStats {
    GitHubStats {
        name: Some("Alice".into()),
        bio: Some("Builds things".into()),
        avatar_url: Some("https://avatars.example/alice.png".into()),
        current_year_commits: Some(321),
        total_stars: Some(42),
        total_prs: Some(17),
        total_issues: Some(5),
        rank: Some(Rank {
            level: "A".into(),
            percentile: Some(22.5),
        }),
    }
}

/// 刷新后的统计：等级变化且没有百分位徽章，渲染结果与首次不同
pub fn refreshed_stats() -> GitHubStats {
    GitHubStats {
        current_year_commits: Some(999),
        total_stars: Some(4200),
        rank: Some(Rank {
            level: "S".into(),
            percentile: None,
        }),
        ..sample_stats()
    }
}

impl StatsFetcher for FakeStats {
    fn user_stats<'a>(
        &'a self,
        _username: &'a str,
        force_refresh: bool,
    ) -> BoxFuture<'a, Result<GitHubStats, AppError>> {
        async move {
            let previous = self.calls.fetch_add(1, Ordering::SeqCst);
            self.forced
                .lock()
                .expect("forced lock")
                .push(force_refresh);
            if self.fail {
                Err(AppError::Upstream("GitHub API rate limited".into()))
            } else if previous == 0 {
                Ok(sample_stats())
            } else {
                Ok(refreshed_stats())
            }
        }
        .boxed()
    }
}

/// 永远优化失败的图片优化器
pub struct NoopOptimizer;

impl ImageOptimizer for NoopOptimizer {
    fn optimize<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Option<String>> {
        async { None }.boxed()
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MokaCardStore>,
    pub stats: Arc<FakeStats>,
}

pub fn harness(stats: FakeStats) -> TestHarness {
    let store = Arc::new(MokaCardStore::new(64 * 1024 * 1024));
    let stats = Arc::new(stats);
    let card = CardConfig {
        width: 600,
        height: 400,
        optimize_speed: true,
        max_parallel: 2,
        ..CardConfig::default()
    };
    let fonts = FontsConfig {
        dir: "./definitely/missing/fonts".into(),
        ..FontsConfig::default()
    };

    let state = AppState {
        store: store.clone() as Arc<dyn CardStore>,
        stats: stats.clone(),
        optimizer: Arc::new(NoopOptimizer),
        fonts: Arc::new(FontLoader::new(&fonts)),
        styles: Arc::new(StyleTable::new()),
        render_semaphore: Arc::new(Semaphore::new(card.render_permits())),
        card: Arc::new(card),
    };
    TestHarness {
        state,
        store,
        stats,
    }
}
