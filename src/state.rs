use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::cache::CardStore;
use crate::config::CardConfig;
use crate::features::card::{FontLoader, StyleTable};
use crate::features::github::StatsFetcher;
use crate::features::image::ImageOptimizer;

/// 聚合的应用共享状态
///
/// 外部依赖均以 trait 对象注入，测试中可替换为内存实现。
#[derive(Clone)]
pub struct AppState {
    /// 卡片与统计共用的缓存（按字节加权，条目级 TTL）
    pub store: Arc<dyn CardStore>,
    pub stats: Arc<dyn StatsFetcher>,
    pub optimizer: Arc<dyn ImageOptimizer>,
    pub fonts: Arc<FontLoader>,
    /// 启动时构建一次，只读
    pub styles: Arc<StyleTable>,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    pub render_semaphore: Arc<Semaphore>,
    pub card: Arc<CardConfig>,
}
