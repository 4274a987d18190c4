use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::sync::Semaphore;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cache::{CardStore, MokaCardStore};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::card::{FontLoader, StyleTable, create_card_router};
use crate::features::github::{GitHubClient, GitHubStatsService};
use crate::features::health::health_check;
use crate::features::image::HttpImageOptimizer;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// 按配置组装生产环境的共享状态
pub fn build_state(config: &AppConfig) -> Result<AppState, AppError> {
    let store: Arc<dyn CardStore> = Arc::new(MokaCardStore::new(config.card.cache_max_bytes));

    let github = GitHubClient::new(&config.github)?;
    let stats = GitHubStatsService::new(github, store.clone(), config.github.stats_cache_ttl());
    let optimizer = HttpImageOptimizer::new(&config.images, &config.github.user_agent)?;

    let permits = config.card.render_permits();
    tracing::info!("渲染并发上限: {}", permits);

    Ok(AppState {
        store,
        stats: Arc::new(stats),
        optimizer: Arc::new(optimizer),
        fonts: Arc::new(FontLoader::new(&config.fonts)),
        styles: Arc::new(StyleTable::new()),
        render_semaphore: Arc::new(Semaphore::new(permits)),
        card: Arc::new(config.card.clone()),
    })
}

/// 路由：`/health`、`/card`、`{prefix}/card` 与 `/docs`
///
/// request_id 与 CORS 作为最外层中间件挂载，覆盖 405/错误响应。
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .merge(create_card_router());

    let prefix = config.api.prefix.trim_matches('/');
    if !prefix.is_empty() {
        app = app.nest(&format!("/{prefix}"), create_card_router());
    }

    let mut app = app
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    if let Some(cors) = crate::cors::build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }
    app.layer(axum::middleware::from_fn(
        crate::request_id::request_id_middleware,
    ))
}
