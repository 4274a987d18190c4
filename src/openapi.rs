use utoipa::OpenApi;
use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};

/// 卡片接口同时挂载在根路径与 `config.api.prefix` 下，Swagger UI 中可切换。
struct ApiServers;

impl utoipa::Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径"))
            .build();

        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("带前缀的卡片接口（默认 /api）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api")
                    .description(Some("对应 config.api.prefix（可通过 APP_API__PREFIX 覆盖）")),
            )
            .build();

        openapi.servers = Some(vec![root, api]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::card::handler::render_card,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::features::health::handler::HealthResponse,
        crate::features::github::GitHubStats,
        crate::features::github::Rank,
    )),
    modifiers(&ApiServers),
    tags(
        (name = "Card", description = "GitHub 个人资料卡片渲染（PNG/SVG）。"),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Profile Card API",
        version = env!("CARGO_PKG_VERSION"),
        description = "GitHub 个人资料卡片生成服务（Axum + utoipa）。"
    )
)]
pub struct ApiDoc;
