use axum::{
    Router,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderValue, header},
    response::IntoResponse,
    routing::get,
};
use chrono::Datelike;
use std::time::Instant;

use crate::error::{AppError, ErrorBody};
use crate::features::github::stats_cache_key;
use crate::state::AppState;

use super::renderer::{self, CardRenderInput};
use super::types::{CardParams, CardQuery, OutputFormat, Profile};

const CACHE_STATUS_HEADER: &str = "x-card-cache";

fn card_response(
    format: OutputFormat,
    body: Bytes,
    max_age_secs: u64,
    cache_status: &'static str,
) -> impl IntoResponse {
    let cache_control = HeaderValue::from_str(&format!("public, max-age={max_age_secs}"))
        .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=86400"));
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(format.content_type()),
            ),
            (header::CACHE_CONTROL, cache_control),
            (
                header::HeaderName::from_static(CACHE_STATUS_HEADER),
                HeaderValue::from_static(cache_status),
            ),
        ],
        body,
    )
}

#[utoipa::path(
    get,
    path = "/card",
    summary = "生成 GitHub 个人资料卡片",
    description = "根据 GitHub 用户统计与自定义参数渲染个人资料卡片（默认 PNG，可选 SVG）。相同参数的结果缓存 24 小时；`nocache=true` 时清除卡片与统计缓存后重新生成。",
    params(CardQuery),
    responses(
        (status = 200, description = "卡片图片（image/png 或 image/svg+xml）"),
        (status = 400, description = "username 缺失或非法", body = ErrorBody),
        (status = 405, description = "仅支持 GET", body = ErrorBody),
        (status = 500, description = "统计获取或渲染失败", body = ErrorBody)
    ),
    tag = "Card"
)]
pub async fn render_card(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let t_total = Instant::now();
    // 以原始键值对解析，重复参数不会触发框架的纯文本 400
    let Query(pairs) =
        query.map_err(|e| AppError::Validation(format!("Invalid query string: {e}")))?;
    let params = CardParams::from_query(&CardQuery::from_pairs(pairs))?;
    let cache_key = params.cache_key()?;

    if params.force_refresh {
        state.store.delete(&cache_key).await;
        state.store.delete(&stats_cache_key(&params.username)).await;
        tracing::info!("nocache=true，已清除缓存: user={}", params.username);
    } else if let Some(hit) = state.store.get(&cache_key).await {
        tracing::debug!(
            "卡片缓存命中: user={}, {} bytes, 耗时 {}ms",
            params.username,
            hit.len(),
            t_total.elapsed().as_millis()
        );
        return Ok(card_response(
            params.format,
            hit,
            state.card.cache_ttl_secs,
            "HIT",
        ));
    }

    // 统计与字体互不依赖，并发获取
    let t_fetch = Instant::now();
    let (stats, fonts) = tokio::join!(
        state.stats.user_stats(&params.username, params.force_refresh),
        state.fonts.load()
    );
    let mut stats = stats?;
    let fetch_ms = t_fetch.elapsed().as_millis();

    let t_images = Instant::now();
    let avatar_src = stats.avatar_url.clone();
    let (avatar, background) = tokio::join!(
        async {
            match avatar_src.as_deref() {
                Some(url) => state.optimizer.optimize(url).await,
                None => None,
            }
        },
        async {
            match params.background_url.as_deref() {
                Some(url) => state.optimizer.optimize(url).await,
                None => None,
            }
        }
    );
    // 头像优化失败时保留原始地址（仅 SVG 输出可用）；背景优化失败则不渲染
    if avatar.is_some() {
        stats.avatar_url = avatar;
    }
    let images_ms = t_images.elapsed().as_millis();

    let profile = Profile {
        github_username: params.username.clone(),
        name: params.name.clone(),
        bio: params.bio.clone(),
        skills: params.skills.clone(),
        theme: params.theme,
        background_image_url: background,
        background_opacity: params.opacity,
    };

    let t_render = Instant::now();
    let svg = renderer::generate_card_svg(&CardRenderInput {
        profile: &profile,
        stats: Some(&stats),
        loading: false,
        current_year: chrono::Utc::now().year(),
        width: state.card.width,
        height: state.card.height,
        font_family: state.fonts.family(),
        styles: &state.styles,
        allow_remote_images: params.format == OutputFormat::Svg,
    })?;

    let body = match params.format {
        OutputFormat::Svg => Bytes::from(svg),
        OutputFormat::Png => {
            let _permit = state
                .render_semaphore
                .acquire()
                .await
                .map_err(|e| AppError::Internal(format!("获取渲染许可失败: {e}")))?;
            let png = renderer::render_svg_to_png_async(
                svg,
                fonts,
                state.fonts.family().to_string(),
                state.card.optimize_speed,
            )
            .await?;
            Bytes::from(png)
        }
    };
    let render_ms = t_render.elapsed().as_millis();

    state
        .store
        .set(&cache_key, body.clone(), state.card.cache_ttl())
        .await;

    tracing::info!(
        "卡片生成完成: user={}, format={:?}, {} bytes | 统计+字体 {}ms, 图片 {}ms, 渲染 {}ms, 总计 {}ms",
        params.username,
        params.format,
        body.len(),
        fetch_ms,
        images_ms,
        render_ms,
        t_total.elapsed().as_millis()
    );

    Ok(card_response(
        params.format,
        body,
        state.card.cache_ttl_secs,
        "MISS",
    ))
}

/// 非 GET 方法统一返回 JSON 405
pub async fn card_method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// `get()` 默认也会响应 HEAD，这里显式拒绝，避免 HEAD 触发完整渲染流程
pub fn create_card_router() -> Router<AppState> {
    Router::new().route(
        "/card",
        get(render_card)
            .head(card_method_not_allowed)
            .fallback(card_method_not_allowed),
    )
}
