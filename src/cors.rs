use axum::http::{HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

/// 根据配置构建 CORS 层。
///
/// 卡片接口只读，方法固定为 GET/OPTIONS；未启用或没有合法 Origin 时返回 None。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let (any_origin, origins) = parse_allowed_origins(&cors.allowed_origins);
    if !any_origin && origins.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }

    let mut layer = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);
    layer = if any_origin {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    };

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

fn parse_allowed_origins(values: &[String]) -> (bool, Vec<HeaderValue>) {
    let mut any = false;
    let mut origins = Vec::new();
    for value in values.iter().map(|raw| raw.trim()).filter(|v| !v.is_empty()) {
        if value == "*" {
            any = true;
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(v) => origins.push(v),
            Err(_) => tracing::warn!("CORS allowed_origins 含无效值: {}", value),
        }
    }
    (any, origins)
}
