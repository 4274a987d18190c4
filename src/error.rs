use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 服务端错误对外统一使用的提示语，原始错误放在 `error` 字段中便于排查。
pub const CARD_FAILURE_MESSAGE: &str = "Failed to generate the card.";

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 参数校验错误（缺少/非法 username 等）
    #[error("{0}")]
    Validation(String),

    /// 请求方法不被允许
    #[error("Method not allowed.")]
    MethodNotAllowed,

    /// 网络请求错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 上游请求超时（包含 connect/read 等阶段）
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 上游返回了错误或无法使用的数据
    #[error("上游错误: {0}")]
    Upstream(String),

    /// 图像渲染错误
    #[error("图像渲染错误: {0}")]
    ImageRendererError(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误响应体
///
/// - 4xx：仅 `message`
/// - 5xx：`message` 为通用提示，`error` 为原始错误文本
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 人类可读的错误信息
    #[schema(example = "GitHub username (username) is required.")]
    pub message: String,
    /// 原始错误文本（仅服务端错误）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 请求追踪 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Network(_)
            | AppError::Timeout(_)
            | AppError::Upstream(_)
            | AppError::ImageRendererError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let request_id = crate::request_id::current_request_id();
        if self.status_code().is_client_error() {
            ErrorBody {
                message: self.to_string(),
                error: None,
                request_id,
            }
        } else {
            ErrorBody {
                message: CARD_FAILURE_MESSAGE.to_string(),
                error: Some(self.to_string()),
                request_id,
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("卡片生成失败: {}", self);
        } else {
            tracing::debug!("拒绝请求 ({}): {}", status.as_u16(), self);
        }
        (status, Json(self.body())).into_response()
    }
}

// =============== Error conversions for common external errors ===============

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Upstream(format!("JSON 解析失败: {err}"))
    }
}
