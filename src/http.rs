use reqwest::Client;
use std::time::Duration;

use crate::error::AppError;

/// 构建带 User-Agent 与超时的 HTTP Client。
///
/// `Client` 内部自带连接池且线程安全，调用方应构建一次后在 `AppState` 中复用。
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .build()
        .map_err(|e| AppError::Internal(format!("初始化 HTTP Client 失败: {e}")))
}
