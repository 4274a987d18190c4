//! 优雅退出信号处理
//!
//! 统一等待 SIGINT（Ctrl+C）与 SIGTERM，返回触发原因供日志记录。

use tracing::{error, info};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
}

/// 等待退出信号
pub async fn wait_for_signal() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("监听 Ctrl+C 失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("监听 SIGTERM 失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = ctrl_c => ShutdownReason::Interrupt,
        _ = terminate => ShutdownReason::Terminate,
    };
    info!("接收到退出信号: {:?}", reason);
    reason
}
