use profile_card::app::{build_router, build_state};
use profile_card::config::AppConfig;
use profile_card::features::card::renderer::prewarm_font_db;
use profile_card::shutdown::wait_for_signal;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("配置加载失败: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("profile_card={},tower_http=info", config.logging.level).into()
            }),
        )
        .init();

    let state = match build_state(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("应用状态初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    // 系统字体扫描较慢，放到后台预热
    tokio::task::spawn_blocking(prewarm_font_db);

    let app = build_router(state, &config);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Card API: http://{}/card, http://{}{}/card", addr, addr, config.api.prefix);

    let shutdown_timeout = config.shutdown.timeout_duration();
    let (closed_tx, closed_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown_signal = async move {
        let reason = wait_for_signal().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
        // 超过时限仍有请求未完成则强制退出
        tokio::spawn(async move {
            if tokio::time::timeout(shutdown_timeout, closed_rx).await.is_err() {
                tracing::warn!("优雅退出超时（{:?}），强制退出", shutdown_timeout);
                std::process::exit(1);
            }
        });
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
    {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }
    let _ = closed_tx.send(());

    tracing::info!("服务器已优雅关闭");
}
