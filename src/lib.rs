//! XJP Version Manager - 域与镜像版本管理服务
//!
//! 维护域版本在 dev / staging / prod 流水线中的推进，
//! 以及镜像版本的测试状态与绑定关系

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

use std::sync::Arc;

use crate::state::app_state::{get_shutdown_token, trigger_shutdown};
use crate::state::AppState;

/// 运行时配置（命令行覆盖项）
#[derive(Debug, Default, Clone)]
pub struct RuntimeConfig {
    /// 覆盖监听端口（优先于 PORT 环境变量）
    pub port_override: Option<u16>,
}

/// 初始化 tracing 订阅器
///
/// 日志级别由 RUST_LOG 控制，默认 info
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 初始化并运行服务，直到收到关闭信号
pub async fn init_and_run(runtime: RuntimeConfig) -> anyhow::Result<()> {
    init_tracing();

    let state = Arc::new(AppState::init().await);

    let port = runtime.port_override.unwrap_or(state.config.port);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port = port, "XJP Version Manager listening");

    // Ctrl+C 触发全局 shutdown
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
            trigger_shutdown();
        }
    });

    let shutdown = get_shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
