//! 应用状态

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// 全局 shutdown token，用于优雅关闭
static GLOBAL_SHUTDOWN: std::sync::OnceLock<CancellationToken> = std::sync::OnceLock::new();

/// 获取全局 shutdown token
pub fn get_shutdown_token() -> CancellationToken {
    GLOBAL_SHUTDOWN
        .get_or_init(CancellationToken::new)
        .clone()
}

/// 触发全局 shutdown
pub fn trigger_shutdown() {
    if let Some(token) = GLOBAL_SHUTDOWN.get() {
        token.cancel();
    }
}

use crate::config::env::EnvConfig;
use crate::services::versions::VersionService;
use crate::state::snapshot;

/// 应用状态
pub struct AppState {
    /// API 密钥（用于验证变更请求）
    pub api_key: String,
    /// 环境配置
    pub config: EnvConfig,
    /// 版本服务
    pub versions: VersionService,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 初始化应用状态：加载配置，打开带快照的版本服务
    pub async fn init() -> Self {
        let config = EnvConfig::from_env();

        tracing::info!(
            api_key_len = config.api_key.len(),
            port = config.port,
            "Loaded configuration"
        );

        let snapshot_path = snapshot::default_path();
        tracing::info!(path = %snapshot_path.display(), "Opening version catalog");
        let versions = VersionService::open(snapshot_path).await;

        Self {
            api_key: config.api_key.clone(),
            versions,
            started_at: Utc::now(),
            config,
        }
    }
}
