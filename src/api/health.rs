//! 健康检查和系统状态 API
//!
//! 包含 /health 和 /status 端点

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    uptime_secs: i64,
    domains: usize,
    domain_versions: usize,
    images: usize,
    image_versions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(health_check))
}

/// 健康检查 - 返回状态、版本、目录统计等信息
///
/// GET /health, GET /status
/// 无需认证
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.versions.stats().await;
    let uptime_secs = (chrono::Utc::now() - state.started_at).num_seconds();

    Json(HealthResponse {
        status: "ok",
        service: "xjp-version-manager",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs,
        domains: stats.domains,
        domain_versions: stats.domain_versions,
        images: stats.images,
        image_versions: stats.image_versions,
        last_modified: stats.last_modified.map(|t| t.to_rfc3339()),
    })
}
