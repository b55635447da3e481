//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod domains;
pub mod health;
pub mod images;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::name;
use crate::error::ApiError;
use crate::state::AppState;

/// 构建完整的 API 路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & Status
        .merge(health::router())
        // Domains
        .merge(domains::router())
        // Images
        .merge(images::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 规范化并校验路径/请求体里的名称
///
/// HTTP 边界统一转小写，存储层只接受 `a-z0-9_-`。
pub(crate) fn valid_name(raw: &str) -> Result<String, ApiError> {
    let normalized = name::normalize(raw);
    if name::is_valid(&normalized) {
        Ok(normalized)
    } else {
        Err(ApiError::bad_request(format!(
            "invalid name '{}': allowed characters are a-z, 0-9, '-' and '_'",
            raw
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_name_lowercases() {
        assert_eq!(valid_name("My-Domain").unwrap(), "my-domain");
        assert_eq!(valid_name("  backend_api  ").unwrap(), "backend_api");
    }

    #[test]
    fn test_valid_name_rejects_bad_charset() {
        assert!(valid_name("has space").is_err());
        assert!(valid_name("dot.name").is_err());
        assert!(valid_name("").is_err());
    }
}
