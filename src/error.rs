//! 统一错误处理
//!
//! 提供 `ApiError` 枚举实现 `IntoResponse`，替代重复的 `(StatusCode, Json<ErrorResponse>)` 模式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::error::VersionError;

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 401 - 未授权（API Key 无效或缺失）
    Unauthorized,
    /// 404 - 资源未找到
    NotFound(String),
    /// 400 - 请求无效（非法名称、非法环境跳转）
    BadRequest(String),
    /// 409 - 冲突（名称已占用、删除被引用实体）
    Conflict(String),
    /// 422 - 规则校验未通过（测试门槛、未知镜像版本）
    UnprocessableEntity(String),
    /// 500 - 多步操作前半段已提交、后续步骤失败
    PartialFailure { committed: String, message: String },
    /// 500 - 内部错误
    Internal(String),
}

impl ApiError {
    /// 创建未授权错误
    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    /// 创建未找到错误
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// 创建请求无效错误
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// 创建冲突错误
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// 创建规则校验错误
    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::UnprocessableEntity(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<VersionError> for ApiError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::NotFound(entity) => ApiError::NotFound(entity),
            VersionError::Conflict(message) => ApiError::Conflict(message),
            VersionError::InvalidTransition { .. } | VersionError::InvalidName(_) => {
                ApiError::BadRequest(err.to_string())
            }
            VersionError::NotTested { .. } | VersionError::UnknownImageVersion { .. } => {
                ApiError::UnprocessableEntity(err.to_string())
            }
            VersionError::PartialFailure { committed, source } => ApiError::PartialFailure {
                committed,
                message: format!("follow-up step failed: {source}"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid or missing API key".to_string(),
                None,
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} not found", resource),
                None,
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable_entity",
                msg,
                None,
            ),
            ApiError::PartialFailure { committed, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_failure",
                message,
                // details 指明已提交的前半段，调用方据此决定如何收尾
                Some(committed),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None),
        };

        let mut body = ErrorResponse::new(error_type, message);
        if let Some(details) = details {
            body = body.with_details(details);
        }
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::NotFound(r) => write!(f, "Not found: {}", r),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::Conflict(m) => write!(f, "Conflict: {}", m),
            ApiError::UnprocessableEntity(m) => write!(f, "Unprocessable: {}", m),
            ApiError::PartialFailure { committed, message } => {
                write!(f, "Partial failure: {} ({})", message, committed)
            }
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::version::Environment;

    #[test]
    fn test_error_response_new() {
        let resp = ErrorResponse::new("test_error", "Test message");
        assert_eq!(resp.error, "test_error");
        assert_eq!(resp.message, "Test message");
        assert!(resp.details.is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let resp = ErrorResponse::new("test_error", "Test message").with_details("Extra info");
        assert_eq!(resp.details, Some("Extra info".to_string()));
    }

    #[test]
    fn test_version_error_mapping() {
        let err: ApiError = VersionError::domain_not_found("shop").into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError =
            VersionError::Conflict("domain 'shop' already exists".to_string()).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = VersionError::InvalidTransition {
            from: Environment::Dev,
            to: Environment::Prod,
        }
        .into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = VersionError::NotTested {
            domain: "shop".to_string(),
            version: "v1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::UnprocessableEntity(_)));

        let err: ApiError = VersionError::UnknownImageVersion {
            name: "api".to_string(),
            version: "v9".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::UnprocessableEntity(_)));
    }

    #[test]
    fn test_partial_failure_keeps_committed_step() {
        let err: ApiError = VersionError::PartialFailure {
            committed: "domain version 'shop/v1' promoted to staging".to_string(),
            source: Box::new(VersionError::Conflict(
                "domain version already exists".to_string(),
            )),
        }
        .into();

        match err {
            ApiError::PartialFailure { committed, message } => {
                assert_eq!(committed, "domain version 'shop/v1' promoted to staging");
                assert!(message.contains("follow-up step failed"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
