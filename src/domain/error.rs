//! 版本管理错误分类
//!
//! 存储层与服务层共用的错误类型；所有违规都是同步的校验失败，
//! 不会破坏目录状态，也不会被自动重试

use thiserror::Error;

use crate::domain::version::Environment;

/// 版本管理操作的错误分类
#[derive(Debug, Error)]
pub enum VersionError {
    /// 被引用的实体不存在
    #[error("{0} not found")]
    NotFound(String),

    /// 创建/改名时的名称冲突，或删除被引用实体被拒绝
    #[error("{0}")]
    Conflict(String),

    /// 非法的环境跳转：回退、跳级或越过 prod
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: Environment, to: Environment },

    /// 测试门槛未满足（版本未标记 tested，或有绑定的镜像版本未测试）
    #[error("tested gate not satisfied for domain version {domain}/{version}")]
    NotTested { domain: String, version: String },

    /// 绑定引用了不存在的镜像版本
    #[error("unknown image version {name}@{version}")]
    UnknownImageVersion { name: String, version: String },

    /// 名称不符合 [a-z0-9_-] 字符集
    #[error("invalid name '{0}': allowed characters are a-z, 0-9, '-' and '_'")]
    InvalidName(String),

    /// 多步操作的前半段已提交，后续步骤失败
    #[error("{committed}, but follow-up step failed: {source}")]
    PartialFailure {
        committed: String,
        #[source]
        source: Box<VersionError>,
    },
}

impl VersionError {
    /// 域未找到
    pub fn domain_not_found(name: &str) -> Self {
        Self::NotFound(format!("domain '{name}'"))
    }

    /// 域版本未找到
    pub fn domain_version_not_found(domain: &str, version: &str) -> Self {
        Self::NotFound(format!("domain version '{domain}/{version}'"))
    }

    /// 镜像未找到
    pub fn image_not_found(name: &str) -> Self {
        Self::NotFound(format!("image '{name}'"))
    }

    /// 镜像版本未找到
    pub fn image_version_not_found(name: &str, version: &str) -> Self {
        Self::NotFound(format!("image version '{name}@{version}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_entity() {
        let err = VersionError::domain_not_found("shop");
        assert_eq!(err.to_string(), "domain 'shop' not found");

        let err = VersionError::InvalidTransition {
            from: Environment::Dev,
            to: Environment::Prod,
        };
        assert_eq!(err.to_string(), "invalid transition from dev to prod");

        let err = VersionError::UnknownImageVersion {
            name: "api".to_string(),
            version: "v9".to_string(),
        };
        assert_eq!(err.to_string(), "unknown image version api@v9");
    }

    #[test]
    fn test_partial_failure_names_committed_step() {
        let err = VersionError::PartialFailure {
            committed: "domain version 'shop/v1' promoted to staging".to_string(),
            source: Box::new(VersionError::Conflict(
                "domain version 'shop/v2' already exists".to_string(),
            )),
        };
        let msg = err.to_string();
        assert!(msg.contains("promoted to staging"));
        assert!(msg.contains("follow-up step failed"));
    }
}
