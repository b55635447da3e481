//! 升级状态机
//!
//! 对单个域版本执行 tested / active / 环境推进规则。规则在此集中校验并
//! 一次性应用（check-then-apply），调用方（目录）在写锁下调用，保证原子性。
//!
//! 升级引擎本身不做任何跨版本的副作用：活跃 dev 版本升级后需要补建
//! 后继 dev 版本时，仅通过返回值 [`FollowUp`] 告知编排层显式执行

use crate::domain::error::VersionError;
use crate::domain::version::{DomainVersion, Environment};

/// 升级成功后编排层需要执行的后续动作
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowUp {
    /// 无后续动作
    None,
    /// 为同一域补建一个新的 dev 版本（活跃 dev 版本升级走后留下接续开发位）
    CreateDevSuccessor,
}

/// 将域版本推进到目标环境
///
/// 规则：
/// - 目标必须是当前环境紧邻的下一站（dev→staging 或 staging→prod）
/// - 版本必须已标记 tested
/// - 推进后版本变为 active；dev→staging 时 tested 重置为 false（新环境从未验证状态开始）
///
/// 校验失败不修改任何状态
pub fn promote(
    domain: &str,
    dv: &mut DomainVersion,
    target: Environment,
) -> Result<FollowUp, VersionError> {
    let current = dv.deployed;

    if current.next() != Some(target) {
        return Err(VersionError::InvalidTransition {
            from: current,
            to: target,
        });
    }

    if !dv.tested {
        return Err(VersionError::NotTested {
            domain: domain.to_string(),
            version: dv.version.clone(),
        });
    }

    let was_active_dev = dv.active && current == Environment::Dev;

    dv.deployed = target;
    dv.active = true;
    if current == Environment::Dev {
        dv.tested = false;
    }

    Ok(if was_active_dev {
        FollowUp::CreateDevSuccessor
    } else {
        FollowUp::None
    })
}

/// 设置域版本的 tested 标记
///
/// 置 true 要求所有绑定的镜像版本均已测试（`all_images_tested`，由目录
/// 实时计算后传入）；置 false 始终允许。不改变 deployed 与 active
pub fn set_tested(
    domain: &str,
    dv: &mut DomainVersion,
    value: bool,
    all_images_tested: bool,
) -> Result<(), VersionError> {
    if value && !all_images_tested {
        return Err(VersionError::NotTested {
            domain: domain.to_string(),
            version: dv.version.clone(),
        });
    }
    dv.tested = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(deployed: Environment, tested: bool, active: bool) -> DomainVersion {
        DomainVersion {
            version: "2025-01-01-10-00-00".to_string(),
            deployed,
            tested,
            active,
            images: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_promote_requires_tested() {
        let mut dv = version(Environment::Dev, false, true);
        let err = promote("shop", &mut dv, Environment::Staging).unwrap_err();
        assert!(matches!(err, VersionError::NotTested { .. }));
        // 校验失败不改状态
        assert_eq!(dv.deployed, Environment::Dev);
        assert!(dv.active);
    }

    #[test]
    fn test_promote_rejects_skipping_environments() {
        let mut dv = version(Environment::Dev, true, true);
        let err = promote("shop", &mut dv, Environment::Prod).unwrap_err();
        assert!(matches!(
            err,
            VersionError::InvalidTransition {
                from: Environment::Dev,
                to: Environment::Prod,
            }
        ));
    }

    #[test]
    fn test_promote_rejects_regression() {
        let mut dv = version(Environment::Staging, true, true);
        let err = promote("shop", &mut dv, Environment::Dev).unwrap_err();
        assert!(matches!(err, VersionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_promote_rejects_same_environment() {
        let mut dv = version(Environment::Staging, true, false);
        let err = promote("shop", &mut dv, Environment::Staging).unwrap_err();
        assert!(matches!(err, VersionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_prod_is_terminal() {
        let mut dv = version(Environment::Prod, true, true);
        for target in [Environment::Dev, Environment::Staging, Environment::Prod] {
            let err = promote("shop", &mut dv, target).unwrap_err();
            assert!(matches!(err, VersionError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_dev_to_staging_resets_tested_and_activates() {
        let mut dv = version(Environment::Dev, true, false);
        let follow_up = promote("shop", &mut dv, Environment::Staging).unwrap();
        assert_eq!(dv.deployed, Environment::Staging);
        assert!(dv.active);
        assert!(!dv.tested);
        // 非活跃 dev 版本升级不需要补建后继
        assert_eq!(follow_up, FollowUp::None);
    }

    #[test]
    fn test_active_dev_promotion_requests_successor() {
        let mut dv = version(Environment::Dev, true, true);
        let follow_up = promote("shop", &mut dv, Environment::Staging).unwrap();
        assert_eq!(follow_up, FollowUp::CreateDevSuccessor);
    }

    #[test]
    fn test_staging_to_prod_keeps_tested() {
        let mut dv = version(Environment::Staging, true, true);
        let follow_up = promote("shop", &mut dv, Environment::Prod).unwrap();
        assert_eq!(dv.deployed, Environment::Prod);
        assert!(dv.active);
        assert!(dv.tested);
        // 活跃版本但不在 dev，无需后继
        assert_eq!(follow_up, FollowUp::None);
    }

    #[test]
    fn test_set_tested_gated_by_image_versions() {
        let mut dv = version(Environment::Dev, false, false);

        let err = set_tested("shop", &mut dv, true, false).unwrap_err();
        assert!(matches!(err, VersionError::NotTested { .. }));
        assert!(!dv.tested);

        set_tested("shop", &mut dv, true, true).unwrap();
        assert!(dv.tested);

        // 置 false 始终允许，且不要求门槛
        set_tested("shop", &mut dv, false, false).unwrap();
        assert!(!dv.tested);
    }
}
