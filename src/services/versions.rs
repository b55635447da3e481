//! 版本服务
//!
//! 对外操作门面：把外部请求翻译成目录调用，多步编排（升级 + 补建后继、
//! 新镜像版本 + 重指绑定）在存储的同一把写锁内作为单个事务执行。
//! 版本号在此生成：本地时钟的可排序时间戳

use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::domain::error::VersionError;
use crate::domain::image::{ImageRow, ImageVersionRow};
use crate::domain::promotion::FollowUp;
use crate::domain::version::{DomainVersionRow, Environment};
use crate::state::catalog::CatalogStats;
use crate::state::version_store::VersionStore;

/// 升级结果
///
/// `successor` 仅在活跃 dev 版本升级后出现：为同域补建的新 dev 版本
#[derive(Clone, Debug, Serialize)]
pub struct PromoteOutcome {
    pub promoted: DomainVersionRow,
    pub successor: Option<DomainVersionRow>,
}

/// 版本服务
pub struct VersionService {
    store: VersionStore,
}

impl VersionService {
    /// 纯内存服务，不落盘
    pub fn in_memory() -> Self {
        Self {
            store: VersionStore::in_memory(),
        }
    }

    /// 打开带快照持久化的服务
    pub async fn open(snapshot_path: PathBuf) -> Self {
        Self {
            store: VersionStore::open(snapshot_path).await,
        }
    }

    /// 生成可排序的版本号：本地时钟，精确到秒
    pub fn generate_version_id() -> String {
        Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
    }

    // ---- 域操作 ----

    /// 列出所有域的全部版本行
    pub async fn list_domains(&self) -> Vec<DomainVersionRow> {
        self.store.read(|c| c.list_domains()).await
    }

    /// 列出所有活跃版本行，可按环境过滤
    pub async fn list_active(&self, env: Option<Environment>) -> Vec<DomainVersionRow> {
        self.store.read(|c| c.list_active(env)).await
    }

    /// 单个域的全部版本行
    pub async fn get_domain_versions(
        &self,
        name: &str,
    ) -> Result<Vec<DomainVersionRow>, VersionError> {
        self.store.read(|c| c.get_domain_versions(name)).await
    }

    /// 单个域的活跃版本行
    pub async fn get_domain_active(
        &self,
        name: &str,
    ) -> Result<Vec<DomainVersionRow>, VersionError> {
        self.store.read(|c| c.get_domain_active(name)).await
    }

    /// 创建域版本，未提供版本号时用时间戳生成；域不存在时一并创建
    pub async fn create_domain_version(
        &self,
        name: &str,
        version: Option<String>,
    ) -> Result<DomainVersionRow, VersionError> {
        let version = version.unwrap_or_else(Self::generate_version_id);
        let row = self
            .store
            .mutate(|c| c.create_domain_version(name, &version))
            .await?;
        info!(domain = %name, version = %row.version, active = row.active, "Domain version created");
        Ok(row)
    }

    /// 域改名
    pub async fn rename_domain(&self, name: &str, new_name: &str) -> Result<(), VersionError> {
        self.store
            .mutate(|c| c.rename_domain(name, new_name))
            .await?;
        info!(domain = %name, new_name = %new_name, "Domain renamed");
        Ok(())
    }

    /// 删除域及其全部版本
    pub async fn delete_domain(&self, name: &str) -> Result<(), VersionError> {
        self.store.mutate(|c| c.delete_domain(name)).await?;
        info!(domain = %name, "Domain deleted");
        Ok(())
    }

    /// 删除域版本
    pub async fn delete_domain_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<(), VersionError> {
        self.store
            .mutate(|c| c.delete_domain_version(name, version))
            .await?;
        info!(domain = %name, version = %version, "Domain version deleted");
        Ok(())
    }

    /// 将域版本推进到目标环境
    ///
    /// 两阶段：第一阶段推进本身；若被升级的版本此前是活跃 dev 版本，
    /// 第二阶段为同域补建新的 dev 版本。两阶段在同一事务内执行，
    /// 第二阶段失败时第一阶段不回滚，以 PartialFailure 报告已提交内容
    pub async fn promote(
        &self,
        name: &str,
        version: &str,
        target: Environment,
    ) -> Result<PromoteOutcome, VersionError> {
        let result = self
            .store
            .mutate(|catalog| {
                let (promoted, follow_up) = catalog.promote_domain_version(name, version, target)?;

                let successor = match follow_up {
                    FollowUp::None => None,
                    FollowUp::CreateDevSuccessor => {
                        let successor_id = Self::generate_version_id();
                        match catalog.create_domain_version(name, &successor_id) {
                            Ok(row) => Some(row),
                            Err(e) => {
                                return Err(VersionError::PartialFailure {
                                    committed: format!(
                                        "domain version '{name}/{version}' promoted to {target}"
                                    ),
                                    source: Box::new(e),
                                });
                            }
                        }
                    }
                };
                Ok(PromoteOutcome { promoted, successor })
            })
            .await;

        match &result {
            Ok(outcome) => {
                info!(
                    domain = %name,
                    version = %version,
                    target = %target,
                    successor = outcome.successor.as_ref().map(|s| s.version.as_str()),
                    "Domain version promoted"
                );
            }
            Err(VersionError::PartialFailure { committed, source }) => {
                warn!(
                    domain = %name,
                    version = %version,
                    committed = %committed,
                    error = %source,
                    "Promotion committed but successor creation failed"
                );
            }
            Err(_) => {}
        }
        result
    }

    /// 设置域版本的 tested 标记
    pub async fn set_domain_version_tested(
        &self,
        name: &str,
        version: &str,
        tested: bool,
    ) -> Result<DomainVersionRow, VersionError> {
        let row = self
            .store
            .mutate(|c| c.set_domain_version_tested(name, version, tested))
            .await?;
        info!(domain = %name, version = %version, tested = tested, "Domain version tested flag updated");
        Ok(row)
    }

    /// 激活域版本，顶替同环境的原活跃版本
    pub async fn activate_domain_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<DomainVersionRow, VersionError> {
        let row = self
            .store
            .mutate(|c| c.activate_domain_version(name, version))
            .await?;
        info!(domain = %name, version = %version, env = %row.deployed, "Domain version activated");
        Ok(row)
    }

    /// 批量更新域版本的镜像绑定，整批生效或整批拒绝
    pub async fn update_domain_version_images(
        &self,
        name: &str,
        version: &str,
        bindings: Vec<(String, String)>,
    ) -> Result<DomainVersionRow, VersionError> {
        let row = self
            .store
            .mutate(|c| c.update_domain_version_images(name, version, &bindings))
            .await?;
        info!(
            domain = %name,
            version = %version,
            bindings = row.images.len(),
            "Domain version image bindings updated"
        );
        Ok(row)
    }

    // ---- 镜像操作 ----

    /// 镜像与归属域的映射
    pub async fn list_images(&self) -> Vec<ImageRow> {
        self.store.read(|c| c.list_images()).await
    }

    /// 全部镜像版本行
    pub async fn list_image_versions(&self) -> Vec<ImageVersionRow> {
        self.store.read(|c| c.list_image_versions()).await
    }

    /// 已测试的镜像版本行，可按归属域过滤
    pub async fn list_tested_image_versions(&self, domain: Option<&str>) -> Vec<ImageVersionRow> {
        self.store
            .read(|c| c.list_tested_image_versions(domain))
            .await
    }

    /// 单个镜像的版本行
    pub async fn get_image_versions(
        &self,
        name: &str,
    ) -> Result<Vec<ImageVersionRow>, VersionError> {
        self.store.read(|c| c.get_image_versions(name)).await
    }

    /// 单个镜像中 tested 标记等于给定值的版本行
    pub async fn get_image_versions_by_tested(
        &self,
        name: &str,
        tested: bool,
    ) -> Result<Vec<ImageVersionRow>, VersionError> {
        self.store
            .read(|c| c.get_image_versions_by_tested(name, tested))
            .await
    }

    /// 创建镜像，归属域不存在时一并创建
    pub async fn create_image(&self, name: &str, domain: &str) -> Result<ImageRow, VersionError> {
        let row = self.store.mutate(|c| c.create_image(name, domain)).await?;
        info!(image = %name, domain = %domain, "Image created");
        Ok(row)
    }

    /// 镜像改名，版本历史与绑定不受影响
    pub async fn rename_image(&self, name: &str, new_name: &str) -> Result<(), VersionError> {
        self.store.mutate(|c| c.rename_image(name, new_name)).await?;
        info!(image = %name, new_name = %new_name, "Image renamed");
        Ok(())
    }

    /// 调整镜像归属域
    pub async fn set_image_domain(&self, name: &str, domain: &str) -> Result<(), VersionError> {
        self.store
            .mutate(|c| c.set_image_domain(name, domain))
            .await?;
        info!(image = %name, domain = %domain, "Image domain updated");
        Ok(())
    }

    /// 删除镜像及其全部版本；仍被绑定时拒绝
    pub async fn delete_image(&self, name: &str) -> Result<(), VersionError> {
        self.store.mutate(|c| c.delete_image(name)).await?;
        info!(image = %name, "Image deleted");
        Ok(())
    }

    /// 创建镜像版本，并在同一事务内把归属域活跃 dev 版本的绑定
    /// 指向新版本（既有绑定重指，没有则新增）
    pub async fn create_image_version(
        &self,
        name: &str,
        version: Option<String>,
    ) -> Result<ImageVersionRow, VersionError> {
        let version = version.unwrap_or_else(Self::generate_version_id);
        let (row, bound) = self
            .store
            .mutate(|catalog| {
                let row = catalog.create_image_version(name, &version)?;
                let bound = catalog.bind_into_active_dev(name, &version);
                Ok((row, bound))
            })
            .await?;

        info!(image = %name, version = %row.version, "Image version created");
        if let Some((domain, domain_version)) = bound {
            info!(
                image = %name,
                version = %row.version,
                domain = %domain,
                domain_version = %domain_version,
                "Active dev binding updated to new image version"
            );
        }
        Ok(row)
    }

    /// 设置镜像版本的 tested 标记
    pub async fn set_image_version_tested(
        &self,
        name: &str,
        version: &str,
        tested: bool,
    ) -> Result<ImageVersionRow, VersionError> {
        let row = self
            .store
            .mutate(|c| c.set_image_version_tested(name, version, tested))
            .await?;
        info!(image = %name, version = %version, tested = tested, "Image version tested flag updated");
        Ok(row)
    }

    /// 目录统计
    pub async fn stats(&self) -> CatalogStats {
        self.store.read(|c| c.stats()).await
    }
}
