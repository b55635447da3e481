//! 版本存储
//!
//! 目录的并发入口：单把读写锁保证每次变更（含多步编排）对读者原子可见，
//! 变更提交后在同一把写锁内保存快照

use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::error;

use crate::domain::error::VersionError;
use crate::state::catalog::Catalog;
use crate::state::snapshot;

/// 版本存储
pub struct VersionStore {
    /// 目录本体
    catalog: RwLock<Catalog>,
    /// 快照文件路径；None 表示纯内存运行
    snapshot_path: Option<PathBuf>,
}

impl VersionStore {
    /// 纯内存存储，不落盘
    pub fn in_memory() -> Self {
        Self {
            catalog: RwLock::new(Catalog::new()),
            snapshot_path: None,
        }
    }

    /// 打开带快照的存储，启动时加载既有快照
    ///
    /// 快照缺失或无法解析时以空目录启动
    pub async fn open(path: PathBuf) -> Self {
        let catalog = snapshot::load(&path).await.unwrap_or_default();
        Self {
            catalog: RwLock::new(catalog),
            snapshot_path: Some(path),
        }
    }

    /// 共享锁下执行读操作
    pub async fn read<T>(&self, f: impl FnOnce(&Catalog) -> T) -> T {
        let catalog = self.catalog.read().await;
        f(&catalog)
    }

    /// 独占锁下执行变更，提交后保存快照
    ///
    /// 整个闭包（可含多步编排）在同一把写锁内执行，读者看不到中间态；
    /// 并发变更在锁上排队。PartialFailure 表示前半段已提交，同样落盘
    pub async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Catalog) -> Result<T, VersionError>,
    ) -> Result<T, VersionError> {
        let mut catalog = self.catalog.write().await;
        let result = f(&mut catalog);

        let committed = matches!(result, Ok(_) | Err(VersionError::PartialFailure { .. }));
        if committed {
            if let Some(path) = &self.snapshot_path {
                // 快照失败不回滚已提交的变更，只记录错误
                if let Err(e) = snapshot::save(path, &catalog).await {
                    error!(path = %path.display(), error = %e, "Failed to save catalog snapshot");
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mutate_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        {
            let store = VersionStore::open(path.clone()).await;
            store
                .mutate(|c| c.create_domain_version("shop", "v1"))
                .await
                .unwrap();
        }

        // 重新打开后数据仍在
        let store = VersionStore::open(path).await;
        let rows = store.read(|c| c.get_domain_versions("shop")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].version, "v1");
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let store = VersionStore::open(path.clone()).await;
        let err = store
            .mutate(|c| c.create_domain_version("Bad Name", "v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, VersionError::InvalidName(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_partial_failure_still_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let store = VersionStore::open(path.clone()).await;
        let err = store
            .mutate(|c| -> Result<(), VersionError> {
                // 前半段提交成功，后半段报 PartialFailure
                c.create_domain_version("shop", "v1")?;
                Err(VersionError::PartialFailure {
                    committed: "domain version 'shop/v1' created".to_string(),
                    source: Box::new(VersionError::Conflict("follow-up failed".to_string())),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VersionError::PartialFailure { .. }));

        // 已提交的前半段落盘
        let store = VersionStore::open(path).await;
        assert!(store.read(|c| c.get_domain_version("shop", "v1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_store_never_touches_disk() {
        let store = VersionStore::in_memory();
        store
            .mutate(|c| c.create_domain_version("shop", "v1"))
            .await
            .unwrap();
        let stats = store.read(|c| c.stats()).await;
        assert_eq!(stats.domains, 1);
    }
}
