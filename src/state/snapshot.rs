//! 目录快照持久化
//!
//! 将完整目录落盘到本地 JSON 文件，重启后恢复

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::catalog::Catalog;

/// 快照文件名
const SNAPSHOT_FILE_NAME: &str = "catalog.json";

/// 快照格式版本（用于未来格式升级）
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// 获取快照文件路径
pub fn default_path() -> PathBuf {
    // 优先使用环境变量指定的路径
    if let Ok(dir) = std::env::var("VM_DATA_DIR") {
        return PathBuf::from(dir).join(SNAPSHOT_FILE_NAME);
    }

    // 其次使用可执行文件所在目录
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            return parent.join(SNAPSHOT_FILE_NAME);
        }
    }

    // 默认使用 /opt/xjp-version-manager
    PathBuf::from("/opt/xjp-version-manager").join(SNAPSHOT_FILE_NAME)
}

/// 落盘的快照（写入侧借用目录，不做整体克隆）
#[derive(Serialize)]
struct SnapshotFile<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    catalog: &'a Catalog,
}

/// 读入的快照
#[derive(Deserialize)]
struct SnapshotData {
    version: u32,
    saved_at: DateTime<Utc>,
    catalog: Catalog,
}

/// 从文件加载目录快照
///
/// 文件缺失、无法解析或格式版本不认识时返回 None，上层以空目录启动
pub async fn load(path: &Path) -> Option<Catalog> {
    if !path.exists() {
        return None;
    }

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read catalog snapshot");
            return None;
        }
    };

    match serde_json::from_str::<SnapshotData>(&content) {
        Ok(data) if data.version == SNAPSHOT_FORMAT_VERSION => {
            let stats = data.catalog.stats();
            info!(
                path = %path.display(),
                domains = stats.domains,
                images = stats.images,
                saved_at = %data.saved_at,
                "Loaded catalog snapshot"
            );
            Some(data.catalog)
        }
        Ok(data) => {
            warn!(
                path = %path.display(),
                version = data.version,
                "Unknown catalog snapshot format version, ignoring"
            );
            None
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to parse catalog snapshot, ignoring"
            );
            None
        }
    }
}

/// 保存目录快照（临时文件 + 原子重命名）
pub async fn save(path: &Path, catalog: &Catalog) -> anyhow::Result<()> {
    let temp_path = path.with_extension("json.tmp");

    // 确保目录存在
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let file = SnapshotFile {
        version: SNAPSHOT_FORMAT_VERSION,
        saved_at: Utc::now(),
        catalog,
    };
    let content = serde_json::to_string_pretty(&file)?;

    // 写入临时文件后原子重命名
    fs::write(&temp_path, &content).await?;
    fs::rename(&temp_path, path).await?;

    let stats = catalog.stats();
    debug!(
        path = %path.display(),
        domains = stats.domains,
        images = stats.images,
        "Saved catalog snapshot"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.create_domain_version("shop", "v1").unwrap();
        catalog.create_image("api", "shop").unwrap();
        catalog.create_image_version("api", "a1").unwrap();
        catalog
            .update_domain_version_images("shop", "v1", &[("api".to_string(), "a1".to_string())])
            .unwrap();
        catalog
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        save(&path, &sample_catalog()).await.unwrap();
        let loaded = load(&path).await.unwrap();

        let stats = loaded.stats();
        assert_eq!(stats.domains, 1);
        assert_eq!(stats.domain_versions, 1);
        assert_eq!(stats.images, 1);
        // 绑定（按稳定 id 键入）完整还原
        let row = loaded.get_domain_version("shop", "v1").unwrap();
        assert_eq!(row.images.len(), 1);
        assert_eq!(row.images[0].name, "api");
        assert_eq!(row.images[0].version, "a1");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).await.is_none());
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_format_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let content = r#"{"version":99,"saved_at":"2025-01-01T00:00:00Z","catalog":{"domains":{},"images":{}}}"#;
        fs::write(&path, content).await.unwrap();

        assert!(load(&path).await.is_none());
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("catalog.json");

        save(&path, &Catalog::new()).await.unwrap();
        assert!(load(&path).await.is_some());
    }
}
