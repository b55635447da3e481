//! 镜像领域模型
//!
//! 镜像（Image）是独立版本化的制品，归属于某个域；其版本（ImageVersion）
//! 各自携带独立的 tested 标记，是域版本测试门槛聚合的叶子事实

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 镜像的稳定内部 ID
///
/// 绑定通过此 ID 引用镜像，因此改名不需要传播到任何绑定
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ImageId(Uuid);

impl ImageId {
    /// 生成新 ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 镜像的一个版本
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageVersion {
    /// 版本号（镜像内唯一）
    pub version: String,
    /// 独立可切换的测试标记
    pub tested: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl ImageVersion {
    /// 创建新版本，初始未测试
    pub fn new(version: String) -> Self {
        Self {
            version,
            tested: false,
            created_at: Utc::now(),
        }
    }
}

/// 镜像记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    /// 稳定内部 ID
    pub id: ImageId,
    /// 显示名称（全局唯一，可改名）
    pub name: String,
    /// 归属的域名称（组织归属，不参与版本化）
    pub domain: String,
    /// 版本列表，创建顺序
    pub versions: Vec<ImageVersion>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最近一次变更时间
    pub updated_at: DateTime<Utc>,
}

impl Image {
    /// 创建不带版本的新镜像
    pub fn new(name: String, domain: String) -> Self {
        let now = Utc::now();
        Self {
            id: ImageId::new(),
            name,
            domain,
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 查找指定版本
    pub fn find_version(&self, version: &str) -> Option<&ImageVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// 查找指定版本的可变引用
    pub fn find_version_mut(&mut self, version: &str) -> Option<&mut ImageVersion> {
        self.versions.iter_mut().find(|v| v.version == version)
    }

    /// 记录变更时间
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// 镜像与归属域的映射行（列表接口）
///
/// 对外契约中镜像名字段叫 `image`
#[derive(Clone, Debug, Serialize)]
pub struct ImageRow {
    #[serde(rename = "image")]
    pub name: String,
    pub domain: String,
}

/// 镜像版本行（列表接口与域版本行内的绑定视图共用）
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ImageVersionRow {
    pub name: String,
    pub version: String,
    pub tested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ids_are_unique() {
        assert_ne!(ImageId::new(), ImageId::new());
    }

    #[test]
    fn test_new_image_version_starts_untested() {
        let iv = ImageVersion::new("2025-01-01-10-00-00".to_string());
        assert!(!iv.tested);
    }

    #[test]
    fn test_image_row_serializes_name_as_image() {
        let row = ImageRow {
            name: "api".to_string(),
            domain: "shop".to_string(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["image"], "api");
        assert_eq!(json["domain"], "shop");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_find_version() {
        let mut image = Image::new("api".to_string(), "shop".to_string());
        image.versions.push(ImageVersion::new("v1".to_string()));
        image.versions.push(ImageVersion::new("v2".to_string()));

        assert!(image.find_version("v1").is_some());
        assert!(image.find_version("v3").is_none());

        image.find_version_mut("v2").unwrap().tested = true;
        assert!(image.find_version("v2").unwrap().tested);
    }
}
