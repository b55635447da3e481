//! 域与域版本领域模型
//!
//! 域（Domain）是一组可部署服务的集合，其发布以域版本（DomainVersion）为单位
//! 沿 dev → staging → prod 流水线推进

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::image::{ImageId, ImageVersionRow};

/// 部署环境流水线
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }

    /// 流水线中紧邻的下一环境，prod 为终点
    pub fn next(&self) -> Option<Environment> {
        match self {
            Environment::Dev => Some(Environment::Staging),
            Environment::Staging => Some(Environment::Prod),
            Environment::Prod => None,
        }
    }

    /// 从字符串解析环境名
    pub fn parse(value: &str) -> Option<Environment> {
        match value {
            "dev" => Some(Environment::Dev),
            "staging" => Some(Environment::Staging),
            "prod" => Some(Environment::Prod),
            _ => None,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 域版本到镜像版本的绑定
///
/// 通过稳定的 `ImageId` 引用镜像，镜像改名不影响已有绑定
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageBinding {
    /// 被绑定镜像的稳定 ID
    pub image: ImageId,
    /// 绑定指向的镜像版本号
    pub version: String,
}

/// 域的一个发布版本
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainVersion {
    /// 版本号（域内唯一，按创建时间排序的时间戳字符串）
    pub version: String,
    /// 当前所处环境
    pub deployed: Environment,
    /// 是否已通过测试门槛
    pub tested: bool,
    /// 是否为活跃部署目标
    pub active: bool,
    /// 镜像绑定，每个镜像至多一条
    pub images: Vec<ImageBinding>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl DomainVersion {
    /// 创建新版本，始终从 dev、未测试状态开始
    pub fn new(version: String, active: bool) -> Self {
        Self {
            version,
            deployed: Environment::Dev,
            tested: false,
            active,
            images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// 查找指定镜像的绑定
    pub fn binding(&self, image: ImageId) -> Option<&ImageBinding> {
        self.images.iter().find(|b| b.image == image)
    }

    /// 查找指定镜像绑定的可变引用
    pub fn binding_mut(&mut self, image: ImageId) -> Option<&mut ImageBinding> {
        self.images.iter_mut().find(|b| b.image == image)
    }
}

/// 域记录
///
/// 持有该域的全部版本，版本按创建顺序排列
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Domain {
    /// 域名称（全局唯一）
    pub name: String,
    /// 版本列表，创建顺序
    pub versions: Vec<DomainVersion>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最近一次变更时间
    pub updated_at: DateTime<Utc>,
}

impl Domain {
    /// 创建空域记录
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            name,
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 查找指定版本
    pub fn find_version(&self, version: &str) -> Option<&DomainVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// 查找指定版本的下标
    pub fn version_index(&self, version: &str) -> Option<usize> {
        self.versions.iter().position(|v| v.version == version)
    }

    /// 记录变更时间
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// 域版本的展平视图（列表接口返回的行）
///
/// 每条绑定携带所引用镜像版本实时解析出的 tested 状态
#[derive(Clone, Debug, Serialize)]
pub struct DomainVersionRow {
    pub name: String,
    pub version: String,
    pub deployed: Environment,
    pub tested: bool,
    pub active: bool,
    pub images: Vec<ImageVersionRow>,
}
