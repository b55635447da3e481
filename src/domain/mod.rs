//! 领域模型模块
//!
//! 纯数据结构与升级规则，不依赖 axum/tokio

pub mod error;
pub mod image;
pub mod name;
pub mod promotion;
pub mod version;

// Re-exports for convenience
pub use error::VersionError;
pub use image::{Image, ImageId, ImageRow, ImageVersion, ImageVersionRow};
pub use promotion::FollowUp;
pub use version::{Domain, DomainVersion, DomainVersionRow, Environment, ImageBinding};
