//! 运行时状态模块
//!
//! 管理应用状态、实体目录与快照持久化

pub mod app_state;
pub mod catalog;
pub mod snapshot;
pub mod version_store;

pub use app_state::AppState;
pub use catalog::{Catalog, CatalogStats};
pub use version_store::VersionStore;
