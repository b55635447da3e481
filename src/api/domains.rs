//! 域版本管理 API
//!
//! 包含 /domains/* 端点：版本创建、tested 标记、激活与环境推进

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{DomainVersionRow, Environment};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiKey;
use crate::state::AppState;

use super::valid_name;

/// 创建版本请求，version 缺省时由服务端生成时间戳版本号
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVersionRequest {
    pub version: Option<String>,
}

/// 域改名请求
#[derive(Debug, Clone, Deserialize)]
pub struct RenameDomainRequest {
    pub new_name: String,
}

/// 版本推进请求
#[derive(Debug, Clone, Deserialize)]
pub struct PromoteRequest {
    pub version: String,
    /// 目标环境："staging" 或 "prod"
    pub target: String,
}

/// tested 标记请求
#[derive(Debug, Clone, Deserialize)]
pub struct SetTestedRequest {
    pub version: String,
    pub tested: bool,
}

/// 激活版本请求
#[derive(Debug, Clone, Deserialize)]
pub struct ActivateRequest {
    pub version: String,
}

/// 单条镜像绑定
#[derive(Debug, Clone, Deserialize)]
pub struct ImageBindingEntry {
    pub name: String,
    pub version: String,
}

/// 批量更新镜像绑定请求
#[derive(Debug, Clone, Deserialize)]
pub struct SetImagesRequest {
    pub version: String,
    pub images: Vec<ImageBindingEntry>,
}

/// 活跃版本查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveQuery {
    /// 按环境过滤："dev" / "staging" / "prod"
    pub env: Option<String>,
}

/// 版本行列表响应
#[derive(Debug, Serialize)]
pub struct DomainVersionListResponse {
    pub versions: Vec<DomainVersionRow>,
    pub total: usize,
}

/// 变更操作确认响应
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// 创建域版本管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/domains/list", get(list_all_versions))
        .route("/domains/active", get(list_active_versions))
        .route("/domains/:name/list", get(list_domain_versions))
        .route(
            "/domains/:name/active",
            get(get_domain_active).put(activate_domain_version),
        )
        .route("/domains/:name/create", post(create_domain_version))
        .route("/domains/:name/rename", put(rename_domain))
        .route("/domains/:name/promote", post(promote_domain_version))
        .route("/domains/:name/tested", put(set_domain_version_tested))
        .route("/domains/:name/images", put(set_domain_version_images))
        .route("/domains/:name", delete(delete_domain))
        .route("/domains/:name/:version", delete(delete_domain_version))
}

/// 解析环境名，未知值报 400
fn parse_environment(raw: &str) -> Result<Environment, ApiError> {
    Environment::parse(raw.trim().to_ascii_lowercase().as_str()).ok_or_else(|| {
        ApiError::bad_request(format!(
            "unknown environment '{}': expected dev, staging or prod",
            raw
        ))
    })
}

/// 列出所有域的全部版本行
///
/// GET /domains/list
/// 无需认证
async fn list_all_versions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let versions = state.versions.list_domains().await;
    let total = versions.len();
    Json(DomainVersionListResponse { versions, total })
}

/// 列出所有域的活跃版本行，可按环境过滤
///
/// GET /domains/active?env=prod
/// 无需认证
async fn list_active_versions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<impl IntoResponse> {
    let env = match &query.env {
        Some(raw) => Some(parse_environment(raw)?),
        None => None,
    };
    let versions = state.versions.list_active(env).await;
    let total = versions.len();
    Ok(Json(DomainVersionListResponse { versions, total }))
}

/// 列出单个域的全部版本行
///
/// GET /domains/:name/list
/// 无需认证
async fn list_domain_versions(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let versions = state.versions.get_domain_versions(&name).await?;
    let total = versions.len();
    Ok(Json(DomainVersionListResponse { versions, total }))
}

/// 列出单个域的活跃版本行
///
/// GET /domains/:name/active
/// 无需认证
async fn get_domain_active(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let versions = state.versions.get_domain_active(&name).await?;
    let total = versions.len();
    Ok(Json(DomainVersionListResponse { versions, total }))
}

/// 创建域版本；域不存在时一并创建，首个版本自动激活
///
/// POST /domains/:name/create
/// 需要 API Key
async fn create_domain_version(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<CreateVersionRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let row = state
        .versions
        .create_domain_version(&name, body.version)
        .await?;
    Ok(Json(row))
}

/// 域改名，版本历史不受影响
///
/// PUT /domains/:name/rename
/// 需要 API Key
async fn rename_domain(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<RenameDomainRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let new_name = valid_name(&body.new_name)?;
    state.versions.rename_domain(&name, &new_name).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("domain '{}' renamed to '{}'", name, new_name),
    }))
}

/// 将域版本推进到紧邻的下一环境
///
/// POST /domains/:name/promote
/// 需要 API Key
///
/// 目标必须是当前环境的直接后继，且版本已通过测试。
/// 活跃 dev 版本推进后会自动补建新的 dev 版本。
async fn promote_domain_version(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<PromoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let target = parse_environment(&body.target)?;
    let outcome = state.versions.promote(&name, &body.version, target).await?;
    Ok(Json(outcome))
}

/// 设置域版本的 tested 标记
///
/// PUT /domains/:name/tested
/// 需要 API Key
///
/// 置 true 要求该版本绑定的镜像版本全部已测试。
async fn set_domain_version_tested(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SetTestedRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let row = state
        .versions
        .set_domain_version_tested(&name, &body.version, body.tested)
        .await?;
    Ok(Json(row))
}

/// 激活域版本，顶替同环境的原活跃版本
///
/// PUT /domains/:name/active
/// 需要 API Key
async fn activate_domain_version(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<ActivateRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let row = state
        .versions
        .activate_domain_version(&name, &body.version)
        .await?;
    Ok(Json(row))
}

/// 批量更新域版本的镜像绑定
///
/// PUT /domains/:name/images
/// 需要 API Key
///
/// 任一条目指向不存在的镜像版本时整批拒绝；
/// 同一镜像出现多次时以最后一条为准。
async fn set_domain_version_images(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SetImagesRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let mut bindings = Vec::with_capacity(body.images.len());
    for entry in &body.images {
        let image = valid_name(&entry.name)?;
        bindings.push((image, entry.version.clone()));
    }
    let row = state
        .versions
        .update_domain_version_images(&name, &body.version, bindings)
        .await?;
    Ok(Json(row))
}

/// 删除域及其全部版本；仍拥有镜像时拒绝
///
/// DELETE /domains/:name
/// 需要 API Key
async fn delete_domain(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    state.versions.delete_domain(&name).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("domain '{}' deleted", name),
    }))
}

/// 删除单个域版本
///
/// DELETE /domains/:name/:version
/// 需要 API Key
async fn delete_domain_version(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    state.versions.delete_domain_version(&name, &version).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("domain version '{}/{}' deleted", name, version),
    }))
}
