//! Image Catalog API
//!
//! Endpoints:
//! - GET /images/list - List images and their owning domains
//! - GET /images/list/versions - List every image version
//! - GET /images/list/tested - List tested image versions, optionally per domain
//! - GET /images/:name/list - List versions of one image
//! - GET /images/:name/tested - List one image's versions by tested flag
//! - POST /images/create - Register a new image
//! - POST /images/:name/create - Create a new image version
//! - PUT /images/:name/rename - Rename an image
//! - PUT /images/:name/domain - Move an image to another domain
//! - PUT /images/:name/tested - Mark an image version tested
//! - DELETE /images/:name - Delete an image and its versions

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{ImageRow, ImageVersionRow};
use crate::error::ApiResult;
use crate::middleware::RequireApiKey;
use crate::state::AppState;

use super::valid_name;

/// Image registration request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImageRequest {
    /// Image name (lowercased at the boundary)
    pub name: String,
    /// Owning domain; created on the fly if missing
    pub domain: String,
}

/// Image version creation request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImageVersionRequest {
    /// Explicit version id; generated from the clock when omitted
    pub version: Option<String>,
}

/// Image rename request
#[derive(Debug, Clone, Deserialize)]
pub struct RenameImageRequest {
    pub new_name: String,
}

/// Image domain reassignment request
#[derive(Debug, Clone, Deserialize)]
pub struct SetImageDomainRequest {
    pub domain: String,
}

/// Image version tested flag request
#[derive(Debug, Clone, Deserialize)]
pub struct SetImageTestedRequest {
    pub version: String,
    pub tested: bool,
}

/// Tested listing query
#[derive(Debug, Clone, Deserialize)]
pub struct TestedQuery {
    /// Restrict to images owned by this domain
    pub domain: Option<String>,
}

/// Per-image tested filter query
#[derive(Debug, Clone, Deserialize)]
pub struct TestedFlagQuery {
    /// Filter by tested status; defaults to true
    pub tested: Option<bool>,
}

/// Image list response
#[derive(Debug, Serialize)]
pub struct ImageListResponse {
    pub images: Vec<ImageRow>,
    pub total: usize,
}

/// Image version list response
#[derive(Debug, Serialize)]
pub struct ImageVersionListResponse {
    pub versions: Vec<ImageVersionRow>,
    pub total: usize,
}

/// Mutation acknowledgement
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Create image catalog router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/images/list", get(list_images))
        .route("/images/list/versions", get(list_image_versions))
        .route("/images/list/tested", get(list_tested_image_versions))
        .route("/images/:name/list", get(get_image_versions))
        .route("/images/create", post(create_image))
        .route("/images/:name/create", post(create_image_version))
        .route("/images/:name/rename", put(rename_image))
        .route("/images/:name/domain", put(set_image_domain))
        .route(
            "/images/:name/tested",
            get(get_image_versions_by_tested).put(set_image_version_tested),
        )
        .route("/images/:name", delete(delete_image))
}

/// List all images and their owning domains
///
/// GET /images/list
/// No authentication required
async fn list_images(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let images = state.versions.list_images().await;
    let total = images.len();
    Json(ImageListResponse { images, total })
}

/// List every version of every image
///
/// GET /images/list/versions
/// No authentication required
async fn list_image_versions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let versions = state.versions.list_image_versions().await;
    let total = versions.len();
    Json(ImageVersionListResponse { versions, total })
}

/// List tested image versions, optionally restricted to one domain
///
/// GET /images/list/tested?domain=backend
/// No authentication required
async fn list_tested_image_versions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TestedQuery>,
) -> ApiResult<impl IntoResponse> {
    let domain = match &query.domain {
        Some(raw) => Some(valid_name(raw)?),
        None => None,
    };
    let versions = state
        .versions
        .list_tested_image_versions(domain.as_deref())
        .await;
    let total = versions.len();
    Ok(Json(ImageVersionListResponse { versions, total }))
}

/// List versions of one image
///
/// GET /images/:name/list
/// No authentication required
async fn get_image_versions(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let versions = state.versions.get_image_versions(&name).await?;
    let total = versions.len();
    Ok(Json(ImageVersionListResponse { versions, total }))
}

/// List one image's versions filtered by tested flag
///
/// GET /images/:name/tested?tested=false
/// No authentication required
///
/// Without the query parameter, returns the tested versions.
async fn get_image_versions_by_tested(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<TestedFlagQuery>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let versions = state
        .versions
        .get_image_versions_by_tested(&name, query.tested.unwrap_or(true))
        .await?;
    let total = versions.len();
    Ok(Json(ImageVersionListResponse { versions, total }))
}

/// Register a new image under a domain
///
/// POST /images/create
/// Requires API Key
async fn create_image(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateImageRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&body.name)?;
    let domain = valid_name(&body.domain)?;
    let row = state.versions.create_image(&name, &domain).await?;
    Ok(Json(row))
}

/// Create a new image version
///
/// POST /images/:name/create
/// Requires API Key
///
/// If the owning domain has an active dev version that already binds
/// this image, the binding is repointed to the new version.
async fn create_image_version(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<CreateImageVersionRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let row = state
        .versions
        .create_image_version(&name, body.version)
        .await?;
    Ok(Json(row))
}

/// Rename an image, keeping its version history and bindings
///
/// PUT /images/:name/rename
/// Requires API Key
async fn rename_image(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<RenameImageRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let new_name = valid_name(&body.new_name)?;
    state.versions.rename_image(&name, &new_name).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("image '{}' renamed to '{}'", name, new_name),
    }))
}

/// Move an image to another domain
///
/// PUT /images/:name/domain
/// Requires API Key
async fn set_image_domain(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SetImageDomainRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let domain = valid_name(&body.domain)?;
    state.versions.set_image_domain(&name, &domain).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("image '{}' moved to domain '{}'", name, domain),
    }))
}

/// Mark an image version as tested (or clear the flag)
///
/// PUT /images/:name/tested
/// Requires API Key
async fn set_image_version_tested(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SetImageTestedRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    let row = state
        .versions
        .set_image_version_tested(&name, &body.version, body.tested)
        .await?;
    Ok(Json(row))
}

/// Delete an image and all of its versions
///
/// DELETE /images/:name
/// Requires API Key
///
/// Rejected while any domain version still binds the image.
async fn delete_image(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let name = valid_name(&name)?;
    state.versions.delete_image(&name).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("image '{}' deleted", name),
    }))
}
