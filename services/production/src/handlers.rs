//! Bill of Material Handlers
//!
//! HTTP endpoints over [`BillOfMaterialService`](crate::service::BillOfMaterialService).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use bomforge_models::{BillOfMaterial, BomTreeView, TempBomTree};
use bomforge_utils::{BomError, ErrorResponse};

use crate::service::BillOfMaterialService;
use crate::tree::PassStats;
use crate::AppState;

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(err: anyhow::Error) -> ApiError {
    let bom_error = BomError::from_anyhow(&err);
    let status = StatusCode::from_u16(bom_error.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %format!("{:#}", err), "Request failed");
    }
    (status, Json(ErrorResponse::from(bom_error)))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "bomforge-production",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Tree generation response
#[derive(Debug, Serialize)]
pub struct GenerateTreeResponse {
    pub root: TempBomTree,
    pub stats: PassStats,
}

/// Materialize the tree cache of a BOM
///
/// POST /api/v1/boms/{bom_id}/tree
pub async fn generate_tree(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> ApiResult<GenerateTreeResponse> {
    let generation = state.service.generate_tree(bom_id).await.map_err(api_error)?;

    Ok(Json(GenerateTreeResponse {
        root: generation.root,
        stats: generation.stats,
    }))
}

/// Read the cached tree of a BOM
///
/// GET /api/v1/boms/{bom_id}/tree
pub async fn get_tree(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> ApiResult<BomTreeView> {
    let view = state.service.cached_tree(bom_id).await.map_err(api_error)?;
    Ok(Json(view))
}

#[derive(Debug, Serialize)]
pub struct LatestVersionResponse {
    pub bom_id: Uuid,
    pub latest_version: i32,
}

/// GET /api/v1/boms/{bom_id}/latest-version
pub async fn get_latest_version(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> ApiResult<LatestVersionResponse> {
    let latest_version = state
        .service
        .resolve_latest_version(bom_id)
        .await
        .map_err(api_error)?;

    Ok(Json(LatestVersionResponse {
        bom_id,
        latest_version,
    }))
}

/// POST /api/v1/boms/{bom_id}/versions
pub async fn create_version(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BillOfMaterial>), ApiError> {
    let bom = state.service.generate_new_version(bom_id).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(bom)))
}

/// POST /api/v1/boms/{bom_id}/personalize
pub async fn personalize(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BillOfMaterial>), ApiError> {
    let bom = state.service.customize(bom_id).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(bom)))
}

#[derive(Debug, Serialize)]
pub struct FileNameResponse {
    pub bom_id: Uuid,
    pub file_name: String,
}

/// GET /api/v1/boms/{bom_id}/file-name
pub async fn get_file_name(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> ApiResult<FileNameResponse> {
    let bom = state.service.find(bom_id).await.map_err(api_error)?;

    Ok(Json(FileNameResponse {
        bom_id,
        file_name: BillOfMaterialService::file_name(&bom),
    }))
}

/// GET /api/v1/products/{product_id}/boms
pub async fn get_product_boms(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Vec<BillOfMaterial>> {
    let boms = state
        .service
        .boms_for_product(product_id)
        .await
        .map_err(api_error)?;
    Ok(Json(boms))
}
