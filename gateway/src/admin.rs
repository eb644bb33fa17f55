//! 策略管理面
//!
//! role_policies 的增删改查，仅 ADMIN 可用。写路径维持
//! 角色名唯一、ADMIN 不落库两条不变量；改动对下一个请求即生效。

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use gam_authz_core::{PermissionSet, PolicyId, Principal, RolePolicy, is_admin_role};
use gam_common::{PagedResult, Pagination, RoleName};
use gam_errors::AppError;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 管理面路由
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_policies).post(create_policy))
        .route(
            "/{id}",
            get(get_policy).put(update_policy).delete(delete_policy),
        )
        .layer(middleware::from_fn(require_admin))
}

/// ADMIN 硬性检查
///
/// 管理面不走数据驱动的策略查询，与原系统的 /admin/** 一致。
async fn require_admin(request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<Principal>()
        .is_some_and(|p| p.roles.iter().any(is_admin_role));

    if !is_admin {
        let status = if request.extensions().get::<Principal>().is_none() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::FORBIDDEN
        };
        let message = if status == StatusCode::UNAUTHORIZED {
            "authentication required"
        } else {
            "access denied"
        };
        return (status, Json(serde_json::json!({ "error": message }))).into_response();
    }

    next.run(request).await
}

// ============ DTO ============

#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    pub id: Uuid,
    pub role_name: String,
    pub grants: PermissionSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RolePolicy> for PolicyResponse {
    fn from(policy: RolePolicy) -> Self {
        Self {
            id: policy.id.0,
            role_name: policy.role_name.to_string(),
            grants: policy.grants,
            created_at: policy.audit_info.created_at,
            updated_at: policy.audit_info.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePolicyRequest {
    pub role_name: String,
    #[serde(default)]
    pub grants: PermissionSet,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePolicyRequest {
    pub grants: PermissionSet,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// ============ 处理器 ============

async fn list_policies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PagedResult<PolicyResponse>>> {
    let defaults = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(defaults.page).max(1),
        page_size: query.page_size.unwrap_or(defaults.page_size).clamp(1, 100),
    };

    let result = state.policies.list(&pagination).await?;
    let items = result.items.into_iter().map(PolicyResponse::from).collect();

    Ok(Json(PagedResult {
        items,
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

async fn get_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PolicyResponse>> {
    let policy = state
        .policies
        .find_by_id(&PolicyId::from_uuid(id))
        .await?
        .ok_or_else(|| AppError::not_found("Policy not found"))?;

    Ok(Json(policy.into()))
}

async fn create_policy(
    State(state): State<AppState>,
    Json(request): Json<CreatePolicyRequest>,
) -> ApiResult<(StatusCode, Json<PolicyResponse>)> {
    let role_name = RoleName::new(&request.role_name)
        .map_err(|e| ApiError(AppError::validation(e.to_string())))?;

    // RolePolicy::new 同时拒绝 ADMIN 落库
    let policy = RolePolicy::new(role_name.clone(), request.grants)?;

    if state.policies.exists_by_role_name(&role_name).await? {
        return Err(AppError::conflict("Role name already exists").into());
    }

    state.policies.create(&policy).await?;
    info!(role = %role_name, "Role policy created");

    Ok((StatusCode::CREATED, Json(policy.into())))
}

async fn update_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePolicyRequest>,
) -> ApiResult<Json<PolicyResponse>> {
    let mut policy = state
        .policies
        .find_by_id(&PolicyId::from_uuid(id))
        .await?
        .ok_or_else(|| AppError::not_found("Policy not found"))?;

    policy.grants = request.grants;
    policy.audit_info.update(None);

    state.policies.update(&policy).await?;
    info!(role = %policy.role_name, "Role policy updated");

    Ok(Json(policy.into()))
}

async fn delete_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.policies.delete(&PolicyId::from_uuid(id)).await?;
    info!(%id, "Role policy deleted");
    Ok(StatusCode::NO_CONTENT)
}
