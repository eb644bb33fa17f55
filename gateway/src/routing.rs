//! API 路由
//!
//! 受保护的业务路由在注册期声明 (模块, 操作) 授权范围；
//! /health 与 /ready 是路由层维护的公开白名单，不经过授权引擎。

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
};
use gam_authz_core::Module;
use gam_common::Pagination;
use gam_errors::AppResult;
use gam_telemetry::HealthStatus;
use serde::Serialize;

use crate::admin::admin_routes;
use crate::authn::principal_middleware;
use crate::middleware::{AuthzState, RouteScope, authorize};
use crate::state::AppState;

/// 组装整个应用路由
///
/// 任何路由范围解析失败都会让启动失败 (fail fast)。
pub fn app_router(state: AppState) -> AppResult<Router> {
    let protected = Router::new()
        .nest("/assets", resource_routes(&state, Module::Assets)?)
        .nest("/contracts", resource_routes(&state, Module::Contracts)?)
        .nest("/inventory", resource_routes(&state, Module::Inventory)?)
        .nest("/maintenance", resource_routes(&state, Module::Maintenance)?)
        .nest("/reports", report_routes(&state)?)
        .nest("/admin/policies", admin_routes())
        .layer(middleware::from_fn(principal_middleware));

    Ok(Router::new()
        .merge(public_routes())
        .merge(protected)
        .with_state(state))
}

/// 读写模块的资源路由
///
/// GET → 读；POST/PUT/DELETE → 写。处理器是业务服务的占位,
/// 真正的业务逻辑在各业务服务里。
fn resource_routes(state: &AppState, module: Module) -> AppResult<Router<AppState>> {
    let scope = RouteScope::read_write(module)?;
    Ok(Router::new()
        .route(
            "/",
            get(list_resource).post(mutate_resource),
        )
        .route(
            "/{id}",
            get(fetch_resource)
                .put(mutate_resource)
                .delete(mutate_resource),
        )
        .layer(middleware::from_fn_with_state(
            AuthzState {
                engine: state.engine.clone(),
                scope,
            },
            authorize,
        )))
}

/// Reports 只读路由 (没有写路由可注册)
fn report_routes(state: &AppState) -> AppResult<Router<AppState>> {
    let scope = RouteScope::read_only(Module::Reports)?;
    Ok(Router::new()
        .route("/", get(list_resource))
        .route("/{id}", get(fetch_resource))
        .layer(middleware::from_fn_with_state(
            AuthzState {
                engine: state.engine.clone(),
                scope,
            },
            authorize,
        )))
}

/// 公开路由白名单
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}

// ============ 业务占位处理器 ============

#[derive(Debug, Serialize)]
struct ResourceAck {
    status: &'static str,
}

async fn list_resource() -> Json<ResourceAck> {
    // TODO: 转发到对应业务服务
    Json(ResourceAck { status: "ok" })
}

async fn fetch_resource() -> Json<ResourceAck> {
    // TODO: 转发到对应业务服务
    Json(ResourceAck { status: "ok" })
}

async fn mutate_resource() -> Json<ResourceAck> {
    // TODO: 转发到对应业务服务
    Json(ResourceAck { status: "accepted" })
}

// ============ 健康检查 ============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 就绪检查：策略存储必须可读，引擎才有决策依据
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let probe = Pagination {
        page: 1,
        page_size: 1,
    };
    let store_check = state.policies.list(&probe).await;

    let mut status = HealthStatus::new();
    status.add_check(
        "policy-store",
        store_check.is_ok(),
        store_check.err().map(|e| e.to_string()),
    );

    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
