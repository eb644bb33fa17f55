//! 授权中间件 (RequestAuthorizer)
//!
//! 挡在每个受保护路由之前：取出主体与路由声明的 (模块, 操作)，
//! 调用决策引擎，放行或以通用拒绝响应结束请求。
//! 检查无状态、可重复，不缓存任何决策。

use axum::{
    Json,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use gam_authz_core::{Access, Action, DecisionEngine, Module, Permission, Principal};
use gam_errors::{AppError, AppResult};
use metrics::{counter, histogram};
use tracing::{debug, error, warn};

/// 路由授权范围
///
/// 在路由注册期解析权限选择器；非法组合 (例如 Reports 的写权限)
/// 在这里就失败，启动中止，绝不会拖到请求期。
#[derive(Debug, Clone, Copy)]
pub struct RouteScope {
    module: Module,
    read: Permission,
    write: Option<Permission>,
}

impl RouteScope {
    /// 读写模块的授权范围
    pub fn read_write(module: Module) -> AppResult<Self> {
        Ok(Self {
            module,
            read: Permission::resolve(module, Access::Read)?,
            write: Some(Permission::resolve(module, Access::Write)?),
        })
    }

    /// 只读模块的授权范围
    pub fn read_only(module: Module) -> AppResult<Self> {
        Ok(Self {
            module,
            read: Permission::resolve(module, Access::Read)?,
            write: None,
        })
    }

    pub fn module(&self) -> Module {
        self.module
    }

    /// 按请求操作选出权限选择器
    ///
    /// 只读范围遇到写操作说明注册期漏配了路由，按配置错误上抛。
    fn permission_for(&self, action: Action) -> AppResult<Permission> {
        match action.access() {
            Access::Read => Ok(self.read),
            Access::Write => self.write.ok_or_else(|| {
                AppError::configuration(format!(
                    "Module '{}' is registered read-only but received a mutating route",
                    self.module
                ))
            }),
        }
    }
}

/// 授权中间件状态
#[derive(Clone)]
pub struct AuthzState {
    pub engine: DecisionEngine,
    pub scope: RouteScope,
}

/// HTTP 方法折算为请求操作
fn action_for_method(method: &Method) -> Option<Action> {
    match *method {
        Method::GET | Method::HEAD => Some(Action::Read),
        Method::POST => Some(Action::Create),
        Method::PUT | Method::PATCH => Some(Action::Update),
        Method::DELETE => Some(Action::Delete),
        _ => None,
    }
}

/// 通用拒绝响应
///
/// 不透露缺的是哪个权限位，避免向未授权调用方泄露策略结构。
fn deny_response(status: StatusCode) -> Response {
    let message = match status {
        StatusCode::UNAUTHORIZED => "authentication required",
        StatusCode::SERVICE_UNAVAILABLE => "service unavailable",
        _ => "access denied",
    };
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// 授权检查中间件
pub async fn authorize(
    State(authz): State<AuthzState>,
    request: Request,
    next: Next,
) -> Response {
    let start = std::time::Instant::now();

    let Some(action) = action_for_method(request.method()) else {
        warn!(method = %request.method(), "Denying unmapped HTTP method");
        return deny_response(StatusCode::FORBIDDEN);
    };

    let permission = match authz.scope.permission_for(action) {
        Ok(permission) => permission,
        Err(e) => {
            // 注册期校验的漏网之鱼，属于配置缺陷
            error!(error = %e, "Route scope misconfiguration");
            return deny_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let principal = request.extensions().get::<Principal>().cloned();

    let decision = match authz.engine.decide(principal.as_ref(), permission).await {
        Ok(decision) => decision,
        Err(e) => {
            // 存储不可用：不能解释为 allow 或 deny，拒绝请求并上报
            error!(error = %e, permission = %permission, "Policy store unavailable");
            counter!("authorization_errors_total").increment(1);
            return deny_response(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    counter!(
        "authorization_decisions_total",
        "source" => decision.source.to_string(),
        "allowed" => decision.allowed.to_string()
    )
    .increment(1);
    histogram!("authorization_decision_duration_ms")
        .record(start.elapsed().as_millis() as f64);

    if !decision.allowed {
        debug!(permission = %permission, "Request denied");
        let status = if principal.is_none() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::FORBIDDEN
        };
        return deny_response(status);
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use gam_authz_core::{
        PermissionSet, PolicyId, PolicyRepository, PolicyStore, RolePolicy, RoleSelection,
    };
    use gam_common::{PagedResult, Pagination, RoleName};
    use tower::ServiceExt;

    use super::*;
    use crate::authn::{ROLES_HEADER, SUBJECT_HEADER, principal_middleware};

    /// 测试用内存仓储
    #[derive(Default)]
    struct InMemoryRepo {
        policies: Mutex<HashMap<RoleName, RolePolicy>>,
        fail: bool,
    }

    impl InMemoryRepo {
        fn with(policies: Vec<RolePolicy>) -> Self {
            Self {
                policies: Mutex::new(
                    policies
                        .into_iter()
                        .map(|p| (p.role_name.clone(), p))
                        .collect(),
                ),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                policies: Mutex::new(HashMap::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl PolicyRepository for InMemoryRepo {
        async fn find_by_role_name(&self, role: &RoleName) -> AppResult<Option<RolePolicy>> {
            if self.fail {
                return Err(AppError::database("connection refused"));
            }
            Ok(self.policies.lock().unwrap().get(role).cloned())
        }

        async fn find_by_id(&self, _id: &PolicyId) -> AppResult<Option<RolePolicy>> {
            Ok(None)
        }

        async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<RolePolicy>> {
            Ok(PagedResult::new(Vec::new(), 0, pagination))
        }

        async fn create(&self, policy: &RolePolicy) -> AppResult<()> {
            self.policies
                .lock()
                .unwrap()
                .insert(policy.role_name.clone(), policy.clone());
            Ok(())
        }

        async fn update(&self, _policy: &RolePolicy) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _id: &PolicyId) -> AppResult<()> {
            Ok(())
        }

        async fn exists_by_role_name(&self, role: &RoleName) -> AppResult<bool> {
            Ok(self.policies.lock().unwrap().contains_key(role))
        }
    }

    async fn handler() -> &'static str {
        "OK"
    }

    fn app(repo: InMemoryRepo, module: Module) -> Router {
        let engine = DecisionEngine::new(
            PolicyStore::new(Arc::new(repo)),
            RoleSelection::First,
        );
        let scope = RouteScope::read_write(module).unwrap();

        Router::new()
            .route("/", get(handler).post(handler).put(handler).delete(handler))
            .layer(middleware::from_fn_with_state(
                AuthzState { engine, scope },
                authorize,
            ))
            .layer(middleware::from_fn(principal_middleware))
    }

    fn warehouse_policy() -> RolePolicy {
        let read = Permission::resolve(Module::Inventory, Access::Read).unwrap();
        RolePolicy::new(RoleName::new("WAREHOUSE").unwrap(), PermissionSet::empty())
            .unwrap()
            .with_grant(read)
    }

    fn request(method: &str, subject: Option<&str>, roles: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/");
        if let Some(subject) = subject {
            builder = builder.header(SUBJECT_HEADER, subject);
        }
        if let Some(roles) = roles {
            builder = builder.header(ROLES_HEADER, roles);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_request_is_401() {
        let app = app(InMemoryRepo::with(vec![warehouse_policy()]), Module::Inventory);
        let response = app.oneshot(request("GET", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn granted_read_passes_through() {
        let app = app(InMemoryRepo::with(vec![warehouse_policy()]), Module::Inventory);
        let response = app
            .oneshot(request("GET", Some("wh"), Some("WAREHOUSE")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_write_flag_denies_all_mutations() {
        for method in ["POST", "PUT", "DELETE"] {
            let app = app(InMemoryRepo::with(vec![warehouse_policy()]), Module::Inventory);
            let response = app
                .oneshot(request(method, Some("wh"), Some("WAREHOUSE")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "method {}", method);
        }
    }

    #[tokio::test]
    async fn deny_body_is_generic() {
        let app = app(InMemoryRepo::with(vec![warehouse_policy()]), Module::Inventory);
        let response = app
            .oneshot(request("DELETE", Some("wh"), Some("WAREHOUSE")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // 响应体不提及缺失的权限位
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({ "error": "access denied" }));
    }

    #[tokio::test]
    async fn role_without_policy_is_denied() {
        let app = app(InMemoryRepo::with(vec![]), Module::Contracts);
        let response = app
            .oneshot(request("GET", Some("leasing"), Some("LEASING")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_passes_with_empty_store() {
        let app = app(InMemoryRepo::with(vec![]), Module::Contracts);
        let response = app
            .oneshot(request("PUT", Some("admin"), Some("ADMIN,LEASING")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn store_failure_is_503_not_a_decision() {
        let app = app(InMemoryRepo::failing(), Module::Inventory);
        let response = app
            .oneshot(request("GET", Some("wh"), Some("WAREHOUSE")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reports_write_scope_fails_at_registration() {
        assert!(RouteScope::read_write(Module::Reports).is_err());
        assert!(RouteScope::read_only(Module::Reports).is_ok());
    }

    #[tokio::test]
    async fn unmapped_method_is_denied() {
        let app = app(InMemoryRepo::with(vec![]), Module::Assets);
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/")
                    .header(SUBJECT_HEADER, "admin")
                    .header(ROLES_HEADER, "ADMIN")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // OPTIONS 未注册映射，fail-closed
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
