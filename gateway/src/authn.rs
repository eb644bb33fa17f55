//! 主体注入中间件
//!
//! 凭据校验不在本服务范围内：身份代理在边界完成认证后，
//! 通过可信头部把主体与角色集合传进来。这里只做解析与注入，
//! 头部缺失即视为未认证请求 (引擎侧等价于无角色 → 拒绝)。

use axum::{extract::Request, middleware::Next, response::Response};
use gam_authz_core::Principal;
use gam_common::RoleName;
use tracing::warn;

/// 身份代理断言的主体标识
pub const SUBJECT_HEADER: &str = "x-auth-subject";
/// 身份代理断言的角色集合 (逗号分隔)
pub const ROLES_HEADER: &str = "x-auth-roles";

/// 解析可信头部并注入 Principal 请求扩展
pub async fn principal_middleware(mut request: Request, next: Next) -> Response {
    let subject = request
        .headers()
        .get(SUBJECT_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    if let Some(subject) = subject {
        let roles = request
            .headers()
            .get(ROLES_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(parse_roles)
            .unwrap_or_default();

        request
            .extensions_mut()
            .insert(Principal::new(subject, roles));
    }

    next.run(request).await
}

fn parse_roles(raw: &str) -> Vec<RoleName> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| match RoleName::new(s) {
            Ok(role) => Some(role),
            Err(_) => {
                warn!(role = s, "Ignoring malformed role in roles header");
                None
            }
        })
        .collect()
}
