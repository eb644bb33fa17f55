//! 请求主体与角色评估状态机

use gam_common::RoleName;

use crate::policy::is_admin_role;

/// 请求主体
///
/// 由上游认证层解析后注入请求扩展；凭据校验不在本引擎范围内。
#[derive(Debug, Clone)]
pub struct Principal {
    /// 主体标识 (用户名或用户 ID，仅用于日志)
    pub subject: String,
    /// 认证层断言的角色集合
    pub roles: Vec<RoleName>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, roles: Vec<RoleName>) -> Self {
        Self {
            subject: subject.into(),
            roles,
        }
    }
}

/// 角色评估状态机
///
/// ADMIN 的识别只发生在这里，先于任何策略查询；
/// 不把字符串比较散落在各处检查里。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleEvaluation {
    /// 无任何角色 (未认证或认证层给出空角色集)
    Unauthenticated,
    /// 携带 ADMIN，无条件放行
    AdminOverride,
    /// 按策略查询评估，保留非 ADMIN 角色的原始顺序
    PolicyLookup(Vec<RoleName>),
}

impl RoleEvaluation {
    /// 由主体的角色集合推导评估路径
    pub fn of(roles: &[RoleName]) -> Self {
        if roles.is_empty() {
            return RoleEvaluation::Unauthenticated;
        }
        if roles.iter().any(is_admin_role) {
            return RoleEvaluation::AdminOverride;
        }
        RoleEvaluation::PolicyLookup(
            roles
                .iter()
                .filter(|r| !is_admin_role(r))
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str) -> RoleName {
        RoleName::new(name).unwrap()
    }

    #[test]
    fn empty_roles_are_unauthenticated() {
        assert_eq!(RoleEvaluation::of(&[]), RoleEvaluation::Unauthenticated);
    }

    #[test]
    fn admin_wins_regardless_of_position() {
        assert_eq!(
            RoleEvaluation::of(&[role("ADMIN"), role("LEASING")]),
            RoleEvaluation::AdminOverride
        );
        assert_eq!(
            RoleEvaluation::of(&[role("LEASING"), role("ADMIN")]),
            RoleEvaluation::AdminOverride
        );
    }

    #[test]
    fn policy_lookup_preserves_iteration_order() {
        assert_eq!(
            RoleEvaluation::of(&[role("LEASING"), role("TECH")]),
            RoleEvaluation::PolicyLookup(vec![role("LEASING"), role("TECH")])
        );
    }
}
