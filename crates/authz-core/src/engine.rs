//! 授权决策引擎

use gam_common::RoleName;
use gam_errors::AppResult;
use tracing::debug;

use crate::module::Permission;
use crate::principal::{Principal, RoleEvaluation};
use crate::store::PolicyStore;

/// 多角色主体的角色选取策略
///
/// 原系统行为是 First：只评估遇到的第一个非 ADMIN 角色。
/// 主体持有多个非 ADMIN 角色时只看其中一个，这是刻意保留的
/// 已知限制，是否换成并集语义留给产品侧决定。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleSelection {
    /// 只评估第一个非 ADMIN 角色 (原始行为)
    #[default]
    First,
    /// 任一角色被授予即放行
    MostPermissive,
    /// 所有角色都被授予才放行
    AllMustAgree,
}

/// 决策来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// ADMIN 硬编码放行
    AdminOverride,
    /// 策略记录授予
    RolePolicy,
    /// 默认拒绝 (无角色 / 无记录 / 权限位为 false)
    DefaultDeny,
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionSource::AdminOverride => write!(f, "ADMIN_OVERRIDE"),
            DecisionSource::RolePolicy => write!(f, "ROLE_POLICY"),
            DecisionSource::DefaultDeny => write!(f, "DEFAULT_DENY"),
        }
    }
}

/// 决策结果
///
/// 只在一次检查的生命周期内存在，用于日志与指标；
/// 不持久化，也不进入拒绝响应体 (避免向调用方泄露策略结构)。
#[derive(Debug, Clone)]
pub struct Decision {
    pub allowed: bool,
    pub source: DecisionSource,
    /// 做出决策所依据的角色 (聚合策略下可能为空)
    pub role: Option<RoleName>,
    pub permission: Permission,
}

impl Decision {
    fn allow(source: DecisionSource, role: Option<RoleName>, permission: Permission) -> Self {
        Self {
            allowed: true,
            source,
            role,
            permission,
        }
    }

    fn deny(role: Option<RoleName>, permission: Permission) -> Self {
        Self {
            allowed: false,
            source: DecisionSource::DefaultDeny,
            role,
            permission,
        }
    }
}

/// 决策引擎
///
/// 判定顺序:
/// 1. 无角色 → 拒绝
/// 2. 携带 ADMIN → 放行，不做任何存储查询
/// 3. 按选取策略查 PolicyStore，缺记录等价拒绝
///
/// 存储读取失败以 Err 上抛，由调用方拒绝请求 (fail-closed)，
/// 引擎本身不把失败解释成任何一种决策。
#[derive(Clone)]
pub struct DecisionEngine {
    store: PolicyStore,
    selection: RoleSelection,
}

impl DecisionEngine {
    pub fn new(store: PolicyStore, selection: RoleSelection) -> Self {
        Self { store, selection }
    }

    /// 对一次 (主体, 权限) 检查做出决策
    pub async fn decide(
        &self,
        principal: Option<&Principal>,
        permission: Permission,
    ) -> AppResult<Decision> {
        let roles: &[RoleName] = principal.map(|p| p.roles.as_slice()).unwrap_or(&[]);

        let decision = match RoleEvaluation::of(roles) {
            RoleEvaluation::Unauthenticated => Decision::deny(None, permission),
            RoleEvaluation::AdminOverride => {
                Decision::allow(DecisionSource::AdminOverride, None, permission)
            }
            RoleEvaluation::PolicyLookup(candidates) => {
                self.lookup(&candidates, permission).await?
            }
        };

        debug!(
            subject = principal.map(|p| p.subject.as_str()).unwrap_or("-"),
            permission = %permission,
            allowed = decision.allowed,
            source = %decision.source,
            "Authorization decision"
        );

        Ok(decision)
    }

    async fn lookup(&self, roles: &[RoleName], permission: Permission) -> AppResult<Decision> {
        match self.selection {
            RoleSelection::First => {
                // RoleEvaluation 保证这里至少有一个角色
                let role = &roles[0];
                let allowed = self.store.has(role, permission).await?;
                Ok(if allowed {
                    Decision::allow(DecisionSource::RolePolicy, Some(role.clone()), permission)
                } else {
                    Decision::deny(Some(role.clone()), permission)
                })
            }
            RoleSelection::MostPermissive => {
                for role in roles {
                    if self.store.has(role, permission).await? {
                        return Ok(Decision::allow(
                            DecisionSource::RolePolicy,
                            Some(role.clone()),
                            permission,
                        ));
                    }
                }
                Ok(Decision::deny(None, permission))
            }
            RoleSelection::AllMustAgree => {
                for role in roles {
                    if !self.store.has(role, permission).await? {
                        return Ok(Decision::deny(Some(role.clone()), permission));
                    }
                }
                Ok(Decision::allow(DecisionSource::RolePolicy, None, permission))
            }
        }
    }
}
