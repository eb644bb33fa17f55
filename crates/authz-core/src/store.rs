//! 策略读取门面

use std::sync::Arc;

use gam_common::RoleName;
use gam_errors::AppResult;

use crate::module::Permission;
use crate::policy::RolePolicy;
use crate::repository::PolicyRepository;

/// 策略存取门面
///
/// 决策路径上对仓储的唯一入口，只读。无策略记录等价于全部拒绝
/// (fail-closed)；仓储错误原样向上传播，绝不折算成 allow/deny。
#[derive(Clone)]
pub struct PolicyStore {
    repo: Arc<dyn PolicyRepository>,
}

impl PolicyStore {
    pub fn new(repo: Arc<dyn PolicyRepository>) -> Self {
        Self { repo }
    }

    /// 按角色名读取策略记录
    pub async fn get(&self, role: &RoleName) -> AppResult<Option<RolePolicy>> {
        self.repo.find_by_role_name(role).await
    }

    /// 角色是否被授予某权限
    ///
    /// 角色没有策略记录时返回 false。
    pub async fn has(&self, role: &RoleName, permission: Permission) -> AppResult<bool> {
        let policy = self.repo.find_by_role_name(role).await?;
        Ok(policy.is_some_and(|p| p.grants.allows(permission)))
    }
}
