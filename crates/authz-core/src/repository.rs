//! 策略仓储接口

use async_trait::async_trait;
use gam_common::{PagedResult, Pagination, RoleName};
use gam_errors::AppResult;

use crate::policy::{PolicyId, RolePolicy};

/// 策略仓储接口
///
/// 决策路径只使用 `find_by_role_name`；其余方法服务于管理面。
/// 实现不得在仓储层做决策缓存：策略修改必须对下一个请求立即生效。
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// 按角色名查找策略，未配置返回 None (正常结果，不是错误)
    async fn find_by_role_name(&self, role: &RoleName) -> AppResult<Option<RolePolicy>>;

    /// 按 ID 查找策略
    async fn find_by_id(&self, id: &PolicyId) -> AppResult<Option<RolePolicy>>;

    /// 分页列出所有策略
    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<RolePolicy>>;

    /// 创建策略
    async fn create(&self, policy: &RolePolicy) -> AppResult<()>;

    /// 更新策略
    async fn update(&self, policy: &RolePolicy) -> AppResult<()>;

    /// 删除策略
    async fn delete(&self, id: &PolicyId) -> AppResult<()>;

    /// 检查角色名是否已存在 (角色名全局唯一)
    async fn exists_by_role_name(&self, role: &RoleName) -> AppResult<bool>;
}
