//! 角色策略实体

use gam_common::{AuditInfo, RoleName};
use gam_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde::de::Error as _;
use uuid::Uuid;

use crate::module::Permission;

/// ADMIN 超级角色
///
/// 不走策略查询，由引擎硬编码放行；也禁止作为策略记录存储。
pub const ADMIN_ROLE: &str = "ADMIN";

/// 判断角色是否为 ADMIN
pub fn is_admin_role(role: &RoleName) -> bool {
    role.as_str() == ADMIN_ROLE
}

/// 策略 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PolicyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// 权限位集合
///
/// 九个合法选择器各占一位。读写位相互独立，互不蕴含。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet(u16);

impl PermissionSet {
    /// 空集合 (全部拒绝)
    pub fn empty() -> Self {
        Self(0)
    }

    /// 是否授予某权限
    pub fn allows(&self, permission: Permission) -> bool {
        self.0 & (1 << permission.index()) != 0
    }

    /// 授予权限
    pub fn grant(&mut self, permission: Permission) {
        self.0 |= 1 << permission.index();
    }

    /// 撤销权限
    pub fn revoke(&mut self, permission: Permission) {
        self.0 &= !(1 << permission.index());
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// 已授予的权限列表
    pub fn permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .iter()
            .copied()
            .filter(|p| self.allows(*p))
            .collect()
    }

    /// 已授予权限的代码列表 (用于管理接口)
    pub fn codes(&self) -> Vec<&'static str> {
        self.permissions().iter().map(|p| p.code()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::empty();
        for permission in iter {
            set.grant(permission);
        }
        set
    }
}

// 对外序列化为权限代码数组，例如 ["inventory:read", "reports:read"]
impl Serialize for PermissionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.codes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let codes = Vec::<String>::deserialize(deserializer)?;
        let mut set = Self::empty();
        for code in codes {
            let permission =
                Permission::from_code(&code).map_err(|e| D::Error::custom(e.to_string()))?;
            set.grant(permission);
        }
        Ok(set)
    }
}

/// 角色策略记录
///
/// 每个角色一行，角色名唯一。ADMIN 不落库。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePolicy {
    pub id: PolicyId,
    pub role_name: RoleName,
    pub grants: PermissionSet,
    pub audit_info: AuditInfo,
}

impl RolePolicy {
    pub fn new(role_name: RoleName, grants: PermissionSet) -> AppResult<Self> {
        if is_admin_role(&role_name) {
            return Err(AppError::validation(
                "The ADMIN role is a built-in override and cannot carry a stored policy",
            ));
        }
        Ok(Self {
            id: PolicyId::new(),
            role_name,
            grants,
            audit_info: AuditInfo::default(),
        })
    }

    pub fn with_grant(mut self, permission: Permission) -> Self {
        self.grants.grant(permission);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Access, Module};

    fn perm(module: Module, access: Access) -> Permission {
        Permission::resolve(module, access).unwrap()
    }

    #[test]
    fn empty_set_denies_everything() {
        let set = PermissionSet::empty();
        for permission in Permission::ALL {
            assert!(!set.allows(permission));
        }
    }

    #[test]
    fn read_and_write_bits_are_independent() {
        let mut set = PermissionSet::empty();
        set.grant(perm(Module::Inventory, Access::Read));

        assert!(set.allows(perm(Module::Inventory, Access::Read)));
        assert!(!set.allows(perm(Module::Inventory, Access::Write)));

        set.grant(perm(Module::Assets, Access::Write));
        assert!(set.allows(perm(Module::Assets, Access::Write)));
        assert!(!set.allows(perm(Module::Assets, Access::Read)));
    }

    #[test]
    fn grant_and_revoke_round_trip() {
        let mut set = PermissionSet::empty();
        let p = perm(Module::Contracts, Access::Write);
        set.grant(p);
        assert!(set.allows(p));
        set.revoke(p);
        assert!(!set.allows(p));
        assert!(set.is_empty());
    }

    #[test]
    fn serde_as_permission_codes() {
        let set: PermissionSet = [
            perm(Module::Inventory, Access::Read),
            perm(Module::Reports, Access::Read),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json, serde_json::json!(["inventory:read", "reports:read"]));

        let back: PermissionSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);

        let bad: Result<PermissionSet, _> =
            serde_json::from_value(serde_json::json!(["reports:write"]));
        assert!(bad.is_err());
    }

    #[test]
    fn admin_role_cannot_be_stored() {
        let err = RolePolicy::new(
            RoleName::new("ADMIN").unwrap(),
            PermissionSet::empty(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 400);

        // 大小写归一后仍然拒绝
        assert!(RolePolicy::new(RoleName::new("admin").unwrap(), PermissionSet::empty()).is_err());
    }

    #[test]
    fn builder_grants() {
        let policy = RolePolicy::new(RoleName::new("WAREHOUSE").unwrap(), PermissionSet::empty())
            .unwrap()
            .with_grant(perm(Module::Inventory, Access::Read));
        assert!(policy.grants.allows(perm(Module::Inventory, Access::Read)));
        assert!(!policy.grants.allows(perm(Module::Inventory, Access::Write)));
    }
}
