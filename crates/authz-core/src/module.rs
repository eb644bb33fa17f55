//! 资源模块与权限选择器

use gam_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 资源模块
///
/// 每个模块的读/写权限相互独立。Reports 为只读模块，没有写权限位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Assets,
    Contracts,
    Inventory,
    Maintenance,
    Reports,
}

impl Module {
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Assets => "assets",
            Module::Contracts => "contracts",
            Module::Inventory => "inventory",
            Module::Maintenance => "maintenance",
            Module::Reports => "reports",
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 请求操作
///
/// Create/Update/Delete 统一折算为写访问，引擎不再区分三者。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// 折算为访问类型
    pub fn access(&self) -> Access {
        match self {
            Action::Read => Access::Read,
            Action::Create | Action::Update | Action::Delete => Access::Write,
        }
    }
}

/// 访问类型 (读/写)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
        }
    }
}

/// 权限选择器
///
/// 一个合法的 (模块, 访问类型) 组合。全集共九个；(Reports, Write)
/// 不可表示，试图构造它属于配置错误，必须在路由注册期失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    module: Module,
    access: Access,
}

impl Permission {
    /// 九个合法的权限选择器
    pub const ALL: [Permission; 9] = [
        Permission { module: Module::Assets, access: Access::Read },
        Permission { module: Module::Assets, access: Access::Write },
        Permission { module: Module::Contracts, access: Access::Read },
        Permission { module: Module::Contracts, access: Access::Write },
        Permission { module: Module::Inventory, access: Access::Read },
        Permission { module: Module::Inventory, access: Access::Write },
        Permission { module: Module::Maintenance, access: Access::Read },
        Permission { module: Module::Maintenance, access: Access::Write },
        Permission { module: Module::Reports, access: Access::Read },
    ];

    /// 构造权限选择器
    ///
    /// (Reports, Write) 返回配置错误。
    pub fn resolve(module: Module, access: Access) -> AppResult<Self> {
        if module == Module::Reports && access == Access::Write {
            return Err(AppError::configuration(
                "Module 'reports' is read-only and has no write permission",
            ));
        }
        Ok(Self { module, access })
    }

    /// 由 (模块, 操作) 解析权限选择器
    pub fn for_action(module: Module, action: Action) -> AppResult<Self> {
        Self::resolve(module, action.access())
    }

    pub fn module(&self) -> Module {
        self.module
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// 权限代码 (例如 "assets:read")，用于管理接口与存储映射
    pub fn code(&self) -> &'static str {
        match (self.module, self.access) {
            (Module::Assets, Access::Read) => "assets:read",
            (Module::Assets, Access::Write) => "assets:write",
            (Module::Contracts, Access::Read) => "contracts:read",
            (Module::Contracts, Access::Write) => "contracts:write",
            (Module::Inventory, Access::Read) => "inventory:read",
            (Module::Inventory, Access::Write) => "inventory:write",
            (Module::Maintenance, Access::Read) => "maintenance:read",
            (Module::Maintenance, Access::Write) => "maintenance:write",
            (Module::Reports, Access::Read) => "reports:read",
            (Module::Reports, Access::Write) => unreachable!("rejected by resolve"),
        }
    }

    /// 由权限代码解析
    pub fn from_code(code: &str) -> AppResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.code() == code)
            .ok_or_else(|| AppError::validation(format!("Unknown permission code: {}", code)))
    }

    /// 位集合中的下标 (0..=8)
    pub(crate) fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|p| p == self)
            .expect("Permission::ALL covers every constructible permission")
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
