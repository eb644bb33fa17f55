//! gam-authz-core - 动态角色授权引擎
//!
//! 按 (角色, 模块, 操作) 做出 allow/deny 决策。
//! 策略存于 role_policies 表，运行时可改，下一个请求即生效。

mod engine;
mod module;
mod policy;
mod principal;
mod repository;
mod store;

pub use engine::*;
pub use module::*;
pub use policy::*;
pub use principal::*;
pub use repository::*;
pub use store::*;
