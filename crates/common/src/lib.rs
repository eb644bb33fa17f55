//! gam-common - 通用类型定义

mod types;

pub use types::*;
