//! role_policies 表结构引导

use gam_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::info;

/// role_policies 建表 SQL
///
/// 每个模块一对独立的读/写布尔列，Reports 只有读列。
/// role_name 上的唯一约束承载"角色名全局唯一"不变量。
const CREATE_ROLE_POLICIES: &str = r#"
CREATE TABLE IF NOT EXISTS role_policies (
    id UUID PRIMARY KEY,
    role_name TEXT NOT NULL UNIQUE CHECK (role_name <> ''),
    can_assets_read BOOLEAN NOT NULL DEFAULT FALSE,
    can_assets_write BOOLEAN NOT NULL DEFAULT FALSE,
    can_contracts_read BOOLEAN NOT NULL DEFAULT FALSE,
    can_contracts_write BOOLEAN NOT NULL DEFAULT FALSE,
    can_inventory_read BOOLEAN NOT NULL DEFAULT FALSE,
    can_inventory_write BOOLEAN NOT NULL DEFAULT FALSE,
    can_maintenance_read BOOLEAN NOT NULL DEFAULT FALSE,
    can_maintenance_write BOOLEAN NOT NULL DEFAULT FALSE,
    can_reports_read BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL,
    created_by UUID,
    updated_at TIMESTAMPTZ NOT NULL,
    updated_by UUID
)
"#;

/// 引导授权相关表结构
pub async fn ensure_schema(pool: &PgPool) -> AppResult<()> {
    sqlx::query(CREATE_ROLE_POLICIES)
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to ensure role_policies schema: {}", e)))?;
    info!("role_policies schema ensured");
    Ok(())
}
