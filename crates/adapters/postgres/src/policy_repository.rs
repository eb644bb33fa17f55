//! PostgreSQL 策略仓储实现
//!
//! role_policies 一行一个角色，九个独立布尔权限列。
//! 决策路径的读取不做任何本地缓存：策略修改对下一个请求立即生效。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gam_authz_core::{Permission, PermissionSet, PolicyId, PolicyRepository, RolePolicy};
use gam_common::{AuditInfo, PagedResult, Pagination, RoleName, UserId};
use gam_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

/// 将 sqlx 错误转换为 AppError
///
/// role_name 唯一约束冲突单独映射为 Conflict。
fn map_sqlx_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.code().as_deref() == Some("23505") {
            return AppError::conflict("Role name already exists");
        }
    }
    AppError::database(e.to_string())
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, role_name,
           can_assets_read, can_assets_write,
           can_contracts_read, can_contracts_write,
           can_inventory_read, can_inventory_write,
           can_maintenance_read, can_maintenance_write,
           can_reports_read,
           created_at, created_by, updated_at, updated_by
    FROM role_policies
"#;

pub struct PostgresPolicyRepository {
    pool: PgPool,
}

impl PostgresPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepository for PostgresPolicyRepository {
    async fn find_by_role_name(&self, role: &RoleName) -> AppResult<Option<RolePolicy>> {
        let row = sqlx::query_as::<_, PolicyRow>(&format!(
            "{} WHERE role_name = $1",
            SELECT_COLUMNS
        ))
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(RolePolicy::try_from).transpose()
    }

    async fn find_by_id(&self, id: &PolicyId) -> AppResult<Option<RolePolicy>> {
        let row = sqlx::query_as::<_, PolicyRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(RolePolicy::try_from).transpose()
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<PagedResult<RolePolicy>> {
        let rows = sqlx::query_as::<_, PolicyRow>(&format!(
            "{} ORDER BY role_name LIMIT $1 OFFSET $2",
            SELECT_COLUMNS
        ))
        .bind(pagination.page_size as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM role_policies")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(RolePolicy::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PagedResult::new(items, total.0 as u64, pagination))
    }

    async fn create(&self, policy: &RolePolicy) -> AppResult<()> {
        let flags = permission_flags(&policy.grants);

        sqlx::query(
            r#"
            INSERT INTO role_policies (
                id, role_name,
                can_assets_read, can_assets_write,
                can_contracts_read, can_contracts_write,
                can_inventory_read, can_inventory_write,
                can_maintenance_read, can_maintenance_write,
                can_reports_read,
                created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(policy.id.0)
        .bind(policy.role_name.as_str())
        .bind(flags[0])
        .bind(flags[1])
        .bind(flags[2])
        .bind(flags[3])
        .bind(flags[4])
        .bind(flags[5])
        .bind(flags[6])
        .bind(flags[7])
        .bind(flags[8])
        .bind(policy.audit_info.created_at)
        .bind(policy.audit_info.created_by.as_ref().map(|u| u.0))
        .bind(policy.audit_info.updated_at)
        .bind(policy.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, policy: &RolePolicy) -> AppResult<()> {
        let flags = permission_flags(&policy.grants);

        let result = sqlx::query(
            r#"
            UPDATE role_policies
            SET role_name = $2,
                can_assets_read = $3, can_assets_write = $4,
                can_contracts_read = $5, can_contracts_write = $6,
                can_inventory_read = $7, can_inventory_write = $8,
                can_maintenance_read = $9, can_maintenance_write = $10,
                can_reports_read = $11,
                updated_at = $12, updated_by = $13
            WHERE id = $1
            "#,
        )
        .bind(policy.id.0)
        .bind(policy.role_name.as_str())
        .bind(flags[0])
        .bind(flags[1])
        .bind(flags[2])
        .bind(flags[3])
        .bind(flags[4])
        .bind(flags[5])
        .bind(flags[6])
        .bind(flags[7])
        .bind(flags[8])
        .bind(policy.audit_info.updated_at)
        .bind(policy.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Policy not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: &PolicyId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM role_policies WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Policy not found"));
        }
        Ok(())
    }

    async fn exists_by_role_name(&self, role: &RoleName) -> AppResult<bool> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM role_policies WHERE role_name = $1)")
                .bind(role.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.0)
    }
}

/// 权限位展开为列值，顺序与 Permission::ALL 一致
fn permission_flags(grants: &PermissionSet) -> [bool; 9] {
    let mut flags = [false; 9];
    for (i, permission) in Permission::ALL.iter().enumerate() {
        flags[i] = grants.allows(*permission);
    }
    flags
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
struct PolicyRow {
    id: Uuid,
    role_name: String,
    can_assets_read: bool,
    can_assets_write: bool,
    can_contracts_read: bool,
    can_contracts_write: bool,
    can_inventory_read: bool,
    can_inventory_write: bool,
    can_maintenance_read: bool,
    can_maintenance_write: bool,
    can_reports_read: bool,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
    updated_by: Option<Uuid>,
}

impl PolicyRow {
    fn grants(&self) -> PermissionSet {
        let flags = [
            self.can_assets_read,
            self.can_assets_write,
            self.can_contracts_read,
            self.can_contracts_write,
            self.can_inventory_read,
            self.can_inventory_write,
            self.can_maintenance_read,
            self.can_maintenance_write,
            self.can_reports_read,
        ];
        Permission::ALL
            .iter()
            .zip(flags)
            .filter(|(_, flag)| *flag)
            .map(|(p, _)| *p)
            .collect()
    }
}

impl TryFrom<PolicyRow> for RolePolicy {
    type Error = AppError;

    fn try_from(row: PolicyRow) -> AppResult<Self> {
        let role_name = RoleName::new(&row.role_name)
            .map_err(|_| AppError::internal(format!("Corrupt role name in row {}", row.id)))?;
        let grants = row.grants();

        Ok(RolePolicy {
            id: PolicyId::from_uuid(row.id),
            role_name,
            grants,
            audit_info: AuditInfo {
                created_at: row.created_at,
                created_by: row.created_by.map(UserId::from_uuid),
                updated_at: row.updated_at,
                updated_by: row.updated_by.map(UserId::from_uuid),
            },
        })
    }
}
