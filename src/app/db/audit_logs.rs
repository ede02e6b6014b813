//! Append-only audit sink. Entries are written inside the same transaction
//! as the mutation they describe and are never updated or deleted.

use sqlx::{FromRow, SqliteExecutor};
use strum_macros::{Display, EnumString};
use time::OffsetDateTime;

use crate::app::domain::RecordId;

/// What kind of mutation an audit entry describes. State transitions
/// (mark-as-sent/accepted/paid/completed) are recorded as updates, matching
/// the shape of the change they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

/// What kind of record an audit entry is about. Stored as the singular
/// snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AuditResource {
    Lead,
    Proposal,
    WorkOrder,
    Invoice,
    Customer,
    User,
    Organization,
}

/// Database row for audit_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLog {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub action: String,
    pub resource: String,
    pub resource_id: String,
    pub changes: Option<String>,
    pub created_at: i64,
}

/// Append an audit entry. `changes` carries the literal set of changed
/// fields for updates, nothing for creates and deletes.
pub async fn record<'e, E>(
    executor: E,
    organization_id: &str,
    user_id: &str,
    action: AuditAction,
    resource: AuditResource,
    resource_id: &str,
    changes: Option<serde_json::Value>,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let changes = changes.as_ref().map(super::encode_json).transpose()?;

    sqlx::query(
        "INSERT INTO audit_logs (id, organization_id, user_id, action, resource, resource_id, changes, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(RecordId::new().as_str())
    .bind(organization_id)
    .bind(user_id)
    .bind(action.to_string())
    .bind(resource.to_string())
    .bind(resource_id)
    .bind(changes)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// List the most recent entries for an organization.
pub async fn list_recent<'e, E>(
    executor: E,
    organization_id: &str,
    limit: i64,
) -> Result<Vec<AuditLog>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, AuditLog>(
        "SELECT * FROM audit_logs WHERE organization_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(organization_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}
