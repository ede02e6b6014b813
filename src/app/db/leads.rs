use sqlx::{FromRow, SqliteExecutor};
use strum_macros::{Display, EnumString};
use time::OffsetDateTime;

use crate::app::domain::{OrganizationId, RecordId, UserId};
use crate::app::scope::AssignmentScoped;

/// Database row for leads table. Serialized straight to the API (no JSON
/// list columns to decode).
#[derive(Debug, Clone, FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub organization_id: String,
    pub customer_id: Option<String>,
    pub status: String,
    pub priority: String,
    pub source: String,
    pub description: String,
    pub estimated_value: Option<f64>,
    pub scheduled_date: Option<i64>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AssignmentScoped for Lead {
    fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assigned_to.as_deref() == Some(user_id)
    }
}

/// Data structure for inserting a new lead.
pub struct NewLead {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub customer_id: Option<String>,
    pub status: String,
    pub priority: String,
    pub source: String,
    pub description: String,
    pub estimated_value: Option<f64>,
    pub scheduled_date: Option<i64>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
}

/// Partial update; serializes to exactly the changed fields for the audit
/// trail.
#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// List all leads of an organization, newest first.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<Vec<Lead>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Lead>(
        "SELECT * FROM leads WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await
}

/// List leads of an organization filtered by status.
pub async fn list_by_status<'e, E>(
    executor: E,
    organization_id: &str,
    status: &str,
) -> Result<Vec<Lead>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Lead>(
        "SELECT * FROM leads WHERE organization_id = ? AND status = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .bind(status)
    .fetch_all(executor)
    .await
}

/// List leads of an organization assigned to a specific user.
pub async fn list_by_assignee<'e, E>(
    executor: E,
    organization_id: &str,
    user_id: &str,
) -> Result<Vec<Lead>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Lead>(
        "SELECT * FROM leads WHERE organization_id = ? AND assigned_to = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Find a lead by ID.
pub async fn find_by_id<'e, E>(executor: E, lead_id: &str) -> Result<Option<Lead>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = ?")
        .bind(lead_id)
        .fetch_optional(executor)
        .await
}

/// Insert a new lead.
pub async fn insert<'e, E>(executor: E, lead: &NewLead) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO leads \
         (id, organization_id, customer_id, status, priority, source, description, estimated_value, scheduled_date, assigned_to, notes, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(lead.id.as_str())
    .bind(lead.organization_id.as_str())
    .bind(&lead.customer_id)
    .bind(&lead.status)
    .bind(&lead.priority)
    .bind(&lead.source)
    .bind(&lead.description)
    .bind(lead.estimated_value)
    .bind(lead.scheduled_date)
    .bind(&lead.assigned_to)
    .bind(&lead.notes)
    .bind(lead.created_by.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply a partial update.
pub async fn patch<'e, E>(executor: E, lead_id: &str, changes: &LeadPatch) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "UPDATE leads SET \
         status = COALESCE(?, status), \
         priority = COALESCE(?, priority), \
         source = COALESCE(?, source), \
         description = COALESCE(?, description), \
         estimated_value = COALESCE(?, estimated_value), \
         scheduled_date = COALESCE(?, scheduled_date), \
         assigned_to = COALESCE(?, assigned_to), \
         notes = COALESCE(?, notes), \
         updated_at = ? \
         WHERE id = ?",
    )
    .bind(&changes.status)
    .bind(&changes.priority)
    .bind(&changes.source)
    .bind(&changes.description)
    .bind(changes.estimated_value)
    .bind(changes.scheduled_date)
    .bind(&changes.assigned_to)
    .bind(&changes.notes)
    .bind(now)
    .bind(lead_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Overwrite the status. Used by the proposal-acceptance cascade.
pub async fn set_status<'e, E>(executor: E, lead_id: &str, status: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query("UPDATE leads SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(lead_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Hard-delete a lead.
pub async fn delete<'e, E>(executor: E, lead_id: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("DELETE FROM leads WHERE id = ?")
        .bind(lead_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Lead pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Scheduled,
    Quoted,
    Won,
    Lost,
}

/// Lead priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeadPriority {
    Low,
    Medium,
    High,
    Urgent,
}
