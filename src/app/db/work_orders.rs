use sqlx::{FromRow, SqliteExecutor};
use strum_macros::{Display, EnumString};
use time::OffsetDateTime;

use crate::app::domain::{OrganizationId, RecordId, UserId};
use crate::app::scope::AssignmentScoped;

/// One checklist item on a work order (unpriced; crews tick these off).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChecklistItem {
    pub name: String,
    pub description: String,
    pub completed: bool,
}

/// Database row for work_orders table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkOrder {
    pub id: String,
    pub organization_id: String,
    pub proposal_id: Option<String>,
    pub customer_id: String,
    pub work_order_number: String,
    pub status: String,
    pub scheduled_date: i64,
    pub completed_date: Option<i64>,
    pub assigned_crew: String,
    pub services: String,
    pub equipment: String,
    pub safety_notes: Option<String>,
    pub job_notes: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WorkOrder {
    /// Parse the assigned crew column. Corrupt data reads as an empty crew,
    /// which is the restrictive direction for visibility checks.
    pub fn crew(&self) -> Vec<String> {
        serde_json::from_str(&self.assigned_crew).unwrap_or_default()
    }
}

impl AssignmentScoped for WorkOrder {
    fn is_assigned_to(&self, user_id: &str) -> bool {
        self.crew().iter().any(|member| member == user_id)
    }
}

/// Data structure for inserting a new work order.
pub struct NewWorkOrder {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub proposal_id: Option<String>,
    pub customer_id: String,
    pub work_order_number: String,
    pub status: String,
    pub scheduled_date: i64,
    pub assigned_crew: Vec<String>,
    pub services: Vec<ChecklistItem>,
    pub equipment: Vec<String>,
    pub safety_notes: Option<String>,
    pub job_notes: Option<String>,
    pub created_by: UserId,
}

/// Partial update; serializes to exactly the changed fields for the audit
/// trail.
#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_crew: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ChecklistItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_notes: Option<String>,
}

/// List all work orders of an organization, newest first.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<Vec<WorkOrder>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, WorkOrder>(
        "SELECT * FROM work_orders WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await
}

/// List work orders scheduled inside an inclusive date range.
pub async fn list_in_date_range<'e, E>(
    executor: E,
    organization_id: &str,
    start: i64,
    end: i64,
) -> Result<Vec<WorkOrder>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, WorkOrder>(
        "SELECT * FROM work_orders WHERE organization_id = ? AND scheduled_date >= ? AND scheduled_date <= ? \
         ORDER BY scheduled_date ASC",
    )
    .bind(organization_id)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}

/// Find a work order by ID.
pub async fn find_by_id<'e, E>(
    executor: E,
    work_order_id: &str,
) -> Result<Option<WorkOrder>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, WorkOrder>("SELECT * FROM work_orders WHERE id = ?")
        .bind(work_order_id)
        .fetch_optional(executor)
        .await
}

/// Insert a new work order.
pub async fn insert<'e, E>(executor: E, work_order: &NewWorkOrder) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let assigned_crew = super::encode_json(&work_order.assigned_crew)?;
    let services = super::encode_json(&work_order.services)?;
    let equipment = super::encode_json(&work_order.equipment)?;

    sqlx::query(
        "INSERT INTO work_orders \
         (id, organization_id, proposal_id, customer_id, work_order_number, status, scheduled_date, assigned_crew, services, equipment, safety_notes, job_notes, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(work_order.id.as_str())
    .bind(work_order.organization_id.as_str())
    .bind(&work_order.proposal_id)
    .bind(&work_order.customer_id)
    .bind(&work_order.work_order_number)
    .bind(&work_order.status)
    .bind(work_order.scheduled_date)
    .bind(assigned_crew)
    .bind(services)
    .bind(equipment)
    .bind(&work_order.safety_notes)
    .bind(&work_order.job_notes)
    .bind(work_order.created_by.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply a partial update.
pub async fn patch<'e, E>(
    executor: E,
    work_order_id: &str,
    changes: &WorkOrderPatch,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let assigned_crew = changes.assigned_crew.as_ref().map(|c| super::encode_json(c)).transpose()?;
    let services = changes.services.as_ref().map(|s| super::encode_json(s)).transpose()?;
    let equipment = changes.equipment.as_ref().map(|e| super::encode_json(e)).transpose()?;

    sqlx::query(
        "UPDATE work_orders SET \
         status = COALESCE(?, status), \
         scheduled_date = COALESCE(?, scheduled_date), \
         assigned_crew = COALESCE(?, assigned_crew), \
         services = COALESCE(?, services), \
         equipment = COALESCE(?, equipment), \
         safety_notes = COALESCE(?, safety_notes), \
         job_notes = COALESCE(?, job_notes), \
         updated_at = ? \
         WHERE id = ?",
    )
    .bind(&changes.status)
    .bind(changes.scheduled_date)
    .bind(assigned_crew)
    .bind(services)
    .bind(equipment)
    .bind(&changes.safety_notes)
    .bind(&changes.job_notes)
    .bind(now)
    .bind(work_order_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Transition to `completed`, stamping `completed_date`.
pub async fn mark_completed<'e, E>(executor: E, work_order_id: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "UPDATE work_orders SET status = 'completed', completed_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(now)
    .bind(work_order_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Work order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkOrderStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}
