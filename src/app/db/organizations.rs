use sqlx::{FromRow, SqliteExecutor};
use strum_macros::{Display, EnumString};
use time::OffsetDateTime;

use crate::app::domain::OrganizationId;

/// Database row for organizations table.
#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub plan: String,
    pub subscription_status: String,
    pub billing_email: String,
    pub max_users: i64,
    pub user_count: i64,
    pub company_address: Option<String>,
    pub company_phone: Option<String>,
    pub timezone: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data structure for inserting a new organization.
pub struct NewOrganization {
    pub id: OrganizationId,
    pub name: String,
    pub plan: Plan,
    pub subscription_status: SubscriptionStatus,
    pub billing_email: String,
    pub max_users: i64,
    pub user_count: i64,
}

/// Partial update for organization settings. `None` fields are left as-is.
#[derive(Debug, Default, serde::Serialize)]
pub struct OrganizationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Find an organization by ID.
pub async fn find_by_id<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<Option<Organization>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = ?")
        .bind(organization_id)
        .fetch_optional(executor)
        .await
}

/// Insert a new organization.
pub async fn insert<'e, E>(executor: E, organization: &NewOrganization) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "INSERT INTO organizations \
         (id, name, plan, subscription_status, billing_email, max_users, user_count, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(organization.id.as_str())
    .bind(&organization.name)
    .bind(organization.plan.to_string())
    .bind(organization.subscription_status.to_string())
    .bind(&organization.billing_email)
    .bind(organization.max_users)
    .bind(organization.user_count)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply a settings patch. Untouched fields keep their current value.
pub async fn patch<'e, E>(
    executor: E,
    organization_id: &str,
    changes: &OrganizationPatch,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "UPDATE organizations SET \
         name = COALESCE(?, name), \
         company_address = COALESCE(?, company_address), \
         company_phone = COALESCE(?, company_phone), \
         timezone = COALESCE(?, timezone), \
         updated_at = ? \
         WHERE id = ?",
    )
    .bind(&changes.name)
    .bind(&changes.company_address)
    .bind(&changes.company_phone)
    .bind(&changes.timezone)
    .bind(now)
    .bind(organization_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Increment the active-user count (new or reactivated seat).
pub async fn increment_user_count<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query("UPDATE organizations SET user_count = user_count + 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(organization_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Decrement the active-user count, never below zero.
/// Take a seat only while the plan limit holds. Returns false when the
/// organization is already at `max_users`; the check and the increment are
/// one statement, so two concurrent claims cannot both see the last free
/// seat.
pub async fn claim_seat<'e, E>(executor: E, organization_id: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let result = sqlx::query(
        "UPDATE organizations SET user_count = user_count + 1, updated_at = ? \
         WHERE id = ? AND user_count < max_users",
    )
    .bind(now)
    .bind(organization_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn decrement_user_count<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "UPDATE organizations SET user_count = MAX(0, user_count - 1), updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(organization_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Count users with the active flag set, for usage stats.
pub async fn count_active_users<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_scalar("SELECT count(*) FROM users WHERE organization_id = ? AND is_active = 1")
        .bind(organization_id)
        .fetch_one(executor)
        .await
}

/// Subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Plan {
    Base,
    Growth,
    Enterprise,
}

/// Billing-system subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
    Trialing,
}
