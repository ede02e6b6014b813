use sqlx::{FromRow, SqliteExecutor};
use strum_macros::{Display, EnumString};
use time::OffsetDateTime;

use crate::app::domain::{OrganizationId, RecordId, UserId};

/// One priced service line on a proposal.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServiceLine {
    pub name: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub rate: f64,
    pub total: f64,
}

/// Database row for proposals table.
#[derive(Debug, Clone, FromRow)]
pub struct Proposal {
    pub id: String,
    pub organization_id: String,
    pub lead_id: Option<String>,
    pub customer_id: String,
    pub proposal_number: String,
    pub status: String,
    pub valid_until: i64,
    pub services: String,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub terms: Option<String>,
    pub notes: Option<String>,
    pub sent_at: Option<i64>,
    pub accepted_at: Option<i64>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data structure for inserting a new proposal.
pub struct NewProposal {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub lead_id: Option<String>,
    pub customer_id: String,
    pub proposal_number: String,
    pub status: String,
    pub valid_until: i64,
    pub services: Vec<ServiceLine>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub terms: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
}

/// Partial update; serializes to exactly the changed fields for the audit
/// trail.
#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// List all proposals of an organization, newest first.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<Vec<Proposal>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Proposal>(
        "SELECT * FROM proposals WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await
}

/// Find a proposal by ID.
pub async fn find_by_id<'e, E>(executor: E, proposal_id: &str) -> Result<Option<Proposal>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Proposal>("SELECT * FROM proposals WHERE id = ?")
        .bind(proposal_id)
        .fetch_optional(executor)
        .await
}

/// Insert a new proposal.
pub async fn insert<'e, E>(executor: E, proposal: &NewProposal) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let services = super::encode_json(&proposal.services)?;

    sqlx::query(
        "INSERT INTO proposals \
         (id, organization_id, lead_id, customer_id, proposal_number, status, valid_until, services, subtotal, tax_rate, tax_amount, total, terms, notes, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(proposal.id.as_str())
    .bind(proposal.organization_id.as_str())
    .bind(&proposal.lead_id)
    .bind(&proposal.customer_id)
    .bind(&proposal.proposal_number)
    .bind(&proposal.status)
    .bind(proposal.valid_until)
    .bind(services)
    .bind(proposal.subtotal)
    .bind(proposal.tax_rate)
    .bind(proposal.tax_amount)
    .bind(proposal.total)
    .bind(&proposal.terms)
    .bind(&proposal.notes)
    .bind(proposal.created_by.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply a partial update.
pub async fn patch<'e, E>(
    executor: E,
    proposal_id: &str,
    changes: &ProposalPatch,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let services = changes.services.as_ref().map(|s| super::encode_json(s)).transpose()?;

    sqlx::query(
        "UPDATE proposals SET \
         status = COALESCE(?, status), \
         services = COALESCE(?, services), \
         subtotal = COALESCE(?, subtotal), \
         tax_rate = COALESCE(?, tax_rate), \
         tax_amount = COALESCE(?, tax_amount), \
         total = COALESCE(?, total), \
         terms = COALESCE(?, terms), \
         notes = COALESCE(?, notes), \
         updated_at = ? \
         WHERE id = ?",
    )
    .bind(&changes.status)
    .bind(services)
    .bind(changes.subtotal)
    .bind(changes.tax_rate)
    .bind(changes.tax_amount)
    .bind(changes.total)
    .bind(&changes.terms)
    .bind(&changes.notes)
    .bind(now)
    .bind(proposal_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Transition to `sent`, stamping `sent_at`.
pub async fn mark_sent<'e, E>(executor: E, proposal_id: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query("UPDATE proposals SET status = 'sent', sent_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(proposal_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Transition to `accepted`, stamping `accepted_at`. The lead cascade is
/// the caller's responsibility, inside the same transaction.
pub async fn mark_accepted<'e, E>(executor: E, proposal_id: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "UPDATE proposals SET status = 'accepted', accepted_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(now)
    .bind(proposal_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Hard-delete a proposal.
pub async fn delete<'e, E>(executor: E, proposal_id: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("DELETE FROM proposals WHERE id = ?")
        .bind(proposal_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Proposal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Rejected,
}
