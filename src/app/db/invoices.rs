use sqlx::{FromRow, SqliteExecutor};
use strum_macros::{Display, EnumString};
use time::OffsetDateTime;

use crate::app::domain::{OrganizationId, RecordId, UserId};

/// One billed line on an invoice.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub total: f64,
}

/// Database row for invoices table.
#[derive(Debug, Clone, FromRow)]
pub struct Invoice {
    pub id: String,
    pub organization_id: String,
    pub work_order_id: Option<String>,
    pub customer_id: String,
    pub invoice_number: String,
    pub status: String,
    pub due_date: i64,
    pub line_items: String,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub payment_method: Option<String>,
    pub paid_at: Option<i64>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data structure for inserting a new invoice.
pub struct NewInvoice {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub work_order_id: Option<String>,
    pub customer_id: String,
    pub invoice_number: String,
    pub status: String,
    pub due_date: i64,
    pub line_items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub created_by: UserId,
}

/// Partial update; serializes to exactly the changed fields for the audit
/// trail.
#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// List all invoices of an organization, newest first.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<Vec<Invoice>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Invoice>(
        "SELECT * FROM invoices WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await
}

/// List invoices of an organization filtered by status.
pub async fn list_by_status<'e, E>(
    executor: E,
    organization_id: &str,
    status: &str,
) -> Result<Vec<Invoice>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Invoice>(
        "SELECT * FROM invoices WHERE organization_id = ? AND status = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .bind(status)
    .fetch_all(executor)
    .await
}

/// List sent invoices whose due date has passed.
pub async fn list_overdue<'e, E>(
    executor: E,
    organization_id: &str,
    now: i64,
) -> Result<Vec<Invoice>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Invoice>(
        "SELECT * FROM invoices WHERE organization_id = ? AND status = 'sent' AND due_date < ? \
         ORDER BY due_date ASC",
    )
    .bind(organization_id)
    .bind(now)
    .fetch_all(executor)
    .await
}

/// Find an invoice by ID.
pub async fn find_by_id<'e, E>(executor: E, invoice_id: &str) -> Result<Option<Invoice>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?")
        .bind(invoice_id)
        .fetch_optional(executor)
        .await
}

/// Insert a new invoice.
pub async fn insert<'e, E>(executor: E, invoice: &NewInvoice) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let line_items = super::encode_json(&invoice.line_items)?;

    sqlx::query(
        "INSERT INTO invoices \
         (id, organization_id, work_order_id, customer_id, invoice_number, status, due_date, line_items, subtotal, tax_rate, tax_amount, total, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(invoice.id.as_str())
    .bind(invoice.organization_id.as_str())
    .bind(&invoice.work_order_id)
    .bind(&invoice.customer_id)
    .bind(&invoice.invoice_number)
    .bind(&invoice.status)
    .bind(invoice.due_date)
    .bind(line_items)
    .bind(invoice.subtotal)
    .bind(invoice.tax_rate)
    .bind(invoice.tax_amount)
    .bind(invoice.total)
    .bind(invoice.created_by.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply a partial update.
pub async fn patch<'e, E>(
    executor: E,
    invoice_id: &str,
    changes: &InvoicePatch,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let line_items = changes.line_items.as_ref().map(|l| super::encode_json(l)).transpose()?;

    sqlx::query(
        "UPDATE invoices SET \
         status = COALESCE(?, status), \
         due_date = COALESCE(?, due_date), \
         line_items = COALESCE(?, line_items), \
         subtotal = COALESCE(?, subtotal), \
         tax_rate = COALESCE(?, tax_rate), \
         tax_amount = COALESCE(?, tax_amount), \
         total = COALESCE(?, total), \
         updated_at = ? \
         WHERE id = ?",
    )
    .bind(&changes.status)
    .bind(changes.due_date)
    .bind(line_items)
    .bind(changes.subtotal)
    .bind(changes.tax_rate)
    .bind(changes.tax_amount)
    .bind(changes.total)
    .bind(now)
    .bind(invoice_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Transition to `paid`: the full total is recorded as paid, with the
/// payment method and timestamp.
pub async fn mark_paid<'e, E>(
    executor: E,
    invoice_id: &str,
    payment_method: &str,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "UPDATE invoices SET status = 'paid', amount_paid = total, payment_method = ?, paid_at = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(payment_method)
    .bind(now)
    .bind(now)
    .bind(invoice_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}
