use sqlx::{FromRow, SqliteExecutor};
use strum_macros::{Display, EnumString};
use time::OffsetDateTime;

use crate::app::domain::{OrganizationId, RecordId, UserId};

/// Database row for customers table.
#[derive(Debug, Clone, FromRow)]
pub struct Customer {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub property_type: String,
    pub notes: Option<String>,
    pub tags: String,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data structure for inserting a new customer.
pub struct NewCustomer {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub property_type: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_by: UserId,
}

/// Partial update. `None` fields are left as-is; serializes to exactly the
/// changed fields, which is what the audit entry records.
#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// List all customers of an organization, newest first.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<Vec<Customer>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await
}

/// Find a customer by ID.
pub async fn find_by_id<'e, E>(executor: E, customer_id: &str) -> Result<Option<Customer>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(customer_id)
        .fetch_optional(executor)
        .await
}

/// Case-insensitive substring search over name, email and phone, scoped to
/// the organization.
pub async fn search<'e, E>(
    executor: E,
    organization_id: &str,
    term: &str,
) -> Result<Vec<Customer>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let pattern = format!("%{}%", term);
    sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers WHERE organization_id = ? \
         AND (name LIKE ? OR email LIKE ? OR phone LIKE ?) \
         ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(executor)
    .await
}

/// Insert a new customer.
pub async fn insert<'e, E>(executor: E, customer: &NewCustomer) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let tags = super::encode_json(&customer.tags)?;

    sqlx::query(
        "INSERT INTO customers \
         (id, organization_id, name, email, phone, address, city, state, zip_code, property_type, notes, tags, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(customer.id.as_str())
    .bind(customer.organization_id.as_str())
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(&customer.city)
    .bind(&customer.state)
    .bind(&customer.zip_code)
    .bind(&customer.property_type)
    .bind(&customer.notes)
    .bind(tags)
    .bind(customer.created_by.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply a partial update.
pub async fn patch<'e, E>(
    executor: E,
    customer_id: &str,
    changes: &CustomerPatch,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let tags = changes.tags.as_ref().map(super::encode_json).transpose()?;

    sqlx::query(
        "UPDATE customers SET \
         name = COALESCE(?, name), \
         email = COALESCE(?, email), \
         phone = COALESCE(?, phone), \
         address = COALESCE(?, address), \
         city = COALESCE(?, city), \
         state = COALESCE(?, state), \
         zip_code = COALESCE(?, zip_code), \
         property_type = COALESCE(?, property_type), \
         notes = COALESCE(?, notes), \
         tags = COALESCE(?, tags), \
         updated_at = ? \
         WHERE id = ?",
    )
    .bind(&changes.name)
    .bind(&changes.email)
    .bind(&changes.phone)
    .bind(&changes.address)
    .bind(&changes.city)
    .bind(&changes.state)
    .bind(&changes.zip_code)
    .bind(&changes.property_type)
    .bind(&changes.notes)
    .bind(tags)
    .bind(now)
    .bind(customer_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Property type of a customer site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PropertyType {
    Residential,
    Commercial,
    Municipal,
}
