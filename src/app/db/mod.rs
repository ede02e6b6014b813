pub mod audit_logs;
pub mod customers;
pub mod invoices;
pub mod leads;
pub mod organizations;
pub mod proposals;
pub mod users;
pub mod work_orders;

/// Serialize a value into a JSON column.
pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}