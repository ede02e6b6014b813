use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing, Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::app::{
    db,
    db::audit_logs::{AuditAction, AuditResource},
    db::invoices::{Invoice, InvoicePatch, InvoiceStatus, LineItem, NewInvoice},
    domain::{Action, OrganizationId, RecordId, Resource, UserId},
    error::AppError,
    identity::CurrentUser,
    tenant, AppState,
};

/// API shape for an invoice: the stored JSON line items column is decoded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub organization_id: String,
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
    pub amount_paid: f64,
    pub payment_method: Option<String>,
    pub paid_at: Option<i64>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl InvoiceResponse {
    fn from_row(row: Invoice) -> Result<Self, AppError> {
        let line_items = serde_json::from_str(&row.line_items).map_err(|_| AppError::Internal)?;
        Ok(InvoiceResponse {
            id: row.id,
            organization_id: row.organization_id,
            work_order_id: row.work_order_id,
            customer_id: row.customer_id,
            invoice_number: row.invoice_number,
            status: row.status,
            due_date: row.due_date,
            line_items,
            subtotal: row.subtotal,
            tax_rate: row.tax_rate,
            tax_amount: row.tax_amount,
            total: row.total,
            amount_paid: row.amount_paid,
            payment_method: row.payment_method,
            paid_at: row.paid_at,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Request body for creating an invoice.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub work_order_id: Option<String>,
    pub customer_id: String,
    #[validate(length(min = 1, max = 64))]
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub due_date: i64,
    pub line_items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// Request body for partially updating an invoice.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<i64>,
    pub line_items: Option<Vec<LineItem>>,
    pub subtotal: Option<f64>,
    pub tax_rate: Option<f64>,
    pub tax_amount: Option<f64>,
    pub total: Option<f64>,
}

/// Request body for recording payment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsPaidRequest {
    #[validate(length(min = 1, max = 64))]
    pub payment_method: String,
}

/// Fetch an invoice and enforce tenant isolation.
async fn find_scoped(
    pool: &sqlx::SqlitePool,
    user: &CurrentUser,
    invoice_id: &str,
) -> Result<Invoice, AppError> {
    let invoice = db::invoices::find_by_id(pool, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;
    tenant::require_same_organization(user, &invoice.organization_id)?;
    Ok(invoice)
}

fn rows_to_responses(rows: Vec<Invoice>) -> Result<Vec<InvoiceResponse>, AppError> {
    rows.into_iter().map(InvoiceResponse::from_row).collect()
}

/// GET /api/invoices — All invoices of the caller's organization. No tier
/// narrowing: invoices are organization-wide.
pub async fn list(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let rows = db::invoices::list_for_organization(&state.db, &user.organization_id).await?;
    Ok(Json(rows_to_responses(rows)?))
}

/// GET /api/invoices/status/:status
pub async fn list_by_status(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(status): Path<InvoiceStatus>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let rows = db::invoices::list_by_status(
        &state.db,
        &user.organization_id,
        &status.to_string(),
    )
    .await?;
    Ok(Json(rows_to_responses(rows)?))
}

/// GET /api/invoices/overdue — Sent invoices past their due date.
pub async fn list_overdue(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let rows = db::invoices::list_overdue(&state.db, &user.organization_id, now).await?;
    Ok(Json(rows_to_responses(rows)?))
}

/// GET /api/invoices/:id
pub async fn get(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = find_scoped(&state.db, &user, &invoice_id).await?;
    Ok(Json(InvoiceResponse::from_row(invoice)?))
}

/// POST /api/invoices
pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    user.require_permission(Resource::Invoices, Action::Create)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let invoice_id = RecordId::new();
    let new_invoice = NewInvoice {
        id: invoice_id.clone(),
        organization_id: OrganizationId::from_string(&user.organization_id)
            .map_err(|_| AppError::Internal)?,
        work_order_id: request.work_order_id,
        customer_id: request.customer_id,
        invoice_number: request.invoice_number,
        status: request.status.to_string(),
        due_date: request.due_date,
        line_items: request.line_items,
        subtotal: request.subtotal,
        tax_rate: request.tax_rate,
        tax_amount: request.tax_amount,
        total: request.total,
        created_by: UserId::from_string(&user.id).map_err(|_| AppError::Internal)?,
    };

    let mut tx = state.db.begin().await?;
    db::invoices::insert(&mut *tx, &new_invoice).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Create,
        AuditResource::Invoice,
        &invoice_id.as_str(),
        None,
    )
    .await?;
    tx.commit().await?;

    let invoice = db::invoices::find_by_id(&state.db, &invoice_id.as_str())
        .await?
        .ok_or(AppError::Internal)?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from_row(invoice)?)))
}

/// PATCH /api/invoices/:id
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    find_scoped(&state.db, &user, &invoice_id).await?;
    user.require_permission(Resource::Invoices, Action::Update)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let changes = InvoicePatch {
        status: request.status.map(|s| s.to_string()),
        due_date: request.due_date,
        line_items: request.line_items,
        subtotal: request.subtotal,
        tax_rate: request.tax_rate,
        tax_amount: request.tax_amount,
        total: request.total,
    };
    let changed_fields = serde_json::to_value(&changes).map_err(|_| AppError::Internal)?;

    let mut tx = state.db.begin().await?;
    db::invoices::patch(&mut *tx, &invoice_id, &changes).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Invoice,
        &invoice_id,
        Some(changed_fields),
    )
    .await?;
    tx.commit().await?;

    let invoice = db::invoices::find_by_id(&state.db, &invoice_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(InvoiceResponse::from_row(invoice)?))
}

/// POST /api/invoices/:id/pay — State transition to `paid`. Tenant
/// membership only; records the full total as paid.
pub async fn mark_as_paid(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(request): Json<MarkAsPaidRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    find_scoped(&state.db, &user, &invoice_id).await?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let mut tx = state.db.begin().await?;
    db::invoices::mark_paid(&mut *tx, &invoice_id, &request.payment_method).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Invoice,
        &invoice_id,
        Some(serde_json::json!({
            "status": "paid",
            "paymentMethod": request.payment_method,
        })),
    )
    .await?;
    tx.commit().await?;

    let invoice = db::invoices::find_by_id(&state.db, &invoice_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(InvoiceResponse::from_row(invoice)?))
}

/// Invoice routes. `overdue` and `status/:status` sit above `:id` so the
/// literal segments match first.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", routing::get(list).post(create))
        .route("/api/invoices/overdue", routing::get(list_overdue))
        .route("/api/invoices/status/:status", routing::get(list_by_status))
        .route("/api/invoices/:id", routing::get(get).patch(update))
        .route("/api/invoices/:id/pay", routing::post(mark_as_paid))
}
